use crate::error::Error;
use crate::models;
use crate::responses::CodeChange;
use crate::schema;
use crate::Conn;

use squash_types::data::Package;

use diesel::prelude::*;
use itertools::Itertools;
use std::collections::BTreeSet;

/// A job reduced to what the detector looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPackages {
    pub ci_id: String,
    pub ci_dataset: String,
    pub date: i64,
    pub packages: BTreeSet<Package>,
}

/// Lists, for each job, the packages it added or changed relative to the job
/// before it.
///
/// Jobs sharing a `ci_id` count once, as their first occurrence, even when
/// other runs come in between.
/// The first job has no baseline and is never listed, nor are jobs whose
/// package set equals their predecessor's. Only `current - previous` is
/// reported: a package that disappears entirely does not show up. Whether
/// removals should be listed too is still an open product question.
pub fn compute_code_changes(jobs: &[JobPackages], dataset: Option<&str>) -> Vec<CodeChange> {
    let mut jobs = jobs
        .iter()
        .filter(|job| dataset.map_or(true, |dataset| job.ci_dataset == dataset))
        .collect::<Vec<_>>();
    jobs.sort_by_key(|job| job.date);

    jobs.into_iter()
        .unique_by(|job| job.ci_id.clone())
        .tuple_windows()
        .filter_map(|(previous, current)| {
            let packages = current
                .packages
                .difference(&previous.packages)
                .cloned()
                .collect::<Vec<_>>();
            (!packages.is_empty()).then(|| CodeChange {
                ci_id: current.ci_id.clone(),
                count: packages.len(),
                packages,
            })
        })
        .collect()
}

/// Loads the job history of `dataset` (or of every dataset) and runs the
/// detector over it.
pub fn code_changes(conn: &mut Conn, dataset: Option<&str>) -> Result<Vec<CodeChange>, Error> {
    let mut query: schema::jobs::BoxedQuery<'_, diesel::sqlite::Sqlite> =
        schema::jobs::table.into_boxed();
    if let Some(dataset) = dataset {
        query = query.filter(schema::jobs::ci_dataset.eq(dataset));
    }
    let jobs = query
        .order((schema::jobs::date.asc(), schema::jobs::id.asc()))
        .load::<models::Job>(conn)?;
    let packages = models::Package::belonging_to(&jobs)
        .load::<models::Package>(conn)?
        .grouped_by(&jobs);

    let history = jobs
        .into_iter()
        .zip(packages)
        .map(|(job, packages)| JobPackages {
            ci_id: job.ci_id,
            ci_dataset: job.ci_dataset,
            date: job.date,
            packages: packages
                .into_iter()
                .map(|p| Package {
                    name: p.name,
                    git_commit: p.git_commit,
                    git_url: p.git_url,
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    tracing::trace!("detecting code changes over {} jobs", history.len());

    Ok(compute_code_changes(&history, dataset))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/lsst/numpy.git";

    fn package(name: &str, commit: &str) -> Package {
        Package {
            name: name.into(),
            git_commit: commit.into(),
            git_url: URL.into(),
        }
    }

    fn job(ci_id: &str, dataset: &str, date: i64, packages: &[(&str, &str)]) -> JobPackages {
        JobPackages {
            ci_id: ci_id.into(),
            ci_dataset: dataset.into(),
            date,
            packages: packages.iter().map(|(n, c)| package(n, c)).collect(),
        }
    }

    #[test]
    fn scenario_commit_bump() {
        let history = [
            job("100", "cfht", 1, &[("numpy", "abc")]),
            job("101", "cfht", 2, &[("numpy", "abc")]),
            job("102", "cfht", 3, &[("numpy", "def")]),
        ];
        assert_eq!(
            compute_code_changes(&history, None),
            vec![CodeChange {
                ci_id: "102".into(),
                packages: vec![package("numpy", "def")],
                count: 1,
            }]
        );
    }

    #[test]
    fn empty_history() {
        assert!(compute_code_changes(&[], None).is_empty());
        assert!(compute_code_changes(&[], Some("cfht")).is_empty());
    }

    #[test]
    fn first_job_is_never_listed() {
        let history = [
            job("1", "cfht", 1, &[("afw", "a1"), ("numpy", "n1")]),
            job("2", "cfht", 2, &[("afw", "a2"), ("numpy", "n1")]),
        ];
        let changes = compute_code_changes(&history, None);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].ci_id, "2");
        assert!(compute_code_changes(&history[..1], None).is_empty());
    }

    #[test]
    fn removals_are_not_reported() {
        let history = [
            job("1", "cfht", 1, &[("afw", "a1"), ("numpy", "n1")]),
            job("2", "cfht", 2, &[("numpy", "n1")]),
            job("3", "cfht", 3, &[("numpy", "n1"), ("sconsUtils", "s1")]),
        ];
        let changes = compute_code_changes(&history, None);
        assert_eq!(
            changes,
            vec![CodeChange {
                ci_id: "3".into(),
                packages: vec![package("sconsUtils", "s1")],
                count: 1,
            }]
        );
    }

    #[test]
    fn repeated_ci_ids_count_once() {
        let history = [
            job("1", "cfht", 1, &[("numpy", "n1")]),
            job("2", "cfht", 2, &[("numpy", "n2")]),
            // a retried step of run 2, the first occurrence stands for the run
            job("2", "cfht", 3, &[("numpy", "n3")]),
            job("3", "cfht", 4, &[("numpy", "n3")]),
        ];
        let changes = compute_code_changes(&history, None);
        assert_eq!(
            changes,
            vec![
                CodeChange {
                    ci_id: "2".into(),
                    packages: vec![package("numpy", "n2")],
                    count: 1,
                },
                CodeChange {
                    ci_id: "3".into(),
                    packages: vec![package("numpy", "n3")],
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn returning_ci_ids_count_once() {
        let history = [
            job("5", "cfht", 1, &[("numpy", "a")]),
            job("6", "cfht", 2, &[("numpy", "b")]),
            job("5", "cfht", 3, &[("numpy", "c")]),
        ];
        let ids = compute_code_changes(&history, Some("cfht"))
            .into_iter()
            .map(|c| c.ci_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["6"]);

        let history = [
            job("1", "cfht", 1, &[("numpy", "n1")]),
            job("2", "cfht", 2, &[("numpy", "n2")]),
            job("1", "cfht", 3, &[("numpy", "n9")]),
            job("3", "cfht", 4, &[("numpy", "n2"), ("afw", "a1")]),
        ];
        assert_eq!(
            compute_code_changes(&history, None),
            vec![
                CodeChange {
                    ci_id: "2".into(),
                    packages: vec![package("numpy", "n2")],
                    count: 1,
                },
                CodeChange {
                    ci_id: "3".into(),
                    packages: vec![package("afw", "a1")],
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn dataset_filter_builds_its_own_sequence() {
        let history = [
            job("1", "cfht", 1, &[("numpy", "n1")]),
            job("2", "decam", 2, &[("numpy", "n2")]),
            job("3", "cfht", 3, &[("numpy", "n1")]),
            job("4", "cfht", 4, &[("numpy", "n4")]),
        ];
        let cfht = compute_code_changes(&history, Some("cfht"));
        assert_eq!(cfht.iter().map(|c| c.ci_id.as_str()).collect::<Vec<_>>(), ["4"]);
        assert!(compute_code_changes(&history, Some("decam")).is_empty());
        assert!(compute_code_changes(&history, Some("hsc")).is_empty());

        let all = compute_code_changes(&history, None);
        assert_eq!(
            all.iter().map(|c| c.ci_id.as_str()).collect::<Vec<_>>(),
            ["2", "3", "4"]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let history = [
            job("3", "cfht", 3, &[("numpy", "n3")]),
            job("1", "cfht", 1, &[("numpy", "n1")]),
            job("2", "cfht", 2, &[("numpy", "n2")]),
        ];
        let ids = compute_code_changes(&history, None)
            .into_iter()
            .map(|c| c.ci_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["2", "3"]);
    }

    #[test]
    fn entries_are_exact_set_differences() {
        let history = [
            job("1", "cfht", 1, &[("a", "1"), ("b", "1"), ("c", "1")]),
            job("2", "cfht", 2, &[("a", "1"), ("b", "2"), ("d", "1")]),
            job("3", "cfht", 3, &[("a", "1"), ("b", "2"), ("d", "1")]),
            job("4", "cfht", 4, &[("a", "2"), ("c", "1")]),
            job("5", "cfht", 5, &[]),
            job("6", "cfht", 6, &[("a", "2")]),
        ];
        let changes = compute_code_changes(&history, None);
        for change in &changes {
            let i = history.iter().position(|j| j.ci_id == change.ci_id).unwrap();
            let expected = history[i]
                .packages
                .difference(&history[i - 1].packages)
                .cloned()
                .collect::<Vec<_>>();
            assert_eq!(change.packages, expected);
            assert_eq!(change.count, expected.len());
        }
        assert_eq!(
            changes.iter().map(|c| c.ci_id.as_str()).collect::<Vec<_>>(),
            ["2", "4", "6"]
        );
        assert_eq!(compute_code_changes(&history, None), changes);
    }
}
