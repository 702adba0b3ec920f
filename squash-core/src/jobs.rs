use crate::error::Error;
use crate::models;
use crate::schema;
use crate::stored;
use crate::Conn;
use crate::{handles, requests, responses};

use squash_types::data::{JobStatus, Measurement, VersionedPackage};

use diesel::prelude::*;
use itertools::Itertools;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
pub struct Job {
    pub job: models::Job,
}

const MAX_PAGE: u8 = 100;

impl Job {
    /// Records a job with its measurements and packages. Nothing is written
    /// unless every nested record is valid.
    pub fn create(
        conn: &mut Conn,
        decl: &requests::JobDecl,
        now: OffsetDateTime,
    ) -> Result<handles::Job, Error> {
        validate(decl)?;
        let blobs = decl.blobs.as_ref().map(stored::encode_twice).transpose()?;
        let metadata = decl
            .measurements
            .iter()
            .map(|m| m.metadata.as_ref().map(stored::encode_twice).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        conn.transaction::<handles::Job, Error, _>(|conn| {
            // job dates strictly increase, even if the clock stalls or goes back
            let date = match Self::latest(conn)? {
                Some(latest) => to_micros(now).max(latest.date + 1),
                None => to_micros(now),
            };
            let new_job = models::NewJob {
                ci_id: &decl.ci_id,
                ci_name: &decl.ci_name,
                ci_dataset: &decl.ci_dataset,
                ci_label: &decl.ci_label,
                date,
                ci_url: &decl.ci_url,
                status: decl.status.into(),
                blobs: blobs.as_deref(),
            };
            let job = diesel::insert_into(schema::jobs::table)
                .values(&new_job)
                .get_result::<models::Job>(conn)?;

            for (i, (measurement, metadata)) in decl.measurements.iter().zip(&metadata).enumerate()
            {
                let known = schema::metrics::table
                    .find(&measurement.metric)
                    .count()
                    .get_result::<i64>(conn)?
                    > 0;
                if !known {
                    return Err(Error::invalid_job(
                        format!("measurements[{i}]"),
                        format!("unknown metric {}", measurement.metric),
                    ));
                }
                diesel::insert_into(schema::measurements::table)
                    .values(&models::NewMeasurement {
                        value: measurement.value,
                        metadata: metadata.as_deref(),
                        job_id: job.id,
                        metric_id: &measurement.metric,
                    })
                    .execute(conn)?;
            }

            let new_packages = decl
                .packages
                .iter()
                .map(|package| models::NewPackage {
                    name: &package.name,
                    git_url: &package.git_url,
                    git_commit: &package.git_commit,
                    git_branch: &package.git_branch,
                    build_version: &package.build_version,
                    job_id: job.id,
                })
                .collect::<Vec<_>>();
            if !new_packages.is_empty() {
                diesel::insert_into(schema::packages::table)
                    .values(&new_packages)
                    .execute(conn)?;
            }

            Ok(handles::job(job.id))
        })
    }

    pub fn get(conn: &mut Conn, handle: &handles::Job) -> Result<Self, Error> {
        let job = schema::jobs::table
            .find(handle.id)
            .first::<models::Job>(conn)
            .optional()?
            .ok_or(Error::JobNotFound(*handle))?;
        Ok(Job { job })
    }

    pub fn handle(&self) -> handles::Job {
        handles::job(self.job.id)
    }

    pub fn info(&self, conn: &mut Conn) -> Result<responses::JobInfo, Error> {
        let mut infos = infos(conn, vec![self.job.clone()])?;
        Ok(infos.remove(0))
    }

    /// The most recently created job, if any.
    pub fn latest(conn: &mut Conn) -> Result<Option<models::Job>, Error> {
        Ok(schema::jobs::table
            .order(schema::jobs::id.desc())
            .first::<models::Job>(conn)
            .optional()?)
    }

    pub fn list(
        conn: &mut Conn,
        search: &requests::JobSearch,
    ) -> Result<responses::SearchResult<responses::JobInfo>, Error> {
        let query = || {
            let mut query: schema::jobs::BoxedQuery<'_, diesel::sqlite::Sqlite> =
                schema::jobs::table.into_boxed();
            if let Some(ci_dataset) = &search.ci_dataset {
                query = query.filter(schema::jobs::ci_dataset.eq(ci_dataset.clone()));
            }
            if let Some(ci_id) = &search.ci_id {
                query = query.filter(schema::jobs::ci_id.eq(ci_id.clone()));
            }
            query
        };
        let total = query().count().get_result::<i64>(conn)? as u64;
        let page = query()
            .order((schema::jobs::date.asc(), schema::jobs::id.asc()))
            .limit(search.limit.min(MAX_PAGE).into())
            .offset(search.offset.into())
            .load::<models::Job>(conn)?;
        let list = infos(conn, page)?;
        Ok(responses::SearchResult {
            count: list.len() as u8,
            list,
            total,
        })
    }

    /// Distinct datasets, in the order they first appeared.
    pub fn datasets(conn: &mut Conn) -> Result<Vec<String>, Error> {
        Ok(schema::jobs::table
            .select(schema::jobs::ci_dataset)
            .order(schema::jobs::id.asc())
            .load::<String>(conn)?
            .into_iter()
            .unique()
            .collect())
    }
}

/// Job dates are stored as microseconds since the epoch.
pub(crate) fn to_micros(date: OffsetDateTime) -> i64 {
    (date.unix_timestamp_nanos() / 1_000) as i64
}

pub(crate) fn from_micros(micros: i64) -> Result<OffsetDateTime, Error> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(micros) * 1_000,
    )?)
}

pub(crate) fn status(job: &models::Job) -> Result<JobStatus, Error> {
    JobStatus::try_from(job.status)
        .map_err(|e| diesel::result::Error::DeserializationError(e.into()).into())
}

fn infos(conn: &mut Conn, jobs: Vec<models::Job>) -> Result<Vec<responses::JobInfo>, Error> {
    let measurements = models::Measurement::belonging_to(&jobs)
        .order(schema::measurements::id.asc())
        .load::<models::Measurement>(conn)?
        .grouped_by(&jobs);
    let packages = models::Package::belonging_to(&jobs)
        .order(schema::packages::id.asc())
        .load::<models::Package>(conn)?
        .grouped_by(&jobs);

    jobs.into_iter()
        .zip(measurements)
        .zip(packages)
        .map(|((job, measurements), packages)| -> Result<_, Error> {
            Ok(responses::JobInfo {
                handle: handles::job(job.id),
                date: from_micros(job.date)?,
                status: status(&job)?,
                blobs: stored::decode_column("blobs", job.blobs.as_deref()),
                measurements: measurements
                    .into_iter()
                    .map(|m| Measurement {
                        metadata: stored::decode_column("metadata", m.metadata.as_deref()),
                        metric: m.metric_id,
                        value: m.value,
                    })
                    .collect(),
                packages: packages
                    .into_iter()
                    .map(|p| VersionedPackage {
                        name: p.name,
                        git_url: p.git_url,
                        git_commit: p.git_commit,
                        git_branch: p.git_branch,
                        build_version: p.build_version,
                    })
                    .collect(),
                ci_id: job.ci_id,
                ci_name: job.ci_name,
                ci_dataset: job.ci_dataset,
                ci_label: job.ci_label,
                ci_url: job.ci_url,
            })
        })
        .collect()
}

fn check_text(record: &str, field: &str, value: &str, max_len: usize) -> Result<(), Error> {
    if value.is_empty() {
        Err(Error::invalid_job(record, format!("{field} may not be blank")))
    } else if value.chars().count() > max_len {
        Err(Error::invalid_job(
            record,
            format!("{field} is longer than {max_len} characters"),
        ))
    } else {
        Ok(())
    }
}

fn validate(decl: &requests::JobDecl) -> Result<(), Error> {
    use lazy_static::lazy_static;
    use regex::Regex;
    lazy_static! {
        static ref SLUG: Regex = Regex::new("^[A-Za-z0-9_-]+$").unwrap();
        static ref SHA1: Regex = Regex::new("^[0-9a-fA-F]{40}$").unwrap();
    }

    check_text("job", "ci_id", &decl.ci_id, 16)?;
    check_text("job", "ci_name", &decl.ci_name, 32)?;
    check_text("job", "ci_dataset", &decl.ci_dataset, 16)?;
    check_text("job", "ci_label", &decl.ci_label, 16)?;
    check_text("job", "ci_url", &decl.ci_url, usize::MAX)?;

    for (i, measurement) in decl.measurements.iter().enumerate() {
        let record = format!("measurements[{i}]");
        check_text(&record, "metric", &measurement.metric, handles::Metric::MAX_LEN)?;
        if !measurement.value.is_finite() {
            return Err(Error::invalid_job(record, "value must be a finite number"));
        }
    }

    for (i, package) in decl.packages.iter().enumerate() {
        let record = format!("packages[{i}]");
        check_text(&record, "name", &package.name, 64)?;
        if !SLUG.is_match(&package.name) {
            return Err(Error::invalid_job(record, "name must be a slug"));
        }
        check_text(&record, "git_url", &package.git_url, 128)?;
        if !SHA1.is_match(&package.git_commit) {
            return Err(Error::invalid_job(
                record,
                "git_commit must be a 40 character SHA1",
            ));
        }
        check_text(&record, "git_branch", &package.git_branch, usize::MAX)?;
        check_text(&record, "build_version", &package.build_version, usize::MAX)?;
    }

    Ok(())
}
