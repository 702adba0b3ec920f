use crate::error::Error;
use crate::jobs::{from_micros, to_micros};
use crate::requests::SeriesFilter;
use crate::responses::SeriesPoint;
use crate::schema;
use crate::Conn;

use squash_types::data::Period;

use diesel::prelude::*;
use time::{Duration, OffsetDateTime};

/// Earliest job date included by `period`, `None` when unbounded.
pub fn lower_bound(period: Period, now: OffsetDateTime) -> Option<OffsetDateTime> {
    period.weeks().map(|weeks| now - Duration::weeks(weeks))
}

/// Measurements matching `filter`, oldest job first.
pub fn build_series(
    conn: &mut Conn,
    filter: &SeriesFilter,
    now: OffsetDateTime,
) -> Result<Vec<SeriesPoint>, Error> {
    use schema::{jobs, measurements};

    let mut query = measurements::table
        .inner_join(jobs::table)
        .select((
            jobs::ci_dataset,
            jobs::ci_id,
            jobs::date,
            jobs::ci_url,
            measurements::value,
            measurements::metric_id,
        ))
        .into_boxed::<diesel::sqlite::Sqlite>();
    if let Some(metric) = &filter.metric {
        query = query.filter(measurements::metric_id.eq(metric.clone()));
    }
    if let Some(dataset) = &filter.ci_dataset {
        query = query.filter(jobs::ci_dataset.eq(dataset.clone()));
    }
    if let Some(bound) = lower_bound(filter.period, now) {
        query = query.filter(jobs::date.ge(to_micros(bound)));
    }

    query
        .order((jobs::date.asc(), jobs::id.asc(), measurements::id.asc()))
        .load::<(String, String, i64, String, f64, String)>(conn)?
        .into_iter()
        .map(|(dataset, ci_id, date, ci_url, value, metric)| -> Result<_, Error> {
            Ok(SeriesPoint {
                dataset,
                ci_id,
                date: from_micros(date)?,
                ci_url,
                value,
                metric,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn windows() {
        let now = datetime!(2026-10-19 12:00 UTC);
        assert_eq!(
            lower_bound(Period::LastYear, now),
            Some(now - Duration::weeks(48))
        );
        assert_eq!(
            lower_bound(Period::LastSixMonths, now),
            Some(datetime!(2026-05-04 12:00 UTC))
        );
        assert_eq!(
            lower_bound(Period::LastThreeMonths, now),
            Some(now - Duration::weeks(12))
        );
        assert_eq!(
            lower_bound(Period::LastMonth, now),
            Some(datetime!(2026-09-21 12:00 UTC))
        );
        assert_eq!(lower_bound(Period::All, now), None);
    }

    #[test]
    fn unknown_period_uses_four_weeks() {
        let now = datetime!(2026-10-19 0:00 UTC);
        assert_eq!(
            lower_bound(Period::parse_lenient(Some("Last decade")), now),
            Some(now - Duration::weeks(4))
        );
    }
}
