use crate::error::Error;
use crate::jobs::{from_micros, Job};
use crate::responses::Statistics;
use crate::schema;
use crate::Conn;

use diesel::prelude::*;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");

pub fn format_date(date: OffsetDateTime) -> Result<String, Error> {
    Ok(date.format(DATE_FORMAT)?)
}

/// Landing page summary. Fails with `NoJobsRecorded` before the first job
/// arrives, since most figures describe the latest job.
pub fn compute_statistics(conn: &mut Conn) -> Result<Statistics, Error> {
    let latest = Job::latest(conn)?.ok_or(Error::NoJobsRecorded)?;

    let count = |n: i64| n as u64;
    Ok(Statistics {
        number_of_metrics: count(schema::metrics::table.count().get_result(conn)?),
        number_of_packages: count(
            schema::packages::table
                .filter(schema::packages::job_id.eq(latest.id))
                .count()
                .get_result(conn)?,
        ),
        number_of_jobs: count(schema::jobs::table.count().get_result(conn)?),
        number_of_measurements: count(schema::measurements::table.count().get_result(conn)?),
        datasets: Job::datasets(conn)?.join(", "),
        latest_job_date: format_date(from_micros(latest.date)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn human_readable_dates() {
        assert_eq!(
            format_date(datetime!(2026-10-19 23:59 UTC)).unwrap(),
            "Oct 19, 2026"
        );
        assert_eq!(
            format_date(datetime!(2017-03-01 0:00 UTC)).unwrap(),
            "Mar 1, 2017"
        );
    }
}
