use crate::error::Error;
use crate::jobs::Job;
use crate::responses;
use crate::Conn;

use squash_types::data::Period;

/// Metric shown when a dashboard query names none. Deliberately pinned: it
/// overrides the default that would otherwise be taken from the stored
/// metrics.
pub const DEFAULT_METRIC: &str = "AM1";
pub const DEFAULT_SNR_CUT: &str = "100";
pub const DEFAULT_PERIOD: Period = Period::LastSixMonths;

/// Defaults for dashboard queries: the latest job, the pinned metric and
/// fixed window parameters.
pub fn resolve_defaults(conn: &mut Conn) -> Result<responses::Defaults, Error> {
    let (ci_id, ci_dataset) = match Job::latest(conn)? {
        Some(job) => (Some(job.ci_id), Some(job.ci_dataset)),
        None => (None, None),
    };
    Ok(responses::Defaults {
        ci_id,
        ci_dataset,
        metric: DEFAULT_METRIC.to_string(),
        snr_cut: DEFAULT_SNR_CUT.to_string(),
        period: DEFAULT_PERIOD,
    })
}
