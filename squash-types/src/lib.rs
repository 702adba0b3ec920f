pub mod handles {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Job {
        pub id: i32,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Metric {
        pub name: String,
    }
    impl Metric {
        pub const MAX_LEN: usize = 16;

        pub fn legal(&self) -> bool {
            use lazy_static::lazy_static;
            use regex::Regex;
            lazy_static! {
                static ref RE: Regex = Regex::new("^[A-Za-z0-9_-]+$").unwrap();
            }
            self.name.len() <= Self::MAX_LEN && RE.is_match(&self.name)
        }
    }

    impl std::fmt::Display for Job {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "#{}", self.id)
        }
    }
    impl std::fmt::Display for Metric {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "{}", self.name)
        }
    }

    pub fn job(id: i32) -> Job {
        Job { id }
    }
    pub fn metric(name: String) -> Metric {
        Metric { name }
    }
}

pub mod data {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    /// Outcome of a CI run, stored and serialized as its integer code.
    #[derive(
        Copy,
        Clone,
        Debug,
        Default,
        PartialEq,
        Eq,
        serde_repr::Serialize_repr,
        serde_repr::Deserialize_repr,
    )]
    #[repr(i32)]
    pub enum JobStatus {
        #[default]
        Ok = 0,
        Failed = 1,
    }
    impl TryFrom<i32> for JobStatus {
        type Error = String;
        fn try_from(i: i32) -> Result<Self, Self::Error> {
            match i {
                0 => Ok(Self::Ok),
                1 => Ok(Self::Failed),
                _ => Err(format!("unknown job status {i}")),
            }
        }
    }
    impl From<JobStatus> for i32 {
        fn from(status: JobStatus) -> i32 {
            status as i32
        }
    }

    /// A package as used by a job, identified by `(name, git_commit, git_url)`.
    /// The field order gives the ordering of code-change listings.
    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct Package {
        pub name: String,
        pub git_commit: String,
        pub git_url: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct VersionedPackage {
        pub name: String,
        pub git_url: String,
        pub git_commit: String,
        pub git_branch: String,
        pub build_version: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Measurement {
        pub metric: String,
        pub value: f64,
        #[serde(default)]
        pub metadata: Option<Value>,
    }

    fn default_operator() -> String {
        "<".into()
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Metric {
        pub metric: String,
        #[serde(default)]
        pub unit: String,
        pub description: String,
        /// Operator used to test a measurement against the specification
        #[serde(default = "default_operator")]
        pub operator: String,
        #[serde(default)]
        pub parameters: Option<Value>,
        #[serde(default)]
        pub specs: Option<Value>,
        #[serde(default)]
        pub reference: Option<Value>,
    }

    /// A data payload produced by a job, referenced by its identifier from
    /// measurement metadata.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Blob {
        pub identifier: String,
        pub data: Value,
    }

    /// The `blobs` entry of a measurement's metadata: which job blob plays
    /// which role.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MetadataBlobs {
        #[serde(default)]
        pub matched_dataset: Option<String>,
        #[serde(default)]
        pub photom_model: Option<String>,
        #[serde(default)]
        pub astrom_model: Option<String>,
    }

    /// Named time windows bounding measurement series.
    #[derive(
        Copy,
        Clone,
        Debug,
        Default,
        PartialEq,
        Eq,
        Serialize,
        Deserialize,
        strum::Display,
        strum::EnumString,
        strum::EnumIter,
    )]
    pub enum Period {
        #[default]
        #[serde(rename = "Last month")]
        #[strum(serialize = "Last month")]
        LastMonth,
        #[serde(rename = "Last 3 months")]
        #[strum(serialize = "Last 3 months")]
        LastThreeMonths,
        #[serde(rename = "Last 6 months")]
        #[strum(serialize = "Last 6 months")]
        LastSixMonths,
        #[serde(rename = "Last year")]
        #[strum(serialize = "Last year")]
        LastYear,
        #[serde(rename = "All")]
        #[strum(serialize = "All")]
        All,
    }
    impl Period {
        /// Unrecognized names fall back to the default window.
        pub fn parse_lenient(s: Option<&str>) -> Self {
            s.and_then(|s| s.parse().ok()).unwrap_or_default()
        }

        /// Length of the window, `None` for an unbounded one.
        pub fn weeks(&self) -> Option<i64> {
            match self {
                Self::LastMonth => Some(4),
                Self::LastThreeMonths => Some(12),
                Self::LastSixMonths => Some(24),
                Self::LastYear => Some(48),
                Self::All => None,
            }
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum User {
        Admin,
    }
}

pub mod requests {
    use crate::data::{Blob, JobStatus, Measurement, Metric, Period, VersionedPackage};
    use crate::handles;

    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct JobDecl {
        pub ci_id: String,
        pub ci_name: String,
        pub ci_dataset: String,
        pub ci_label: String,
        pub ci_url: String,
        #[serde(default)]
        pub status: JobStatus,
        #[serde(default)]
        pub blobs: Option<Vec<Blob>>,
        #[serde(default)]
        pub measurements: Vec<Measurement>,
        #[serde(default)]
        pub packages: Vec<VersionedPackage>,
    }

    fn default_limit() -> u8 {
        100
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct JobSearch {
        #[serde(default)]
        pub ci_dataset: Option<String>,
        #[serde(default)]
        pub ci_id: Option<String>,
        #[serde(default = "default_limit")]
        pub limit: u8,
        #[serde(default)]
        pub offset: u32,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SeriesFilter {
        pub metric: Option<String>,
        pub ci_dataset: Option<String>,
        pub period: Period,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AppDataQuery {
        pub ci_id: Option<String>,
        pub ci_dataset: Option<String>,
        pub metric: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Job {
        Info,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum MetricRequest {
        Info,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub enum Request {
        ListJobs(JobSearch),
        CreateJob(JobDecl),
        Job(handles::Job, Job),
        ListMetrics,
        CreateMetrics(Vec<Metric>),
        Metric(handles::Metric, MetricRequest),
        ListDatasets,
        Defaults,
        Series(SeriesFilter),
        CodeChanges { ci_dataset: Option<String> },
        Statistics,
        AppData(AppDataQuery),
        Login { password: String },
        User,
    }

    impl std::fmt::Display for Request {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            match self {
                Request::ListJobs(_) => write!(f, "Search through jobs"),
                Request::CreateJob(decl) => write!(
                    f,
                    "Create job {} on dataset {} with {} measurements",
                    decl.ci_id,
                    decl.ci_dataset,
                    decl.measurements.len()
                ),
                Request::Job(h, req) => write!(f, "{:?} for job {}", req, h),
                Request::ListMetrics => write!(f, "List metrics"),
                Request::CreateMetrics(metrics) => {
                    write!(f, "Create {} metrics", metrics.len())
                }
                Request::Metric(h, req) => write!(f, "{:?} for metric {}", req, h),
                Request::ListDatasets => write!(f, "List datasets"),
                Request::Defaults => write!(f, "Get defaults"),
                Request::Series(s) => write!(f, "Measurement series over {}", s.period),
                Request::CodeChanges { .. } => write!(f, "List code changes"),
                Request::Statistics => write!(f, "Get statistics"),
                Request::AppData(_) => write!(f, "Get app data"),
                Request::Login { .. } => write!(f, "Log in"),
                Request::User => write!(f, "Get user"),
            }
        }
    }
}

pub mod responses {
    use crate::data::{Blob, JobStatus, Measurement, Metric, Package, Period, User, VersionedPackage};
    use crate::handles;

    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use time::OffsetDateTime;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SearchResult<T> {
        pub count: u8,
        pub list: Vec<T>,
        pub total: u64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct JobInfo {
        pub handle: handles::Job,
        pub ci_id: String,
        pub ci_name: String,
        pub ci_dataset: String,
        pub ci_label: String,
        #[serde(with = "time::serde::timestamp")]
        pub date: OffsetDateTime,
        pub ci_url: String,
        pub status: JobStatus,
        pub blobs: Option<Vec<Blob>>,
        pub measurements: Vec<Measurement>,
        pub packages: Vec<VersionedPackage>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Defaults {
        pub ci_id: Option<String>,
        pub ci_dataset: Option<String>,
        pub metric: String,
        pub snr_cut: String,
        pub period: Period,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SeriesPoint {
        pub dataset: String,
        pub ci_id: String,
        #[serde(with = "time::serde::timestamp")]
        pub date: OffsetDateTime,
        pub ci_url: String,
        pub value: f64,
        pub metric: String,
    }

    /// Packages added or changed by a job relative to the job before it.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CodeChange {
        pub ci_id: String,
        pub packages: Vec<Package>,
        pub count: usize,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Statistics {
        pub number_of_metrics: u64,
        pub number_of_packages: u64,
        pub number_of_jobs: u64,
        pub number_of_measurements: u64,
        pub datasets: String,
        pub latest_job_date: String,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub metadata: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub matched_dataset: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub photom_model: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub astrom_model: Option<Value>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub enum Response {
        Ok,
        ListJobs(SearchResult<JobInfo>),
        JobCreated(handles::Job),
        JobInfo(JobInfo),
        ListMetrics(Vec<Metric>),
        MetricsCreated(Vec<handles::Metric>),
        MetricInfo(Metric),
        ListDatasets(Vec<String>),
        Defaults(Defaults),
        Series(Vec<SeriesPoint>),
        CodeChanges(Vec<CodeChange>),
        Statistics(Statistics),
        AppData(AppData),
        User(Option<User>),
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ResponseError {
        BadRequest(String),
        InternalError,
        ResourceNotFound(String),
    }

    impl std::fmt::Display for ResponseError {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            match self {
                ResponseError::BadRequest(e) => write!(f, "Bad request: {}", e),
                ResponseError::InternalError => write!(f, "Internal server error"),
                ResponseError::ResourceNotFound(e) => write!(f, "Resource not found: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::data::*;
    use super::handles;

    #[test]
    fn period_names() {
        assert_eq!(Period::LastSixMonths.to_string(), "Last 6 months");
        assert_eq!("Last year".parse::<Period>(), Ok(Period::LastYear));
        assert_eq!(Period::parse_lenient(Some("All")), Period::All);
        assert_eq!(Period::parse_lenient(Some("Last week")), Period::LastMonth);
        assert_eq!(Period::parse_lenient(None), Period::LastMonth);
        assert_eq!(
            serde_json::to_value(Period::LastThreeMonths).unwrap(),
            serde_json::json!("Last 3 months")
        );
    }

    #[test]
    fn job_status_is_an_integer() {
        assert_eq!(serde_json::to_string(&JobStatus::Failed).unwrap(), "1");
        let status: JobStatus = serde_json::from_str("0").unwrap();
        assert_eq!(status, JobStatus::Ok);
        assert!(JobStatus::try_from(7).is_err());
    }

    #[test]
    fn metric_handles() {
        assert!(handles::metric("AM1".into()).legal());
        assert!(handles::metric("PA1_design-x".into()).legal());
        assert!(!handles::metric("".into()).legal());
        assert!(!handles::metric("a metric".into()).legal());
        assert!(!handles::metric("x".repeat(17)).legal());
    }

    #[test]
    fn metric_defaults() {
        let metric: Metric =
            serde_json::from_str(r#"{"metric": "AM1", "description": "astrometry"}"#).unwrap();
        assert_eq!(metric.operator, "<");
        assert_eq!(metric.unit, "");
        assert_eq!(metric.specs, None);
    }
}
