use crate::handles;

#[derive(Debug, derive_more::Display)]
pub enum Error {
    #[display("Access denied")]
    AccessDenied,
    #[display("Illegal metric handle: {_0}")]
    IllegalMetricHandle(handles::Metric),
    #[display("Invalid job, {record}: {reason}")]
    InvalidJob { record: String, reason: String },
    #[display("Invalid metric {metric}: {reason}")]
    InvalidMetric { metric: String, reason: String },
    #[display("Job {_0} was not found")]
    JobNotFound(handles::Job),
    #[display("Metric {_0} already exists")]
    MetricAlreadyExists(handles::Metric),
    #[display("Metric {_0} was not found")]
    MetricNotFound(handles::Metric),
    #[display("No job has been recorded yet")]
    NoJobsRecorded,
    #[display("Unexpected database error: {_0}")]
    UnexpectedDatabaseError(diesel::result::Error),
    #[display("Unexpected serialization error: {_0}")]
    UnexpectedSerializationError(serde_json::Error),
    #[display("Unexpected time error: {_0}")]
    UnexpectedTimeError(time::Error),
    #[display("Failed to log in")]
    LoginError,
}

impl Error {
    pub fn is_internal(&self) -> bool {
        use Error::*;
        match self {
            UnexpectedDatabaseError(_)
            | UnexpectedSerializationError(_)
            | UnexpectedTimeError(_) => true,
            _ => false,
        }
    }

    pub(crate) fn invalid_job(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidJob {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Error {
        Error::UnexpectedDatabaseError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::UnexpectedSerializationError(e)
    }
}

impl From<time::error::ComponentRange> for Error {
    fn from(e: time::error::ComponentRange) -> Error {
        Error::UnexpectedTimeError(e.into())
    }
}

impl From<time::error::Format> for Error {
    fn from(e: time::error::Format) -> Error {
        Error::UnexpectedTimeError(e.into())
    }
}

impl Into<squash_types::responses::ResponseError> for Error {
    fn into(self) -> squash_types::responses::ResponseError {
        use {squash_types::responses::ResponseError::*, Error::*};
        match self {
            UnexpectedDatabaseError(_)
            | UnexpectedSerializationError(_)
            | UnexpectedTimeError(_) => InternalError,
            JobNotFound(_) | MetricNotFound(_) | NoJobsRecorded => {
                ResourceNotFound(format!("{}", self))
            }
            AccessDenied
            | IllegalMetricHandle(_)
            | InvalidJob { .. }
            | InvalidMetric { .. }
            | MetricAlreadyExists(_)
            | LoginError => BadRequest(format!("{}", self)),
        }
    }
}
