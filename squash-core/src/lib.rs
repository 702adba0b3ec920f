mod apps;
mod code_changes;
mod defaults;
mod jobs;
mod metrics;
mod models;
mod schema;
mod series;
mod statistics;
mod stored;

#[cfg(test)]
mod tests;

pub mod error;

pub use squash_types::{data, handles, requests, responses, responses::Response, responses::ResponseError};

pub use crate::code_changes::{compute_code_changes, JobPackages};
pub use crate::defaults::DEFAULT_METRIC;

use error::Error;
use jobs::Job;
use metrics::Metric;

use argon2::PasswordHash;
use diesel::prelude::*;
use diesel::r2d2;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::{Deserialize, Serialize};
use std::sync::{LazyLock, OnceLock};
use time::OffsetDateTime;

/// Process-wide configuration, set once by [`init`].
#[derive(Debug)]
pub struct Settings {
    pub password: PasswordHash<'static>,
    pub database_url: String,
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

fn settings() -> &'static Settings {
    SETTINGS.get().expect("squash_core::init must run first")
}

fn verify_password(password: &[u8]) -> bool {
    use argon2::{Argon2, PasswordVerifier};
    Argon2::default()
        .verify_password(password, &settings().password)
        .is_ok()
}

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<SqliteConnection>>;
pub type Conn = r2d2::PooledConnection<r2d2::ConnectionManager<SqliteConnection>>;

/// Applied to every pooled connection.
#[derive(Debug)]
pub struct SqlitePragmas;

const PRAGMAS: &str = "PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 10000;";

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        use diesel::connection::SimpleConnection;
        conn.batch_execute(PRAGMAS).map_err(r2d2::Error::QueryError)
    }
}

// SQuaSH's state
pub static POOL: LazyLock<DbPool> = LazyLock::new(|| pool(&settings().database_url, None));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum User {
    Admin,
    Anonymous,
}

impl User {
    pub fn is_admin(&self) -> bool {
        match self {
            User::Admin => true,
            _ => false,
        }
    }
    pub fn from_password(password: &[u8]) -> Self {
        if verify_password(password) {
            User::Admin
        } else {
            User::Anonymous
        }
    }
}

/// Reads are public, writes are reserved to the administrator.
pub fn authorize_request(user: &User, req: &requests::Request) -> bool {
    use requests::*;
    match req {
        Request::CreateJob(_) | Request::CreateMetrics(_) => user.is_admin(),
        Request::ListJobs(_)
        | Request::Job(_, _)
        | Request::ListMetrics
        | Request::Metric(_, _)
        | Request::ListDatasets
        | Request::Defaults
        | Request::Series(_)
        | Request::CodeChanges { .. }
        | Request::Statistics
        | Request::AppData(_)
        | Request::Login { .. }
        | Request::User => true,
    }
}

pub fn handle_request_aux(
    conn: &mut Conn,
    user: &User,
    req: &requests::Request,
) -> Result<Response, Error> {
    if !authorize_request(user, req) {
        return Err(Error::AccessDenied);
    }
    Ok(match req {
        requests::Request::ListJobs(search) => Response::ListJobs(Job::list(conn, search)?),
        requests::Request::CreateJob(decl) => {
            let handle = Job::create(conn, decl, OffsetDateTime::now_utc())?;
            tracing::info!("recorded job {} ({}, {})", handle, decl.ci_id, decl.ci_dataset);
            Response::JobCreated(handle)
        }
        requests::Request::Job(job_handle, req) => {
            let job = Job::get(conn, job_handle)?;
            match req {
                requests::Job::Info => Response::JobInfo(job.info(conn)?),
            }
        }
        requests::Request::ListMetrics => Response::ListMetrics(Metric::list(conn)?),
        requests::Request::CreateMetrics(decls) => {
            Response::MetricsCreated(Metric::create(conn, decls)?)
        }
        requests::Request::Metric(metric_handle, req) => {
            let metric = Metric::get(conn, metric_handle)?;
            match req {
                requests::MetricRequest::Info => Response::MetricInfo(metric.info()),
            }
        }
        requests::Request::ListDatasets => Response::ListDatasets(Job::datasets(conn)?),
        requests::Request::Defaults => Response::Defaults(defaults::resolve_defaults(conn)?),
        requests::Request::Series(filter) => Response::Series(series::build_series(
            conn,
            filter,
            OffsetDateTime::now_utc(),
        )?),
        requests::Request::CodeChanges { ci_dataset } => Response::CodeChanges(
            code_changes::code_changes(conn, ci_dataset.as_deref())?,
        ),
        requests::Request::Statistics => {
            Response::Statistics(statistics::compute_statistics(conn)?)
        }
        requests::Request::AppData(query) => {
            // missing parameters default to the latest job and the pinned metric
            let needs_defaults = query.ci_id.is_none() || query.ci_dataset.is_none();
            let defaults = if needs_defaults {
                Some(defaults::resolve_defaults(conn)?)
            } else {
                None
            };
            let ci_id = query
                .ci_id
                .clone()
                .or_else(|| defaults.as_ref().and_then(|d| d.ci_id.clone()));
            let ci_dataset = query
                .ci_dataset
                .clone()
                .or_else(|| defaults.as_ref().and_then(|d| d.ci_dataset.clone()));
            let metric = query.metric.as_deref().unwrap_or(DEFAULT_METRIC);
            match (ci_id, ci_dataset) {
                (Some(ci_id), Some(ci_dataset)) => Response::AppData(apps::resolve_app_data(
                    conn,
                    &ci_id,
                    &ci_dataset,
                    metric,
                )?),
                _ => Response::AppData(responses::AppData::default()),
            }
        }
        requests::Request::Login { password } => {
            if verify_password(password.as_bytes()) {
                Response::Ok
            } else {
                Err(Error::LoginError)?
            }
        }
        requests::Request::User => Response::User(match user {
            User::Admin => Some(data::User::Admin),
            User::Anonymous => None,
        }),
    })
}

/// Main entry point for SQuaSH requests
pub async fn handle_request(user: User, req: requests::Request) -> Result<Response, ResponseError> {
    tokio::task::spawn_blocking(move || {
        let mut conn = POOL.get().map_err(|e| {
            tracing::error!("could not get a database connection: {}", e);
            ResponseError::InternalError
        })?;
        tracing::trace!("handling request {} for user {:?}", req, user);
        handle_request_aux(&mut conn, &user, &req).map_err(|e| {
            if e.is_internal() {
                tracing::error!("request {} for user {:?} raised error: {:?}", req, user, e);
            } else {
                tracing::debug!("request {} for user {:?} raised error: {:?}", req, user, e);
            }
            e.into()
        })
    })
    .await
    .map_err(|e| {
        tracing::error!("request handler panicked: {}", e);
        ResponseError::InternalError
    })?
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Builds a connection pool and brings the schema up to date.
pub fn pool(database_url: &str, max_size: Option<u32>) -> DbPool {
    let mut builder = r2d2::Pool::builder().connection_customizer(Box::new(SqlitePragmas));
    if let Some(max_size) = max_size {
        builder = builder.max_size(max_size);
    }
    let pool = builder
        .build(r2d2::ConnectionManager::<SqliteConnection>::new(database_url))
        .expect("could not open the SQLite database");

    let applied = pool
        .get()
        .expect("failed to get a database connection")
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations")
        .len();
    tracing::debug!("applied {} migrations", applied);

    pool
}

/// Sets up SQuaSH's state. `password` is the argon2 PHC hash of the admin
/// password.
pub fn init(password: &str, database_url: &str) {
    let password: &'static str = Box::leak(password.to_owned().into_boxed_str());
    let password = PasswordHash::new(password).expect("could not parse the password hash");
    SETTINGS
        .set(Settings {
            password,
            database_url: database_url.to_owned(),
        })
        .expect("squash_core::init was called twice");
    LazyLock::force(&POOL);
}
