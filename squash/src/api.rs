use squash_core::data::{Metric, Period};
use squash_core::handle_request;
use squash_core::handles;
use squash_core::requests::*;
use squash_core::responses::{Response, ResponseError};
use squash_core::User;

use actix_session::Session;
use actix_web::{body::BoxBody, guard, http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use actix_web::{dev::Payload, FromRequest};
use serde::Deserialize;

use std::future::Future;
use std::pin::Pin;

struct ResponseWrapper(Response);
#[derive(Debug)]
struct ResponseErrorWrapper(ResponseError);

impl std::fmt::Display for ResponseErrorWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

fn status_of(rsp: &Response) -> StatusCode {
    match rsp {
        Response::JobCreated(_) | Response::MetricsCreated(_) => StatusCode::CREATED,
        _ => StatusCode::OK,
    }
}

impl Responder for ResponseWrapper {
    type Body = BoxBody;
    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        use Response::*;
        let mut builder = HttpResponse::build(status_of(&self.0));
        match self.0 {
            Ok => builder.json(true),
            ListJobs(payload) => builder.json(payload),
            JobCreated(payload) => builder.json(payload),
            JobInfo(payload) => builder.json(payload),
            ListMetrics(payload) => builder.json(payload),
            MetricsCreated(payload) => builder.json(payload),
            MetricInfo(payload) => builder.json(payload),
            ListDatasets(payload) => builder.json(payload),
            Defaults(payload) => builder.json(payload),
            Series(payload) => builder.json(payload),
            CodeChanges(payload) => builder.json(payload),
            Statistics(payload) => builder.json(payload),
            AppData(payload) => builder.json(payload),
            User(payload) => builder.json(payload),
        }
    }
}

struct UserWrapper(User);

impl FromRequest for UserWrapper {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<UserWrapper, actix_web::Error>>>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let maybe_user = req
            .headers()
            .get("password")
            .map(|value| User::from_password(value.as_bytes()));
        let session = Session::from_request(req, pl);
        Box::pin(async move {
            match maybe_user {
                Some(user) => Ok(UserWrapper(user)),
                None => {
                    let user = session
                        .await?
                        .get::<User>("user")?
                        .unwrap_or(User::Anonymous);
                    Ok(UserWrapper(user))
                }
            }
        })
    }
}

fn status_code(e: &ResponseError) -> StatusCode {
    match e {
        ResponseError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ResponseError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ResponseError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
    }
}

impl actix_web::ResponseError for ResponseErrorWrapper {
    fn status_code(&self) -> StatusCode {
        status_code(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    metric: Option<String>,
    ci_dataset: Option<String>,
    period: Option<String>,
}

impl From<SeriesQuery> for SeriesFilter {
    fn from(query: SeriesQuery) -> Self {
        SeriesFilter {
            metric: query.metric,
            ci_dataset: query.ci_dataset,
            period: Period::parse_lenient(query.period.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodeChangesQuery {
    ci_dataset: Option<String>,
}

/// Metrics may be posted one at a time or in bulk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(body: OneOrMany<T>) -> Vec<T> {
        match body {
            OneOrMany::One(x) => vec![x],
            OneOrMany::Many(xs) => xs,
        }
    }
}

/// A macro to generate api endpoints
macro_rules! r {
    ($name: ident($($i: ident : $t: ty),*) => $e: expr
     ;$($rest: tt)*
    ) => {
    async fn $name (user: UserWrapper, $($i : $t),*) -> Result<ResponseWrapper, ResponseErrorWrapper> {
        handle_request(user.0, $e).await.map(ResponseWrapper).map_err(ResponseErrorWrapper)
    } r!( $($rest)* );
    };
    (  ) => {}
}

r!(
    list_jobs(query: web::Query<JobSearch>) =>
        Request::ListJobs(query.into_inner());

    create_job(body: web::Json<JobDecl>) =>
        Request::CreateJob(body.into_inner());

    job_info(path: web::Path<i32>) =>
        Request::Job(
            handles::job(path.into_inner()),
            Job::Info,
        );

    list_metrics() =>
        Request::ListMetrics;

    create_metrics(body: web::Json<OneOrMany<Metric>>) =>
        Request::CreateMetrics(body.into_inner().into());

    metric_info(path: web::Path<String>) =>
        Request::Metric(
            handles::metric(path.into_inner()),
            MetricRequest::Info,
        );

    list_datasets() =>
        Request::ListDatasets;

    defaults() =>
        Request::Defaults;

    measurements(query: web::Query<SeriesQuery>) =>
        Request::Series(query.into_inner().into());

    code_changes(query: web::Query<CodeChangesQuery>) =>
        Request::CodeChanges { ci_dataset: query.into_inner().ci_dataset };

    stats() =>
        Request::Statistics;

    apps(query: web::Query<AppDataQuery>) =>
        Request::AppData(query.into_inner());

    user_info() =>
        Request::User;
);

async fn login(
    session: Session,
    body: web::Json<String>,
) -> Result<ResponseWrapper, ResponseErrorWrapper> {
    let password = body.into_inner();
    let rsp = handle_request(User::Anonymous, Request::Login { password })
        .await
        .map_err(ResponseErrorWrapper)?;
    session.insert("user", User::Admin).map_err(|e| {
        tracing::error!("could not store session: {}", e);
        ResponseErrorWrapper(ResponseError::InternalError)
    })?;
    Ok(ResponseWrapper(rsp))
}

async fn logout(session: Session) -> ResponseWrapper {
    session.remove("user");
    ResponseWrapper(Response::Ok)
}

async fn raw_request(
    user: UserWrapper,
    body: web::Json<Request>,
) -> web::Json<Result<Response, ResponseError>> {
    web::Json(handle_request(user.0, body.into_inner()).await)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::post().to(raw_request))
            .service(
                web::scope("/jobs")
                    .route("", web::get().to(list_jobs))
                    .route("", web::post().to(create_job))
                    .route("/{id}", web::get().to(job_info)),
            )
            .service(
                web::scope("/metrics")
                    .route("", web::get().to(list_metrics))
                    .route("", web::post().to(create_metrics))
                    .route("/{metric}", web::get().to(metric_info)),
            )
            .route("/datasets", web::get().to(list_datasets))
            .route("/defaults", web::get().to(defaults))
            .route("/measurements", web::get().to(measurements))
            .route("/code_changes", web::get().to(code_changes))
            .route("/stats", web::get().to(stats))
            .route("/apps", web::get().to(apps))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/user", web::get().to(user_info))
            .route(
                "{anything:.*}",
                web::route()
                    .guard(guard::Options())
                    .to(|| HttpResponse::Ok()),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes() {
        assert_eq!(
            status_code(&ResponseError::BadRequest("Access denied".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&ResponseError::ResourceNotFound("Job #3 was not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&ResponseError::InternalError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(&Response::JobCreated(handles::job(1))),
            StatusCode::CREATED
        );
        assert_eq!(status_of(&Response::ListDatasets(vec![])), StatusCode::OK);
    }

    #[test]
    fn series_query() {
        let query: SeriesQuery = serde_json::from_value(json!({
            "metric": "AM1",
            "period": "Last 3 months",
        }))
        .unwrap();
        let filter = SeriesFilter::from(query);
        assert_eq!(filter.metric.as_deref(), Some("AM1"));
        assert_eq!(filter.ci_dataset, None);
        assert_eq!(filter.period, Period::LastThreeMonths);

        let query: SeriesQuery = serde_json::from_value(json!({"period": "Last week"})).unwrap();
        assert_eq!(SeriesFilter::from(query).period, Period::LastMonth);
    }

    #[test]
    fn one_or_many_metrics() {
        let one: OneOrMany<Metric> =
            serde_json::from_value(json!({"metric": "AM1", "description": "repeatability"}))
                .unwrap();
        let one: Vec<Metric> = one.into();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].operator, "<");

        let many: OneOrMany<Metric> = serde_json::from_value(json!([
            {"metric": "AM1", "description": "repeatability", "unit": "marcsec"},
            {"metric": "PA1", "description": "photometric repeatability"},
        ]))
        .unwrap();
        let many: Vec<Metric> = many.into();
        assert_eq!(
            many.iter().map(|m| m.metric.as_str()).collect::<Vec<_>>(),
            ["AM1", "PA1"]
        );
    }
}
