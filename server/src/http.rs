use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Query, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{self, HeaderName, HeaderValue, Method, Uri},
    response::IntoResponse,
    routing::{get, post},
};
use platform_api::{ApiError, ApiResult};
use products_hr::{
    BulkResult, EmployeeInput, EmployeeSummary, OnboardingService, ResetRequest, ResetResult,
    roster,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub onboarding: OnboardingService,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(addr = %config.addr, "onboarding server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    info!("onboarding server stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let layer = CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET]);
    // Credentialed CORS cannot be combined with a wildcard origin.
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_credentials(true)
            .allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/add-employee", post(add_employee_handler))
        .route("/upload-csv", post(upload_csv_handler))
        .route("/forgot-password", post(forgot_password_handler))
        .layer(DefaultBodyLimit::max(state.config.upload_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct AddEmployeeResponse {
    message: &'static str,
    employee_summary: EmployeeSummary,
}

async fn add_employee_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmployeeInput>, JsonRejection>,
) -> ApiResult<Json<AddEmployeeResponse>> {
    let Json(input) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let employee_summary = state.onboarding.create_employee(input).await?;
    Ok(Json(AddEmployeeResponse {
        message: "Employee added successfully",
        employee_summary,
    }))
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    #[serde(flatten)]
    result: BulkResult,
}

async fn upload_csv_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::FileFormat(format!("Invalid multipart request: {}", rejection.body_text()))
    })?;
    let (file_name, contents) = read_upload(&mut multipart).await?;
    roster::ensure_csv_filename(&file_name)?;
    let result = state.onboarding.bulk_create(&contents).await?;
    Ok(Json(UploadResponse {
        message: "CSV processed",
        result,
    }))
}

async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::FileFormat(format!("Invalid multipart request: {err}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::FileFormat("No filename provided in file field".into()))?;
        let contents = field
            .bytes()
            .await
            .map_err(|err| ApiError::FileFormat(format!("Multipart error: {err}")))?;
        return Ok((file_name, contents));
    }
    Err(ApiError::FileFormat(format!(
        "No '{UPLOAD_FIELD}' field found in upload"
    )))
}

#[derive(Serialize)]
struct ForgotPasswordResponse {
    message: &'static str,
    #[serde(flatten)]
    result: ResetResult,
}

/// Accepts the lookup key either as a JSON body or as query parameters.
async fn forgot_password_handler(
    State(state): State<AppState>,
    uri: Uri,
    body: Bytes,
) -> ApiResult<Json<ForgotPasswordResponse>> {
    let request: ResetRequest = if body.iter().all(u8::is_ascii_whitespace) {
        Query::<ResetRequest>::try_from_uri(&uri)
            .map(|Query(request)| request)
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::validation(format!("Invalid request body: {err}")))?
    };
    let result = state.onboarding.reset_password(request).await?;
    Ok(Json(ForgotPasswordResponse {
        message: "Password reset successfully.",
        result,
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(state.onboarding.pool()).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "onboarding-test-boundary";
    const HEADER: &str = "E_ID,E_Name,email,address1,address2,role,mobile,altMobile,latitude,longitude,physicalAddress,userStatus";

    async fn router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        build_router(AppState {
            onboarding: OnboardingService::new(db),
            config: Arc::new(AppConfig::default()),
        })
    }

    fn employee_body() -> Value {
        json!({
            "E_ID": 240705,
            "E_Name": "Jane Doe",
            "email": "jane@example.com",
            "address1": "1 Main St",
            "address2": "",
            "role": "engineer",
            "mobile": "5550100",
            "altMobile": "",
            "latitude": 12.97,
            "longitude": 77.59,
            "physicalAddress": "Block A",
            "userStatus": "active"
        })
    }

    fn json_request(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri("/upload-csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn add_employee_returns_summary_with_one_time_password() {
        let router = router().await;
        let (status, body) = send(&router, json_request("/add-employee", &employee_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Employee added successfully");
        let summary = &body["employee_summary"];
        assert_eq!(summary["E_ID"], 240705);
        assert_eq!(summary["Username"], "jane240705");
        assert_eq!(summary["userStatus"], "active");
        assert!(!summary["Password"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_employee_is_bad_request() {
        let router = router().await;
        send(&router, json_request("/add-employee", &employee_body())).await;
        let (status, body) = send(&router, json_request("/add-employee", &employee_body())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DUPLICATE");
        assert_eq!(body["detail"], "Username jane240705 already exists");
    }

    #[tokio::test]
    async fn malformed_employee_is_unprocessable() {
        let router = router().await;
        let mut missing_email = employee_body();
        missing_email.as_object_mut().unwrap().remove("email");
        let (status, body) = send(&router, json_request("/add-employee", &missing_email)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION");

        let mut bad_email = employee_body();
        bad_email["email"] = json!("not-an-email");
        let (status, body) = send(&router, json_request("/add-employee", &bad_email)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn upload_reports_added_and_failed_rows() {
        let router = router().await;
        let csv = format!(
            "{HEADER}\n\
             1,Ann Lee,ann@example.com,1 Main St,,engineer,5550101,,1.0,2.0,Block A,active\n\
             2,Bob Ray,,2 Main St,,engineer,5550102,,1.0,2.0,Block B,active"
        );
        let (status, body) = send(&router, upload_request("staff.csv", &csv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "CSV processed");
        assert_eq!(body["added"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["employee_summaries"][0]["Username"], "ann1");
        assert_eq!(body["failed_rows"][0]["row"], 2);
    }

    #[tokio::test]
    async fn upload_rejects_wrong_type_and_missing_columns() {
        let router = router().await;
        let (status, body) = send(&router, upload_request("staff.xlsx", HEADER)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Only CSV files are allowed.");

        let (status, body) = send(&router, upload_request("staff.csv", "E_ID,E_Name\n1,Ann")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FILE_FORMAT");
        assert!(body["detail"].as_str().unwrap().starts_with("Missing columns:"));
    }

    #[tokio::test]
    async fn upload_without_multipart_body_is_bad_request() {
        let router = router().await;
        let (status, body) = send(&router, json_request("/upload-csv", &employee_body())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FILE_FORMAT");
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Invalid multipart request:")
        );
    }

    #[tokio::test]
    async fn forgot_password_accepts_body_or_query() {
        let router = router().await;
        let (_, created) = send(&router, json_request("/add-employee", &employee_body())).await;
        let first_password = created["employee_summary"]["Password"].clone();

        let (status, body) = send(
            &router,
            json_request("/forgot-password", &json!({"E_Name": "jane doe", "E_ID": 240705})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Password reset successfully.");
        assert_eq!(body["username"], "jane240705");
        assert_ne!(body["new_plain_password"], first_password);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/forgot-password?E_Name=JANE%20DOE&E_ID=240705")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "jane240705");
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_employee_is_not_found() {
        let router = router().await;
        let (status, body) = send(
            &router,
            json_request("/forgot-password", &json!({"E_Name": "Nobody", "E_ID": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Employee not found");
    }

    #[tokio::test]
    async fn health_reports_database() {
        let router = router().await;
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["db_ok"], true);
    }
}
