// DMV Ledger - REST API with Axum
//
// Request bodies are parsed here; the ledger work runs on the blocking pool
// because the store holds a SQLite connection behind a mutex.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::entities::{Person, Vehicle, VehicleRegistration};
use crate::error::LedgerResult;
use crate::handlers::{
    add_person, add_secondary_owner, add_vehicle, add_vehicle_registration,
    find_vehicles_by_owner, query_registration_history, verify_registration, HandlerStatus,
    QueryResponse, SecondaryOwnerRequest,
};
use crate::ledger::LedgerDriver;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub driver: LedgerDriver,
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

type ApiResult = Result<Response, Response>;

#[derive(Debug, Deserialize)]
struct GovIdQuery {
    #[serde(rename = "GovId")]
    gov_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VinQuery {
    #[serde(rename = "VIN")]
    vin: Option<String>,
}

// ============================================================================
// Plumbing
// ============================================================================

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

fn conflict_response() -> Response {
    error_response(
        StatusCode::CONFLICT,
        "Transaction aborted after repeated conflicts",
    )
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed request body.");
        error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    })
}

fn required(value: Option<String>, name: &str) -> Result<String, Response> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Missing query parameter {}", name),
        )),
    }
}

/// Run ledger work off the async executor; any error is a 500
async fn run_blocking<T, F>(state: &AppState, work: F) -> Result<T, Response>
where
    F: FnOnce(&LedgerDriver) -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    let driver = state.driver.clone();
    match tokio::task::spawn_blocking(move || work(&driver)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(error = %e, "Request failed.");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Handler task panicked.");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

/// 304 carries no body; 409 reports the aborted transaction
fn write_response(status: HandlerStatus) -> Response {
    match status {
        HandlerStatus::Ok => Json(ApiResponse::ok("OK")).into_response(),
        HandlerStatus::NotModified => StatusCode::NOT_MODIFIED.into_response(),
        HandlerStatus::NotFound => error_response(StatusCode::NOT_FOUND, "Not Found"),
        HandlerStatus::Conflict => conflict_response(),
    }
}

/// Rows with 200, an empty list with 404, or the 409 error body
fn query_response<T: Serialize>(response: QueryResponse<T>) -> Response {
    let status = match response.status {
        HandlerStatus::Conflict => return conflict_response(),
        HandlerStatus::Ok => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    };
    let body = ApiResponse {
        success: status == StatusCode::OK,
        data: response.items,
        error: None,
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /persons
async fn create_person(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let person: Person = parse_body(&body)?;
    let status = run_blocking(&state, move |driver| add_person(driver, &person)).await?;
    Ok(write_response(status))
}

/// POST /vehicles
async fn create_vehicle(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let vehicle: Vehicle = parse_body(&body)?;
    let status = run_blocking(&state, move |driver| add_vehicle(driver, &vehicle)).await?;
    Ok(write_response(status))
}

/// POST /vehicle-registrations
async fn create_registration(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let registration: VehicleRegistration = parse_body(&body)?;
    let status = run_blocking(&state, move |driver| {
        add_vehicle_registration(driver, &registration)
    })
    .await?;
    Ok(write_response(status))
}

/// POST /vehicle-registrations/secondary-owners
async fn create_secondary_owner(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let request: SecondaryOwnerRequest = parse_body(&body)?;
    let status = run_blocking(&state, move |driver| add_secondary_owner(driver, &request)).await?;
    Ok(write_response(status))
}

/// GET /vehicles?GovId=
async fn get_vehicles(State(state): State<AppState>, Query(query): Query<GovIdQuery>) -> ApiResult {
    let gov_id = required(query.gov_id, "GovId")?;
    let response = run_blocking(&state, move |driver| find_vehicles_by_owner(driver, &gov_id)).await?;
    Ok(query_response(response))
}

/// GET /vehicle-registrations/history?VIN=
async fn get_history(State(state): State<AppState>, Query(query): Query<VinQuery>) -> ApiResult {
    let vin = required(query.vin, "VIN")?;
    let response =
        run_blocking(&state, move |driver| query_registration_history(driver, &vin)).await?;
    Ok(query_response(response))
}

/// GET /vehicle-registrations/verify?VIN=
async fn get_verification(State(state): State<AppState>, Query(query): Query<VinQuery>) -> ApiResult {
    let vin = required(query.vin, "VIN")?;
    let lookup_vin = vin.clone();
    let response =
        run_blocking(&state, move |driver| verify_registration(driver, &lookup_vin)).await?;

    match (response.status, response.items.into_iter().next()) {
        (HandlerStatus::Conflict, _) => Err(conflict_response()),
        (_, Some(report)) => Ok(Json(ApiResponse::ok(report)).into_response()),
        (_, None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("No vehicle registration found for VIN {}", vin),
        )),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/persons", post(create_person))
        .route("/vehicles", post(create_vehicle).get(get_vehicles))
        .route("/vehicle-registrations", post(create_registration))
        .route(
            "/vehicle-registrations/secondary-owners",
            post(create_secondary_owner),
        )
        .route("/vehicle-registrations/history", get(get_history))
        .route("/vehicle-registrations/verify", get(get_verification))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{person, registration, test_driver, vehicle};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState {
            driver: test_driver(),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_add_vehicle_twice() {
        let app = app();
        let body = serde_json::to_value(vehicle("KM8SRDHF6EU074761")).unwrap();

        let (first, _) = send(&app, Method::POST, "/vehicles", Some(body.clone())).await;
        let (second, second_body) = send(&app, Method::POST, "/vehicles", Some(body)).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::NOT_MODIFIED);
        assert_eq!(second_body, Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app();
        let (status, body) =
            send(&app, Method::POST, "/persons", Some(json!({"FirstName": "Raul"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_query_parameter() {
        let (status, _) = send(&app(), Method::GET, "/vehicles", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_registration_for_unknown_owner() {
        let app = app();
        let body = serde_json::to_value(registration("KM8SRDHF6EU074761", "NOBODY")).unwrap();

        let (status, _) = send(&app, Method::POST, "/vehicle-registrations", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_owner_flow() {
        let app = app();
        let vin = "KM8SRDHF6EU074761";

        for (gov_id, name) in [("LOGANB486CG", "Brent"), ("LEWISR261LL", "Raul")] {
            let body = serde_json::to_value(person(gov_id, name)).unwrap();
            let (status, _) = send(&app, Method::POST, "/persons", Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }
        let body = serde_json::to_value(vehicle(vin)).unwrap();
        send(&app, Method::POST, "/vehicles", Some(body)).await;
        let body = serde_json::to_value(registration(vin, "LOGANB486CG")).unwrap();
        let (status, _) = send(&app, Method::POST, "/vehicle-registrations", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let secondary = json!({
            "VIN": vin,
            "Owners": {"SecondaryOwners": [{"PersonId": "LEWISR261LL"}]}
        });
        let uri = "/vehicle-registrations/secondary-owners";
        let (first, _) = send(&app, Method::POST, uri, Some(secondary.clone())).await;
        let (second, _) = send(&app, Method::POST, uri, Some(secondary)).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::NOT_MODIFIED);

        let (status, body) = send(&app, Method::GET, "/vehicles?GovId=LOGANB486CG", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["VIN"], vin);

        let uri = format!("/vehicle-registrations/history?VIN={}", vin);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let versions: Vec<u64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["Version"].as_u64().unwrap())
            .collect();
        assert_eq!(versions, vec![0, 1]);

        let uri = format!("/vehicle-registrations/verify?VIN={}", vin);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["Verified"], true);
    }

    #[tokio::test]
    async fn test_locked_store_answers_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::LedgerConfig {
            database: dir.path().join("dmv.db"),
            max_retries: 1,
            ..Default::default()
        };
        let store = config.open_store().unwrap();
        let driver = crate::setup::run_setup(&store, &config, true).unwrap();
        let app = router(AppState { driver });

        let other = rusqlite::Connection::open(&config.database).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();

        let body = serde_json::to_value(vehicle("5YJ3E1EA7KF317000")).unwrap();
        let (write, _) = send(&app, Method::POST, "/vehicles", Some(body)).await;
        assert_eq!(write, StatusCode::CONFLICT);

        for uri in [
            "/vehicles?GovId=LEWISR261LL",
            "/vehicle-registrations/history?VIN=1N4AL11D75C109151",
            "/vehicle-registrations/verify?VIN=1N4AL11D75C109151",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::CONFLICT, "{}", uri);
            assert_eq!(body["success"], false);
        }

        other.execute_batch("ROLLBACK").unwrap();
        let (status, _) = send(&app, Method::GET, "/vehicles?GovId=LEWISR261LL", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_owner_has_no_vehicles() {
        let (status, body) = send(&app(), Method::GET, "/vehicles?GovId=NOBODY", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["data"], json!([]));
    }
}
