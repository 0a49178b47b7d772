use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use fawtara::PortalError;
use fawtara::types::BillingItem;

use crate::state::AppState;

/// Messages for failures the caller cannot do anything about.
pub const NETWORK_FAILURE_MSG: &str = "عطل في الشبكة، اعد المحاولة لاحقا، وبدون vpn";
pub const SERVER_FAILURE_MSG: &str = "حصل خطأ ما، العطل من السيرفر أعد المحاولة لاحقا";

const USER_ID_HEADER: &str = "userId";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillsRequest {
    pub billing_and_subscription_numbers: Vec<BillingItem>,
    pub city: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(login))
        .route("/bills", post(bills))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.portal.login(&req.username, &req.password).await {
        Ok(session) => {
            let user_id = Uuid::new_v4().to_string();
            state.sessions.put(user_id.clone(), session);
            (StatusCode::OK, Json(json!({ "userId": user_id }))).into_response()
        }
        Err(PortalError::Auth(message)) => message_response(StatusCode::BAD_REQUEST, &message),
        Err(err) => failure_response(err),
    }
}

async fn bills(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BillsRequest>, JsonRejection>,
) -> Response {
    let session = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|id| state.sessions.get(id));

    let Some(session) = session else {
        log::warn!("Rejecting bills request without a known session");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let Ok(Json(req)) = body else {
        return message_response(StatusCode::BAD_REQUEST, "Empty request body");
    };

    log::info!(
        "Fetching {} bills for city {}",
        req.billing_and_subscription_numbers.len(),
        req.city
    );

    match state
        .portal
        .fetch_bills(&session, &req.billing_and_subscription_numbers, &req.city)
        .await
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(PortalError::Unavailable(message)) => {
            message_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
        Err(err) => failure_response(err),
    }
}

fn failure_response(err: PortalError) -> Response {
    log::error!("Portal request failed: {}", err);
    let message = match err {
        PortalError::Timeout(_) => NETWORK_FAILURE_MSG,
        _ => SERVER_FAILURE_MSG,
    };
    message_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}
