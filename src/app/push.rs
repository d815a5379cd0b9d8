use crate::ports::SubscriptionStore;
use crate::push as push_service;
use crate::state;
use crate::types::push::{DispatchResult, NewSubscription, PushSubscription};

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::USER_AGENT;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use std::sync::Arc;

use super::ErrorResponse;
use super::auth::RequestIdentity;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => Ok(Json(PublicKeyResponse {
            public_key: vapid.public_key,
        })),
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            Err(not_configured())
        }
    }
}

/// Browser `PushSubscription.toJSON()` shape.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) endpoint: String,
    pub(crate) keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionKeys {
    pub(crate) p256dh: String,
    pub(crate) auth: String,
}

pub(crate) async fn push_subscriptions(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<Vec<PushSubscription>>, ApiError> {
    let user_id = identity.user_id()?;
    Ok(Json(state.subscriptions.list_for_user(user_id)))
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
    headers: HeaderMap,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<PushSubscription>), ApiError> {
    let user_id = identity.user_id()?;
    let endpoint = request.endpoint.trim();
    let p256dh = request.keys.p256dh.trim();
    let auth = request.keys.auth.trim();
    if endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::json("endpoint, keys.p256dh, and keys.auth are required."),
        ));
    }
    if !endpoint.starts_with("https://") {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::json("endpoint must be an https URL."),
        ));
    }

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let subscription = state.subscriptions.upsert(NewSubscription {
        user_id,
        endpoint: endpoint.to_string(),
        p256dh: p256dh.to_string(),
        auth: auth.to_string(),
        user_agent,
    });
    tracing::info!(
        user_id,
        subscription_id = subscription.id,
        "registered push subscription"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let user_id = identity.user_id()?;
    let owned = state
        .subscriptions
        .get(id)
        .is_some_and(|subscription| subscription.user_id == user_id);
    if !owned || !state.subscriptions.delete(id) {
        return Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::json("subscription not found"),
        ));
    }
    tracing::info!(user_id, subscription_id = id, "removed push subscription");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DispatchResponse {
    pub(crate) results: Vec<DispatchResult>,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let user_id = identity.user_id()?;
    let dispatcher = dispatcher(&state)?;
    let results = dispatcher.send_test_notification(user_id).await;
    Ok(Json(DispatchResponse { results }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    pub(crate) user_id: u64,
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) data: JsonValue,
}

pub(crate) async fn push_send(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Json(request): Json<SendRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    if !identity.principal.is_admin() {
        return Err((StatusCode::FORBIDDEN, ErrorResponse::json("forbidden")));
    }
    if request.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::json("title must not be empty."),
        ));
    }
    let dispatcher = dispatcher(&state)?;
    let results = dispatcher
        .send_to_user(request.user_id, &request.title, &request.body, request.data)
        .await;
    Ok(Json(DispatchResponse { results }))
}

fn dispatcher(state: &state::AppState) -> Result<Arc<push_service::WebPushDispatcher>, ApiError> {
    state.push.as_ref().map(Arc::clone).ok_or_else(not_configured)
}

fn not_configured() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        ErrorResponse::json("Push notifications are not configured."),
    )
}
