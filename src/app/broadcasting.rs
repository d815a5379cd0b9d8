use crate::channels::ChannelRequest;
use crate::state;
use crate::types::channels::Decision;

use axum::Extension;
use axum::Json;
use axum::extract::{Form, FromRequest, Query, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::Serialize;

use super::ErrorResponse;
use super::auth::RequestIdentity;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChannelAuthParams {
    channel_name: Option<String>,
    socket_id: Option<String>,
}

impl ChannelAuthParams {
    /// Fields set here win; missing ones are taken from `fallback`.
    fn or(self, fallback: Self) -> Self {
        Self {
            channel_name: self.channel_name.or(fallback.channel_name),
            socket_id: self.socket_id.or(fallback.socket_id),
        }
    }
}

#[derive(Serialize)]
struct SignedResponse {
    auth: String,
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        match self {
            Decision::Allow => (StatusCode::OK, Json(true)).into_response(),
            Decision::AllowSigned { auth } => {
                (StatusCode::OK, Json(SignedResponse { auth })).into_response()
            }
            Decision::Deny(err) => {
                (StatusCode::FORBIDDEN, ErrorResponse::json(err.to_string())).into_response()
            }
        }
    }
}

pub(crate) async fn channel_auth_query(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Query(params): Query<ChannelAuthParams>,
) -> Response {
    authorize_channel(&state, &identity, params)
}

/// POST accepts the parameters in the query string, a form body or a JSON
/// body. Body fields take precedence over query fields.
pub(crate) async fn channel_auth_post(
    State(state): State<state::AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Query(query): Query<ChannelAuthParams>,
    request: Request,
) -> Response {
    let body = match body_params(request, &state).await {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    authorize_channel(&state, &identity, body.or(query))
}

async fn body_params(
    request: Request,
    state: &state::AppState,
) -> Result<ChannelAuthParams, Response> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        Json::<ChannelAuthParams>::from_request(request, state)
            .await
            .map(|Json(params)| params)
            .map_err(IntoResponse::into_response)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<ChannelAuthParams>::from_request(request, state)
            .await
            .map(|Form(params)| params)
            .map_err(IntoResponse::into_response)
    } else {
        Ok(ChannelAuthParams::default())
    }
}

fn authorize_channel(
    state: &state::AppState,
    identity: &RequestIdentity,
    params: ChannelAuthParams,
) -> Response {
    let Some(channel) = params
        .channel_name
        .as_deref()
        .filter(|channel| !channel.trim().is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            ErrorResponse::json("channel_name is required."),
        )
            .into_response();
    };
    // The signature covers the exact name the client subscribes with.
    if channel.trim() != channel {
        return (
            StatusCode::BAD_REQUEST,
            ErrorResponse::json("channel_name must not have surrounding whitespace."),
        )
            .into_response();
    }

    let decision = state.channels.authorize(ChannelRequest {
        channel,
        socket_id: params.socket_id.as_deref(),
        principal: identity.principal,
    });

    tracing::info!(
        channel,
        session_present = identity.session_present,
        bearer_present = identity.bearer_present,
        token_preview = identity.token_preview.as_deref(),
        user_id = identity.principal.user_id(),
        outcome = decision.outcome(),
        "channel authorization"
    );

    decision.into_response()
}
