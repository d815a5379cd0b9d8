use crate::channels::token_preview;
use crate::state;
use crate::types::channels::Principal;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::Serialize;

use super::ErrorResponse;

/// Who is calling, and which credentials came with the request.
#[derive(Debug, Clone)]
pub(crate) struct RequestIdentity {
    pub(crate) principal: Principal,
    pub(crate) session_present: bool,
    pub(crate) bearer_present: bool,
    pub(crate) token_preview: Option<String>,
}

impl RequestIdentity {
    pub(crate) fn user_id(&self) -> Result<u64, (StatusCode, Json<ErrorResponse>)> {
        self.principal.user_id().ok_or_else(unauthorized)
    }
}

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = resolve_identity(&state, req.headers());
    let path = req.uri().path();
    if identity.principal.is_anonymous() && requires_user(path) {
        return unauthorized().into_response();
    }

    req.extensions_mut().insert(identity);
    next.run(req).await
}

fn requires_user(path: &str) -> bool {
    path.starts_with("/api/") && path != "/api/push/public-key"
}

/// Session cookie first, then bearer token. A credential that fails
/// verification leaves the caller anonymous.
pub(crate) fn resolve_identity(state: &state::AppState, headers: &HeaderMap) -> RequestIdentity {
    let session = auth_cookie(headers, state.auth.cookie_name());
    let bearer = bearer_token(headers);
    let mut identity = RequestIdentity {
        principal: Principal::Anonymous,
        session_present: session.is_some(),
        bearer_present: bearer.is_some(),
        token_preview: None,
    };

    for token in [session, bearer].into_iter().flatten() {
        identity.token_preview = Some(token_preview(token));
        match state.auth.verify_token(token) {
            Ok(principal) => {
                identity.principal = principal;
                break;
            }
            Err(err) => {
                tracing::debug!(
                    error = %err,
                    token_preview = identity.token_preview.as_deref(),
                    "rejected credential"
                );
            }
        }
    }
    identity
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
            && !cookie_value.is_empty()
        {
            return Some(cookie_value);
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::UNAUTHORIZED, ErrorResponse::json("unauthorized"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    name: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoginResponse {
    pub(crate) token: String,
    pub(crate) user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct UserSummary {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) admin: bool,
}

pub(crate) async fn login(
    State(state): State<state::AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let name = request.name.trim();
    if name.is_empty() || request.password.trim().is_empty() {
        return Err(invalid_credentials());
    }

    let Some(user) = state.users.authenticate(name, &request.password) else {
        tracing::info!(user_name = name, "failed sign-in attempt");
        return Err(invalid_credentials());
    };

    let token = state.auth.issue_token(user.id, user.admin).map_err(|err| {
        tracing::error!(error = %err, "failed to issue auth token");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::json("Failed to sign in."),
        )
    })?;

    let cookie = HeaderValue::from_str(&state.auth.auth_cookie(&token)).map_err(|err| {
        tracing::error!(error = %err, "auth cookie is not a valid header value");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::json("Failed to sign in."),
        )
    })?;

    tracing::info!(user_id = user.id, "user signed in");
    let body = LoginResponse {
        token,
        user: UserSummary {
            id: user.id,
            name: user.name.clone(),
            admin: user.admin,
        },
    };
    let mut response = Json(body).into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(cookie) = HeaderValue::from_str(&state.auth.clear_cookie()) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

pub(crate) async fn me(
    axum::Extension(identity): axum::Extension<RequestIdentity>,
) -> Json<Principal> {
    Json(identity.principal)
}

fn invalid_credentials() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        ErrorResponse::json("Invalid username or password."),
    )
}
