use crate::auth as auth_service;
use crate::channels::{ChannelAuthorizer, ChannelSigner, RuleTable};
use crate::config;
use crate::push as push_service;
use crate::state;
use crate::store::MemorySubscriptionStore;
use crate::users::UserDirectory;

use axum::Json;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};

use std::sync::Arc;

mod auth;
mod broadcasting;
mod push;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl ErrorResponse {
    pub(crate) fn json(error: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: error.into(),
        })
    }
}

pub fn app(config: config::AppConfig) -> Router {
    let auth = auth_service::AuthState::from_config(&config)
        .unwrap_or_else(|err| panic!("invalid auth configuration: {err}"));
    let users = match config.users_file.as_deref() {
        Some(path) => UserDirectory::load(path)
            .unwrap_or_else(|err| panic!("failed to load users from {}: {err}", path.display())),
        None => {
            tracing::warn!("no users file configured, sign-in is disabled");
            UserDirectory::default()
        }
    };
    if config.users_file.is_some() && users.is_empty() {
        tracing::warn!("users file has no accounts, sign-in is disabled");
    }
    let signer = config.broadcast.as_ref().and_then(|broadcast| {
        ChannelSigner::new(broadcast.app_key.clone(), broadcast.secret.clone())
            .map_err(|err| tracing::warn!(error = %err, "private channel signing disabled"))
            .ok()
    });
    let rules = RuleTable::default();
    let patterns: Vec<_> = rules.rules().iter().map(|rule| rule.pattern).collect();
    tracing::info!(
        users = users.len(),
        signing = signer.is_some(),
        channel_rules = ?patterns,
        "starting beacon"
    );

    let subscriptions = MemorySubscriptionStore::new();
    let push = push_service::build_dispatcher(&config, subscriptions.clone()).map(Arc::new);
    let state = state::AppState {
        config,
        auth,
        users: Arc::new(users),
        channels: Arc::new(ChannelAuthorizer::new(signer, rules)),
        subscriptions,
        push,
    };

    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/broadcasting/auth",
            get(broadcasting::channel_auth_query).post(broadcasting::channel_auth_post),
        )
        .route("/api/me", get(auth::me))
        .route("/api/push/public-key", get(push::push_public_key))
        .route(
            "/api/push/subscriptions",
            get(push::push_subscriptions).post(push::push_subscribe),
        )
        .route(
            "/api/push/subscriptions/{id}",
            delete(push::push_unsubscribe),
        )
        .route("/api/push/test", post(push::push_test))
        .route("/api/push/send", post(push::push_send))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::users::hash_password_with_salt;
    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
    use axum::response::Response;
    use serde_json::Value as JsonValue;
    use serde_json::from_slice as json_from_slice;
    use tower::ServiceExt;

    use std::path::PathBuf;

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let app = app(config::AppConfig::default());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn auth_middleware__should_return_json_unauthorized_for_api() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/api/push/subscriptions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["error"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_middleware__should_accept_bearer_token() {
        // Given
        let token = token_for(7, false);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["kind"], "user");
        assert_eq!(payload["id"], 7);
        assert_eq!(payload["is_admin"], false);
    }

    #[tokio::test]
    async fn auth_middleware__should_prefer_session_cookie_over_bearer() {
        // Given
        let session = token_for(1, true);
        let bearer = token_for(2, false);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header(COOKIE, format!("beacon_session={session}"))
                    .header(AUTHORIZATION, format!("Bearer {bearer}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        let payload = json_body(response).await;
        assert_eq!(payload["id"], 1);
        assert_eq!(payload["is_admin"], true);
    }

    #[tokio::test]
    async fn login__should_set_cookie_and_return_token() {
        // Given
        let path = write_users_file("login-success");
        let app_config = config::AppConfig {
            users_file: Some(path.clone()),
            ..Default::default()
        };

        // When
        let response = app(app_config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"marten","password":"secret"}"#))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .expect("cookie header")
            .to_string();
        assert!(cookie.starts_with("beacon_session="));
        let payload = json_body(response).await;
        assert_eq!(payload["user"]["id"], 1);
        assert_eq!(payload["user"]["admin"], true);
        let token = payload["token"].as_str().expect("token");
        let auth = auth_service::AuthState::from_config(&config::AppConfig::default())
            .expect("auth state");
        assert!(auth.verify_token(token).expect("verify").is_admin());

        std::fs::remove_file(&path).expect("cleanup");
    }

    #[tokio::test]
    async fn login__should_reject_invalid_credentials() {
        // Given
        let path = write_users_file("login-failure");
        let app_config = config::AppConfig {
            users_file: Some(path.clone()),
            ..Default::default()
        };

        // When
        let response = app(app_config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"marten","password":"nope"}"#))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());

        std::fs::remove_file(&path).expect("cleanup");
    }

    #[tokio::test]
    async fn logout__should_clear_cookie() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers().get(SET_COOKIE).expect("set-cookie header");
        assert!(cookie.to_str().expect("cookie").contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn broadcasting_auth__should_allow_public_channel_for_anonymous() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/broadcasting/auth?channel_name=public-chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, JsonValue::Bool(true));
    }

    #[tokio::test]
    async fn broadcasting_auth__should_reject_anonymous_private_channel() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/broadcasting/auth?channel_name=admin-chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn broadcasting_auth__should_sign_notifications_channel_from_form() {
        // Given
        let app_config = config::AppConfig {
            broadcast: Some(config::BroadcastConfig {
                app_key: "k".to_string(),
                secret: "s".to_string(),
            }),
            ..Default::default()
        };
        let token = token_for(2, false);

        // When
        let response = app(app_config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/broadcasting/auth")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(
                        "socket_id=123.456&channel_name=private-notifications",
                    ))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["auth"],
            "k:cede5a3f915b0105660f20d07d7a9953d35c8b7549ba62a4100feea8f00dc46b"
        );
    }

    #[tokio::test]
    async fn broadcasting_auth__should_return_forbidden_for_unknown_channel() {
        // Given
        let token = token_for(2, true);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/broadcasting/auth?channel_name=presence-lobby")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "Channel not authorized");
    }

    #[tokio::test]
    async fn broadcasting_auth__should_require_channel_name() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/broadcasting/auth")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn broadcasting_auth__should_read_query_on_post_without_body() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/broadcasting/auth?channel_name=public-chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, JsonValue::Bool(true));
    }

    #[tokio::test]
    async fn broadcasting_auth__should_read_json_body_on_post() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/broadcasting/auth")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"channel_name":"public-chat"}"#))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, JsonValue::Bool(true));
    }

    #[tokio::test]
    async fn broadcasting_auth__should_prefer_body_over_query_on_post() {
        // Given
        let app_config = config::AppConfig {
            broadcast: Some(config::BroadcastConfig {
                app_key: "k".to_string(),
                secret: "s".to_string(),
            }),
            ..Default::default()
        };
        let token = token_for(2, false);

        // When
        let response = app(app_config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/broadcasting/auth?channel_name=admin-chat&socket_id=123.456")
                    .header(CONTENT_TYPE, "application/json")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(r#"{"channel_name":"private-notifications"}"#))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["auth"],
            "k:cede5a3f915b0105660f20d07d7a9953d35c8b7549ba62a4100feea8f00dc46b"
        );
    }

    #[tokio::test]
    async fn broadcasting_auth__should_reject_channel_name_with_surrounding_whitespace() {
        // Given
        let app_config = config::AppConfig {
            broadcast: Some(config::BroadcastConfig {
                app_key: "k".to_string(),
                secret: "s".to_string(),
            }),
            ..Default::default()
        };
        let token = token_for(2, false);

        // When
        let response = app(app_config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/broadcasting/auth")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(
                        "socket_id=123.456&channel_name=%20private-notifications",
                    ))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn push_subscriptions__should_register_list_and_delete_own_rows() {
        // Given
        let app = app(config::AppConfig::default());
        let owner = token_for(5, false);
        let stranger = token_for(6, false);
        let subscribe_body =
            r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"p256","auth":"auth"}}"#;

        // When
        let created = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/push/subscriptions")
                    .header(CONTENT_TYPE, "application/json")
                    .header(USER_AGENT, "test-browser")
                    .header(AUTHORIZATION, format!("Bearer {owner}"))
                    .body(Body::from(subscribe_body))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = json_body(created).await;
        assert_eq!(created["user_id"], 5);
        assert_eq!(created["user_agent"], "test-browser");
        let id = created["id"].as_u64().expect("id");

        let listed = app
            .clone()
            .oneshot(authorized_request("GET", "/api/push/subscriptions", &owner))
            .await
            .expect("request failed");
        let listed = json_body(listed).await;
        assert_eq!(listed.as_array().expect("array").len(), 1);

        let path = format!("/api/push/subscriptions/{id}");
        let foreign = app
            .clone()
            .oneshot(authorized_request("DELETE", &path, &stranger))
            .await
            .expect("request failed");
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

        let removed = app
            .clone()
            .oneshot(authorized_request("DELETE", &path, &owner))
            .await
            .expect("request failed");
        assert_eq!(removed.status(), StatusCode::NO_CONTENT);

        let again = app
            .oneshot(authorized_request("DELETE", &path, &owner))
            .await
            .expect("request failed");
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn push_subscribe__should_reject_missing_keys() {
        // Given
        let token = token_for(5, false);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/push/subscriptions")
                    .header(CONTENT_TYPE, "application/json")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(
                        r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"","auth":"a"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn push_public_key__should_be_unavailable_without_vapid() {
        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/api/push/public-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn push_test__should_be_unavailable_without_vapid() {
        // Given
        let token = token_for(5, false);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(authorized_request("POST", "/api/push/test", &token))
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await["error"],
            "Push notifications are not configured."
        );
    }

    #[tokio::test]
    async fn push_send__should_require_admin() {
        // Given
        let token = token_for(5, false);

        // When
        let response = app(config::AppConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/push/send")
                    .header(CONTENT_TYPE, "application/json")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(r#"{"user_id":1,"title":"Hi","body":"There"}"#))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    fn token_for(user_id: u64, admin: bool) -> String {
        auth_service::AuthState::from_config(&config::AppConfig::default())
            .expect("auth state")
            .issue_token(user_id, admin)
            .expect("issue token")
    }

    fn authorized_request(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> JsonValue {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        json_from_slice(&body).expect("parse json")
    }

    fn write_users_file(test_name: &str) -> PathBuf {
        let password_hash = hash_password_with_salt("secret", b"beacon-tests").expect("hash");
        let contents = format!(
            r#"[[users]]
id = 1
name = "marten"
password_hash = "{password_hash}"
admin = true
"#
        );
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        path.push(format!("beacon-{}-{}.toml", test_name, nanos));
        std::fs::write(&path, contents).expect("write users file");
        path
    }
}
