use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::Role,
        dto::{ClaimsResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest},
        extractors::AuthUser,
        middleware::{authenticate, authorize, RoleGate},
        services::Registration,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes behind a bearer token; `/admin` additionally requires the admin role.
pub fn protected_routes(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/admin", get(admin))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new([Role::Admin]),
            authorize,
        ));

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/protected", get(protected))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(body) = payload?;
    let input = Registration::parse(body.name, body.email, body.password, body.role)?;
    state.auth.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = payload?;
    let token = state
        .auth
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
    }))
}

pub async fn dashboard(AuthUser(claims): AuthUser) -> Json<ClaimsResponse> {
    Json(ClaimsResponse {
        message: "Welcome to the dashboard!",
        user: claims,
    })
}

pub async fn protected(AuthUser(claims): AuthUser) -> Json<ClaimsResponse> {
    Json(ClaimsResponse {
        message: "This is a protected route",
        user: claims,
    })
}

pub async fn admin(AuthUser(claims): AuthUser) -> Json<ClaimsResponse> {
    Json(ClaimsResponse {
        message: "Welcome to the Admin Dashboard!",
        user: claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::app::build_app;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn token_for(app: &Router, role: Option<&str>) -> String {
        let email = format!("{}@x.com", Uuid::new_v4());
        let mut body = json!({"name": "A", "email": email, "password": "secret1"});
        if let Some(r) = role {
            body["role"] = json!(r);
        }
        let (status, _) = send(app, post_json("/register", body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(
            app,
            post_json("/login", json!({"email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_reports_missing_fields() {
        let app = build_app(AppState::fake());
        let (status, body) =
            send(&app, post_json("/register", json!({"email": "a@x.com", "password": "p"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "All fields are required");
    }

    #[tokio::test]
    async fn register_rejects_malformed_json() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn register_does_not_echo_credentials() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            post_json("/register", json!({"name": "A", "email": "a@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"message": "User registered successfully"}));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = build_app(AppState::fake());
        let first = json!({"name": "A", "email": "a@x.com", "password": "secret1"});
        let second = json!({"name": "B", "email": "a@x.com", "password": "other", "role": "admin"});
        assert_eq!(send(&app, post_json("/register", first)).await.0, StatusCode::CREATED);
        let (status, body) = send(&app, post_json("/register", second)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn user_token_is_forbidden_from_admin() {
        let app = build_app(AppState::fake());
        let token = token_for(&app, None).await;

        let (status, body) = send(&app, get_with_token("/dashboard", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "user");

        let (status, body) = send(&app, get_with_token("/admin", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Forbidden: Insufficient role");
    }

    #[tokio::test]
    async fn admin_token_reaches_admin() {
        let app = build_app(AppState::fake());
        let token = token_for(&app, Some("admin")).await;
        let (status, body) = send(&app, get_with_token("/admin", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to the Admin Dashboard!");
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn gated_routes_reject_bad_tokens() {
        let state = AppState::fake();
        let expired = state
            .auth
            .keys()
            .sign_at(
                Uuid::new_v4(),
                Role::Admin,
                OffsetDateTime::now_utc() - Duration::hours(2),
            )
            .unwrap();
        let app = build_app(state);

        for uri in ["/dashboard", "/protected", "/admin"] {
            let (status, body) = send(&app, get_with_token(uri, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} without token");
            assert_eq!(body["message"], "Access denied. No token provided.");

            let (status, body) = send(&app, get_with_token(uri, Some("garbage"))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with garbage");
            assert_eq!(body["message"], "Invalid token. Access denied.");

            let (status, _) = send(&app, get_with_token(uri, Some(&expired))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with expired token");
        }
    }

    #[tokio::test]
    async fn token_expired_seconds_ago_is_rejected() {
        let state = AppState::fake();
        let just_expired = state
            .auth
            .keys()
            .sign_at(
                Uuid::new_v4(),
                Role::Admin,
                OffsetDateTime::now_utc() - Duration::seconds(3600 + 30),
            )
            .unwrap();
        let app = build_app(state);

        for uri in ["/dashboard", "/protected", "/admin"] {
            let (status, body) = send(&app, get_with_token(uri, Some(&just_expired))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} with token expired 30s ago");
            assert_eq!(body["message"], "Invalid token. Access denied.");
        }
    }

    #[tokio::test]
    async fn root_greets() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Welcome to the server!");
    }
}
