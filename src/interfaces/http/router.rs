//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{NoteService, UserService};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse};
use crate::interfaces::http::middleware::{
    admin_middleware, auth_middleware, AuthState, SessionCookie,
};
use crate::interfaces::http::modules::{auth, health, metrics, notes, request_id, users};

/// Shared state for every route. Each handler extracts its own slice via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub notes: Arc<NoteService>,
    pub cookie: SessionCookie,
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(
        users: Arc<UserService>,
        notes: Arc<NoteService>,
        cookie: SessionCookie,
        db: Option<DatabaseConnection>,
    ) -> Self {
        Self {
            users,
            notes,
            cookie,
            db,
            started_at: Arc::new(Instant::now()),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        AuthState {
            users: Arc::clone(&s.users),
            cookie: s.cookie.clone(),
        }
    }
}

impl FromRef<AppState> for auth::AuthHandlerState {
    fn from_ref(s: &AppState) -> Self {
        auth::AuthHandlerState {
            users: Arc::clone(&s.users),
            cookie: s.cookie.clone(),
        }
    }
}

impl FromRef<AppState> for users::UserHandlerState {
    fn from_ref(s: &AppState) -> Self {
        users::UserHandlerState {
            users: Arc::clone(&s.users),
        }
    }
}

impl FromRef<AppState> for notes::NoteHandlerState {
    fn from_ref(s: &AppState) -> Self {
        notes::NoteHandlerState {
            notes: Arc::clone(&s.notes),
        }
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        health::HealthState {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT from /auth/login; the session cookie is accepted too",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::logout,
        auth::get_current_user,
        auth::update_profile,
        auth::delete_profile,
        // Notes
        notes::list_notes,
        notes::create_note,
        notes::search_notes,
        notes::count_notes,
        notes::get_note,
        notes::update_note,
        notes::delete_note,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            ApiResponse<String>,
            PaginatedResponse<users::UserDto>,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::UpdateProfileRequest,
            notes::NoteDto,
            notes::NoteCountDto,
            notes::CreateNoteRequest,
            notes::UpdateNoteRequest,
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Registration, login/logout and own profile"),
        (name = "Notes", description = "The caller's personal notes"),
        (name = "Users", description = "User management (administrators only)"),
    ),
    info(
        title = "Notes Service API",
        version = "1.0.0",
        description = "User accounts, personal notes and admin user management",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Credentials cannot be combined with a wildcard origin
    if allowed_origins.iter().any(|o| o == "*") {
        warn!("CORS allows any origin; cookie authentication will not work cross-site");
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(origins).allow_credentials(true)
}

/// Create the API router with all routes
pub fn create_api_router(
    state: AppState,
    allowed_origins: &[String],
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let auth_state = AuthState::from_ref(&state);

    let auth_public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));

    let auth_protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::get_current_user))
        .route("/user", get(auth::get_current_user))
        .route(
            "/profile",
            axum::routing::put(auth::update_profile).delete(auth::delete_profile),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    let note_routes = Router::new()
        .route("/", get(notes::list_notes).post(notes::create_note))
        .route("/search", get(notes::search_notes))
        .route("/count", get(notes::count_notes))
        // paths used by the earlier REST frontend
        .route("/my-notes", get(notes::list_notes))
        .route("/create/", post(notes::create_note))
        .route("/note/{id}", get(notes::get_note))
        .route("/update/{id}", axum::routing::put(notes::update_note))
        .route("/delete/{id}", axum::routing::delete(notes::delete_note))
        .route(
            "/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    // admin check runs after authentication
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_public_routes.merge(auth_protected_routes))
        .nest("/api/notes", note_routes)
        .nest("/api/users", user_routes)
        .with_state(state)
        .merge(swagger_routes);

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::NewAccount;
    use crate::domain::{RepositoryProvider, UserRole};
    use crate::infrastructure::crypto::JwtConfig;
    use crate::infrastructure::InMemoryRepositoryProvider;

    struct TestApp {
        router: Router,
        users: Arc<UserService>,
    }

    fn test_app() -> TestApp {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let users = Arc::new(UserService::new(repos.clone(), JwtConfig::default()).with_hash_cost(4));
        let notes = Arc::new(NoteService::new(repos));
        let state = AppState::new(users.clone(), notes, SessionCookie::default(), None);
        TestApp {
            router: create_api_router(state, &["http://localhost:5173".to_string()], None),
            users,
        }
    }

    impl TestApp {
        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let resp = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = resp.status();
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        async fn register(&self, username: &str) -> String {
            let (status, body) = self
                .send(
                    "POST",
                    "/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{}@example.com", username),
                        "password": "secret1"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["data"]["token"].as_str().unwrap().to_string()
        }

        /// Creates the admin on first use; later calls just log in again.
        async fn admin_token(&self) -> String {
            let _ = self
                .users
                .create_user(NewAccount {
                    username: "admin".into(),
                    email: "admin@example.com".into(),
                    password: "admin123".into(),
                    role: UserRole::Admin,
                })
                .await;
            self.users.login("admin", "admin123").await.unwrap().token
        }
    }

    #[tokio::test]
    async fn register_then_me_never_exposes_password() {
        let app = test_app();
        let token = app.register("alice").await;

        let (status, body) = app.send("GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["role"], "USER");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn duplicate_email_is_409() {
        let app = test_app();
        app.register("alice").await;

        let (status, body) = app
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({"username": "alice2", "email": "ALICE@example.com", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Email already exists");
    }

    #[tokio::test]
    async fn padded_email_registers_normalized() {
        let app = test_app();
        let (status, body) = app
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({"username": "alice", "email": " Alice@Example.com ", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn invalid_registration_is_422() {
        let app = test_app();
        let (status, _) = app
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({"username": "al", "email": "bad", "password": "1"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let app = test_app();
        app.register("alice").await;
        let (status, body) = app
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": "alice", "password": "nope-nope"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = test_app();
        let (status, _) = app.send("GET", "/api/notes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.send("GET", "/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_cookie_authenticates_and_logout_revokes() {
        let app = test_app();
        app.register("alice").await;

        let resp = app
            .router
            .clone()
            .oneshot(
                Request::post("/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"username": "alice@example.com", "password": "secret1"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("notes_session="));
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let token = cookie.trim_start_matches("notes_session=").to_string();

        let me = app
            .router
            .clone()
            .oneshot(
                Request::get("/auth/me")
                    .header("cookie", cookie.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);

        let (status, _) = app.send("POST", "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send("GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn notes_crud_flow() {
        let app = test_app();
        let token = app.register("alice").await;

        let (status, body) = app
            .send(
                "POST",
                "/api/notes",
                Some(&token),
                Some(json!({"title": "", "content": "remember the milk"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["title"], "Untitled");
        let id = body["data"]["id"].as_i64().unwrap();

        app.send(
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "Second"})),
        )
        .await;

        let (_, body) = app.send("GET", "/api/notes", Some(&token), None).await;
        let titles: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Second", "Untitled"]);

        let (status, body) = app
            .send(
                "PUT",
                &format!("/api/notes/{}", id),
                Some(&token),
                Some(json!({"title": "Groceries"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Groceries");
        assert_eq!(body["data"]["content"], "remember the milk");

        let (_, body) = app
            .send("GET", "/api/notes/search?query=MILK", Some(&token), None)
            .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = app.send("GET", "/api/notes/count", Some(&token), None).await;
        assert_eq!(body["data"]["count"], 2);

        let (status, _) = app
            .send("DELETE", &format!("/api/notes/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .send("GET", &format!("/api/notes/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_another_users_note_is_403() {
        let app = test_app();
        let alice = app.register("alice").await;
        let bob = app.register("bob").await;

        let (_, body) = app
            .send(
                "POST",
                "/api/notes",
                Some(&alice),
                Some(json!({"title": "Private"})),
            )
            .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = app
            .send("DELETE", &format!("/api/notes/{}", id), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = app.send("GET", "/api/notes/count", Some(&alice), None).await;
        assert_eq!(body["data"]["count"], 1);
    }

    #[tokio::test]
    async fn legacy_note_paths_reach_the_same_handlers() {
        let app = test_app();
        let token = app.register("alice").await;

        let (status, body) = app
            .send(
                "POST",
                "/api/notes/create/",
                Some(&token),
                Some(json!({"title": "", "content": "from the old client"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["title"], "Untitled");
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = app.send("GET", "/api/notes/my-notes", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = app
            .send(
                "PUT",
                &format!("/api/notes/update/{}", id),
                Some(&token),
                Some(json!({"title": "Renamed"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Renamed");

        let (status, body) = app
            .send("GET", &format!("/api/notes/note/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "from the old client");

        let (status, body) = app.send("GET", "/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");

        let (status, _) = app
            .send("DELETE", &format!("/api/notes/delete/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.send("GET", "/api/notes/count", Some(&token), None).await;
        assert_eq!(body["data"]["count"], 0);
    }

    #[tokio::test]
    async fn user_admin_is_restricted_to_admins() {
        let app = test_app();
        let user = app.register("alice").await;

        let (status, body) = app.send("GET", "/api/users", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let admin = app.admin_token().await;
        let (status, body) = app.send("GET", "/api/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 2);
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn admin_cannot_delete_self_from_list() {
        let app = test_app();
        let admin = app.admin_token().await;

        let (_, me) = app.send("GET", "/auth/me", Some(&admin), None).await;
        let admin_id = me["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send("DELETE", &format!("/api/users/{}", admin_id), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "You cannot delete your own account");
    }

    #[tokio::test]
    async fn admin_edit_without_password_keeps_login_working() {
        let app = test_app();
        let admin = app.admin_token().await;

        let (status, body) = app
            .send(
                "POST",
                "/api/users",
                Some(&admin),
                Some(json!({
                    "username": "bob",
                    "email": "bob@example.com",
                    "password": "bobpass1",
                    "role": "user"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let bob_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                "PUT",
                &format!("/api/users/{}", bob_id),
                Some(&admin),
                Some(json!({"username": "robert", "password": "", "role": "ADMIN"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "ADMIN");

        let (status, _) = app
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": "robert", "password": "bobpass1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_own_account_removes_notes_and_session() {
        let app = test_app();
        let token = app.register("alice").await;
        app.send(
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "bye"})),
        )
        .await;

        let (status, _) = app.send("DELETE", "/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send("GET", "/api/notes", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let admin = app.admin_token().await;
        let (_, body) = app
            .send("GET", "/api/users?search=alice", Some(&admin), None)
            .await;
        assert_eq!(body["data"]["total"], 0);
    }

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let app = test_app();
        let (status, body) = app.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"]["backend"], "memory");
    }
}
