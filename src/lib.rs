pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod telemetry;

use chrono::Duration;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{catch, catchers, get, routes, Build, Responder, Rocket};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Config, StorageBackend};
use crate::models::User;
use crate::notify::{EmailLogNotifier, Notifier};
use crate::services::auth::{self, AuthFailure};
use crate::services::bookings::{BookingManager, TransitionPolicy};
use crate::services::error::ServiceError;
use crate::store::{MemoryStore, PgStore, Store};

/// Shared state handed to every request through Rocket's managed state.
#[derive(Clone)]
pub struct RentalApp {
    pub store: Arc<dyn Store>,
    pub bookings: Arc<BookingManager>,
    pub session_ttl: Duration,
}

impl RentalApp {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        let policy = if config.strict_status_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Unconstrained
        };
        RentalApp {
            bookings: Arc::new(BookingManager::new(store.clone(), notifier, policy)),
            store,
            session_ttl: Duration::minutes(config.session_ttl_minutes),
        }
    }

    /// Empty in-memory marketplace with default settings.
    pub fn in_memory() -> Self {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        RentalApp::new(Arc::new(MemoryStore::new()), Arc::new(EmailLogNotifier), &config)
    }

    /// Runs store-bound work on Tokio's blocking pool, off the async workers.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&RentalApp) -> Result<T, ServiceError> + Send + 'static,
        T: Send + 'static,
    {
        let app = self.clone();
        rocket::tokio::task::spawn_blocking(move || work(&app))
            .await
            .map_err(|e| ServiceError::InternalError(format!("Blocking task failed: {}", e)))?
    }
}

// Request guard resolving the bearer token to an active user
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingOrMalformedHeader,
    InvalidToken,
    InactiveUser,
    NoAppState,
    StoreUnavailable,
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = (); // Specific error goes to local_cache for the catchers

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let app = match req.rocket().state::<RentalApp>() {
            Some(app) => app,
            None => {
                req.local_cache(|| Some(AuthError::NoAppState));
                return Outcome::Forward(Status::InternalServerError);
            }
        };

        let token = match bearer_token(req) {
            Some(token) => token,
            None => {
                req.local_cache(|| Some(AuthError::MissingOrMalformedHeader));
                return Outcome::Forward(Status::Unauthorized);
            }
        };

        let token = token.to_string();
        match app.blocking(move |app| auth::authenticate(app.store.as_ref(), &token)).await {
            Ok(Ok(user)) => Outcome::Success(AuthenticatedUser(user)),
            Ok(Err(AuthFailure::InvalidToken)) => {
                req.local_cache(|| Some(AuthError::InvalidToken));
                Outcome::Forward(Status::Unauthorized)
            }
            Ok(Err(AuthFailure::InactiveUser)) => {
                req.local_cache(|| Some(AuthError::InactiveUser));
                Outcome::Forward(Status::Forbidden)
            }
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                req.local_cache(|| Some(AuthError::StoreUnavailable));
                Outcome::Forward(Status::InternalServerError)
            }
        }
    }
}

// Guard to extract the raw Bearer token string
pub struct BearerToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match bearer_token(req) {
            Some(token) => Outcome::Success(BearerToken(token.to_string())),
            None => {
                req.local_cache(|| Some(AuthError::MissingOrMalformedHeader));
                Outcome::Forward(Status::Unauthorized)
            }
        }
    }
}

// Serializable error response struct
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Responder, Debug)]
pub enum ApiError {
    #[response(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[response(status = 401)]
    Unauthorized(Json<ErrorResponse>),
    #[response(status = 403)]
    Forbidden(Json<ErrorResponse>),
    #[response(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[response(status = 409)]
    Conflict(Json<ErrorResponse>),
    #[response(status = 500)]
    InternalError(Json<ErrorResponse>),
}

fn error_body(error: &str, message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
    })
}

#[catch(401)]
fn unauthorized_catcher(req: &Request<'_>) -> Json<ErrorResponse> {
    match req.local_cache(|| None as Option<AuthError>) {
        Some(AuthError::MissingOrMalformedHeader) => {
            error_body("missing_or_malformed_header", "Authorization header is missing or malformed.")
        }
        Some(AuthError::InvalidToken) => error_body("invalid_token", "Session token is invalid or expired."),
        _ => error_body("unauthorized", "Access denied. Valid authentication token required."),
    }
}

#[catch(403)]
fn forbidden_catcher(req: &Request<'_>) -> Json<ErrorResponse> {
    match req.local_cache(|| None as Option<AuthError>) {
        Some(AuthError::InactiveUser) => error_body("inactive_user", "Inactive user"),
        _ => error_body("forbidden", "You are not allowed to do that."),
    }
}

#[catch(500)]
fn internal_server_error_catcher(req: &Request<'_>) -> Json<ErrorResponse> {
    match req.local_cache(|| None as Option<AuthError>) {
        Some(AuthError::NoAppState) => {
            error_body("no_app_state", "Critical application state (RentalApp) not found.")
        }
        Some(AuthError::StoreUnavailable) => error_body("store_unavailable", "Could not verify the session."),
        _ => error_body("internal_server_error", "An unexpected error occurred on the server."),
    }
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> Json<ErrorResponse> {
    let code = match status.code {
        400 => "bad_request",
        404 => "not_found",
        422 => "unprocessable_entity",
        _ => "error",
    };
    error_body(code, status.reason().unwrap_or("Request failed"))
}

#[get("/")]
fn index() -> Json<rocket::serde::json::Value> {
    Json(rocket::serde::json::json!({ "message": "Welcome to the Rental Marketplace API" }))
}

/// Rocket instance serving `app`. Used by `main` and by the tests.
pub fn rocket_with(app: RentalApp) -> Rocket<Build> {
    rocket::build()
        .manage(app)
        .mount("/", routes![index])
        .mount("/api", routes::all())
        .register(
            "/",
            catchers![
                unauthorized_catcher,
                forbidden_catcher,
                internal_server_error_catcher,
                default_catcher
            ],
        )
}

// In-memory instance with default settings
pub fn rocket_instance() -> Rocket<Build> {
    rocket_with(RentalApp::in_memory())
}

/// Builds the store selected by `config` and the Rocket instance around it.
pub fn build(config: &Config) -> anyhow::Result<Rocket<Build>> {
    let notifier: Arc<dyn Notifier> = Arc::new(EmailLogNotifier);
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data will not survive a restart");
            Ok(rocket_with(RentalApp::new(Arc::new(MemoryStore::new()), notifier, config)))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let pool = db::init_pool(url, config.db_pool_size)?;
            let app = RentalApp::new(Arc::new(PgStore::new(pool.clone())), notifier, config);
            Ok(rocket_with(app).attach(db::stage(pool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_config_selects_strict_transitions() {
        let config = Config {
            storage: StorageBackend::Memory,
            strict_status_transitions: true,
            ..Config::default()
        };
        let app = RentalApp::new(Arc::new(MemoryStore::new()), Arc::new(EmailLogNotifier), &config);
        assert_eq!(app.bookings.policy(), TransitionPolicy::Strict);
        assert_eq!(RentalApp::in_memory().bookings.policy(), TransitionPolicy::Unconstrained);
    }

    #[rocket::async_test]
    async fn blocking_work_sees_the_shared_store() {
        let app = RentalApp::in_memory();
        let count = app
            .blocking(|app| Ok(app.store.list_users(0, 10)?.len()))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[rocket::async_test]
    async fn blocking_work_errors_pass_through() {
        let app = RentalApp::in_memory();
        let err = app
            .blocking(|_| Err::<(), _>(ServiceError::NotFound("Item not found".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound("Item not found".to_string()));
    }

    #[rocket::async_test]
    async fn panicking_work_becomes_an_internal_error() {
        let app = RentalApp::in_memory();
        let err = app
            .blocking(|_| -> Result<(), ServiceError> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InternalError(_)));
    }
}
