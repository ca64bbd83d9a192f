//! # Clinic API
//!
//! REST server for the clinic's orders, stock and issuance workflow.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Clinic API Routes                              │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /api/orders   │  │ /api/issuances │  │  /api/stock                ││
//! │  │                │  │                │  │                            ││
//! │  │ • list/create  │  │ • get          │  │ • list/create              ││
//! │  │ • payments     │  │ • return       │  │ • summary                  ││
//! │  │ • status       │  │ • damage       │  │ • issuances per batch      ││
//! │  │ • issue        │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐            │
//! │  │  /api/auth     │  │  /api/users    │  │  /health       │            │
//! │  │ login/refresh  │  │ list/create    │  │  (public)      │            │
//! │  │ logout/me      │  │                │  │                │            │
//! │  └────────────────┘  └────────────────┘  └────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./clinic.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 900)
//! - `JWT_REFRESH_LIFETIME_SECS` - Refresh token lifetime (default: 604800)
//! - `JWT_RENEWAL_WINDOW_SECS` - Renew access tokens this close to expiry (default: 300)
//! - `COOKIE_SECURE` - `Secure` attribute on auth cookies (default: false)
//! - `LOG_LEVEL` - default filter when `RUST_LOG` is unset (default: info)

use std::sync::Arc;

use clinic_db::Database;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_app;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(
            &config.jwt_secret,
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
        )
        .with_secure_cookies(config.cookie_secure);

        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}
