//! # fdo-gateway: Multi-Tenant FDO Gateway
//!
//! Organization-scoped front end for a single-tenant FDO Owner Service.
//! Callers authenticate with exchange credentials; the gateway resolves the
//! organization each request acts for, checks the caller against the
//! exchange, keeps its own index of which organization owns each onboarded
//! device, and forwards the rest to the Owner Service.
//!
//! ## API Surface
//!
//! | Route                                          | Operation         |
//! |------------------------------------------------|-------------------|
//! | `GET /api/version`                             | gateway version   |
//! | `GET /api/fdo/version`                         | Owner Service health |
//! | `GET /api/orgs/{org}/fdo/certificate/{alias}`  | owner public key  |
//! | `GET /api/orgs/{org}/fdo/vouchers`             | list devices      |
//! | `GET /api/orgs/{org}/fdo/vouchers/{device}`    | fetch voucher     |
//! | `POST /api/orgs/{org}/fdo/vouchers`            | import voucher    |
//! | `POST`/`GET /api/orgs/{org}/fdo/redirect`      | To2 redirect      |
//! | `GET /api/orgs/{org}/fdo/to0/{device}`         | trigger TO0       |
//! | `POST`/`GET /api/orgs/{org}/fdo/resource/{name}` | service-info resources |
//! | `POST /api/orgs/{org}/fdo/svi`                 | service-info instructions |
//! | `GET`/`POST /api/fdo/vouchers[/{device}]`      | voucher routes, org from `?orgid=` or credentials |
//!
//! ## Request Pipeline
//!
//! ```text
//! TraceLayer → dispatch → resolve org → Auth Gate → validate → index / Owner Service
//! ```

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod onboarding;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Largest request body accepted (vouchers, scripts, resources).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
