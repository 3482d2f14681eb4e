//! # Route Dispatch
//!
//! The gateway does not register routes with axum one by one. A single
//! fallback handler resolves the request against the ordered
//! [`RouteTable`](fdo_core::RouteTable), builds a [`RequestContext`] and
//! hands it to the operation's handler. Each protected handler then runs
//! the same pipeline: resolve tenancy, authenticate, validate the request
//! shape, and only then touch the device index or the Owner Service.

pub mod owner;
pub mod version;
pub mod vouchers;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use fdo_core::{Method, Operation};
use fdo_owner_client::OwnerResponse;

use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::state::AppState;

/// Router whose only handler is the table-driven dispatcher.
pub fn router() -> Router<AppState> {
    Router::new().fallback(dispatch)
}

async fn dispatch(
    State(state): State<AppState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let Some(route) = Method::parse(method.as_str()).and_then(|m| state.routes.resolve(m, path))
    else {
        return AppError::NotFound(format!("route {method} {path} not found")).into_response();
    };

    let operation = route.operation();
    tracing::debug!(operation = operation.as_str(), pattern = route.pattern(), "dispatching");
    let ctx = RequestContext::new(route, &uri, &headers, body);

    let result = match operation {
        Operation::GetVersion => Ok(version::get_version(&state)),
        Operation::GetOwnerVersion => version::get_owner_version(&state).await,
        Operation::GetCertificate => owner::get_certificate(&state, &ctx).await,
        Operation::ListVouchers => vouchers::list_vouchers(&state, &ctx).await,
        Operation::GetVoucher => vouchers::get_voucher(&state, &ctx).await,
        Operation::ImportVoucher => vouchers::import_voucher(&state, &ctx).await,
        Operation::SetRedirect => owner::set_redirect(&state, &ctx).await,
        Operation::GetRedirect => owner::get_redirect(&state, &ctx).await,
        Operation::TriggerTo0 => owner::trigger_to0(&state, &ctx).await,
        Operation::PutResource => owner::put_resource(&state, &ctx).await,
        Operation::GetResource => owner::get_resource(&state, &ctx).await,
        Operation::PutServiceInfo => owner::put_service_info(&state, &ctx).await,
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

/// Relay an Owner Service response: its status and body, as plain text.
pub(crate) fn relay(response: OwnerResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    plain_text(status, response.body)
}

pub(crate) fn plain_text(status: StatusCode, body: impl Into<axum::body::Body>) -> Response {
    (status, [(CONTENT_TYPE, "text/plain")], body.into()).into_response()
}
