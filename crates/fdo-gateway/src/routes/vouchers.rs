//! Voucher operations: list, fetch and import.
//!
//! Listing and fetching are answered from the device index. The index is
//! the only source of truth for which organization owns a device, so
//! `get_voucher` checks ownership before the Owner Service is consulted.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{plain_text, relay};
use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::onboarding::{ImportResult, VoucherImport};
use crate::state::AppState;

/// `GET /api/orgs/{org}/fdo/vouchers`: device ids of the organization,
/// sorted.
pub async fn list_vouchers(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let devices = state
        .with_devices(move |index| index.list_devices(&org))
        .await?;
    let ids: Vec<String> = devices.iter().map(ToString::to_string).collect();
    Ok(Json(ids).into_response())
}

/// `GET /api/orgs/{org}/fdo/vouchers/{device}`
///
/// The Owner Service must still know the voucher; its refusal is relayed.
/// The body returned is the voucher as the caller uploaded it.
pub async fn get_voucher(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let device = ctx.device()?;
    state
        .with_devices(move |index| index.authorize_device(&device, &org))
        .await?;

    let upstream = state.owner.voucher(&device).await?;
    if !upstream.is_success() {
        tracing::warn!(device = %device, status = upstream.status, "Owner Service has no voucher");
        return Ok(relay(upstream));
    }

    let voucher = state
        .with_devices(move |index| index.read_voucher(&device))
        .await?;
    Ok(plain_text(StatusCode::OK, voucher))
}

/// `POST /api/orgs/{org}/fdo/vouchers`
pub async fn import_voucher(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let voucher = ctx.plain_text_body()?;
    match VoucherImport::new(state, org, voucher).run().await? {
        ImportResult::Imported(outcome) => Ok(Json(outcome).into_response()),
        ImportResult::Rejected(response) => Ok(relay(response)),
    }
}
