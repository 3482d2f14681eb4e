//! Owner Service passthrough operations.
//!
//! These authenticate the caller, validate what the gateway can validate
//! locally, then forward to the Owner Service and relay its answer.
//! `TriggerTo0` additionally checks device ownership in the local index
//! before anything is sent upstream.

use axum::response::Response;

use super::relay;
use crate::error::AppError;
use crate::extractors::RequestContext;
use crate::state::AppState;

/// `GET /api/orgs/{org}/fdo/certificate/{alias}`
pub async fn get_certificate(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    ctx.authorized_org(state).await?;
    let alias = ctx.key_alias()?;
    Ok(relay(state.owner.certificate(alias).await?))
}

/// `POST /api/orgs/{org}/fdo/redirect`
pub async fn set_redirect(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let body = ctx.plain_text_body()?;
    let response = state.owner.set_redirect(body).await?;
    tracing::info!(org = %org, status = response.status, "redirect update forwarded");
    Ok(relay(response))
}

/// `GET /api/orgs/{org}/fdo/redirect`
pub async fn get_redirect(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    ctx.authorized_org(state).await?;
    Ok(relay(state.owner.redirect().await?))
}

/// `GET /api/orgs/{org}/fdo/to0/{device}`
pub async fn trigger_to0(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let device = ctx.device()?;
    let owner_org = org.clone();
    state
        .with_devices(move |index| index.authorize_device(&device, &owner_org))
        .await?;
    let response = state.owner.trigger_to0(&device).await?;
    tracing::info!(org = %org, device = %device, status = response.status, "TO0 triggered");
    Ok(relay(response))
}

/// `POST /api/orgs/{org}/fdo/resource/{name}`
pub async fn put_resource(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let name = ctx.resource_name()?;
    let body = ctx.plain_text_body()?;
    let response = state.owner.put_resource(&name, body).await?;
    tracing::info!(org = %org, resource = %name, status = response.status, "resource uploaded");
    Ok(relay(response))
}

/// `GET /api/orgs/{org}/fdo/resource/{name}`
pub async fn get_resource(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    ctx.authorized_org(state).await?;
    let name = ctx.resource_name()?;
    Ok(relay(state.owner.resource(&name).await?))
}

/// `POST /api/orgs/{org}/fdo/svi`
pub async fn put_service_info(state: &AppState, ctx: &RequestContext) -> Result<Response, AppError> {
    let org = ctx.authorized_org(state).await?;
    let body = ctx.plain_text_body()?;
    let response = state.owner.put_service_info(body).await?;
    tracing::info!(org = %org, status = response.status, "service info uploaded");
    Ok(relay(response))
}
