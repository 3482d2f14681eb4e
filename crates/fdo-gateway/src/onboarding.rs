//! # Voucher Import
//!
//! Importing a voucher is a fixed sequence of steps against two systems
//! that share no transaction:
//!
//! ```text
//! SubmitVoucher ─▶ CommitRecord ─▶ RegisterExecDirective ─▶ RegisterServiceInfo
//!  (Owner Service)  (device index)   (Owner Service)          (Owner Service)
//! ```
//!
//! A failure stops the sequence. Completed steps are not undone; the
//! failure is logged with the steps that did complete so an operator can
//! reconcile. A rejection at `SubmitVoucher` is relayed to the caller
//! unchanged and leaves no local state behind.

use fdo_core::{
    DeviceId, ExecDirective, NodeToken, OrgId, ResourceName, ServiceInfoInstructions,
};
use fdo_owner_client::OwnerResponse;
use fdo_store::DeviceRecord;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Steps of a voucher import, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStep {
    /// Hand the voucher to the Owner Service, which answers with the device id.
    SubmitVoucher,
    /// Persist the device record under the caller's organization.
    CommitRecord,
    /// Upload the device's agent-install command as a resource.
    RegisterExecDirective,
    /// Install the agent-install service-info instructions.
    RegisterServiceInfo,
}

impl ImportStep {
    /// Every step, in the order [`VoucherImport::run`] performs them.
    pub const ORDER: [Self; 4] = [
        Self::SubmitVoucher,
        Self::CommitRecord,
        Self::RegisterExecDirective,
        Self::RegisterServiceInfo,
    ];

    /// Name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitVoucher => "submit_voucher",
            Self::CommitRecord => "commit_record",
            Self::RegisterExecDirective => "register_exec_directive",
            Self::RegisterServiceInfo => "register_service_info",
        }
    }
}

/// Body returned after a successful import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub device_id: DeviceId,
    pub node_token: NodeToken,
}

/// How an import ended when no step failed outright.
#[derive(Debug)]
pub enum ImportResult {
    Imported(ImportOutcome),
    /// The Owner Service refused the voucher; relay its answer.
    Rejected(OwnerResponse),
}

/// One voucher import in progress.
pub struct VoucherImport<'a> {
    state: &'a AppState,
    org: OrgId,
    voucher: Vec<u8>,
    completed: Vec<ImportStep>,
}

impl<'a> VoucherImport<'a> {
    /// Start an import of `voucher` on behalf of `org`.
    pub fn new(state: &'a AppState, org: OrgId, voucher: &[u8]) -> Self {
        Self {
            state,
            org,
            voucher: voucher.to_vec(),
            completed: Vec::with_capacity(ImportStep::ORDER.len()),
        }
    }

    /// Run every step in order, stopping at the first failure. Steps that
    /// already completed are not undone.
    pub async fn run(mut self) -> Result<ImportResult, AppError> {
        let state = self.state;
        let owner = &state.owner;
        let config = &state.config;

        // SubmitVoucher
        let submitted = owner
            .import_voucher(&self.voucher)
            .await
            .map_err(|e| self.fail(ImportStep::SubmitVoucher, e.into()))?;
        if !submitted.is_success() {
            tracing::warn!(
                org = %self.org,
                status = submitted.status,
                "Owner Service rejected voucher"
            );
            return Ok(ImportResult::Rejected(submitted));
        }
        let device = DeviceId::parse(&submitted.text()).map_err(|e| {
            self.fail(
                ImportStep::SubmitVoucher,
                AppError::BackendUnavailable(format!("Owner Service returned {e}")),
            )
        })?;
        self.completed.push(ImportStep::SubmitVoucher);

        // CommitRecord
        let node_token = NodeToken::generate();
        let exec_directive = ExecDirective::agent_install(
            &config.pkgs_from,
            &device,
            &node_token,
            &self.org,
            &config.cfg_file_from,
        );
        let record = DeviceRecord {
            device,
            org: self.org.clone(),
            voucher: self.voucher.clone(),
            node_token: node_token.clone(),
            exec_directive: exec_directive.clone(),
        };
        state
            .with_devices(move |index| index.create_device(&record))
            .await
            .map_err(|e| self.fail(ImportStep::CommitRecord, e))?;
        self.completed.push(ImportStep::CommitRecord);

        // RegisterExecDirective
        let resource = ResourceName::new(ExecDirective::resource_name(&device))
            .map_err(|e| self.fail(ImportStep::RegisterExecDirective, e.into()))?;
        let registered = owner
            .put_resource(&resource, exec_directive.as_str().as_bytes())
            .await
            .map_err(|e| self.fail(ImportStep::RegisterExecDirective, e.into()))?;
        self.require_success(ImportStep::RegisterExecDirective, &registered)?;
        self.completed.push(ImportStep::RegisterExecDirective);

        // RegisterServiceInfo
        let instructions = ServiceInfoInstructions::agent_install(config.mgmt_hub_cert.is_some())
            .to_json()
            .map_err(|e| {
                self.fail(
                    ImportStep::RegisterServiceInfo,
                    AppError::Internal(format!("service info encoding failed: {e}")),
                )
            })?;
        let registered = owner
            .put_service_info(&instructions)
            .await
            .map_err(|e| self.fail(ImportStep::RegisterServiceInfo, e.into()))?;
        self.require_success(ImportStep::RegisterServiceInfo, &registered)?;
        self.completed.push(ImportStep::RegisterServiceInfo);

        tracing::info!(org = %self.org, device = %device, "voucher imported");
        Ok(ImportResult::Imported(ImportOutcome {
            device_id: device,
            node_token,
        }))
    }

    fn require_success(&self, step: ImportStep, response: &OwnerResponse) -> Result<(), AppError> {
        if response.is_success() {
            return Ok(());
        }
        Err(self.fail(
            step,
            AppError::BackendUnavailable(format!(
                "Owner Service answered {} during {}",
                response.status,
                step.as_str()
            )),
        ))
    }

    fn fail(&self, step: ImportStep, err: AppError) -> AppError {
        let completed: Vec<&str> = self.completed.iter().map(ImportStep::as_str).collect();
        tracing::error!(
            org = %self.org,
            failed_step = step.as_str(),
            ?completed,
            error = %err,
            "voucher import stopped; completed steps were not rolled back"
        );
        err
    }
}
