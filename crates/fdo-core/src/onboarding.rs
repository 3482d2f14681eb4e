//! # Onboarding Artifacts
//!
//! What the gateway produces when a voucher is imported: a node token the
//! device will use to register with the exchange, the shell directive the
//! device runs after TO2, and the service-info instruction list that tells
//! the Owner Service which resources to push.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{DeviceId, OrgId};

/// Public key types the Owner Service can return from its certificate
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlias {
    /// ECDSA P-256.
    Secp256r1,
    /// ECDSA P-384.
    Secp384r1,
    /// RSA 3072, PKCS#1.
    RsaPkcs3072,
    /// RSA 2048, PKCS#1.
    RsaPkcs2048,
    /// RSA 2048, restricted.
    Rsa2048Restr,
}

impl PublicKeyAlias {
    /// Every supported alias.
    pub const ALL: [Self; 5] = [
        Self::Secp256r1,
        Self::Secp384r1,
        Self::RsaPkcs3072,
        Self::RsaPkcs2048,
        Self::Rsa2048Restr,
    ];

    /// Alias as the Owner Service spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256r1 => "SECP256R1",
            Self::Secp384r1 => "SECP384R1",
            Self::RsaPkcs3072 => "RSAPKCS3072",
            Self::RsaPkcs2048 => "RSAPKCS2048",
            Self::Rsa2048Restr => "RSA2048RESTR",
        }
    }
}

impl std::str::FromStr for PublicKeyAlias {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alias| alias.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedKeyAlias(s.to_string()))
    }
}

impl std::fmt::Display for PublicKeyAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of random bytes in a node token.
const NODE_TOKEN_BYTES: usize = 32;

/// Exchange node token handed to a newly onboarded device.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeToken(String);

impl NodeToken {
    /// Generate a fresh token from the OS random source, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NODE_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token read back from storage.
    pub fn from_stored(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for NodeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeToken([REDACTED])")
    }
}

/// Command line the device executes once TO2 has delivered its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecDirective(String);

impl ExecDirective {
    /// Render the agent-install invocation for one device.
    ///
    /// `pkgs_from` and `cfg_file_from` are the `-i` and `-k` arguments of
    /// `agent-install.sh`.
    pub fn agent_install(
        pkgs_from: &str,
        device: &DeviceId,
        token: &NodeToken,
        org: &OrgId,
        cfg_file_from: &str,
    ) -> Self {
        Self(format!(
            "/bin/sh agent-install-wrapper.sh -i {pkgs_from} -a {device}:{token} -O {org} -k {cfg_file_from}",
            token = token.as_str(),
        ))
    }

    /// Wrap a directive read back from storage.
    pub fn from_stored(directive: impl Into<String>) -> Self {
        Self(directive.into())
    }

    /// Directive text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource name under which the directive is registered with the
    /// Owner Service. The service-info list refers to it as `$(guid)_exec`.
    pub fn resource_name(device: &DeviceId) -> String {
        format!("{device}_exec")
    }
}

/// One entry of a service-info instruction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceInfoStep {
    /// Push a resource to the device under `filedesc`.
    File {
        /// File name on the device.
        filedesc: String,
        /// Resource name in the Owner Service.
        resource: String,
    },
    /// Run a command on the device.
    Exec {
        /// argv.
        exec: Vec<String>,
    },
}

/// Service-info instruction list posted to the Owner Service after each
/// import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceInfoInstructions(Vec<ServiceInfoStep>);

impl ServiceInfoInstructions {
    /// Agent-install instructions: ship the config, the optional hub
    /// certificate, the wrapper script and the per-device exec file, then
    /// run it.
    pub fn agent_install(include_hub_cert: bool) -> Self {
        let file = |filedesc: &str, resource: &str| ServiceInfoStep::File {
            filedesc: filedesc.to_string(),
            resource: resource.to_string(),
        };

        let mut steps = Vec::with_capacity(5);
        if include_hub_cert {
            steps.push(file("agent-install.crt", "agent-install.crt"));
        }
        steps.push(file("agent-install.cfg", "agent-install.cfg"));
        steps.push(file("agent-install-wrapper.sh", "agent-install-wrapper.sh"));
        steps.push(file("setup.sh", "$(guid)_exec"));
        steps.push(ServiceInfoStep::Exec {
            exec: vec!["bash".to_string(), "setup.sh".to_string()],
        });
        Self(steps)
    }

    /// Steps in order.
    pub fn steps(&self) -> &[ServiceInfoStep] {
        &self.0
    }

    /// JSON body for the Owner Service.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
