use passkey_attestation_types::webauthn::AttestationStatementFormat;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Verifier settings, built once and shared by every validator of a
/// [`ValidatorRegistry`](crate::ValidatorRegistry).
///
/// Missing fields take their default when deserialized, so a deployment only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// `android-safetynet` settings.
    pub safetynet: SafetyNetConfig,
    /// `tpm` settings.
    pub tpm: TpmConfig,
    /// Formats the registry accepts. Any other format is a configuration error.
    pub enabled_formats: Vec<AttestationStatementFormat>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            safetynet: SafetyNetConfig::default(),
            tpm: TpmConfig::default(),
            enabled_formats: AttestationStatementFormat::iter().collect(),
        }
    }
}

impl VerifierConfig {
    /// Replace the SafetyNet settings.
    pub fn with_safetynet(self, safetynet: SafetyNetConfig) -> Self {
        Self { safetynet, ..self }
    }

    /// Replace the TPM settings.
    pub fn with_tpm(self, tpm: TpmConfig) -> Self {
        Self { tpm, ..self }
    }

    /// Only accept the given formats.
    pub fn with_enabled_formats(
        self,
        formats: impl IntoIterator<Item = AttestationStatementFormat>,
    ) -> Self {
        Self {
            enabled_formats: formats.into_iter().collect(),
            ..self
        }
    }

    /// Whether `format` is accepted.
    pub fn is_enabled(&self, format: AttestationStatementFormat) -> bool {
        self.enabled_formats.contains(&format)
    }
}

/// `android-safetynet` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyNetConfig {
    /// How far after the ceremony time the response timestamp may be, in seconds.
    pub forward_threshold_secs: u64,
    /// How far before the ceremony time the response timestamp may be, in seconds.
    pub backward_threshold_secs: u64,
    /// Lowest accepted Google Play Services version. `None` accepts any non-negative version.
    pub minimum_version: Option<u64>,
    /// Subject common name the response signing certificate must carry.
    pub expected_common_name: String,
}

impl Default for SafetyNetConfig {
    fn default() -> Self {
        Self {
            forward_threshold_secs: 0,
            backward_threshold_secs: 60,
            minimum_version: None,
            expected_common_name: "attest.android.com".to_owned(),
        }
    }
}

impl SafetyNetConfig {
    /// Set the forward threshold, in seconds.
    pub fn with_forward_threshold_secs(self, forward_threshold_secs: u64) -> Self {
        Self {
            forward_threshold_secs,
            ..self
        }
    }

    /// Set the backward threshold, in seconds.
    pub fn with_backward_threshold_secs(self, backward_threshold_secs: u64) -> Self {
        Self {
            backward_threshold_secs,
            ..self
        }
    }

    /// Set the lowest accepted version.
    pub fn with_minimum_version(self, minimum_version: u64) -> Self {
        Self {
            minimum_version: Some(minimum_version),
            ..self
        }
    }

    /// Set the expected signing certificate common name.
    pub fn with_expected_common_name(self, name: impl Into<String>) -> Self {
        Self {
            expected_common_name: name.into(),
            ..self
        }
    }
}

/// `tpm` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpmConfig {
    /// The only accepted `ver`.
    pub required_version: String,
}

impl Default for TpmConfig {
    fn default() -> Self {
        Self {
            required_version: "2.0".to_owned(),
        }
    }
}
