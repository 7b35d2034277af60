use std::{sync::Arc, time::Duration};

use passkey_attestation_types::{
    crypto::{constant_time_eq, sha256},
    statement::AttestationStatement,
    webauthn::{AttestationStatementFormat, AttestationType},
    Bytes,
};

use super::{end_entity, format_mismatch, StatementValidator};
use crate::{
    config::SafetyNetConfig,
    policy::{FreshnessWindow, MinimumVersion, VersionPolicy},
    AttestationError, ProofError, RegistrationContext, StructuralError,
};

/// Validates `android-safetynet` statements.
///
/// Checks, in order:
/// 1. every required response field is present;
/// 2. the response carries a non-empty certificate path;
/// 3. `ver` is accepted by the [`VersionPolicy`];
/// 4. the response nonce is the base64 SHA-256 of `authData || clientDataHash`;
/// 5. the signing certificate was issued to the expected host name;
/// 6. `ctsProfileMatch` is true;
/// 7. `timestampMs` lies in the [`FreshnessWindow`] around the ceremony time;
/// 8. the response signature verifies with the signing certificate.
///
/// A statement passing every check is [`AttestationType::Basic`], with the response certificate
/// path as trust path.
#[derive(Clone)]
pub struct SafetyNetValidator {
    version_policy: Arc<dyn VersionPolicy + Send + Sync>,
    freshness: FreshnessWindow,
    expected_common_name: String,
}

impl SafetyNetValidator {
    /// Build from configuration, with a [`MinimumVersion`] version policy.
    pub fn new(config: &SafetyNetConfig) -> Self {
        Self {
            version_policy: Arc::new(MinimumVersion::from(config.minimum_version)),
            freshness: FreshnessWindow::new(
                Duration::from_secs(config.backward_threshold_secs),
                Duration::from_secs(config.forward_threshold_secs),
            ),
            expected_common_name: config.expected_common_name.clone(),
        }
    }

    /// Replace the version policy.
    pub fn with_version_policy(self, version_policy: Arc<dyn VersionPolicy + Send + Sync>) -> Self {
        Self {
            version_policy,
            ..self
        }
    }
}

impl StatementValidator for SafetyNetValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::AndroidSafetyNet
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::AndroidSafetyNet(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };
        let response = stmt.response.payload();

        if let Some(field) = response.first_missing_field() {
            log::debug!("SafetyNet response lacks {field}");
            return Err(StructuralError::MissingField(field).into());
        }
        let (Some(nonce), Some(timestamp_ms), Some(cts_profile_match)) = (
            response.nonce.as_deref(),
            response.timestamp_ms,
            response.cts_profile_match,
        ) else {
            return Err(StructuralError::MissingField("nonce").into());
        };

        let path = stmt
            .response
            .header()
            .x5c
            .as_ref()
            .ok_or(StructuralError::EmptyCertificatePath)?;
        let leaf = end_entity(path)?;

        let version = self.version_policy.validate(&stmt.ver).inspect_err(|e| {
            log::debug!("SafetyNet version {:?} rejected: {e}", stmt.ver);
        })?;

        let nonce = Bytes::try_from(nonce).map_err(|_| StructuralError::MalformedField {
            field: "nonce",
            reason: "not base64 encoded".to_owned(),
        })?;
        if !constant_time_eq(&sha256(&ctx.signed_data()), &nonce) {
            log::debug!("SafetyNet nonce is not bound to this ceremony");
            return Err(ProofError::NonceMismatch.into());
        }

        let common_name = leaf.subject_common_name();
        if common_name != Some(self.expected_common_name.as_str()) {
            log::debug!("SafetyNet response signed for {common_name:?}");
            return Err(ProofError::IssuerMismatch {
                expected: self.expected_common_name.clone(),
                found: common_name.map(str::to_owned),
            }
            .into());
        }

        if !cts_profile_match {
            log::debug!("SafetyNet device failed the CTS profile match");
            return Err(ProofError::IntegrityCheckFailed.into());
        }

        self.freshness
            .check(timestamp_ms, ctx.ceremony_time())
            .inspect_err(|e| log::debug!("SafetyNet response is stale: {e}"))?;

        if !stmt.response.is_valid_signature() {
            log::warn!("SafetyNet response signature does not verify");
            return Err(ProofError::InvalidSignature(
                "response signature does not verify with its certificate".to_owned(),
            )
            .into());
        }

        log::debug!("SafetyNet attestation from Play Services version {version} verified");
        Ok(AttestationType::Basic)
    }
}
