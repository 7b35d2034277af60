use std::sync::Arc;

use passkey_attestation_types::{
    statement::{AttestationStatement, CertificatePath},
    webauthn::AttestationType,
};

use crate::{
    policy::VersionPolicy,
    validator::{
        AndroidKeyValidator, AppleValidator, FidoU2fValidator, NoneValidator, PackedValidator,
        SafetyNetValidator, StatementValidator, TpmValidator,
    },
    AttestationError, ConfigurationError, RegistrationContext, VerifierConfig,
};

/// The outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAttestation<'a> {
    /// How the attestation is to be trusted.
    pub attestation_type: AttestationType,
    /// The statement's own certificate path, end-entity first, to evaluate against trust anchors.
    /// `None` for self attestation and `none`.
    pub trust_path: Option<&'a CertificatePath>,
}

/// Selects the validator for a statement's format.
///
/// Built once from a [`VerifierConfig`] and shared by concurrent ceremonies.
#[derive(Clone)]
pub struct ValidatorRegistry {
    config: VerifierConfig,
    none: NoneValidator,
    packed: PackedValidator,
    tpm: TpmValidator,
    android_key: AndroidKeyValidator,
    android_safetynet: SafetyNetValidator,
    fido_u2f: FidoU2fValidator,
    apple: AppleValidator,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl ValidatorRegistry {
    /// Build every validator from `config`.
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            none: NoneValidator,
            packed: PackedValidator,
            tpm: TpmValidator::new(&config.tpm),
            android_key: AndroidKeyValidator,
            android_safetynet: SafetyNetValidator::new(&config.safetynet),
            fido_u2f: FidoU2fValidator,
            apple: AppleValidator,
            config,
        }
    }

    /// Replace the version policy of the `android-safetynet` validator.
    pub fn with_safetynet_version_policy(
        self,
        policy: Arc<dyn VersionPolicy + Send + Sync>,
    ) -> Self {
        Self {
            android_safetynet: self.android_safetynet.with_version_policy(policy),
            ..self
        }
    }

    /// The configuration the validators were built from.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The validator for `statement`.
    ///
    /// Unknown formats and formats not enabled in the configuration are a
    /// [`ConfigurationError::UnsupportedFormat`].
    pub fn dispatch(
        &self,
        statement: &AttestationStatement,
    ) -> Result<&dyn StatementValidator, AttestationError> {
        let validator: &dyn StatementValidator = match statement {
            AttestationStatement::None => &self.none,
            AttestationStatement::Packed(_) => &self.packed,
            AttestationStatement::Tpm(_) => &self.tpm,
            AttestationStatement::AndroidKey(_) => &self.android_key,
            AttestationStatement::AndroidSafetyNet(_) => &self.android_safetynet,
            AttestationStatement::FidoU2f(_) => &self.fido_u2f,
            AttestationStatement::Apple(_) => &self.apple,
            AttestationStatement::Unsupported { format } => {
                log::debug!("no validator for attestation format {format:?}");
                return Err(ConfigurationError::UnsupportedFormat(format.clone()).into());
            }
        };
        if !self.config.is_enabled(validator.format()) {
            log::debug!("attestation format {} is disabled", validator.format());
            return Err(
                ConfigurationError::UnsupportedFormat(validator.format().to_string()).into(),
            );
        }
        Ok(validator)
    }

    /// Validate the statement of `ctx` with the matching validator.
    pub fn verify<'a>(
        &self,
        ctx: &'a RegistrationContext,
    ) -> Result<VerifiedAttestation<'a>, AttestationError> {
        let statement = ctx.statement();
        let attestation_type = self
            .dispatch(statement)?
            .validate(ctx)
            .inspect_err(|e| {
                log::debug!(
                    "{} attestation rejected ({:?}): {e}",
                    statement.format_identifier(),
                    e.kind()
                )
            })?;
        log::debug!(
            "{} attestation verified as {attestation_type}",
            statement.format_identifier()
        );

        let trust_path = attestation_type
            .has_trust_path()
            .then(|| statement.certificate_path())
            .flatten();
        Ok(VerifiedAttestation {
            attestation_type,
            trust_path,
        })
    }
}
