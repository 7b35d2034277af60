use passkey_attestation_types::{
    crypto::{constant_time_eq, HashAlgorithm, PublicKey},
    statement::{
        tpm::{TPM_GENERATED_VALUE, TPM_ST_ATTEST_CERTIFY},
        AttestationCertificate, AttestationStatement, DecodeError,
    },
    webauthn::{AttestationStatementFormat, AttestationType},
};

use super::{
    check_aaguid_extension, end_entity, format_mismatch, statement_algorithm, verify_signature,
    StatementValidator,
};
use crate::{
    config::TpmConfig, AttestationError, PolicyError, ProofError, RegistrationContext,
    StructuralError,
};

/// `tcg-kp-AIKCertificate`
const AIK_CERTIFICATE_EKU: &str = "2.23.133.8.3";

/// Validates `tpm` statements.
///
/// Checks, in order:
/// 1. `ver` is the configured TPM version;
/// 2. the certificate path is not empty;
/// 3. `pubArea` holds the credential public key;
/// 4. `certInfo` is a `TPM_GENERATED_VALUE` structure of type `TPM_ST_ATTEST_CERTIFY`;
/// 5. `certInfo.extraData` is the hash of `authData || clientDataHash` with the hash of `alg`;
/// 6. `certInfo` attests the name of `pubArea`;
/// 7. `sig` verifies over `certInfo` with the AIK certificate key;
/// 8. the AIK certificate is version 3, has an empty subject, the `tcg-kp-AIKCertificate`
///    extended key usage and is not a CA;
/// 9. the certificate AAGUID extension, when present, matches the authenticator data.
///
/// The result is [`AttestationType::AttestationCa`].
#[derive(Debug, Clone)]
pub struct TpmValidator {
    required_version: String,
}

impl TpmValidator {
    /// Build from configuration.
    pub fn new(config: &TpmConfig) -> Self {
        Self {
            required_version: config.required_version.clone(),
        }
    }
}

impl StatementValidator for TpmValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::Tpm
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::Tpm(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };

        if stmt.ver != self.required_version {
            return Err(PolicyError::TpmVersion {
                found: stmt.ver.clone(),
                required: self.required_version.clone(),
            }
            .into());
        }
        let aik = end_entity(&stmt.x5c)?;

        let credential_key = PublicKey::from_cose_key(ctx.credential_data()?.key())?;
        if stmt.pub_area.public_key().map_err(DecodeError::from)? != credential_key {
            log::debug!("tpm pubArea does not hold the credential key");
            return Err(ProofError::PublicKeyMismatch.into());
        }

        let cert_info = &stmt.cert_info;
        if cert_info.magic != TPM_GENERATED_VALUE {
            return Err(ProofError::TpmMismatch("magic").into());
        }
        if cert_info.attest_type != TPM_ST_ATTEST_CERTIFY {
            return Err(ProofError::TpmMismatch("type").into());
        }

        let alg = statement_algorithm(stmt.alg)?;
        let hash = HashAlgorithm::for_cose(alg)
            .ok_or_else(|| StructuralError::UnsupportedAlgorithm(format!("{alg:?}")))?;
        if !constant_time_eq(&cert_info.extra_data, &hash.digest(&ctx.signed_data())) {
            log::debug!("tpm extraData is not bound to this ceremony");
            return Err(ProofError::TpmMismatch("extraData").into());
        }

        let name = stmt.pub_area.name().map_err(DecodeError::from)?;
        if cert_info.certify.as_ref().map(|c| c.name.as_slice()) != Some(name.as_slice()) {
            return Err(ProofError::TpmMismatch("name").into());
        }

        verify_signature(
            self.format(),
            aik.public_key()?,
            alg,
            cert_info.raw(),
            &stmt.sig,
        )?;

        check_aik_requirements(aik)?;
        check_aaguid_extension(aik, ctx)?;

        Ok(AttestationType::AttestationCa)
    }
}

fn check_aik_requirements(aik: &AttestationCertificate) -> Result<(), ProofError> {
    if !aik.is_v3() {
        return Err(ProofError::CertificateRequirement("version 3"));
    }
    if !aik.subject_is_empty() {
        return Err(ProofError::CertificateRequirement("empty subject"));
    }
    if !aik
        .extended_key_usages()
        .iter()
        .any(|eku| eku == AIK_CERTIFICATE_EKU)
    {
        return Err(ProofError::CertificateRequirement("tcg-kp-AIKCertificate"));
    }
    if aik.is_ca() == Some(true) {
        return Err(ProofError::CertificateRequirement("not a CA"));
    }
    Ok(())
}
