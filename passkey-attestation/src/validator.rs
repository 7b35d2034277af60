//! One validator per attestation statement format.
//!
//! Each validator runs its checks in a fixed order and stops at the first one that fails. The
//! checks each format runs are listed on its validator type.

mod android_key;
mod android_safetynet;
mod apple;
mod fido_u2f;
mod none;
mod packed;
mod tpm;

use coset::iana;
use passkey_attestation_types::{
    crypto::{self, PublicKey},
    statement::{AttestationCertificate, AttestationStatement, CertificatePath},
    webauthn::{AttestationStatementFormat, AttestationType},
};
use x509_parser::der_parser::der::parse_der_octetstring;

pub use self::{
    android_key::AndroidKeyValidator, android_safetynet::SafetyNetValidator,
    apple::AppleValidator, fido_u2f::FidoU2fValidator, none::NoneValidator,
    packed::PackedValidator, tpm::TpmValidator,
};
use crate::{
    AttestationError, ConfigurationError, ProofError, RegistrationContext, StructuralError,
};

/// `id-fido-gen-ce-aaguid`
pub(crate) const AAGUID_EXTENSION_OID: &str = "1.3.6.1.4.1.45724.1.1.4";

/// The contract every format validator fulfils.
///
/// Validators hold only immutable configuration, so a single instance can serve concurrent
/// ceremonies.
pub trait StatementValidator {
    /// The format this validator handles.
    fn format(&self) -> AttestationStatementFormat;

    /// Validate the statement of `ctx` and classify the attestation.
    ///
    /// A statement of any other format is a [`ConfigurationError::FormatMismatch`].
    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError>;
}

/// The error for a validator handed a statement it does not handle.
pub(crate) fn format_mismatch(
    expected: AttestationStatementFormat,
    statement: &AttestationStatement,
) -> AttestationError {
    log::debug!(
        "{expected} validator received a {} statement",
        statement.format_identifier()
    );
    ConfigurationError::FormatMismatch {
        expected,
        found: statement.format_identifier().to_owned(),
    }
    .into()
}

/// The end-entity certificate of a path that must not be empty.
pub(crate) fn end_entity(
    path: &CertificatePath,
) -> Result<&AttestationCertificate, AttestationError> {
    path.end_entity()
        .ok_or_else(|| StructuralError::EmptyCertificatePath.into())
}

/// Verify a DER signature made by `key` with the COSE algorithm `alg`.
pub(crate) fn verify_signature(
    format: AttestationStatementFormat,
    key: &PublicKey,
    alg: iana::Algorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<(), AttestationError> {
    key.verify(alg, data, signature).map_err(|e| {
        log::warn!("{format} attestation signature rejected: {e}");
        AttestationError::from(e)
    })
}

/// The statement `alg` as a COSE algorithm.
pub(crate) fn statement_algorithm(alg: i64) -> Result<iana::Algorithm, AttestationError> {
    Ok(crypto::cose_algorithm(alg)?)
}

/// Check the optional AAGUID extension of an attestation certificate against the authenticator
/// data.
pub(crate) fn check_aaguid_extension(
    certificate: &AttestationCertificate,
    ctx: &RegistrationContext,
) -> Result<(), AttestationError> {
    let Some(extension) = certificate.extension(AAGUID_EXTENSION_OID) else {
        return Ok(());
    };
    if extension.critical {
        return Err(
            ProofError::CertificateRequirement("AAGUID extension must not be critical").into(),
        );
    }
    let (_, aaguid) = parse_der_octetstring(&extension.value)
        .map_err(|_| StructuralError::MalformedExtension("AAGUID"))?;
    let aaguid = aaguid
        .as_slice()
        .map_err(|_| StructuralError::MalformedExtension("AAGUID"))?;
    if aaguid != ctx.credential_data()?.aaguid.as_bytes() {
        return Err(ProofError::AaguidMismatch.into());
    }
    Ok(())
}
