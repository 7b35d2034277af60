use passkey_attestation_types::{
    crypto::{constant_time_eq, sha256, PublicKey},
    statement::AttestationStatement,
    webauthn::{AttestationStatementFormat, AttestationType},
};
use x509_parser::der_parser::{
    ber::BerObjectContent,
    der::{parse_der_octetstring, parse_der_sequence},
};

use super::{end_entity, format_mismatch, StatementValidator};
use crate::{AttestationError, ProofError, RegistrationContext, StructuralError};

/// Apple anonymous attestation extension, holding the nonce.
const NONCE_OID: &str = "1.2.840.113635.100.8.2";

/// Validates `apple` anonymous attestation statements.
///
/// Checks, in order:
/// 1. the certificate path is not empty;
/// 2. the leaf certificate nonce extension is SHA-256 of `authData || clientDataHash`;
/// 3. the leaf certificate key is the credential public key.
///
/// The result is [`AttestationType::AnonymizationCa`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleValidator;

impl StatementValidator for AppleValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::Apple
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::Apple(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };

        let leaf = end_entity(&stmt.x5c)?;
        let extension = leaf
            .extension(NONCE_OID)
            .ok_or(StructuralError::MissingExtension("apple nonce"))?;
        let nonce = parse_nonce(&extension.value)
            .ok_or(StructuralError::MalformedExtension("apple nonce"))?;
        if !constant_time_eq(&sha256(&ctx.signed_data()), &nonce) {
            log::debug!("apple nonce is not bound to this ceremony");
            return Err(ProofError::NonceMismatch.into());
        }

        let credential_key = PublicKey::from_cose_key(ctx.credential_data()?.key())?;
        if *leaf.public_key()? != credential_key {
            log::debug!("apple certificate does not certify the credential key");
            return Err(ProofError::PublicKeyMismatch.into());
        }

        Ok(AttestationType::AnonymizationCa)
    }
}

/// `SEQUENCE { [1] EXPLICIT OCTET STRING nonce }`
fn parse_nonce(der: &[u8]) -> Option<Vec<u8>> {
    let (_, sequence) = parse_der_sequence(der).ok()?;
    let tagged = sequence.as_sequence().ok()?.first()?;
    let BerObjectContent::Unknown(any) = &tagged.content else {
        return None;
    };
    let (_, nonce) = parse_der_octetstring(any.data).ok()?;
    nonce.as_slice().ok().map(<[u8]>::to_vec)
}
