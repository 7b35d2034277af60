use coset::iana;
use passkey_attestation_types::{
    crypto::PublicKey,
    statement::AttestationStatement,
    webauthn::{AttestationStatementFormat, AttestationType},
};

use super::{end_entity, format_mismatch, verify_signature, StatementValidator};
use crate::{AttestationError, RegistrationContext, StructuralError};

/// Validates `fido-u2f` statements.
///
/// Checks, in order:
/// 1. `x5c` holds exactly one certificate, with a P-256 key;
/// 2. the credential key is a P-256 key;
/// 3. `sig` verifies over the U2F registration data
///    `0x00 || rpIdHash || clientDataHash || credentialId || publicKeyU2F`.
///
/// The result is [`AttestationType::Basic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FidoU2fValidator;

impl StatementValidator for FidoU2fValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::FidoU2f
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::FidoU2f(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };

        if stmt.x5c.len() != 1 {
            log::debug!("fido-u2f statement has {} certificates", stmt.x5c.len());
            return Err(StructuralError::CertificateCount {
                expected: 1,
                found: stmt.x5c.len(),
            }
            .into());
        }
        let attestation_key = end_entity(&stmt.x5c)?.public_key()?;
        if !matches!(attestation_key, PublicKey::P256(_)) {
            return Err(StructuralError::UnsupportedKey(
                "fido-u2f attestation certificate key is not P-256".to_owned(),
            )
            .into());
        }

        let credential = ctx.credential_data()?;
        let public_key_u2f = PublicKey::from_cose_key(credential.key())?
            .to_uncompressed_point()
            .ok_or_else(|| {
                StructuralError::UnsupportedKey("fido-u2f credential key is not P-256".to_owned())
            })?;

        let mut verification_data = vec![0x00];
        verification_data.extend_from_slice(ctx.auth_data().rp_id_hash());
        verification_data.extend_from_slice(ctx.client_data_hash());
        verification_data.extend_from_slice(credential.credential_id());
        verification_data.extend_from_slice(&public_key_u2f);

        verify_signature(
            self.format(),
            attestation_key,
            iana::Algorithm::ES256,
            &verification_data,
            &stmt.sig,
        )?;

        Ok(AttestationType::Basic)
    }
}
