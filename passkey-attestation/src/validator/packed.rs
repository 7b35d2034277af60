use passkey_attestation_types::{
    crypto::{cose_key_algorithm, PublicKey},
    statement::{AttestationCertificate, AttestationStatement, PackedStatement},
    webauthn::{AttestationStatementFormat, AttestationType},
};

use super::{
    check_aaguid_extension, end_entity, format_mismatch, statement_algorithm, verify_signature,
    StatementValidator,
};
use crate::{AttestationError, ProofError, RegistrationContext, StructuralError};

/// Validates `packed` statements.
///
/// With an `x5c` certificate path:
/// 1. the path is not empty;
/// 2. `sig` verifies over `authData || clientDataHash` with the attestation certificate key;
/// 3. the attestation certificate is version 3, has the OU `Authenticator Attestation` and is not
///    a CA;
/// 4. the certificate AAGUID extension, when present, matches the authenticator data.
///
/// The result is [`AttestationType::Basic`].
///
/// Without `x5c` the statement is self attestation:
/// 1. `alg` is the credential key algorithm;
/// 2. `sig` verifies over `authData || clientDataHash` with the credential key.
///
/// The result is [`AttestationType::SelfAttestation`]. ECDAA statements are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedValidator;

impl PackedValidator {
    fn validate_basic(
        &self,
        ctx: &RegistrationContext,
        stmt: &PackedStatement,
        leaf: &AttestationCertificate,
    ) -> Result<AttestationType, AttestationError> {
        let alg = statement_algorithm(stmt.alg)?;
        verify_signature(
            self.format(),
            leaf.public_key()?,
            alg,
            &ctx.signed_data(),
            &stmt.sig,
        )?;

        if !leaf.is_v3() {
            return Err(ProofError::CertificateRequirement("version 3").into());
        }
        if leaf.subject_organizational_unit() != Some("Authenticator Attestation") {
            return Err(
                ProofError::CertificateRequirement("OU of Authenticator Attestation").into(),
            );
        }
        if leaf.is_ca() == Some(true) {
            return Err(ProofError::CertificateRequirement("not a CA").into());
        }
        check_aaguid_extension(leaf, ctx)?;

        Ok(AttestationType::Basic)
    }

    fn validate_self(
        &self,
        ctx: &RegistrationContext,
        stmt: &PackedStatement,
    ) -> Result<AttestationType, AttestationError> {
        let credential = ctx.credential_data()?;
        let alg = statement_algorithm(stmt.alg)?;
        if cose_key_algorithm(credential.key()) != Some(alg) {
            log::debug!("packed self attestation uses {alg:?}, not the credential key algorithm");
            return Err(ProofError::AlgorithmMismatch.into());
        }
        let key = PublicKey::from_cose_key(credential.key())?;
        verify_signature(self.format(), &key, alg, &ctx.signed_data(), &stmt.sig)?;

        Ok(AttestationType::SelfAttestation)
    }
}

impl StatementValidator for PackedValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::Packed
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::Packed(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };
        if stmt.ecdaa_key_id.is_some() {
            return Err(StructuralError::EcdaaUnsupported.into());
        }

        let result = match &stmt.x5c {
            Some(path) => self.validate_basic(ctx, stmt, end_entity(path)?),
            None => self.validate_self(ctx, stmt),
        };
        if let Err(e) = &result {
            log::debug!("packed attestation rejected: {e}");
        }
        result
    }
}

#[cfg(test)]
mod tests;
