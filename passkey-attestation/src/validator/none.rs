use passkey_attestation_types::{
    statement::AttestationStatement,
    webauthn::{AttestationStatementFormat, AttestationType},
};

use super::{format_mismatch, StatementValidator};
use crate::{AttestationError, RegistrationContext};

/// Validates `none` statements.
///
/// The statement was already required to be an empty map when decoded, so there is nothing left
/// to prove: the result is always [`AttestationType::None`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneValidator;

impl StatementValidator for NoneValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::None
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        match ctx.statement() {
            AttestationStatement::None => Ok(AttestationType::None),
            other => Err(format_mismatch(self.format(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use passkey_attestation_types::statement::{AttestationStatement, FidoU2fStatement};

    use super::*;
    use crate::testing::{context, plain_auth_data};

    #[test]
    fn nothing_to_prove() {
        let ctx = context(AttestationStatement::None, plain_auth_data());
        assert_eq!(NoneValidator.validate(&ctx), Ok(AttestationType::None));
    }

    #[test]
    fn other_formats() {
        let stmt = AttestationStatement::FidoU2f(FidoU2fStatement {
            sig: vec![0; 70],
            x5c: Default::default(),
        });
        let error = NoneValidator
            .validate(&context(stmt, plain_auth_data()))
            .expect_err("not a none statement");
        assert_eq!(error.kind(), crate::ErrorKind::Configuration);
    }
}
