use passkey_attestation_types::{
    crypto::{constant_time_eq, PublicKey},
    statement::AttestationStatement,
    webauthn::{AttestationStatementFormat, AttestationType},
};
use x509_parser::der_parser::der::{parse_der_sequence, Tag};

use super::{end_entity, format_mismatch, statement_algorithm, verify_signature, StatementValidator};
use crate::{AttestationError, ProofError, RegistrationContext, StructuralError};

/// Android key attestation extension, holding the `KeyDescription`.
const KEY_DESCRIPTION_OID: &str = "1.3.6.1.4.1.11129.2.1.17";

/// `KeyDescription.attestationChallenge`
const CHALLENGE_INDEX: usize = 4;
/// `KeyDescription.softwareEnforced` and `KeyDescription.teeEnforced`
const AUTHORIZATION_LIST_INDICES: [usize; 2] = [6, 7];
/// `AuthorizationList.allApplications`
const ALL_APPLICATIONS: Tag = Tag(600);

/// Validates `android-key` statements.
///
/// Checks, in order:
/// 1. the certificate path is not empty;
/// 2. `sig` verifies over `authData || clientDataHash` with the leaf certificate key;
/// 3. the leaf certificate key is the credential public key;
/// 4. the leaf certificate key description has `clientDataHash` as attestation challenge;
/// 5. neither authorization list of the key description has `allApplications`.
///
/// The result is [`AttestationType::Basic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidKeyValidator;

impl StatementValidator for AndroidKeyValidator {
    fn format(&self) -> AttestationStatementFormat {
        AttestationStatementFormat::AndroidKey
    }

    fn validate(&self, ctx: &RegistrationContext) -> Result<AttestationType, AttestationError> {
        let AttestationStatement::AndroidKey(stmt) = ctx.statement() else {
            return Err(format_mismatch(self.format(), ctx.statement()));
        };

        let leaf = end_entity(&stmt.x5c)?;
        let leaf_key = leaf.public_key()?;
        let alg = statement_algorithm(stmt.alg)?;
        verify_signature(self.format(), leaf_key, alg, &ctx.signed_data(), &stmt.sig)?;

        let credential_key = PublicKey::from_cose_key(ctx.credential_data()?.key())?;
        if *leaf_key != credential_key {
            log::debug!("android-key certificate does not certify the credential key");
            return Err(ProofError::PublicKeyMismatch.into());
        }

        let extension = leaf
            .extension(KEY_DESCRIPTION_OID)
            .ok_or(StructuralError::MissingExtension("key description"))?;
        let description = KeyDescription::parse(&extension.value)
            .ok_or(StructuralError::MalformedExtension("key description"))?;
        if !constant_time_eq(&description.challenge, ctx.client_data_hash()) {
            log::debug!("android-key attestation challenge is not this ceremony's");
            return Err(ProofError::ChallengeMismatch.into());
        }
        if description.all_applications {
            log::debug!("android-key credential is usable by all applications");
            return Err(ProofError::AllApplications.into());
        }

        Ok(AttestationType::Basic)
    }
}

/// The parts of the Android `KeyDescription` sequence the format checks.
struct KeyDescription {
    challenge: Vec<u8>,
    all_applications: bool,
}

impl KeyDescription {
    fn parse(der: &[u8]) -> Option<Self> {
        let (_, description) = parse_der_sequence(der).ok()?;
        let fields = description.as_sequence().ok()?;
        let challenge = fields.get(CHALLENGE_INDEX)?.as_slice().ok()?.to_vec();

        let mut all_applications = false;
        for index in AUTHORIZATION_LIST_INDICES {
            let list = fields.get(index)?.as_sequence().ok()?;
            all_applications |= list.iter().any(|entry| entry.tag() == ALL_APPLICATIONS);
        }

        Some(Self {
            challenge,
            all_applications,
        })
    }
}
