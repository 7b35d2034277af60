use std::time::SystemTime;

use passkey_attestation_types::{
    ctap2::{AttestedCredentialData, AuthenticatorData},
    statement::{AttestationObject, AttestationStatement},
};

use crate::{AttestationError, StructuralError};

/// Everything one registration ceremony hands to the verifier.
///
/// Validators only ever borrow the context, so it can be verified any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationContext {
    attestation_object: AttestationObject,
    client_data_hash: [u8; 32],
    ceremony_time: SystemTime,
}

impl RegistrationContext {
    /// Create a context from a decoded attestation object.
    ///
    /// * `client_data_hash` - SHA-256 of the client data JSON, exactly 32 bytes.
    /// * `ceremony_time` - when the ceremony is taking place, the reference for freshness checks.
    pub fn new(
        attestation_object: AttestationObject,
        client_data_hash: &[u8],
        ceremony_time: SystemTime,
    ) -> Result<Self, AttestationError> {
        let client_data_hash = client_data_hash
            .try_into()
            .map_err(|_| StructuralError::ClientDataHashLength(client_data_hash.len()))?;
        Ok(Self {
            attestation_object,
            client_data_hash,
            ceremony_time,
        })
    }

    /// Decode a CBOR attestation object and create a context from it.
    pub fn from_cbor(
        attestation_object: &[u8],
        client_data_hash: &[u8],
        ceremony_time: SystemTime,
    ) -> Result<Self, AttestationError> {
        Self::new(
            AttestationObject::from_cbor(attestation_object)?,
            client_data_hash,
            ceremony_time,
        )
    }

    /// The decoded attestation object.
    pub fn attestation_object(&self) -> &AttestationObject {
        &self.attestation_object
    }

    /// The attestation statement.
    pub fn statement(&self) -> &AttestationStatement {
        &self.attestation_object.statement
    }

    /// The authenticator data exactly as received.
    pub fn auth_data_bytes(&self) -> &[u8] {
        self.attestation_object.auth_data_bytes()
    }

    /// The decoded authenticator data.
    pub fn auth_data(&self) -> &AuthenticatorData {
        &self.attestation_object.auth_data
    }

    /// SHA-256 of the client data JSON.
    pub fn client_data_hash(&self) -> &[u8; 32] {
        &self.client_data_hash
    }

    /// When the ceremony is taking place.
    pub fn ceremony_time(&self) -> SystemTime {
        self.ceremony_time
    }

    /// `authenticatorData || clientDataHash`, the data most formats sign or hash.
    pub fn signed_data(&self) -> Vec<u8> {
        let mut data = self.auth_data_bytes().to_vec();
        data.extend_from_slice(&self.client_data_hash);
        data
    }

    /// The credential being registered.
    pub fn credential_data(&self) -> Result<&AttestedCredentialData, AttestationError> {
        self.auth_data()
            .attested_credential_data
            .as_ref()
            .ok_or_else(|| StructuralError::MissingCredentialData.into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use ciborium::{cbor, Value};
    use passkey_attestation_types::{
        ctap2::{AuthenticatorData, Flags},
        statement::{AttestationObject, AttestationStatement},
    };

    use super::RegistrationContext;
    use crate::{AttestationError, StructuralError};

    fn object() -> AttestationObject {
        let auth_data = AuthenticatorData::new("example.com", 7)
            .set_flags(Flags::UP)
            .to_vec();
        AttestationObject::new(AttestationStatement::None, auth_data).expect("valid auth data")
    }

    #[test]
    fn client_data_hash_must_be_32_bytes() {
        let result = RegistrationContext::new(object(), &[0; 31], SystemTime::now());
        assert_eq!(
            result,
            Err(AttestationError::Structural(
                StructuralError::ClientDataHashLength(31)
            ))
        );
    }

    #[test]
    fn signed_data_is_received_bytes_then_hash() {
        let ctx = RegistrationContext::new(object(), &[9; 32], SystemTime::now())
            .expect("valid context");

        let signed = ctx.signed_data();

        assert_eq!(signed.len(), 37 + 32);
        assert_eq!(&signed[..37], ctx.auth_data_bytes());
        assert_eq!(&signed[37..], [9; 32]);
        assert_eq!(ctx.auth_data().counter, 7);
    }

    #[test]
    fn decodes_cbor_attestation_object() {
        let auth_data = AuthenticatorData::new("example.com", 0).to_vec();
        let object = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(auth_data.clone()),
        })
        .expect("valid cbor");
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&object, &mut encoded).expect("serialize");

        let ctx = RegistrationContext::from_cbor(&encoded, &[1; 32], SystemTime::now())
            .expect("valid attestation object");

        assert_eq!(ctx.statement(), &AttestationStatement::None);
        assert_eq!(ctx.auth_data_bytes(), auth_data.as_slice());
        assert_eq!(ctx.client_data_hash(), &[1; 32]);
    }

    #[test]
    fn undecodable_attestation_object_is_structural() {
        let error = RegistrationContext::from_cbor(&[0xff], &[1; 32], SystemTime::now())
            .expect_err("not CBOR");
        assert_eq!(error.kind(), crate::ErrorKind::Structural);
    }

    #[test]
    fn missing_credential_data() {
        let ctx = RegistrationContext::new(object(), &[0; 32], SystemTime::now())
            .expect("valid context");
        assert_eq!(
            ctx.credential_data().map(|_| ()),
            Err(AttestationError::from(StructuralError::MissingCredentialData))
        );
    }
}
