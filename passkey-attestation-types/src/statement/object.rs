use ciborium::value::Value;

use crate::{
    ctap2::AuthenticatorData,
    statement::{AttestationStatement, DecodeError},
};

/// A decoded attestation object.
///
/// The authenticator data is kept both decoded and as the exact bytes received, which are the
/// ones every format signs over.
///
/// <https://w3c.github.io/webauthn/#sctn-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    /// The attestation statement, selected by `fmt`.
    pub statement: AttestationStatement,
    /// The decoded authenticator data.
    pub auth_data: AuthenticatorData,
    auth_data_bytes: Vec<u8>,
}

impl AttestationObject {
    /// Assemble an attestation object from a decoded statement and raw authenticator data.
    pub fn new(
        statement: AttestationStatement,
        auth_data_bytes: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            statement,
            auth_data: AuthenticatorData::from_slice(&auth_data_bytes)?,
            auth_data_bytes,
        })
    }

    /// Decode the CBOR attestation object `{fmt, attStmt, authData}`.
    pub fn from_cbor(data: &[u8]) -> Result<Self, DecodeError> {
        let value: Value =
            ciborium::de::from_reader(data).map_err(|e| DecodeError::Cbor(e.to_string()))?;
        let Value::Map(entries) = value else {
            return Err(DecodeError::Cbor("attestation object is not a map".into()));
        };

        let mut fmt = None;
        let mut att_stmt = None;
        let mut auth_data = None;
        for (key, value) in entries {
            match key.as_text() {
                Some("fmt") => fmt = Some(value),
                Some("attStmt") => att_stmt = Some(value),
                Some("authData") => auth_data = Some(value),
                _ => {}
            }
        }

        let fmt = match fmt.ok_or(DecodeError::MissingField("fmt"))? {
            Value::Text(fmt) => fmt,
            _ => return Err(DecodeError::InvalidField("fmt")),
        };
        let auth_data = match auth_data.ok_or(DecodeError::MissingField("authData"))? {
            Value::Bytes(bytes) => bytes,
            _ => return Err(DecodeError::InvalidField("authData")),
        };
        let att_stmt = att_stmt.ok_or(DecodeError::MissingField("attStmt"))?;

        Self::new(AttestationStatement::from_cbor(&fmt, att_stmt)?, auth_data)
    }

    /// The authenticator data exactly as received.
    pub fn auth_data_bytes(&self) -> &[u8] {
        &self.auth_data_bytes
    }
}

#[cfg(test)]
mod tests {
    use ciborium::{cbor, value::Value};

    use super::AttestationObject;
    use crate::{
        ctap2::{AuthenticatorData, Flags},
        statement::{AttestationStatement, DecodeError},
    };

    fn encode(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(value, &mut out).expect("could not encode");
        out
    }

    fn auth_data() -> Vec<u8> {
        AuthenticatorData::new("example.com", 0)
            .set_flags(Flags::UP | Flags::UV)
            .to_vec()
    }

    #[test]
    fn none_attestation_object() {
        let object = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(auth_data()),
        })
        .expect("valid cbor");

        let decoded = AttestationObject::from_cbor(&encode(&object)).expect("should decode");
        assert_eq!(decoded.statement, AttestationStatement::None);
        assert_eq!(decoded.auth_data_bytes(), auth_data().as_slice());
        assert_eq!(decoded.auth_data.counter, 0);
    }

    #[test]
    fn unknown_format_is_kept() {
        let object = cbor!({
            "fmt" => "compound",
            "attStmt" => { "anything" => 1 },
            "authData" => Value::Bytes(auth_data()),
        })
        .expect("valid cbor");

        let decoded = AttestationObject::from_cbor(&encode(&object)).expect("should decode");
        assert_eq!(decoded.statement.format_identifier(), "compound");
        assert!(decoded.statement.format().is_none());
    }

    #[test]
    fn missing_members() {
        let object = cbor!({ "fmt" => "none", "attStmt" => {} }).expect("valid cbor");
        assert_eq!(
            AttestationObject::from_cbor(&encode(&object)),
            Err(DecodeError::MissingField("authData"))
        );

        let object = cbor!({ "fmt" => 3, "attStmt" => {}, "authData" => Value::Bytes(auth_data()) })
            .expect("valid cbor");
        assert_eq!(
            AttestationObject::from_cbor(&encode(&object)),
            Err(DecodeError::InvalidField("fmt"))
        );
    }

    #[test]
    fn not_cbor() {
        assert!(matches!(
            AttestationObject::from_cbor(&[0xff, 0x00]),
            Err(DecodeError::Cbor(_))
        ));
        assert!(matches!(
            AttestationObject::from_cbor(&encode(&Value::Integer(1.into()))),
            Err(DecodeError::Cbor(_))
        ));
    }

    #[test]
    fn short_auth_data() {
        let object = cbor!({
            "fmt" => "none",
            "attStmt" => {},
            "authData" => Value::Bytes(vec![0; 10]),
        })
        .expect("valid cbor");
        assert!(matches!(
            AttestationObject::from_cbor(&encode(&object)),
            Err(DecodeError::AuthenticatorData(_))
        ));
    }
}
