//! Authenticator extension inputs, the CBOR counterpart of
//! [`AuthenticationExtensionsClientInputs`](crate::webauthn::AuthenticationExtensionsClientInputs).
//!
//! <https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-defined-extensions>

use ciborium::value::{Integer, Value};
use indexmap::IndexMap;
use serde::{de::Error as _, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

use crate::webauthn::{CredentialProtectionPolicy, ExtensionInputError};

/// A single authenticator extension input.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticatorExtensionInput {
    /// `uvm`
    Uvm(bool),
    /// `credProtect`, carried as its byte code.
    CredProtect(CredentialProtectionPolicy),
    /// Any extension this crate does not know about, kept as received.
    Unknown(Value),
}

impl AuthenticatorExtensionInput {
    /// The well-known authenticator extension identifiers.
    pub const KNOWN_KEYS: [&'static str; 2] = ["uvm", "credProtect"];

    /// Route a raw CBOR value into the variant its identifier requires.
    pub fn from_cbor(key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        let input = match key {
            "uvm" => Self::Uvm(
                value
                    .as_bool()
                    .ok_or_else(|| ExtensionInputError::new(key, "a boolean"))?,
            ),
            "credProtect" => Self::CredProtect(
                value
                    .as_integer()
                    .and_then(|i| u8::try_from(i).ok())
                    .and_then(|code| CredentialProtectionPolicy::try_from(code).ok())
                    .ok_or_else(|| ExtensionInputError::new(key, "a policy code between 1 and 3"))?,
            ),
            _ => Self::Unknown(value),
        };
        Ok(input)
    }

    /// The CBOR form of this input.
    pub fn to_cbor(&self) -> Value {
        match self {
            Self::Uvm(b) => Value::Bool(*b),
            Self::CredProtect(policy) => Value::Integer(Integer::from(u8::from(*policy))),
            Self::Unknown(value) => value.clone(),
        }
    }
}

/// Authenticator extension inputs keyed by identifier in insertion order.
///
/// A well-known identifier is always stored in its typed form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticationExtensionsAuthenticatorInputs {
    inputs: IndexMap<String, AuthenticatorExtensionInput>,
}

impl AuthenticationExtensionsAuthenticatorInputs {
    /// Start building the inputs of a registration ceremony.
    pub fn registration() -> RegistrationAuthenticatorInputsBuilder {
        RegistrationAuthenticatorInputsBuilder::default()
    }

    /// Start building the inputs of an authentication ceremony.
    pub fn authentication() -> AuthenticationAuthenticatorInputsBuilder {
        AuthenticationAuthenticatorInputsBuilder::default()
    }

    /// Every identifier present, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    /// The identifiers that are not well-known.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, v)| matches!(v, AuthenticatorExtensionInput::Unknown(_)))
            .map(|(k, _)| k.as_str())
    }

    /// Look up any input by identifier.
    pub fn get(&self, key: &str) -> Option<&AuthenticatorExtensionInput> {
        self.inputs.get(key)
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// `uvm`
    pub fn uvm(&self) -> Option<bool> {
        match self.get("uvm")? {
            AuthenticatorExtensionInput::Uvm(b) => Some(*b),
            _ => None,
        }
    }

    /// `credProtect`
    pub fn cred_protect(&self) -> Option<CredentialProtectionPolicy> {
        match self.get("credProtect")? {
            AuthenticatorExtensionInput::CredProtect(p) => Some(*p),
            _ => None,
        }
    }

    fn insert(&mut self, key: &str, value: Value) -> Result<(), ExtensionInputError> {
        let input = AuthenticatorExtensionInput::from_cbor(key, value)?;
        self.inputs.insert(key.to_owned(), input);
        Ok(())
    }
}

impl Serialize for AuthenticationExtensionsAuthenticatorInputs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inputs.len()))?;
        for (key, input) in &self.inputs {
            map.serialize_entry(key, &input.to_cbor())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AuthenticationExtensionsAuthenticatorInputs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut inputs = Self::default();
        for (key, value) in raw {
            inputs.insert(&key, value).map_err(D::Error::custom)?;
        }
        Ok(inputs)
    }
}

/// Builder for the authenticator extension inputs of a registration ceremony.
#[derive(Debug, Default)]
pub struct RegistrationAuthenticatorInputsBuilder {
    inputs: AuthenticationExtensionsAuthenticatorInputs,
}

impl RegistrationAuthenticatorInputsBuilder {
    /// Set `uvm`.
    pub fn uvm(mut self, uvm: bool) -> Self {
        self.inputs
            .inputs
            .insert("uvm".to_owned(), AuthenticatorExtensionInput::Uvm(uvm));
        self
    }

    /// Set `credProtect`.
    pub fn cred_protect(mut self, policy: CredentialProtectionPolicy) -> Self {
        self.inputs.inputs.insert(
            "credProtect".to_owned(),
            AuthenticatorExtensionInput::CredProtect(policy),
        );
        self
    }

    /// Set any input by identifier. Well-known identifiers must carry a value of their type.
    pub fn set(mut self, key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        self.inputs.insert(key, value)?;
        Ok(self)
    }

    /// Freeze the inputs.
    pub fn build(self) -> AuthenticationExtensionsAuthenticatorInputs {
        self.inputs
    }
}

/// Builder for the authenticator extension inputs of an authentication ceremony.
///
/// `credProtect` only applies to registration and is refused here.
#[derive(Debug, Default)]
pub struct AuthenticationAuthenticatorInputsBuilder {
    inputs: AuthenticationExtensionsAuthenticatorInputs,
}

impl AuthenticationAuthenticatorInputsBuilder {
    /// Set `uvm`.
    pub fn uvm(mut self, uvm: bool) -> Self {
        self.inputs
            .inputs
            .insert("uvm".to_owned(), AuthenticatorExtensionInput::Uvm(uvm));
        self
    }

    /// Set any input by identifier. Well-known identifiers must carry a value of their type and
    /// `credProtect` is rejected.
    pub fn set(mut self, key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        if key == "credProtect" {
            return Err(ExtensionInputError::new(key, "a registration ceremony"));
        }
        self.inputs.insert(key, value)?;
        Ok(self)
    }

    /// Freeze the inputs.
    pub fn build(self) -> AuthenticationExtensionsAuthenticatorInputs {
        self.inputs
    }
}

#[cfg(test)]
mod tests {
    use ciborium::cbor;

    use super::*;

    #[test]
    fn cred_protect_travels_as_byte_code() {
        let inputs = AuthenticationExtensionsAuthenticatorInputs::registration()
            .cred_protect(CredentialProtectionPolicy::UserVerificationOptionalWithCredentialIdList)
            .build();

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&inputs, &mut encoded).expect("serializable");
        let value: Value = ciborium::de::from_reader(encoded.as_slice()).expect("valid cbor");

        assert_eq!(value, cbor!({ "credProtect" => 2 }).unwrap());
    }

    #[test]
    fn decoded_map_routes_known_and_unknown_keys() {
        let raw = cbor!({ "hmac-secret" => true, "credProtect" => 3, "uvm" => true }).unwrap();
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&raw, &mut encoded).expect("serializable");

        let inputs: AuthenticationExtensionsAuthenticatorInputs =
            ciborium::de::from_reader(encoded.as_slice()).expect("valid inputs");

        assert_eq!(
            inputs.cred_protect(),
            Some(CredentialProtectionPolicy::UserVerificationRequired)
        );
        assert_eq!(inputs.uvm(), Some(true));
        assert_eq!(inputs.unknown_keys().collect::<Vec<_>>(), ["hmac-secret"]);
        assert_eq!(
            inputs.keys().collect::<Vec<_>>(),
            ["hmac-secret", "credProtect", "uvm"]
        );
    }

    #[test]
    fn out_of_range_policy_is_rejected() {
        AuthenticationExtensionsAuthenticatorInputs::registration()
            .set("credProtect", Value::Integer(Integer::from(9u8)))
            .expect_err("9 is not a policy");
    }

    #[test]
    fn authentication_inputs_refuse_cred_protect() {
        let err = AuthenticationExtensionsAuthenticatorInputs::authentication()
            .uvm(true)
            .set("credProtect", Value::Integer(Integer::from(3u8)))
            .expect_err("credProtect is registration only");
        assert_eq!(err.key, "credProtect");

        let inputs = AuthenticationExtensionsAuthenticatorInputs::authentication()
            .uvm(true)
            .set("hmac-secret", Value::Bool(true))
            .expect("unknown inputs pass through")
            .build();
        assert_eq!(inputs.cred_protect(), None);
        assert_eq!(inputs.keys().collect::<Vec<_>>(), ["uvm", "hmac-secret"]);
    }
}
