use indexmap::IndexMap;
use serde::{de::Error as _, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// An extension input value did not have the type its identifier requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("extension `{key}` expects {expected}")]
pub struct ExtensionInputError {
    /// The extension identifier.
    pub key: String,
    /// Description of the accepted value.
    pub expected: &'static str,
}

impl ExtensionInputError {
    pub(crate) fn new(key: &str, expected: &'static str) -> Self {
        Self {
            key: key.to_owned(),
            expected,
        }
    }
}

repr_enum! {
    /// Credential protection level requested through the `credProtect` extension.
    ///
    /// Client inputs carry it as a string, authenticator inputs as its byte code.
    ///
    /// <https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-credProtect-extension>
    #[derive(Hash, Serialize, Deserialize, strum::EnumString, strum::IntoStaticStr, strum::Display)]
    CredentialProtectionPolicy: u8 {
        /// The credential can be used without user verification.
        #[serde(rename = "userVerificationOptional")]
        #[strum(serialize = "userVerificationOptional")]
        UserVerificationOptional: 0x01,
        /// Discovering the credential requires user verification, using it with its ID does not.
        #[serde(rename = "userVerificationOptionalWithCredentialIDList")]
        #[strum(serialize = "userVerificationOptionalWithCredentialIDList")]
        UserVerificationOptionalWithCredentialIdList: 0x02,
        /// Every use requires user verification.
        #[serde(rename = "userVerificationRequired")]
        #[strum(serialize = "userVerificationRequired")]
        UserVerificationRequired: 0x03,
    }
}

/// A single client extension input.
///
/// Well-known identifiers are held in their typed variant, everything else as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientExtensionInput {
    /// `appid`: the FIDO AppID to use for a U2F credential during authentication.
    AppId(String),
    /// `appidExclude`: a FIDO AppID whose credentials are excluded during registration.
    AppIdExclude(String),
    /// `uvm`: request the user verification methods used.
    Uvm(bool),
    /// `credProps`: request credential properties.
    CredProps(bool),
    /// `credentialProtectionPolicy`
    CredentialProtectionPolicy(CredentialProtectionPolicy),
    /// `enforceCredentialProtectionPolicy`
    EnforceCredentialProtectionPolicy(bool),
    /// Any extension this crate does not know about.
    Unknown(Value),
}

impl ClientExtensionInput {
    /// The well-known client extension identifiers.
    pub const KNOWN_KEYS: [&'static str; 6] = [
        "appid",
        "appidExclude",
        "uvm",
        "credProps",
        "credentialProtectionPolicy",
        "enforceCredentialProtectionPolicy",
    ];

    /// Route a raw JSON value into the variant its identifier requires.
    pub fn from_json(key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        let input = match key {
            "appid" => Self::AppId(as_string(key, value)?),
            "appidExclude" => Self::AppIdExclude(as_string(key, value)?),
            "uvm" => Self::Uvm(as_bool(key, value)?),
            "credProps" => Self::CredProps(as_bool(key, value)?),
            "credentialProtectionPolicy" => Self::CredentialProtectionPolicy(
                value
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| {
                        ExtensionInputError::new(key, "a credential protection policy")
                    })?,
            ),
            "enforceCredentialProtectionPolicy" => {
                Self::EnforceCredentialProtectionPolicy(as_bool(key, value)?)
            }
            _ => Self::Unknown(value),
        };
        Ok(input)
    }

    /// The JSON form of this input.
    pub fn to_json(&self) -> Value {
        match self {
            Self::AppId(s) | Self::AppIdExclude(s) => Value::String(s.clone()),
            Self::Uvm(b) | Self::CredProps(b) | Self::EnforceCredentialProtectionPolicy(b) => {
                Value::Bool(*b)
            }
            Self::CredentialProtectionPolicy(policy) => Value::String(policy.to_string()),
            Self::Unknown(value) => value.clone(),
        }
    }
}

fn as_bool(key: &str, value: Value) -> Result<bool, ExtensionInputError> {
    value
        .as_bool()
        .ok_or_else(|| ExtensionInputError::new(key, "a boolean"))
}

fn as_string(key: &str, value: Value) -> Result<String, ExtensionInputError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(ExtensionInputError::new(key, "a string")),
    }
}

/// The client extension inputs of a ceremony, keyed by extension identifier in insertion order.
///
/// A well-known identifier is always stored in its typed form and never as
/// [`ClientExtensionInput::Unknown`].
///
/// <https://w3c.github.io/webauthn/#dictdef-authenticationextensionsclientinputs>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticationExtensionsClientInputs {
    inputs: IndexMap<String, ClientExtensionInput>,
}

impl AuthenticationExtensionsClientInputs {
    /// Start building the inputs of a registration ceremony.
    pub fn registration() -> RegistrationClientInputsBuilder {
        RegistrationClientInputsBuilder::default()
    }

    /// Start building the inputs of an authentication ceremony.
    pub fn authentication() -> AuthenticationClientInputsBuilder {
        AuthenticationClientInputsBuilder::default()
    }

    /// Every identifier present, known and unknown, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    /// The identifiers that are not well-known.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, v)| matches!(v, ClientExtensionInput::Unknown(_)))
            .map(|(k, _)| k.as_str())
    }

    /// Look up any input by identifier.
    pub fn get(&self, key: &str) -> Option<&ClientExtensionInput> {
        self.inputs.get(key)
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// `appid`
    pub fn appid(&self) -> Option<&str> {
        match self.get("appid")? {
            ClientExtensionInput::AppId(s) => Some(s),
            _ => None,
        }
    }

    /// `appidExclude`
    pub fn appid_exclude(&self) -> Option<&str> {
        match self.get("appidExclude")? {
            ClientExtensionInput::AppIdExclude(s) => Some(s),
            _ => None,
        }
    }

    /// `uvm`
    pub fn uvm(&self) -> Option<bool> {
        match self.get("uvm")? {
            ClientExtensionInput::Uvm(b) => Some(*b),
            _ => None,
        }
    }

    /// `credProps`
    pub fn cred_props(&self) -> Option<bool> {
        match self.get("credProps")? {
            ClientExtensionInput::CredProps(b) => Some(*b),
            _ => None,
        }
    }

    /// `credentialProtectionPolicy`
    pub fn credential_protection_policy(&self) -> Option<CredentialProtectionPolicy> {
        match self.get("credentialProtectionPolicy")? {
            ClientExtensionInput::CredentialProtectionPolicy(p) => Some(*p),
            _ => None,
        }
    }

    /// `enforceCredentialProtectionPolicy`
    pub fn enforce_credential_protection_policy(&self) -> Option<bool> {
        match self.get("enforceCredentialProtectionPolicy")? {
            ClientExtensionInput::EnforceCredentialProtectionPolicy(b) => Some(*b),
            _ => None,
        }
    }

    fn insert(&mut self, key: &str, value: Value) -> Result<(), ExtensionInputError> {
        let input = ClientExtensionInput::from_json(key, value)?;
        self.inputs.insert(key.to_owned(), input);
        Ok(())
    }
}

impl Serialize for AuthenticationExtensionsClientInputs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inputs.len()))?;
        for (key, input) in &self.inputs {
            map.serialize_entry(key, &input.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AuthenticationExtensionsClientInputs {
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

/// Builder for the client extension inputs of a registration ceremony.
#[derive(Debug, Default)]
pub struct RegistrationClientInputsBuilder {
    inputs: AuthenticationExtensionsClientInputs,
}

impl RegistrationClientInputsBuilder {
    /// Set `appidExclude`.
    pub fn appid_exclude(self, appid: impl Into<String>) -> Self {
        self.put("appidExclude", ClientExtensionInput::AppIdExclude(appid.into()))
    }

    /// Set `uvm`.
    pub fn uvm(self, uvm: bool) -> Self {
        self.put("uvm", ClientExtensionInput::Uvm(uvm))
    }

    /// Set `credProps`.
    pub fn cred_props(self, cred_props: bool) -> Self {
        self.put("credProps", ClientExtensionInput::CredProps(cred_props))
    }

    /// Set `credentialProtectionPolicy`.
    pub fn credential_protection_policy(self, policy: CredentialProtectionPolicy) -> Self {
        self.put(
            "credentialProtectionPolicy",
            ClientExtensionInput::CredentialProtectionPolicy(policy),
        )
    }

    /// Set `enforceCredentialProtectionPolicy`.
    pub fn enforce_credential_protection_policy(self, enforce: bool) -> Self {
        self.put(
            "enforceCredentialProtectionPolicy",
            ClientExtensionInput::EnforceCredentialProtectionPolicy(enforce),
        )
    }

    /// Set any input by identifier. Well-known identifiers must carry a value of their type.
    pub fn set(mut self, key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        self.inputs.insert(key, value)?;
        Ok(self)
    }

    /// Freeze the inputs.
    pub fn build(self) -> AuthenticationExtensionsClientInputs {
        self.inputs
    }

    fn put(mut self, key: &str, input: ClientExtensionInput) -> Self {
        self.inputs.inputs.insert(key.to_owned(), input);
        self
    }
}

/// Builder for the client extension inputs of an authentication ceremony.
#[derive(Debug, Default)]
pub struct AuthenticationClientInputsBuilder {
    inputs: AuthenticationExtensionsClientInputs,
}

impl AuthenticationClientInputsBuilder {
    /// Set `appid`.
    pub fn appid(mut self, appid: impl Into<String>) -> Self {
        self.inputs
            .inputs
            .insert("appid".to_owned(), ClientExtensionInput::AppId(appid.into()));
        self
    }

    /// Set `uvm`.
    pub fn uvm(mut self, uvm: bool) -> Self {
        self.inputs
            .inputs
            .insert("uvm".to_owned(), ClientExtensionInput::Uvm(uvm));
        self
    }

    /// Set any input by identifier. Well-known identifiers must carry a value of their type.
    pub fn set(mut self, key: &str, value: Value) -> Result<Self, ExtensionInputError> {
        self.inputs.insert(key, value)?;
        Ok(self)
    }

    /// Freeze the inputs.
    pub fn build(self) -> AuthenticationExtensionsClientInputs {
        self.inputs
    }
}
