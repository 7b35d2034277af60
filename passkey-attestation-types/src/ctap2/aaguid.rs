use std::fmt;

use serde::{Deserialize, Serialize};

/// The 128-bit Authenticator Attestation GUID identifying an authenticator's make and model.
///
/// Attestation certificates may carry the same value in the `id-fido-gen-ce-aaguid` extension,
/// in which case it has to match the one found in the [`AttestedCredentialData`].
///
/// <https://w3c.github.io/webauthn/#aaguid>
///
/// [`AttestedCredentialData`]: super::AttestedCredentialData
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Aaguid(pub [u8; Self::LEN]);

impl Aaguid {
    /// Length of an AAGUID in bytes.
    pub const LEN: usize = 16;

    /// The all-zero AAGUID sent by authenticators doing self or no attestation.
    pub const fn new_empty() -> Self {
        Self([0; Self::LEN])
    }

    /// Whether this is the all-zero AAGUID.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; Self::LEN]
    }

    /// The raw bytes of the AAGUID.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Aaguid {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl From<[u8; Aaguid::LEN]> for Aaguid {
    fn from(inner: [u8; Aaguid::LEN]) -> Self {
        Aaguid(inner)
    }
}

impl TryFrom<&[u8]> for Aaguid {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        value.try_into().map(Aaguid)
    }
}

/// Formats as the canonical UUID string, `8-4-4-4-12` lowercase hex digits.
impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Aaguid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Aaguid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AaguidVisitor;
        impl serde::de::Visitor<'_> for AaguidVisitor {
            type Value = Aaguid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a byte string of {} bytes", Aaguid::LEN)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Aaguid::try_from(v).map_err(|_| E::invalid_length(v.len(), &self))
            }
        }
        deserializer.deserialize_bytes(AaguidVisitor)
    }
}
