use std::io::{Cursor, Read};

use ciborium::value::Value;
use coset::{AsCborValue, CborSerializable, CoseKey};

use crate::{
    crypto::sha256,
    ctap2::{Aaguid, Flags},
};

/// Length of the fixed part of the authenticator data: RP ID hash, flags and counter.
const FIXED_LEN: usize = 32 + 1 + 4;

/// Errors decoding the authenticator data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticatorDataError {
    /// Fewer bytes than the fixed 37 byte prefix.
    #[error("authenticator data is {0} bytes, shorter than the 37 byte minimum")]
    TooShort(usize),
    /// The attested credential data ends before its declared content.
    #[error("attested credential data is truncated")]
    TruncatedCredentialData,
    /// The credential ID does not fit in the 16 bit length prefix.
    #[error("credential id of {0} bytes is too long")]
    CredentialIdTooLong(usize),
    /// The credential public key is not a COSE key.
    #[error("credential public key is not a valid COSE key")]
    InvalidCredentialKey,
    /// The extensions are not a CBOR map.
    #[error("authenticator extension data is not a CBOR map")]
    InvalidExtensions,
    /// Bytes remain after everything the flags announce.
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// The authenticator data embedded in an attestation object.
///
/// The relying party never re-encodes this structure for signature checks; the raw bytes are kept
/// next to it in the [`AttestationObject`](crate::statement::AttestationObject).
///
/// <https://w3c.github.io/webauthn/#sctn-authenticator-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    rp_id_hash: [u8; 32],

    /// The flags byte. See [Flags].
    pub flags: Flags,

    /// Signature counter.
    pub counter: u32,

    /// Present when [`Flags::AT`] is set, which it always is during registration.
    pub attested_credential_data: Option<AttestedCredentialData>,

    /// Authenticator extension outputs, a CBOR map keyed by extension identifier. Present when
    /// [`Flags::ED`] is set.
    pub extensions: Option<Value>,
}

impl AuthenticatorData {
    /// Authenticator data for an RP ID with the given counter and no optional parts.
    pub fn new(rp_id: &str, counter: u32) -> Self {
        Self {
            rp_id_hash: sha256(rp_id.as_bytes()),
            flags: Flags::UP,
            counter,
            attested_credential_data: None,
            extensions: None,
        }
    }

    /// Attach [`AttestedCredentialData`], setting [`Flags::AT`].
    pub fn set_attested_credential_data(mut self, acd: AttestedCredentialData) -> Self {
        self.attested_credential_data = Some(acd);
        self.set_flags(Flags::AT)
    }

    /// Attach authenticator extension outputs, setting [`Flags::ED`].
    pub fn set_extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self.set_flags(Flags::ED)
    }

    /// Set additional [`Flags`].
    pub fn set_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }

    /// SHA-256 of the RP ID the credential is scoped to.
    pub fn rp_id_hash(&self) -> &[u8; 32] {
        &self.rp_id_hash
    }

    /// Decode authenticator data.
    ///
    /// Every byte must be accounted for by the flags: trailing data is an error.
    pub fn from_slice(v: &[u8]) -> Result<Self, AuthenticatorDataError> {
        if v.len() < FIXED_LEN {
            return Err(AuthenticatorDataError::TooShort(v.len()));
        }

        let mut rp_id_hash = [0; 32];
        let mut counter = [0; 4];
        rp_id_hash.copy_from_slice(&v[..32]);
        let flags = Flags::from(v[32]);
        counter.copy_from_slice(&v[33..FIXED_LEN]);

        let mut reader = Cursor::new(&v[FIXED_LEN..]);
        let attested_credential_data = flags
            .contains(Flags::AT)
            .then(|| AttestedCredentialData::from_reader(&mut reader))
            .transpose()?;
        let extensions = flags
            .contains(Flags::ED)
            .then(|| match ciborium::de::from_reader(&mut reader) {
                Ok(map @ Value::Map(_)) => Ok(map),
                _ => Err(AuthenticatorDataError::InvalidExtensions),
            })
            .transpose()?;

        let remaining = reader.get_ref().len().saturating_sub(position(&reader));
        if remaining != 0 {
            return Err(AuthenticatorDataError::TrailingBytes(remaining));
        }

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            counter: u32::from_be_bytes(counter),
            attested_credential_data,
            extensions,
        })
    }

    /// Encode to the byte layout authenticators produce.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut flags = self.flags;
        flags.set(Flags::AT, self.attested_credential_data.is_some());
        flags.set(Flags::ED, self.extensions.is_some());

        let mut out = Vec::with_capacity(FIXED_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(flags.into());
        out.extend_from_slice(&self.counter.to_be_bytes());
        if let Some(acd) = &self.attested_credential_data {
            acd.write_to(&mut out);
        }
        if let Some(extensions) = &self.extensions {
            // SAFETY: writing into a Vec cannot fail with an IO error
            ciborium::ser::into_writer(extensions, &mut out).unwrap();
        }
        out
    }
}

fn position(reader: &Cursor<&[u8]>) -> usize {
    // the cursor never moves past the end of an in-memory slice
    usize::try_from(reader.position()).unwrap_or(usize::MAX)
}

/// The credential being registered: AAGUID, credential ID and COSE public key.
///
/// <https://w3c.github.io/webauthn/#attested-credential-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    /// The AAGUID of the authenticator.
    pub aaguid: Aaguid,

    credential_id: Vec<u8>,

    key: CoseKey,

    /// The key exactly as encoded by the authenticator.
    key_bytes: Vec<u8>,
}

impl AttestedCredentialData {
    /// Build attested credential data.
    ///
    /// # Error
    /// Fails if the credential ID is longer than `u16::MAX` or the key cannot be encoded.
    pub fn new(
        aaguid: Aaguid,
        credential_id: Vec<u8>,
        key: CoseKey,
    ) -> Result<Self, AuthenticatorDataError> {
        u16::try_from(credential_id.len())
            .map_err(|_| AuthenticatorDataError::CredentialIdTooLong(credential_id.len()))?;
        let key_bytes = key
            .clone()
            .to_vec()
            .map_err(|_| AuthenticatorDataError::InvalidCredentialKey)?;

        Ok(Self {
            aaguid,
            credential_id,
            key,
            key_bytes,
        })
    }

    /// The credential ID.
    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// The credential public key.
    pub fn key(&self) -> &CoseKey {
        &self.key
    }

    /// The credential public key as received.
    pub fn key_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.aaguid.as_bytes());
        // checked against u16::MAX on construction and parsing
        let len = u16::try_from(self.credential_id.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend_from_slice(&self.key_bytes);
    }

    fn from_reader(reader: &mut Cursor<&[u8]>) -> Result<Self, AuthenticatorDataError> {
        let mut aaguid = [0; Aaguid::LEN];
        let mut cred_len = [0; 2];
        reader
            .read_exact(&mut aaguid)
            .and_then(|_| reader.read_exact(&mut cred_len))
            .map_err(|_| AuthenticatorDataError::TruncatedCredentialData)?;

        let mut credential_id = vec![0; usize::from(u16::from_be_bytes(cred_len))];
        reader
            .read_exact(&mut credential_id)
            .map_err(|_| AuthenticatorDataError::TruncatedCredentialData)?;

        let start = position(reader);
        let value: Value = ciborium::de::from_reader(&mut *reader)
            .map_err(|_| AuthenticatorDataError::InvalidCredentialKey)?;
        let key_bytes = reader.get_ref()[start..position(reader)].to_vec();
        let key = CoseKey::from_cbor_value(value)
            .map_err(|_| AuthenticatorDataError::InvalidCredentialKey)?;

        Ok(Self {
            aaguid: Aaguid(aaguid),
            credential_id,
            key,
            key_bytes,
        })
    }
}
