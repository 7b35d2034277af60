//! Digests, public keys and signature verification used by the attestation formats.
//!
//! Every verification builds its own verifying key from the stored public key, no hashing or
//! verifier state is shared between calls.

use coset::{iana, iana::EnumI64, CoseKey, Label, RegisteredLabel};
use p256::{
    ecdsa::{signature::Verifier as _, Signature as EcdsaSignature, VerifyingKey as EcdsaKey},
    elliptic_curve::{
        generic_array::GenericArray,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        subtle::ConstantTimeEq,
    },
    EncodedPoint,
};
use rsa::{
    pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey},
    BigUint, RsaPublicKey,
};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Errors building keys or checking signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The COSE or JWS algorithm is not supported.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),
    /// The key material could not be decoded.
    #[error("invalid public key")]
    InvalidKey,
    /// The algorithm does not apply to this kind of key.
    #[error("algorithm {0} does not match the key type")]
    AlgorithmKeyMismatch(String),
    /// The signature bytes are not a well formed signature.
    #[error("malformed signature")]
    MalformedSignature,
    /// The signature does not verify.
    #[error("signature verification failed")]
    BadSignature,
}

/// Compute the SHA-256 of the given `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compare two byte strings in constant time. Slices of different lengths are never equal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Hash functions the attestation formats bind data with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// The hash a COSE signature algorithm uses.
    pub fn for_cose(alg: iana::Algorithm) -> Option<Self> {
        match alg {
            iana::Algorithm::ES256 | iana::Algorithm::RS256 | iana::Algorithm::PS256 => {
                Some(Self::Sha256)
            }
            iana::Algorithm::ES384 | iana::Algorithm::RS384 | iana::Algorithm::PS384 => {
                Some(Self::Sha384)
            }
            iana::Algorithm::ES512 | iana::Algorithm::RS512 | iana::Algorithm::PS512 => {
                Some(Self::Sha512)
            }
            _ => None,
        }
    }

    /// Hash `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Convert a COSE algorithm identifier, as carried in `alg` fields of statements.
pub fn cose_algorithm(alg: i64) -> Result<iana::Algorithm, CryptoError> {
    iana::Algorithm::from_i64(alg).ok_or_else(|| CryptoError::UnsupportedAlgorithm(alg.to_string()))
}

/// How an ECDSA signature is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EcdsaEncoding {
    /// ASN.1 DER `SEQUENCE { r, s }`, used by CTAP and X.509.
    Der,
    /// Fixed width `r || s`, used by JWS.
    Fixed,
}

/// A public key able to verify attestation signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// NIST P-256
    P256(p256::PublicKey),
    /// RSA of any modulus size
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`, such as the one of an X.509 certificate.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(key) = <p256::PublicKey as p256::pkcs8::DecodePublicKey>::from_public_key_der(der)
        {
            return Ok(Self::P256(key));
        }
        <RsaPublicKey as rsa::pkcs8::DecodePublicKey>::from_public_key_der(der)
            .map(Self::Rsa)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// Decode a COSE credential public key. Only P-256 EC2 keys and RSA keys are supported.
    pub fn from_cose_key(key: &CoseKey) -> Result<Self, CryptoError> {
        match key.kty {
            RegisteredLabel::Assigned(iana::KeyType::EC2) => {
                let crv = cose_param(key, iana::Ec2KeyParameter::Crv.to_i64())
                    .and_then(|v| v.as_integer())
                    .and_then(|i| i64::try_from(i).ok());
                if crv != Some(iana::EllipticCurve::P_256.to_i64()) {
                    return Err(CryptoError::InvalidKey);
                }
                let x = cose_bytes(key, iana::Ec2KeyParameter::X.to_i64())?;
                let y = cose_bytes(key, iana::Ec2KeyParameter::Y.to_i64())?;
                Self::from_p256_coordinates(x, y)
            }
            RegisteredLabel::Assigned(iana::KeyType::RSA) => {
                let n = cose_bytes(key, iana::RsaKeyParameter::N.to_i64())?;
                let e = cose_bytes(key, iana::RsaKeyParameter::E.to_i64())?;
                Self::from_rsa_components(n, e)
            }
            _ => Err(CryptoError::InvalidKey),
        }
    }

    /// Build a P-256 key from its affine coordinates.
    pub fn from_p256_coordinates(x: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        let point = EncodedPoint::from_affine_coordinates(
            GenericArray::from_slice(x),
            GenericArray::from_slice(y),
            false,
        );
        Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(&point))
            .map(Self::P256)
            .ok_or(CryptoError::InvalidKey)
    }

    /// Build an RSA key from its big-endian modulus and exponent.
    pub fn from_rsa_components(n: &[u8], e: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map(Self::Rsa)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// The 65 byte uncompressed SEC1 encoding of a P-256 key.
    pub fn to_uncompressed_point(&self) -> Option<Vec<u8>> {
        match self {
            Self::P256(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            Self::Rsa(_) => None,
        }
    }

    /// Verify a signature as produced by authenticators: ECDSA signatures are DER encoded.
    pub fn verify(
        &self,
        alg: iana::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        self.verify_with(alg, data, signature, EcdsaEncoding::Der)
    }

    /// Verify a JWS signature, where ECDSA signatures are the fixed width `r || s`.
    pub fn verify_jws(&self, alg: &str, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let alg = match alg {
            "ES256" => iana::Algorithm::ES256,
            "RS256" => iana::Algorithm::RS256,
            "RS384" => iana::Algorithm::RS384,
            "RS512" => iana::Algorithm::RS512,
            other => return Err(CryptoError::UnsupportedAlgorithm(other.to_owned())),
        };
        self.verify_with(alg, data, signature, EcdsaEncoding::Fixed)
    }

    fn verify_with(
        &self,
        alg: iana::Algorithm,
        data: &[u8],
        signature: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<(), CryptoError> {
        match (self, alg) {
            (Self::P256(key), iana::Algorithm::ES256) => {
                let signature = match encoding {
                    EcdsaEncoding::Der => EcdsaSignature::from_der(signature),
                    EcdsaEncoding::Fixed => EcdsaSignature::from_slice(signature),
                }
                .map_err(|_| CryptoError::MalformedSignature)?;
                EcdsaKey::from(key)
                    .verify(data, &signature)
                    .map_err(|_| CryptoError::BadSignature)
            }
            (
                Self::Rsa(key),
                iana::Algorithm::RS256 | iana::Algorithm::RS384 | iana::Algorithm::RS512,
            ) => {
                let signature = RsaSignature::try_from(signature)
                    .map_err(|_| CryptoError::MalformedSignature)?;
                let key = key.clone();
                match alg {
                    iana::Algorithm::RS384 => {
                        RsaVerifyingKey::<Sha384>::new(key).verify(data, &signature)
                    }
                    iana::Algorithm::RS512 => {
                        RsaVerifyingKey::<Sha512>::new(key).verify(data, &signature)
                    }
                    _ => RsaVerifyingKey::<Sha256>::new(key).verify(data, &signature),
                }
                .map_err(|_| CryptoError::BadSignature)
            }
            (
                _,
                iana::Algorithm::ES256
                | iana::Algorithm::RS256
                | iana::Algorithm::RS384
                | iana::Algorithm::RS512,
            ) => Err(CryptoError::AlgorithmKeyMismatch(format!("{alg:?}"))),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("{alg:?}"))),
        }
    }
}

fn cose_param(key: &CoseKey, label: i64) -> Option<&ciborium::value::Value> {
    key.params
        .iter()
        .find(|(l, _)| *l == Label::Int(label))
        .map(|(_, value)| value)
}

fn cose_bytes(key: &CoseKey, label: i64) -> Result<&[u8], CryptoError> {
    cose_param(key, label)
        .and_then(|v| v.as_bytes())
        .map(Vec::as_slice)
        .ok_or(CryptoError::InvalidKey)
}

/// The COSE algorithm a credential key declares, if any.
pub fn cose_key_algorithm(key: &CoseKey) -> Option<iana::Algorithm> {
    match key.alg {
        Some(coset::Algorithm::Assigned(alg)) => Some(alg),
        _ => None,
    }
}

/// Whether the COSE key is of the given key type.
pub fn is_key_type(key: &CoseKey, kty: iana::KeyType) -> bool {
    key.kty == RegisteredLabel::Assigned(kty)
}

#[cfg(test)]
mod tests;
