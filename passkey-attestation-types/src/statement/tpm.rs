//! The TPM 2.0 structures a `tpm` attestation statement carries: `TPMS_ATTEST` in `certInfo` and
//! `TPMT_PUBLIC` in `pubArea`.
//!
//! All integers are big-endian. Both structures keep their raw bytes, since the signature covers
//! `certInfo` as received and the attested name hashes `pubArea` as received.
//!
//! <https://trustedcomputinggroup.org/resource/tpm-library-specification/>

use std::io::{Cursor, Read};

use crate::crypto::{HashAlgorithm, PublicKey};

/// `TPM_GENERATED_VALUE`, the magic of every structure the TPM signs.
pub const TPM_GENERATED_VALUE: u32 = 0xff54_4347;

/// `TPM_ST_ATTEST_CERTIFY`
pub const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

/// Default RSA public exponent, encoded as 0 in `TPMS_RSA_PARMS`.
const DEFAULT_RSA_EXPONENT: u32 = 65_537;

/// Errors decoding TPM structures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TpmError {
    /// Input ended early.
    #[error("TPM structure is truncated")]
    Truncated,
    /// Bytes remain after the structure.
    #[error("TPM structure is followed by {0} trailing bytes")]
    TrailingData(usize),
    /// An algorithm identifier this crate does not handle.
    #[error("unsupported TPM algorithm {0:#06x}")]
    UnsupportedAlgorithm(u16),
    /// An elliptic curve other than NIST P-256.
    #[error("unsupported TPM curve {0:#06x}")]
    UnsupportedCurve(u16),
    /// Key material that does not form a public key.
    #[error("TPM public area holds an invalid key")]
    InvalidKey,
}

repr_enum! {
    /// `TPM_ALG_ID` values used by attestation.
    TpmAlgorithm: u16 {
        /// `TPM_ALG_RSA`
        Rsa: 0x0001,
        /// `TPM_ALG_SHA1`
        Sha1: 0x0004,
        /// `TPM_ALG_SHA256`
        Sha256: 0x000B,
        /// `TPM_ALG_SHA384`
        Sha384: 0x000C,
        /// `TPM_ALG_SHA512`
        Sha512: 0x000D,
        /// `TPM_ALG_NULL`
        Null: 0x0010,
        /// `TPM_ALG_ECC`
        Ecc: 0x0023,
    }
}

impl TpmAlgorithm {
    fn hash_algorithm(self) -> Result<HashAlgorithm, TpmError> {
        match self {
            Self::Sha256 => Ok(HashAlgorithm::Sha256),
            Self::Sha384 => Ok(HashAlgorithm::Sha384),
            Self::Sha512 => Ok(HashAlgorithm::Sha512),
            other => Err(TpmError::UnsupportedAlgorithm(u16::from(other))),
        }
    }
}

/// `TPM_ECC_NIST_P256`
const TPM_ECC_NIST_P256: u16 = 0x0003;

struct TpmReader<'a>(Cursor<&'a [u8]>);

impl<'a> TpmReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self(Cursor::new(data))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TpmError> {
        let mut buf = [0; N];
        self.0.read_exact(&mut buf).map_err(|_| TpmError::Truncated)?;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, TpmError> {
        self.array::<1>().map(|[b]| b)
    }

    fn u16(&mut self) -> Result<u16, TpmError> {
        self.array().map(u16::from_be_bytes)
    }

    fn u32(&mut self) -> Result<u32, TpmError> {
        self.array().map(u32::from_be_bytes)
    }

    fn u64(&mut self) -> Result<u64, TpmError> {
        self.array().map(u64::from_be_bytes)
    }

    /// A `TPM2B_*`: a u16 size followed by that many bytes.
    fn sized(&mut self) -> Result<Vec<u8>, TpmError> {
        let mut buf = vec![0; usize::from(self.u16()?)];
        self.0.read_exact(&mut buf).map_err(|_| TpmError::Truncated)?;
        Ok(buf)
    }

    fn finish(self) -> Result<(), TpmError> {
        let consumed = usize::try_from(self.0.position()).unwrap_or(usize::MAX);
        match self.0.get_ref().len().saturating_sub(consumed) {
            0 => Ok(()),
            rest => Err(TpmError::TrailingData(rest)),
        }
    }
}

/// `TPMS_CLOCK_INFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpmsClockInfo {
    /// Milliseconds the TPM has been powered.
    pub clock: u64,
    /// TPM resets since the last clear.
    pub reset_count: u32,
    /// Restarts since the last reset.
    pub restart_count: u32,
    /// Whether `clock` is guaranteed not to have gone backwards.
    pub safe: bool,
}

/// `TPMS_CERTIFY_INFO`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmsCertifyInfo {
    /// Name of the certified object: `nameAlg || H(pubArea)`.
    pub name: Vec<u8>,
    /// Qualified name of the certified object.
    pub qualified_name: Vec<u8>,
}

/// `TPMS_ATTEST`, the structure the attestation identity key signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmsAttest {
    raw: Vec<u8>,
    /// Must be [`TPM_GENERATED_VALUE`].
    pub magic: u32,
    /// Must be [`TPM_ST_ATTEST_CERTIFY`] for WebAuthn.
    pub attest_type: u16,
    /// Qualified name of the signing key.
    pub qualified_signer: Vec<u8>,
    /// Caller supplied data: the hash of `authData || clientDataHash`.
    pub extra_data: Vec<u8>,
    /// Clock state when signing.
    pub clock_info: TpmsClockInfo,
    /// Vendor specific firmware version.
    pub firmware_version: u64,
    /// The attested content, decoded only when `attest_type` is [`TPM_ST_ATTEST_CERTIFY`].
    pub certify: Option<TpmsCertifyInfo>,
}

impl TpmsAttest {
    /// Decode `certInfo`.
    pub fn from_slice(data: &[u8]) -> Result<Self, TpmError> {
        let mut reader = TpmReader::new(data);
        let magic = reader.u32()?;
        let attest_type = reader.u16()?;
        let qualified_signer = reader.sized()?;
        let extra_data = reader.sized()?;
        let clock_info = TpmsClockInfo {
            clock: reader.u64()?,
            reset_count: reader.u32()?,
            restart_count: reader.u32()?,
            safe: reader.u8()? != 0,
        };
        let firmware_version = reader.u64()?;

        let certify = if attest_type == TPM_ST_ATTEST_CERTIFY {
            let certify = TpmsCertifyInfo {
                name: reader.sized()?,
                qualified_name: reader.sized()?,
            };
            reader.finish()?;
            Some(certify)
        } else {
            None
        };

        Ok(Self {
            raw: data.to_vec(),
            magic,
            attest_type,
            qualified_signer,
            extra_data,
            clock_info,
            firmware_version,
            certify,
        })
    }

    /// The structure as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// `TPMU_PUBLIC_PARMS` for the key types WebAuthn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpmPublicParameters {
    /// `TPMS_RSA_PARMS`
    Rsa {
        /// Symmetric algorithm, `TPM_ALG_NULL` for signing keys.
        symmetric: u16,
        /// Signing scheme.
        scheme: u16,
        /// Modulus size.
        key_bits: u16,
        /// Public exponent, 0 meaning 65537.
        exponent: u32,
    },
    /// `TPMS_ECC_PARMS`
    Ecc {
        /// Symmetric algorithm, `TPM_ALG_NULL` for signing keys.
        symmetric: u16,
        /// Signing scheme.
        scheme: u16,
        /// `TPM_ECC_CURVE`
        curve_id: u16,
        /// Key derivation function.
        kdf: u16,
    },
}

/// `TPMU_PUBLIC_ID`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmPublicUnique {
    /// RSA modulus.
    Rsa(Vec<u8>),
    /// ECC point.
    Ecc {
        /// X coordinate.
        x: Vec<u8>,
        /// Y coordinate.
        y: Vec<u8>,
    },
}

/// `TPMT_PUBLIC`, the public area of the credential key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmtPublic {
    raw: Vec<u8>,
    /// `TPM_ALG_RSA` or `TPM_ALG_ECC`.
    pub key_type: TpmAlgorithm,
    /// Hash algorithm of the object's name.
    pub name_alg: TpmAlgorithm,
    /// `TPMA_OBJECT` bits.
    pub object_attributes: u32,
    /// Authorization policy digest.
    pub auth_policy: Vec<u8>,
    /// Key parameters.
    pub parameters: TpmPublicParameters,
    /// The public key itself.
    pub unique: TpmPublicUnique,
}

impl TpmtPublic {
    /// Decode `pubArea`.
    pub fn from_slice(data: &[u8]) -> Result<Self, TpmError> {
        let mut reader = TpmReader::new(data);
        let key_type = algorithm(reader.u16()?)?;
        let name_alg = algorithm(reader.u16()?)?;
        let object_attributes = reader.u32()?;
        let auth_policy = reader.sized()?;

        let (parameters, unique) = match key_type {
            TpmAlgorithm::Rsa => {
                let parameters = TpmPublicParameters::Rsa {
                    symmetric: null_symmetric(reader.u16()?)?,
                    scheme: reader.u16()?,
                    key_bits: reader.u16()?,
                    exponent: reader.u32()?,
                };
                (parameters, TpmPublicUnique::Rsa(reader.sized()?))
            }
            TpmAlgorithm::Ecc => {
                let parameters = TpmPublicParameters::Ecc {
                    symmetric: null_symmetric(reader.u16()?)?,
                    scheme: reader.u16()?,
                    curve_id: reader.u16()?,
                    kdf: reader.u16()?,
                };
                let unique = TpmPublicUnique::Ecc {
                    x: reader.sized()?,
                    y: reader.sized()?,
                };
                (parameters, unique)
            }
            other => return Err(TpmError::UnsupportedAlgorithm(u16::from(other))),
        };
        reader.finish()?;

        Ok(Self {
            raw: data.to_vec(),
            key_type,
            name_alg,
            object_attributes,
            auth_policy,
            parameters,
            unique,
        })
    }

    /// The structure as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The TPM name of this object: `nameAlg || H_nameAlg(pubArea)`.
    pub fn name(&self) -> Result<Vec<u8>, TpmError> {
        let digest = self.name_alg.hash_algorithm()?.digest(&self.raw);
        let mut name = u16::from(self.name_alg).to_be_bytes().to_vec();
        name.extend_from_slice(&digest);
        Ok(name)
    }

    /// The public key held by the area.
    pub fn public_key(&self) -> Result<PublicKey, TpmError> {
        match (&self.parameters, &self.unique) {
            (TpmPublicParameters::Rsa { exponent, .. }, TpmPublicUnique::Rsa(modulus)) => {
                let exponent = match *exponent {
                    0 => DEFAULT_RSA_EXPONENT,
                    e => e,
                };
                PublicKey::from_rsa_components(modulus, &exponent.to_be_bytes())
                    .map_err(|_| TpmError::InvalidKey)
            }
            (TpmPublicParameters::Ecc { curve_id, .. }, TpmPublicUnique::Ecc { x, y }) => {
                if *curve_id != TPM_ECC_NIST_P256 {
                    return Err(TpmError::UnsupportedCurve(*curve_id));
                }
                PublicKey::from_p256_coordinates(x, y).map_err(|_| TpmError::InvalidKey)
            }
            _ => Err(TpmError::InvalidKey),
        }
    }
}

fn algorithm(id: u16) -> Result<TpmAlgorithm, TpmError> {
    TpmAlgorithm::try_from(id).map_err(|_| TpmError::UnsupportedAlgorithm(id))
}

fn null_symmetric(id: u16) -> Result<u16, TpmError> {
    if id == u16::from(TpmAlgorithm::Null) {
        Ok(id)
    } else {
        Err(TpmError::UnsupportedAlgorithm(id))
    }
}
