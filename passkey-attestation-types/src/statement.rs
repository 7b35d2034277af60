//! Attestation objects and the per-format attestation statements they carry.
//!
//! Decoding happens once, when the attestation object is received. Certificates, the SafetyNet
//! JWS and the TPM structures are parsed here, and every byte string later used as signature input
//! is kept exactly as received.
//!
//! <https://w3c.github.io/webauthn/#sctn-attestation>

mod certificate;
mod envelope;
mod object;
mod safetynet;
pub mod tpm;

use ciborium::value::Value;

pub use self::{
    certificate::{AttestationCertificate, CertificateError, CertificateExtension, CertificatePath},
    envelope::{EnvelopeError, EnvelopeHeader, SignedEnvelope},
    object::AttestationObject,
    safetynet::SafetyNetResponse,
};
use self::tpm::{TpmError, TpmsAttest, TpmtPublic};
use crate::{ctap2::AuthenticatorDataError, webauthn::AttestationStatementFormat};

/// Errors decoding an attestation object or statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not CBOR, or not the expected CBOR shape.
    #[error("attestation object is not valid CBOR: {0}")]
    Cbor(String),
    /// A required member is absent.
    #[error("`{0}` is missing")]
    MissingField(&'static str),
    /// A member has the wrong CBOR type.
    #[error("`{0}` has an unexpected type")]
    InvalidField(&'static str),
    /// The `none` statement must be an empty map.
    #[error("`none` attestation statement is not empty")]
    UnexpectedFields,
    /// The authenticator data is malformed.
    #[error(transparent)]
    AuthenticatorData(#[from] AuthenticatorDataError),
    /// A certificate is malformed.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    /// The SafetyNet JWS is malformed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// A TPM structure is malformed.
    #[error(transparent)]
    Tpm(#[from] TpmError),
}

/// `packed` attestation statement.
///
/// <https://w3c.github.io/webauthn/#sctn-packed-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct PackedStatement {
    /// COSE algorithm of `sig`.
    pub alg: i64,
    /// Signature over `authData || clientDataHash`.
    pub sig: Vec<u8>,
    /// Attestation certificate path. Absent for self attestation.
    pub x5c: Option<CertificatePath>,
    /// ECDAA key identifier, never accepted.
    pub ecdaa_key_id: Option<Vec<u8>>,
}

/// `tpm` attestation statement.
///
/// <https://w3c.github.io/webauthn/#sctn-tpm-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct TpmStatement {
    /// TPM specification version, `2.0`.
    pub ver: String,
    /// COSE algorithm of `sig`.
    pub alg: i64,
    /// AIK certificate path.
    pub x5c: CertificatePath,
    /// Signature over `certInfo`.
    pub sig: Vec<u8>,
    /// The signed `TPMS_ATTEST`.
    pub cert_info: TpmsAttest,
    /// `TPMT_PUBLIC` of the credential key.
    pub pub_area: TpmtPublic,
}

/// `android-key` attestation statement.
///
/// <https://w3c.github.io/webauthn/#sctn-android-key-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AndroidKeyStatement {
    /// COSE algorithm of `sig`.
    pub alg: i64,
    /// Signature over `authData || clientDataHash`.
    pub sig: Vec<u8>,
    /// Keystore certificate path.
    pub x5c: CertificatePath,
}

/// `android-safetynet` attestation statement. Its certificate path is the `x5c` header of the
/// response.
///
/// <https://w3c.github.io/webauthn/#sctn-android-safetynet-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AndroidSafetyNetStatement {
    /// Version of Google Play Services responsible for the SafetyNet API.
    pub ver: String,
    /// The signed SafetyNet response.
    pub response: SignedEnvelope<SafetyNetResponse>,
}

/// `fido-u2f` attestation statement.
///
/// <https://w3c.github.io/webauthn/#sctn-fido-u2f-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct FidoU2fStatement {
    /// DER ECDSA signature over the U2F registration data.
    pub sig: Vec<u8>,
    /// Exactly one attestation certificate.
    pub x5c: CertificatePath,
}

/// `apple` anonymous attestation statement.
///
/// <https://w3c.github.io/webauthn/#sctn-apple-anonymous-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AppleStatement {
    /// Credential certificate path.
    pub x5c: CertificatePath,
}

/// An attestation statement of any format.
///
/// Formats this crate does not know decode to [`AttestationStatement::Unsupported`] so that the
/// decision to reject them is left to the verifier.
#[derive(Debug, Clone, PartialEq)]
pub enum AttestationStatement {
    /// `packed`
    Packed(PackedStatement),
    /// `tpm`
    Tpm(TpmStatement),
    /// `android-key`
    AndroidKey(AndroidKeyStatement),
    /// `android-safetynet`
    AndroidSafetyNet(AndroidSafetyNetStatement),
    /// `fido-u2f`
    FidoU2f(FidoU2fStatement),
    /// `apple`
    Apple(AppleStatement),
    /// `none`
    None,
    /// Any other `fmt`.
    Unsupported {
        /// The `fmt` value.
        format: String,
    },
}

impl AttestationStatement {
    /// The format, or `None` for [`AttestationStatement::Unsupported`].
    pub fn format(&self) -> Option<AttestationStatementFormat> {
        let format = match self {
            Self::Packed(_) => AttestationStatementFormat::Packed,
            Self::Tpm(_) => AttestationStatementFormat::Tpm,
            Self::AndroidKey(_) => AttestationStatementFormat::AndroidKey,
            Self::AndroidSafetyNet(_) => AttestationStatementFormat::AndroidSafetyNet,
            Self::FidoU2f(_) => AttestationStatementFormat::FidoU2f,
            Self::Apple(_) => AttestationStatementFormat::Apple,
            Self::None => AttestationStatementFormat::None,
            Self::Unsupported { .. } => return None,
        };
        Some(format)
    }

    /// The `fmt` identifier as received.
    pub fn format_identifier(&self) -> &str {
        match self {
            Self::Unsupported { format } => format,
            other => other.format().map(<&'static str>::from).unwrap_or_default(),
        }
    }

    /// The certificate path, end-entity first, for formats with certificate based proofs.
    ///
    /// `None` for `none`, for `packed` self attestation and for a SafetyNet response without an
    /// `x5c` header.
    pub fn certificate_path(&self) -> Option<&CertificatePath> {
        match self {
            Self::Packed(stmt) => stmt.x5c.as_ref(),
            Self::Tpm(stmt) => Some(&stmt.x5c),
            Self::AndroidKey(stmt) => Some(&stmt.x5c),
            Self::AndroidSafetyNet(stmt) => stmt.response.header().x5c.as_ref(),
            Self::FidoU2f(stmt) => Some(&stmt.x5c),
            Self::Apple(stmt) => Some(&stmt.x5c),
            Self::None | Self::Unsupported { .. } => None,
        }
    }

    /// Decode the `attStmt` map for the given `fmt`.
    pub fn from_cbor(fmt: &str, att_stmt: Value) -> Result<Self, DecodeError> {
        let Ok(format) = fmt.parse::<AttestationStatementFormat>() else {
            log::debug!("attestation format {fmt:?} is not known");
            return Ok(Self::Unsupported {
                format: fmt.to_owned(),
            });
        };
        let map = StatementMap::new(att_stmt)?;

        let statement = match format {
            AttestationStatementFormat::Packed => Self::Packed(PackedStatement {
                alg: map.int("alg")?,
                sig: map.bytes("sig")?,
                x5c: map.optional_certificates("x5c")?,
                ecdaa_key_id: map.optional_bytes("ecdaaKeyId")?,
            }),
            AttestationStatementFormat::Tpm => Self::Tpm(TpmStatement {
                ver: map.text("ver")?,
                alg: map.int("alg")?,
                x5c: map.certificates("x5c")?,
                sig: map.bytes("sig")?,
                cert_info: TpmsAttest::from_slice(&map.bytes("certInfo")?)?,
                pub_area: TpmtPublic::from_slice(&map.bytes("pubArea")?)?,
            }),
            AttestationStatementFormat::AndroidKey => Self::AndroidKey(AndroidKeyStatement {
                alg: map.int("alg")?,
                sig: map.bytes("sig")?,
                x5c: map.certificates("x5c")?,
            }),
            AttestationStatementFormat::AndroidSafetyNet => {
                let response = map.bytes("response")?;
                let response = std::str::from_utf8(&response)
                    .map_err(|_| DecodeError::InvalidField("response"))?;
                Self::AndroidSafetyNet(AndroidSafetyNetStatement {
                    ver: map.text("ver")?,
                    response: SignedEnvelope::parse(response)?,
                })
            }
            AttestationStatementFormat::FidoU2f => Self::FidoU2f(FidoU2fStatement {
                sig: map.bytes("sig")?,
                x5c: map.certificates("x5c")?,
            }),
            AttestationStatementFormat::Apple => Self::Apple(AppleStatement {
                x5c: map.certificates("x5c")?,
            }),
            AttestationStatementFormat::None if map.is_empty() => Self::None,
            AttestationStatementFormat::None => return Err(DecodeError::UnexpectedFields),
        };
        Ok(statement)
    }
}

/// The `attStmt` map, keyed by text strings.
struct StatementMap(Vec<(Value, Value)>);

impl StatementMap {
    fn new(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Map(entries) => Ok(Self(entries)),
            _ => Err(DecodeError::InvalidField("attStmt")),
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    fn required(&self, key: &'static str) -> Result<&Value, DecodeError> {
        self.get(key).ok_or(DecodeError::MissingField(key))
    }

    fn int(&self, key: &'static str) -> Result<i64, DecodeError> {
        self.required(key)?
            .as_integer()
            .and_then(|i| i64::try_from(i).ok())
            .ok_or(DecodeError::InvalidField(key))
    }

    fn text(&self, key: &'static str) -> Result<String, DecodeError> {
        self.required(key)?
            .as_text()
            .map(str::to_owned)
            .ok_or(DecodeError::InvalidField(key))
    }

    fn bytes(&self, key: &'static str) -> Result<Vec<u8>, DecodeError> {
        self.required(key)?
            .as_bytes()
            .cloned()
            .ok_or(DecodeError::InvalidField(key))
    }

    fn optional_bytes(&self, key: &'static str) -> Result<Option<Vec<u8>>, DecodeError> {
        match self.get(key) {
            Some(_) => self.bytes(key).map(Some),
            None => Ok(None),
        }
    }

    fn certificates(&self, key: &'static str) -> Result<CertificatePath, DecodeError> {
        let entries = self
            .required(key)?
            .as_array()
            .ok_or(DecodeError::InvalidField(key))?;
        let der = entries
            .iter()
            .map(|entry| entry.as_bytes().map(Vec::as_slice))
            .collect::<Option<Vec<_>>>()
            .ok_or(DecodeError::InvalidField(key))?;
        Ok(CertificatePath::from_der_list(der)?)
    }

    fn optional_certificates(
        &self,
        key: &'static str,
    ) -> Result<Option<CertificatePath>, DecodeError> {
        match self.get(key) {
            Some(_) => self.certificates(key).map(Some),
            None => Ok(None),
        }
    }
}
