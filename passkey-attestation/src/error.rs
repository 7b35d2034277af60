use passkey_attestation_types::{
    crypto::CryptoError,
    statement::{CertificateError, DecodeError},
    webauthn::AttestationStatementFormat,
};

/// Why an attestation statement was rejected.
///
/// Every validation stops at the first failed check, so an error always names exactly one reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationError {
    /// The statement is malformed: missing or ill-typed fields, an empty certificate path or an
    /// unsupported algorithm. Not necessarily malicious.
    #[error("malformed attestation statement: {0}")]
    Structural(#[from] StructuralError),

    /// The statement is well formed but rejected by operator configured policy.
    #[error("attestation statement rejected by policy: {0}")]
    Policy(#[from] PolicyError),

    /// The statement does not prove what it claims.
    #[error("attestation statement proof failed: {0}")]
    Proof(#[from] ProofError),

    /// The verifier was asked to handle a format it is not set up for.
    #[error("attestation verifier misconfigured: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// The category of an [`AttestationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AttestationError::Structural`].
    Structural,
    /// See [`AttestationError::Policy`].
    Policy,
    /// See [`AttestationError::Proof`].
    Proof,
    /// See [`AttestationError::Configuration`].
    Configuration,
}

impl AttestationError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Structural(_) => ErrorKind::Structural,
            Self::Policy(_) => ErrorKind::Policy,
            Self::Proof(_) => ErrorKind::Proof,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// The attestation object or statement could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// An attestation certificate could not be used.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    /// A required field is absent.
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    /// A field is present but cannot be interpreted.
    #[error("field `{field}` is malformed: {reason}")]
    MalformedField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The client data hash is not a SHA-256 digest.
    #[error("client data hash must be 32 bytes, got {0}")]
    ClientDataHashLength(usize),
    /// The authenticator data carries no attested credential data.
    #[error("authenticator data has no attested credential data")]
    MissingCredentialData,
    /// The certificate path has no certificates.
    #[error("attestation certificate path is empty")]
    EmptyCertificatePath,
    /// The certificate path has the wrong number of certificates.
    #[error("expected {expected} attestation certificate(s), found {found}")]
    CertificateCount {
        /// Required count.
        expected: usize,
        /// Received count.
        found: usize,
    },
    /// A required certificate extension is absent.
    #[error("attestation certificate lacks the {0} extension")]
    MissingExtension(&'static str),
    /// A certificate extension cannot be decoded.
    #[error("attestation certificate has a malformed {0} extension")]
    MalformedExtension(&'static str),
    /// The signature algorithm or key type is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// A public key cannot be used.
    #[error("unusable public key: {0}")]
    UnsupportedKey(String),
    /// `ecdaaKeyId` is present; ECDAA is not supported.
    #[error("ECDAA attestation is not supported")]
    EcdaaUnsupported,
}

/// Rejected by configured policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The version is a negative number.
    #[error("version {0} is negative")]
    NegativeVersion(i64),
    /// The version is below the configured minimum.
    #[error("version {version} is below the minimum of {minimum}")]
    VersionTooLow {
        /// Received version.
        version: u64,
        /// Configured minimum.
        minimum: u64,
    },
    /// The TPM specification version is not the configured one.
    #[error("TPM version {found:?} is not {required:?}")]
    TpmVersion {
        /// Received version.
        found: String,
        /// Configured version.
        required: String,
    },
    /// The timestamp is before the start of the freshness window.
    #[error("timestamp {timestamp_ms} is before the earliest accepted {earliest_ms}")]
    TimestampTooOld {
        /// Received timestamp, milliseconds since the Unix epoch.
        timestamp_ms: i64,
        /// Start of the window, milliseconds since the Unix epoch.
        earliest_ms: i128,
    },
    /// The timestamp is after the end of the freshness window.
    #[error("timestamp {timestamp_ms} is after the latest accepted {latest_ms}")]
    TimestampInFuture {
        /// Received timestamp, milliseconds since the Unix epoch.
        timestamp_ms: i64,
        /// End of the window, milliseconds since the Unix epoch.
        latest_ms: i128,
    },
}

/// The statement does not prove what it claims.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    /// The signed nonce is not bound to this ceremony.
    #[error("nonce does not match the authenticator data and client data hash")]
    NonceMismatch,
    /// The end-entity certificate was not issued to the expected subject.
    #[error("certificate subject {found:?} is not {expected:?}")]
    IssuerMismatch {
        /// Expected subject common name.
        expected: String,
        /// Received subject common name.
        found: Option<String>,
    },
    /// The device failed the compatibility profile check.
    #[error("ctsProfileMatch is not true")]
    IntegrityCheckFailed,
    /// A signature does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The statement algorithm differs from the credential key algorithm.
    #[error("statement algorithm does not match the credential key")]
    AlgorithmMismatch,
    /// The certified key is not the credential public key.
    #[error("attested public key does not match the credential public key")]
    PublicKeyMismatch,
    /// The certificate AAGUID extension differs from the authenticator data AAGUID.
    #[error("certificate AAGUID does not match the authenticator data")]
    AaguidMismatch,
    /// The attestation certificate does not meet the format's requirements.
    #[error("attestation certificate requirement not met: {0}")]
    CertificateRequirement(&'static str),
    /// The key attestation challenge is not the client data hash.
    #[error("attestation challenge does not match the client data hash")]
    ChallengeMismatch,
    /// The attested key may be used by every application on the device.
    #[error("attested key is not bound to the calling application")]
    AllApplications,
    /// A TPM structure field has an unexpected value.
    #[error("TPM attestation {0} mismatch")]
    TpmMismatch(&'static str),
}

/// The verifier is not set up for the statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No validator is registered for this `fmt`.
    #[error("attestation format {0:?} is not supported")]
    UnsupportedFormat(String),
    /// A validator received a statement of another format.
    #[error("{expected} validator cannot handle a {found:?} statement")]
    FormatMismatch {
        /// The validator's format.
        expected: AttestationStatementFormat,
        /// The statement's `fmt`.
        found: String,
    },
}

impl From<DecodeError> for AttestationError {
    fn from(e: DecodeError) -> Self {
        Self::Structural(e.into())
    }
}

impl From<CertificateError> for AttestationError {
    fn from(e: CertificateError) -> Self {
        Self::Structural(e.into())
    }
}

/// Signature failures are proof failures; anything that prevents checking one is structural.
impl From<CryptoError> for AttestationError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadSignature | CryptoError::MalformedSignature => {
                ProofError::InvalidSignature(e.to_string()).into()
            }
            CryptoError::UnsupportedAlgorithm(alg) | CryptoError::AlgorithmKeyMismatch(alg) => {
                StructuralError::UnsupportedAlgorithm(alg).into()
            }
            CryptoError::InvalidKey => StructuralError::UnsupportedKey(e.to_string()).into(),
        }
    }
}
