use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Attestation statement format identifiers, as registered in the [IANA WebAuthn registry][1].
///
/// The string form is the `fmt` value of the attestation object.
///
/// [1]: https://www.iana.org/assignments/webauthn/webauthn.xhtml#webauthn-attestation-statement-format-ids
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[typeshare]
pub enum AttestationStatementFormat {
    /// WebAuthn-optimized format, implementable by authenticators with limited resources.
    Packed,

    /// Same shape as `packed` but signed by a TPM attestation identity key over a `TPMS_ATTEST`
    /// structure.
    Tpm,

    /// Hardware-backed Android Keystore attestation.
    AndroidKey,

    /// Attestation through the Android SafetyNet API.
    #[serde(rename = "android-safetynet")]
    #[strum(serialize = "android-safetynet")]
    AndroidSafetyNet,

    /// FIDO U2F authenticators.
    #[strum(serialize = "fido-u2f")]
    FidoU2f,

    /// Apple anonymous attestation.
    Apple,

    /// No attestation.
    None,
}

/// The trust model an attestation statement supports.
///
/// <https://w3c.github.io/webauthn/#sctn-attestation-types>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[typeshare]
pub enum AttestationType {
    /// The authenticator's attestation key pair is specific to its model, certified by the vendor.
    Basic,
    /// The credential private key signed its own attestation.
    #[serde(rename = "SELF")]
    #[strum(serialize = "SELF")]
    SelfAttestation,
    /// A TPM-style attestation identity key certified by an attestation CA.
    AttestationCa,
    /// A per-credential certificate issued by an anonymization CA.
    AnonymizationCa,
    /// No attestation information.
    None,
    /// The attestation could not be classified.
    Uncertain,
}

impl AttestationType {
    /// Whether the classification comes with a certificate path to evaluate against trust anchors.
    pub fn has_trust_path(&self) -> bool {
        matches!(
            self,
            Self::Basic | Self::AttestationCa | Self::AnonymizationCa
        )
    }
}
