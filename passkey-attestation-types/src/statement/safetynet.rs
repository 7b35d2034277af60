use serde::{Deserialize, Serialize};

/// The payload of an Android SafetyNet attestation response.
///
/// Every field is optional at the decoding layer so that a missing field is reported by the
/// verifier as a malformed statement rather than as a JSON error. See
/// [`SafetyNetResponse::first_missing_field`].
///
/// <https://developer.android.com/privacy-and-security/safetynet/attestation#use-response-server>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyNetResponse {
    /// Base64 of SHA-256(`authenticatorData` || `clientDataHash`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// When the response was generated, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,

    /// Package name of the calling app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apk_package_name: Option<String>,

    /// Base64 SHA-256 digests of the calling app's signing certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apk_certificate_digest_sha256: Option<Vec<String>>,

    /// Base64 SHA-256 of the calling app's APK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apk_digest_sha256: Option<String>,

    /// The device matches the profile of a device that passed Android compatibility testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cts_profile_match: Option<bool>,

    /// The device has not been tampered with, a weaker signal than `ctsProfileMatch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_integrity: Option<bool>,

    /// Suggestion for getting the device back into a passing state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,

    /// How `ctsProfileMatch` and `basicIntegrity` were evaluated, e.g. `BASIC,HARDWARE_BACKED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_type: Option<String>,
}

impl SafetyNetResponse {
    /// The first required field, in wire order, that is absent.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("nonce", self.nonce.is_none()),
            ("timestampMs", self.timestamp_ms.is_none()),
            ("apkPackageName", self.apk_package_name.is_none()),
            (
                "apkCertificateDigestSha256",
                self.apk_certificate_digest_sha256.is_none(),
            ),
            ("apkDigestSha256", self.apk_digest_sha256.is_none()),
            ("ctsProfileMatch", self.cts_profile_match.is_none()),
            ("basicIntegrity", self.basic_integrity.is_none()),
        ]
        .into_iter()
        .find_map(|(name, missing)| missing.then_some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_play_services_response() {
        let json = r#"{
            "nonce": "R2Rra24vVjJ5SDNlWFJxaG1VNXE=",
            "timestampMs": 1540997200563,
            "apkPackageName": "com.google.android.gms",
            "apkDigestSha256": "XTd0J3NXtpTZ9CMVOoKlIAvXkFhBD4YcAnd+HUoeqG8=",
            "ctsProfileMatch": true,
            "apkCertificateDigestSha256": ["8P1sW0EPJcslw7UzRsiXL64w+O50Ed+RBICtay1g24M="],
            "basicIntegrity": true,
            "evaluationType": "BASIC"
        }"#;

        let response: SafetyNetResponse = serde_json::from_str(json).expect("valid response");

        assert_eq!(response.timestamp_ms, Some(1_540_997_200_563));
        assert_eq!(response.cts_profile_match, Some(true));
        assert_eq!(response.evaluation_type.as_deref(), Some("BASIC"));
        assert_eq!(response.first_missing_field(), None);
    }

    #[test]
    fn reports_missing_fields_in_order() {
        let response: SafetyNetResponse =
            serde_json::from_str(r#"{"nonce":"AA","timestampMs":1}"#).expect("valid json");
        assert_eq!(response.first_missing_field(), Some("apkPackageName"));

        assert_eq!(
            SafetyNetResponse::default().first_missing_field(),
            Some("nonce")
        );
    }
}
