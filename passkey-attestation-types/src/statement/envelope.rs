use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    encoding,
    statement::{CertificateError, CertificatePath},
    Bytes,
};

/// Errors decoding a compact JWS.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Not three dot separated segments.
    #[error("signed envelope must have three segments, found {0}")]
    SegmentCount(usize),
    /// A segment is not base64url.
    #[error("signed envelope {0} is not base64url encoded")]
    Encoding(&'static str),
    /// The header or payload JSON could not be decoded.
    #[error("signed envelope {segment} is not valid JSON: {reason}")]
    Json {
        /// `header` or `payload`
        segment: &'static str,
        /// Decoder message
        reason: String,
    },
    /// An `x5c` entry is not a certificate.
    #[error("signed envelope certificate: {0}")]
    Certificate(#[from] CertificateError),
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    x5c: Option<Vec<Bytes>>,
}

/// The protected header of a [`SignedEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// JWS `alg`.
    pub alg: String,
    /// JWS `x5c`, the signing certificate first.
    pub x5c: Option<CertificatePath>,
}

/// A compact JWS: `header.payload.signature`.
///
/// Whether the signature is valid is decided once in [`SignedEnvelope::parse`], over the header
/// and payload segments exactly as received, using the first `x5c` certificate. The payload is
/// never re-serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope<P> {
    compact: String,
    header: EnvelopeHeader,
    payload: P,
    signature: Vec<u8>,
    valid_signature: bool,
}

impl<P: DeserializeOwned> SignedEnvelope<P> {
    /// Decode a compact JWS and check its signature.
    pub fn parse(compact: &str) -> Result<Self, EnvelopeError> {
        let segments: Vec<&str> = compact.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments[..] else {
            return Err(EnvelopeError::SegmentCount(segments.len()));
        };

        let header_json = encoding::try_from_base64url(header_b64)
            .ok_or(EnvelopeError::Encoding("header"))?;
        let payload_json = encoding::try_from_base64url(payload_b64)
            .ok_or(EnvelopeError::Encoding("payload"))?;
        let signature = encoding::try_from_base64url(signature_b64)
            .ok_or(EnvelopeError::Encoding("signature"))?;

        let raw: RawHeader = serde_json::from_slice(&header_json).map_err(|e| EnvelopeError::Json {
            segment: "header",
            reason: e.to_string(),
        })?;
        let payload: P = serde_json::from_slice(&payload_json).map_err(|e| EnvelopeError::Json {
            segment: "payload",
            reason: e.to_string(),
        })?;

        let x5c = raw
            .x5c
            .map(|certs| CertificatePath::from_der_list(certs.iter().map(|der| der.as_slice())))
            .transpose()?;
        let header = EnvelopeHeader { alg: raw.alg, x5c };

        // the signing input is the ASCII of the first two segments, as received
        let signing_input = &compact[..header_b64.len() + 1 + payload_b64.len()];
        let valid_signature = check_signature(&header, signing_input.as_bytes(), &signature);

        Ok(Self {
            compact: compact.to_owned(),
            header,
            payload,
            signature,
            valid_signature,
        })
    }
}

impl<P> SignedEnvelope<P> {
    /// The protected header.
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    /// The decoded payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// The raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether the signature verified against the first `x5c` certificate at parse time.
    pub fn is_valid_signature(&self) -> bool {
        self.valid_signature
    }

    /// The token exactly as received.
    pub fn to_compact(&self) -> &str {
        &self.compact
    }
}

fn check_signature(header: &EnvelopeHeader, signing_input: &[u8], signature: &[u8]) -> bool {
    let Some(leaf) = header.x5c.as_ref().and_then(CertificatePath::end_entity) else {
        log::debug!("signed envelope carries no signing certificate");
        return false;
    };
    let result = leaf
        .public_key()
        .map_err(|e| e.to_string())
        .and_then(|key| {
            key.verify_jws(&header.alg, signing_input, signature)
                .map_err(|e| e.to_string())
        });
    match result {
        Ok(()) => true,
        Err(reason) => {
            log::warn!("signed envelope signature rejected: {reason}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use p256::{
        ecdsa::{signature::Signer, Signature, SigningKey},
        pkcs8::DecodePrivateKey,
    };
    use rcgen::{CertificateParams, DnType, KeyPair};
    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Claims {
        nonce: String,
    }

    fn signer() -> (SigningKey, Vec<u8>) {
        let key_pair = KeyPair::generate().expect("key generation");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("valid params");
        params.distinguished_name.push(DnType::CommonName, "attest.android.com");
        let cert = params.self_signed(&key_pair).expect("self signed");
        let signing_key =
            SigningKey::from_pkcs8_der(&key_pair.serialize_der()).expect("P-256 key");
        (signing_key, cert.der().to_vec())
    }

    fn sign(key: &SigningKey, cert: &[u8], payload: &str) -> String {
        let header = json!({ "alg": "ES256", "x5c": [encoding::base64(cert)] }).to_string();
        let input = format!(
            "{}.{}",
            encoding::base64url(header.as_bytes()),
            encoding::base64url(payload.as_bytes())
        );
        let signature: Signature = key.sign(input.as_bytes());
        format!("{input}.{}", encoding::base64url(&signature.to_bytes()))
    }

    #[test]
    fn valid_signature_over_received_bytes() {
        let (key, cert) = signer();
        // whitespace that a re-serialization would drop
        let compact = sign(&key, &cert, r#"{ "nonce" :  "abc" }"#);

        let envelope = SignedEnvelope::<Claims>::parse(&compact).expect("well formed");

        assert!(envelope.is_valid_signature());
        assert_eq!(envelope.payload().nonce, "abc");
        assert_eq!(envelope.header().alg, "ES256");
        assert_eq!(
            envelope
                .header()
                .x5c
                .as_ref()
                .and_then(CertificatePath::end_entity_common_name),
            Some("attest.android.com")
        );
        assert_eq!(envelope.to_compact(), compact);
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let (key, cert) = signer();
        let compact = sign(&key, &cert, r#"{"nonce":"abc"}"#);
        let mut parts: Vec<String> = compact.split('.').map(str::to_owned).collect();
        parts[1] = encoding::base64url(br#"{"nonce":"abd"}"#);

        let envelope = SignedEnvelope::<Claims>::parse(&parts.join(".")).expect("well formed");

        assert!(!envelope.is_valid_signature());
    }

    #[test]
    fn missing_certificate_is_invalid() {
        let header = encoding::base64url(br#"{"alg":"ES256"}"#);
        let payload = encoding::base64url(br#"{"nonce":"abc"}"#);
        let compact = format!("{header}.{payload}.{}", encoding::base64url(&[0; 64]));

        let envelope = SignedEnvelope::<Claims>::parse(&compact).expect("well formed");

        assert!(!envelope.is_valid_signature());
        assert_eq!(envelope.header().x5c, None);
    }

    #[test]
    fn malformed_tokens() {
        assert_eq!(
            SignedEnvelope::<Claims>::parse("a.b").map(|_| ()),
            Err(EnvelopeError::SegmentCount(2))
        );
        assert_eq!(
            SignedEnvelope::<Claims>::parse("!!.e30.AA").map(|_| ()),
            Err(EnvelopeError::Encoding("header"))
        );
        let header = encoding::base64url(br#"{"alg":"ES256"}"#);
        assert!(matches!(
            SignedEnvelope::<Claims>::parse(&format!("{header}.e30.AA")),
            Err(EnvelopeError::Json { segment: "payload", .. })
        ));
    }
}
