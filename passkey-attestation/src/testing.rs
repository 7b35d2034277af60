//! Fixtures shared by the validator tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use coset::{iana, CoseKey, CoseKeyBuilder};
use p256::{
    ecdsa::{signature::Signer, DerSignature, Signature, SigningKey},
    pkcs8::DecodePrivateKey,
};
use passkey_attestation_types::{
    crypto::sha256,
    ctap2::{Aaguid, AttestedCredentialData, AuthenticatorData, Flags},
    encoding,
    rand::random_vec,
    statement::{AttestationObject, AttestationStatement},
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use serde_json::json;

use crate::RegistrationContext;

pub(crate) const RP_ID: &str = "future.1password.com";
pub(crate) const CLIENT_DATA_HASH: [u8; 32] = [0x42; 32];

/// 2023-11-14T22:13:20Z
pub(crate) fn ceremony_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub(crate) fn ceremony_time_ms() -> i64 {
    1_700_000_000_000
}

/// The 37 byte authenticator data of a ceremony without attested credential data.
pub(crate) fn plain_auth_data() -> Vec<u8> {
    AuthenticatorData::new(RP_ID, 0)
        .set_flags(Flags::UV)
        .to_vec()
}

/// A P-256 credential key pair.
pub(crate) struct Credential {
    pub(crate) signing_key: SigningKey,
    pub(crate) cose_key: CoseKey,
    pub(crate) aaguid: Aaguid,
    pkcs8: Vec<u8>,
}

impl Credential {
    pub(crate) fn new() -> Self {
        let pkcs8 = KeyPair::generate().expect("key generation").serialize_der();
        let signing_key = SigningKey::from_pkcs8_der(&pkcs8).expect("P-256 key");
        let point = signing_key.verifying_key().to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            unreachable!("uncompressed points have both coordinates");
        };
        let cose_key = CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            x.to_vec(),
            y.to_vec(),
        )
        .algorithm(iana::Algorithm::ES256)
        .build();
        Self {
            signing_key,
            cose_key,
            aaguid: Aaguid([0xaa; 16]),
            pkcs8,
        }
    }

    /// The credential key as an rcgen key pair, so a certificate can certify it.
    pub(crate) fn key_pair(&self) -> KeyPair {
        KeyPair::try_from(self.pkcs8.as_slice()).expect("valid PKCS#8")
    }

    /// Authenticator data carrying this credential.
    pub(crate) fn auth_data(&self) -> Vec<u8> {
        let acd = AttestedCredentialData::new(self.aaguid, random_vec(16), self.cose_key.clone())
            .expect("valid credential data");
        AuthenticatorData::new(RP_ID, 0)
            .set_flags(Flags::UV)
            .set_attested_credential_data(acd)
            .to_vec()
    }
}

/// A certificate with a fresh P-256 key and its signing key.
pub(crate) struct TestCertificate {
    pub(crate) signing_key: SigningKey,
    pub(crate) der: Vec<u8>,
}

/// Issue a self signed certificate after letting `customize` adjust the parameters. The subject
/// starts out empty.
pub(crate) fn certificate(customize: impl FnOnce(&mut CertificateParams)) -> TestCertificate {
    let key_pair = KeyPair::generate().expect("key generation");
    certificate_for(key_pair, customize)
}

/// Issue a self signed certificate for an existing key pair.
pub(crate) fn certificate_for(
    key_pair: KeyPair,
    customize: impl FnOnce(&mut CertificateParams),
) -> TestCertificate {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("valid params");
    params.distinguished_name = DistinguishedName::new();
    customize(&mut params);
    let der = params
        .self_signed(&key_pair)
        .expect("self signed")
        .der()
        .to_vec();
    let signing_key = SigningKey::from_pkcs8_der(&key_pair.serialize_der()).expect("P-256 key");
    TestCertificate { signing_key, der }
}

pub(crate) fn with_common_name(name: &str) -> impl FnOnce(&mut CertificateParams) + '_ {
    move |params| params.distinguished_name.push(DnType::CommonName, name)
}

/// DER ECDSA signature, as authenticators produce.
pub(crate) fn sign(key: &SigningKey, data: &[u8]) -> Vec<u8> {
    let signature: DerSignature = key.sign(data);
    signature.as_bytes().to_vec()
}

/// A compact ES256 JWS with the certificate in its `x5c` header.
pub(crate) fn jws(key: &SigningKey, certificate: &[u8], payload: &serde_json::Value) -> String {
    let header = json!({ "alg": "ES256", "x5c": [encoding::base64(certificate)] }).to_string();
    let input = format!(
        "{}.{}",
        encoding::base64url(header.as_bytes()),
        encoding::base64url(payload.to_string().as_bytes())
    );
    let signature: Signature = key.sign(input.as_bytes());
    format!("{input}.{}", encoding::base64url(&signature.to_bytes()))
}

/// `SHA-256(authData || clientDataHash)`
pub(crate) fn nonce(auth_data: &[u8]) -> [u8; 32] {
    sha256(&[auth_data, CLIENT_DATA_HASH.as_slice()].concat())
}

pub(crate) fn context(statement: AttestationStatement, auth_data: Vec<u8>) -> RegistrationContext {
    context_at(statement, auth_data, ceremony_time())
}

pub(crate) fn context_at(
    statement: AttestationStatement,
    auth_data: Vec<u8>,
    ceremony_time: SystemTime,
) -> RegistrationContext {
    let object = AttestationObject::new(statement, auth_data).expect("valid auth data");
    RegistrationContext::new(object, &CLIENT_DATA_HASH, ceremony_time).expect("valid context")
}
