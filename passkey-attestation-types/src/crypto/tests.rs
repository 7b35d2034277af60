use coset::CoseKeyBuilder;
use p256::{
    ecdsa::{signature::Signer, SigningKey},
    pkcs8::EncodePublicKey,
};
use rsa::{pkcs1v15::SigningKey as RsaSigningKey, signature::SignatureEncoding, RsaPrivateKey};

use super::*;

fn p256_key() -> (SigningKey, PublicKey) {
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    let public = PublicKey::P256(p256::PublicKey::from(signing_key.verifying_key()));
    (signing_key, public)
}

#[test]
fn es256_der_and_fixed_encodings() {
    let (signing_key, public) = p256_key();
    let signature: EcdsaSignature = signing_key.sign(b"authData || clientDataHash");

    public
        .verify(
            iana::Algorithm::ES256,
            b"authData || clientDataHash",
            signature.to_der().as_bytes(),
        )
        .expect("DER signature verifies");
    public
        .verify_jws("ES256", b"authData || clientDataHash", &signature.to_bytes())
        .expect("fixed width signature verifies");

    assert_eq!(
        public.verify(
            iana::Algorithm::ES256,
            b"authData || clientDataHash",
            &signature.to_bytes()
        ),
        Err(CryptoError::MalformedSignature)
    );
    assert_eq!(
        public.verify(
            iana::Algorithm::ES256,
            b"authData || clientDataHasH",
            signature.to_der().as_bytes()
        ),
        Err(CryptoError::BadSignature)
    );
}

#[test]
fn rsa_pkcs1v15_with_every_digest() {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("key generation");
    let public = PublicKey::Rsa(private.to_public_key());

    let sig256 = RsaSigningKey::<Sha256>::new(private.clone()).sign(b"certInfo");
    let sig512 = RsaSigningKey::<Sha512>::new(private).sign(b"certInfo");

    public
        .verify(iana::Algorithm::RS256, b"certInfo", &sig256.to_vec())
        .expect("RS256 verifies");
    public
        .verify_jws("RS512", b"certInfo", &sig512.to_vec())
        .expect("RS512 verifies");
    assert_eq!(
        public.verify(iana::Algorithm::RS384, b"certInfo", &sig256.to_vec()),
        Err(CryptoError::BadSignature)
    );
    assert!(matches!(
        public.verify(iana::Algorithm::ES256, b"certInfo", &sig256.to_vec()),
        Err(CryptoError::AlgorithmKeyMismatch(_))
    ));
}

#[test]
fn unsupported_algorithms() {
    let (_, public) = p256_key();
    assert!(matches!(
        public.verify_jws("HS256", b"data", &[0; 32]),
        Err(CryptoError::UnsupportedAlgorithm(alg)) if alg == "HS256"
    ));
    assert!(matches!(
        public.verify(iana::Algorithm::EdDSA, b"data", &[0; 64]),
        Err(CryptoError::UnsupportedAlgorithm(_))
    ));
    assert!(cose_algorithm(-65535).is_ok());
    assert!(cose_algorithm(12345).is_err());
}

#[test]
fn cose_and_spki_forms_agree() {
    let (signing_key, public) = p256_key();
    let point = signing_key.verifying_key().to_encoded_point(false);
    let cose = CoseKeyBuilder::new_ec2_pub_key(
        iana::EllipticCurve::P_256,
        point.x().expect("uncompressed").to_vec(),
        point.y().expect("uncompressed").to_vec(),
    )
    .algorithm(iana::Algorithm::ES256)
    .build();
    let spki = signing_key
        .verifying_key()
        .to_public_key_der()
        .expect("encodable");

    assert_eq!(PublicKey::from_cose_key(&cose), Ok(public.clone()));
    assert_eq!(PublicKey::from_spki_der(spki.as_bytes()), Ok(public.clone()));
    assert_eq!(
        public.to_uncompressed_point().map(|p| p.len()),
        Some(65)
    );
    assert_eq!(cose_key_algorithm(&cose), Some(iana::Algorithm::ES256));
}

#[test]
fn cose_rsa_key() {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("key generation");
    let public = private.to_public_key();
    let cose = CoseKeyBuilder::new()
        .key_type(iana::KeyType::RSA)
        .param(
            iana::RsaKeyParameter::N.to_i64(),
            ciborium::value::Value::Bytes(rsa::traits::PublicKeyParts::n(&public).to_bytes_be()),
        )
        .param(
            iana::RsaKeyParameter::E.to_i64(),
            ciborium::value::Value::Bytes(rsa::traits::PublicKeyParts::e(&public).to_bytes_be()),
        )
        .build();

    assert_eq!(PublicKey::from_cose_key(&cose), Ok(PublicKey::Rsa(public)));
    assert!(is_key_type(&cose, iana::KeyType::RSA));
}

#[test]
fn cose_key_on_another_curve_is_rejected() {
    let cose = CoseKeyBuilder::new_ec2_pub_key(iana::EllipticCurve::P_384, vec![1; 48], vec![2; 48])
        .build();
    assert_eq!(PublicKey::from_cose_key(&cose), Err(CryptoError::InvalidKey));
}

#[test]
fn digests_follow_the_algorithm() {
    assert_eq!(
        HashAlgorithm::for_cose(iana::Algorithm::RS384).map(|h| h.digest(b"").len()),
        Some(48)
    );
    assert_eq!(HashAlgorithm::Sha256.digest(b"abc"), sha256(b"abc").to_vec());
    assert!(constant_time_eq(&sha256(b"abc"), &sha256(b"abc")));
    assert!(!constant_time_eq(&sha256(b"abc"), &sha256(b"abc")[..31]));
}
