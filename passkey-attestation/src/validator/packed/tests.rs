use passkey_attestation_types::statement::{CertificatePath, PackedStatement};
use rcgen::{CertificateParams, CustomExtension, DnType, IsCa};

use super::*;
use crate::{
    testing::{certificate, context, sign, Credential, TestCertificate, CLIENT_DATA_HASH},
    ErrorKind,
};

fn signed_data(auth_data: &[u8]) -> Vec<u8> {
    [auth_data, CLIENT_DATA_HASH.as_slice()].concat()
}

fn attestation_params(aaguid: Option<[u8; 16]>) -> impl FnOnce(&mut CertificateParams) {
    move |params| {
        params
            .distinguished_name
            .push(DnType::CountryName, "SE");
        params
            .distinguished_name
            .push(DnType::OrganizationName, "Authenticator Vendor");
        params
            .distinguished_name
            .push(DnType::OrganizationalUnitName, "Authenticator Attestation");
        params
            .distinguished_name
            .push(DnType::CommonName, "Vendor Attestation Key");
        params.is_ca = IsCa::ExplicitNoCa;
        if let Some(aaguid) = aaguid {
            let mut value = vec![0x04, 0x10];
            value.extend_from_slice(&aaguid);
            params
                .custom_extensions
                .push(CustomExtension::from_oid_content(
                    &[1, 3, 6, 1, 4, 1, 45724, 1, 1, 4],
                    value,
                ));
        }
    }
}

fn basic(attestation: &TestCertificate, auth_data: &[u8]) -> AttestationStatement {
    AttestationStatement::Packed(PackedStatement {
        alg: -7,
        sig: sign(&attestation.signing_key, &signed_data(auth_data)),
        x5c: Some(
            CertificatePath::from_der_list([attestation.der.as_slice()])
                .expect("valid certificate"),
        ),
        ecdaa_key_id: None,
    })
}

#[test]
fn full_attestation_is_basic() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let attestation = certificate(attestation_params(Some(credential.aaguid.0)));

    let ctx = context(basic(&attestation, &auth_data), auth_data);

    assert_eq!(PackedValidator.validate(&ctx), Ok(AttestationType::Basic));
}

#[test]
fn certificate_aaguid_must_match() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let attestation = certificate(attestation_params(Some([0x11; 16])));

    let ctx = context(basic(&attestation, &auth_data), auth_data);

    assert_eq!(
        PackedValidator.validate(&ctx),
        Err(ProofError::AaguidMismatch.into())
    );
}

#[test]
fn certificate_requirements() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let attestation = certificate(|params| {
        params
            .distinguished_name
            .push(DnType::CommonName, "Vendor Attestation Key");
    });

    let ctx = context(basic(&attestation, &auth_data), auth_data);

    assert!(matches!(
        PackedValidator.validate(&ctx),
        Err(AttestationError::Proof(ProofError::CertificateRequirement(_)))
    ));
}

#[test]
fn signature_must_cover_this_ceremony() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let attestation = certificate(attestation_params(None));
    let AttestationStatement::Packed(mut stmt) = basic(&attestation, &auth_data) else {
        unreachable!()
    };
    stmt.sig = sign(&attestation.signing_key, &auth_data);

    let ctx = context(AttestationStatement::Packed(stmt), auth_data);

    assert!(matches!(
        PackedValidator.validate(&ctx),
        Err(AttestationError::Proof(ProofError::InvalidSignature(_)))
    ));
}

#[test]
fn empty_certificate_path() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: -7,
        sig: vec![0x30, 0x00],
        x5c: Some(CertificatePath::default()),
        ecdaa_key_id: None,
    });

    assert_eq!(
        PackedValidator.validate(&context(stmt, auth_data)),
        Err(StructuralError::EmptyCertificatePath.into())
    );
}

#[test]
fn self_attestation() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: -7,
        sig: sign(&credential.signing_key, &signed_data(&auth_data)),
        x5c: None,
        ecdaa_key_id: None,
    });

    assert_eq!(
        PackedValidator.validate(&context(stmt, auth_data)),
        Ok(AttestationType::SelfAttestation)
    );
}

#[test]
fn self_attestation_algorithm_must_match_the_credential() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: -257,
        sig: sign(&credential.signing_key, &signed_data(&auth_data)),
        x5c: None,
        ecdaa_key_id: None,
    });

    assert_eq!(
        PackedValidator.validate(&context(stmt, auth_data)),
        Err(ProofError::AlgorithmMismatch.into())
    );
}

#[test]
fn self_attestation_by_another_key() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let other = Credential::new();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: -7,
        sig: sign(&other.signing_key, &signed_data(&auth_data)),
        x5c: None,
        ecdaa_key_id: None,
    });

    let error = PackedValidator
        .validate(&context(stmt, auth_data))
        .expect_err("signed by another key");
    assert_eq!(error.kind(), ErrorKind::Proof);
}

#[test]
fn ecdaa_is_not_supported() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: -7,
        sig: vec![],
        x5c: None,
        ecdaa_key_id: Some(vec![1; 32]),
    });

    assert_eq!(
        PackedValidator.validate(&context(stmt, auth_data)),
        Err(StructuralError::EcdaaUnsupported.into())
    );
}

#[test]
fn unknown_algorithm() {
    let credential = Credential::new();
    let auth_data = credential.auth_data();
    let stmt = AttestationStatement::Packed(PackedStatement {
        alg: 12345,
        sig: vec![],
        x5c: None,
        ecdaa_key_id: None,
    });

    let error = PackedValidator
        .validate(&context(stmt, auth_data))
        .expect_err("unknown algorithm");
    assert_eq!(error.kind(), ErrorKind::Structural);
}
