use x509_parser::{certificate::X509Certificate, prelude::FromDer, x509::X509Version};

use crate::crypto::PublicKey;

/// Errors decoding an attestation certificate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    /// Not a DER encoded X.509 certificate.
    #[error("certificate is not a valid DER encoded X.509 certificate")]
    Malformed,
    /// Bytes follow the certificate.
    #[error("certificate is followed by {0} trailing bytes")]
    TrailingData(usize),
    /// A known extension could not be parsed.
    #[error("certificate has a malformed {0} extension")]
    MalformedExtension(&'static str),
    /// The subject public key is neither P-256 nor RSA.
    #[error("certificate public key type is not supported")]
    UnsupportedPublicKey,
}

/// An X.509 extension as found in the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExtension {
    /// Dotted decimal OID.
    pub oid: String,
    /// Critical flag.
    pub critical: bool,
    /// The DER content of the `extnValue` OCTET STRING.
    pub value: Vec<u8>,
}

/// An attestation certificate, parsed once when the statement is decoded.
///
/// Only the properties attestation formats check are extracted; the DER is kept for trust anchor
/// evaluation by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationCertificate {
    der: Vec<u8>,
    version: u32,
    subject_common_name: Option<String>,
    subject_organizational_unit: Option<String>,
    subject_is_empty: bool,
    is_ca: Option<bool>,
    extended_key_usages: Vec<String>,
    extensions: Vec<CertificateExtension>,
    public_key: Option<PublicKey>,
}

impl AttestationCertificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (rest, cert) =
            X509Certificate::from_der(der).map_err(|_| CertificateError::Malformed)?;
        if !rest.is_empty() {
            return Err(CertificateError::TrailingData(rest.len()));
        }

        let subject = cert.subject();
        let subject_common_name = subject
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);
        let subject_organizational_unit = subject
            .iter_organizational_unit()
            .next()
            .and_then(|ou| ou.as_str().ok())
            .map(str::to_owned);
        let subject_is_empty = subject.iter().next().is_none();

        let is_ca = cert
            .basic_constraints()
            .map_err(|_| CertificateError::MalformedExtension("basicConstraints"))?
            .map(|bc| bc.value.ca);
        let extended_key_usages = cert
            .extended_key_usage()
            .map_err(|_| CertificateError::MalformedExtension("extendedKeyUsage"))?
            .map(|eku| eku.value.other.iter().map(|oid| oid.to_id_string()).collect())
            .unwrap_or_default();
        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| CertificateExtension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
                value: ext.value.to_vec(),
            })
            .collect();

        let public_key = PublicKey::from_spki_der(cert.public_key().raw).ok();
        if public_key.is_none() {
            log::debug!(
                "attestation certificate key algorithm {} is not supported",
                cert.public_key().algorithm.algorithm.to_id_string()
            );
        }

        Ok(Self {
            der: der.to_vec(),
            version: cert.version().0,
            subject_common_name,
            subject_organizational_unit,
            subject_is_empty,
            is_ca,
            extended_key_usages,
            extensions,
            public_key,
        })
    }

    /// The certificate as received.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Whether this is an X.509 version 3 certificate.
    pub fn is_v3(&self) -> bool {
        self.version == X509Version::V3.0
    }

    /// The first subject CN, if it is a string.
    pub fn subject_common_name(&self) -> Option<&str> {
        self.subject_common_name.as_deref()
    }

    /// The first subject OU, if it is a string.
    pub fn subject_organizational_unit(&self) -> Option<&str> {
        self.subject_organizational_unit.as_deref()
    }

    /// Whether the subject distinguished name has no attributes.
    pub fn subject_is_empty(&self) -> bool {
        self.subject_is_empty
    }

    /// The basic constraints CA flag, `None` without the extension.
    pub fn is_ca(&self) -> Option<bool> {
        self.is_ca
    }

    /// Extended key usages outside the ones named by RFC 5280, as dotted OIDs.
    pub fn extended_key_usages(&self) -> &[String] {
        &self.extended_key_usages
    }

    /// Look up an extension by dotted OID.
    pub fn extension(&self, oid: &str) -> Option<&CertificateExtension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<&PublicKey, CertificateError> {
        self.public_key
            .as_ref()
            .ok_or(CertificateError::UnsupportedPublicKey)
    }
}

/// An ordered certificate path, end-entity certificate first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePath(Vec<AttestationCertificate>);

impl CertificatePath {
    /// Wrap already parsed certificates.
    pub fn new(certificates: Vec<AttestationCertificate>) -> Self {
        Self(certificates)
    }

    /// Parse a list of DER certificates, end-entity first.
    pub fn from_der_list<'a>(
        certificates: impl IntoIterator<Item = &'a [u8]>,
    ) -> Result<Self, CertificateError> {
        certificates
            .into_iter()
            .map(AttestationCertificate::from_der)
            .collect::<Result<_, _>>()
            .map(Self)
    }

    /// The end-entity (attestation) certificate.
    pub fn end_entity(&self) -> Option<&AttestationCertificate> {
        self.0.first()
    }

    /// The subject CN of the end-entity certificate.
    pub fn end_entity_common_name(&self) -> Option<&str> {
        self.end_entity()?.subject_common_name()
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no certificates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The certificates, end-entity first.
    pub fn iter(&self) -> std::slice::Iter<'_, AttestationCertificate> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CertificatePath {
    type Item = &'a AttestationCertificate;
    type IntoIter = std::slice::Iter<'a, AttestationCertificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use rcgen::{
        CertificateParams, CustomExtension, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
        IsCa, KeyPair,
    };

    use super::*;

    fn params(common_name: Option<&str>) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("valid params");
        params.distinguished_name = DistinguishedName::new();
        if let Some(cn) = common_name {
            params.distinguished_name.push(DnType::CommonName, cn);
        }
        params
    }

    #[test]
    fn extracts_attestation_properties() {
        let key_pair = KeyPair::generate().expect("key generation");
        let mut params = params(Some("attest.android.com"));
        params
            .distinguished_name
            .push(DnType::OrganizationalUnitName, "Authenticator Attestation");
        params.is_ca = IsCa::ExplicitNoCa;
        params
            .extended_key_usages
            .push(ExtendedKeyUsagePurpose::Other(vec![2, 23, 133, 8, 3]));
        params.custom_extensions.push(CustomExtension::from_oid_content(
            &[1, 3, 6, 1, 4, 1, 45724, 1, 1, 4],
            vec![0x04, 0x02, 0xab, 0xcd],
        ));
        let cert = params.self_signed(&key_pair).expect("self signed");

        let parsed = AttestationCertificate::from_der(cert.der()).expect("valid certificate");

        assert!(parsed.is_v3());
        assert_eq!(parsed.subject_common_name(), Some("attest.android.com"));
        assert_eq!(
            parsed.subject_organizational_unit(),
            Some("Authenticator Attestation")
        );
        assert!(!parsed.subject_is_empty());
        assert_eq!(parsed.is_ca(), Some(false));
        assert_eq!(parsed.extended_key_usages(), ["2.23.133.8.3"]);
        assert_eq!(
            parsed
                .extension("1.3.6.1.4.1.45724.1.1.4")
                .map(|ext| ext.value.as_slice()),
            Some([0x04, 0x02, 0xab, 0xcd].as_slice())
        );
        assert!(matches!(parsed.public_key(), Ok(PublicKey::P256(_))));
        assert_eq!(parsed.der(), &cert.der()[..]);
    }

    #[test]
    fn empty_subject() {
        let key_pair = KeyPair::generate().expect("key generation");
        let cert = params(None).self_signed(&key_pair).expect("self signed");

        let parsed = AttestationCertificate::from_der(cert.der()).expect("valid certificate");

        assert!(parsed.subject_is_empty());
        assert_eq!(parsed.subject_common_name(), None);
        assert_eq!(parsed.is_ca(), None);
    }

    #[test]
    fn rejects_garbage_and_trailing_data() {
        assert_eq!(
            AttestationCertificate::from_der(b"not a certificate"),
            Err(CertificateError::Malformed)
        );

        let key_pair = KeyPair::generate().expect("key generation");
        let mut der = params(Some("leaf"))
            .self_signed(&key_pair)
            .expect("self signed")
            .der()
            .to_vec();
        der.push(0);
        assert_eq!(
            AttestationCertificate::from_der(&der),
            Err(CertificateError::TrailingData(1))
        );
    }

    #[test]
    fn path_is_end_entity_first() {
        let key_pair = KeyPair::generate().expect("key generation");
        let leaf = params(Some("leaf")).self_signed(&key_pair).expect("leaf");
        let root = params(Some("root")).self_signed(&key_pair).expect("root");

        let path = CertificatePath::from_der_list([&leaf.der()[..], &root.der()[..]])
            .expect("valid certificates");

        assert_eq!(path.len(), 2);
        assert_eq!(path.end_entity_common_name(), Some("leaf"));
        assert_eq!(
            path.iter()
                .filter_map(AttestationCertificate::subject_common_name)
                .collect::<Vec<_>>(),
            ["leaf", "root"]
        );
        assert_eq!(CertificatePath::default().end_entity(), None);
    }
}
