//! # Passkey Attestation
//!
//! Relying party verification of the attestation statement an authenticator returns during a
//! `webauthn` registration ceremony.
//!
//! A [`ValidatorRegistry`] is built once from a [`VerifierConfig`]. Each ceremony wraps the
//! received attestation object in a [`RegistrationContext`] and calls
//! [`ValidatorRegistry::verify`], which either classifies the attestation and hands back the
//! certificate path to evaluate against trust anchors, or names the first check that failed.
//!
//! Evaluating the certificate path against trust anchors is left to the caller.
//!
//! ```no_run
//! # use std::time::SystemTime;
//! # use passkey_attestation::{RegistrationContext, ValidatorRegistry, VerifierConfig};
//! # fn verify(attestation_object: &[u8], client_data_hash: &[u8]) -> Result<(), passkey_attestation::AttestationError> {
//! let registry = ValidatorRegistry::new(VerifierConfig::default());
//! let ctx = RegistrationContext::from_cbor(attestation_object, client_data_hash, SystemTime::now())?;
//! let verified = registry.verify(&ctx)?;
//! println!("{}", verified.attestation_type);
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
pub mod policy;
mod registry;
pub mod validator;

pub use self::{
    config::{SafetyNetConfig, TpmConfig, VerifierConfig},
    context::RegistrationContext,
    error::{
        AttestationError, ConfigurationError, ErrorKind, PolicyError, ProofError, StructuralError,
    },
    registry::{ValidatorRegistry, VerifiedAttestation},
};

#[cfg(feature = "testable")]
pub use self::policy::MockVersionPolicy;

#[cfg(test)]
mod testing;
