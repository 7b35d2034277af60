//! # Passkey Attestation Types
//!
//! Rust type definitions for the attestation objects a relying party receives during a
//! `webauthn` registration ceremony: authenticator data, the per-format attestation statements,
//! their certificate paths and signed envelopes, and the extension input bags.
//!
//! Everything that will later be used as signature input is kept exactly as received. See
//! [`statement::AttestationObject`].

#[macro_use]
mod utils;

pub mod crypto;
pub mod ctap2;
pub mod statement;
pub mod webauthn;

// Re-exports
pub use utils::{
    bytes::{Bytes, NotBase64Encoded},
    encoding,
};

#[cfg(any(test, feature = "testable"))]
pub use utils::rand;
