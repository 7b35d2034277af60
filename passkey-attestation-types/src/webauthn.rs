//! Relying-party facing types from [WebAuthn Level 3]: attestation format identifiers,
//! attestation types and client extension inputs.
//!
//! [WebAuthn Level 3]: https://w3c.github.io/webauthn

mod attestation;
mod extensions;

pub use self::{attestation::*, extensions::*};
