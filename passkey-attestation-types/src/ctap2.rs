//! Authenticator-produced structures a relying party receives during registration, as laid out by
//! [CTAP 2.1] and the authenticator model of [WebAuthn Level 3].
//!
//! [CTAP 2.1]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html
//! [WebAuthn Level 3]: https://w3c.github.io/webauthn

mod aaguid;
mod attestation_fmt;
mod flags;

pub mod extensions;

pub use self::{aaguid::*, attestation_fmt::*, flags::*};
