//! Encoding helpers shared by the attestation types and verifiers.
//!
//! Decoding is deliberately lenient about padding since authenticators and attestation services
//! are inconsistent about it.

use data_encoding::{Encoding, Specification, BASE64URL_NOPAD, BASE64_NOPAD};

/// Convert bytes to base64 without padding
pub fn base64(data: &[u8]) -> String {
    BASE64_NOPAD.encode(data)
}

/// Convert bytes to base64url without padding
pub fn base64url(data: &[u8]) -> String {
    BASE64URL_NOPAD.encode(data)
}

/// Try parsing from base64 with or without padding
pub fn try_from_base64(input: &str) -> Option<Vec<u8>> {
    BASE64_NOPAD
        .decode(input.trim_end_matches('=').as_bytes())
        .ok()
}

/// Try parsing from base64url with or without padding.
///
/// Non-zero trailing bits are tolerated.
pub fn try_from_base64url(input: &str) -> Option<Vec<u8>> {
    let encoding = relaxed_base64url()?;
    encoding
        .decode(input.trim_end_matches('=').as_bytes())
        .ok()
}

fn relaxed_base64url() -> Option<Encoding> {
    let specs = Specification {
        check_trailing_bits: false,
        padding: None,
        ..BASE64URL_NOPAD.specification()
    };
    specs.encoding().ok()
}
