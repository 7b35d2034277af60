use bitflags::bitflags;

bitflags! {
    /// Flags byte of the authenticator data.
    ///
    /// Bits 1 and 5 are reserved. They are kept when parsing so that re-encoding reproduces the
    /// received byte.
    ///
    /// <https://w3c.github.io/webauthn/#authdata-flags>
    #[repr(transparent)]
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct Flags: u8 {
        /// User Present, bit 0
        const UP = 1 << 0;
        /// User Verified, bit 2
        const UV = 1 << 2;
        /// Backup Eligibility, bit 3
        const BE = 1 << 3;
        /// Backup state, bit 4
        const BS = 1 << 4;
        /// Attested Credential Data, bit 6
        const AT = 1 << 6;
        /// Extension Data Included, bit 7
        const ED = 1 << 7;
    }
}

impl From<Flags> for u8 {
    fn from(src: Flags) -> Self {
        src.bits()
    }
}

impl From<u8> for Flags {
    fn from(value: u8) -> Self {
        Flags::from_bits_retain(value)
    }
}
