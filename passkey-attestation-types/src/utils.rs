pub(crate) mod bytes;
#[macro_use]
pub(crate) mod repr_enum;

pub mod encoding;
#[cfg(any(test, feature = "testable"))]
pub mod rand;
