//! Random data for tests

use rand::RngCore;

/// Generate `len` random bytes.
pub fn random_vec(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}
