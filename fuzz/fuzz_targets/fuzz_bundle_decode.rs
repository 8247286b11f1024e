#![no_main]

use libfuzzer_sys::fuzz_target;

use haven_crypto::{CipherVault, EncryptedBundle};

// Bytes fetched from the content store are untrusted. Parsing and opening
// a bundle must fail cleanly, never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(bundle) = EncryptedBundle::from_bytes(data) {
        let _ = CipherVault::new().decrypt(&bundle);
    }
});
