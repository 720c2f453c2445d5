#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Never panics, even on garbage input
    let _ = geoipdb::Database::from_bytes(data.to_vec());
});
