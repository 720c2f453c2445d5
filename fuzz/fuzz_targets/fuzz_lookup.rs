#![no_main]
use libfuzzer_sys::fuzz_target;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fuzz_target!(|data: &[u8]| {
    // Trailing 16 bytes are the address, the rest is the database
    if data.len() < 16 {
        return;
    }
    let (db_bytes, addr) = data.split_at(data.len() - 16);
    let Ok(db) = geoipdb::Database::from_bytes(db_bytes.to_vec()) else {
        return;
    };

    let mut v6 = [0u8; 16];
    v6.copy_from_slice(addr);
    let _ = db.lookup(IpAddr::V6(Ipv6Addr::from(v6)));
    let _ = db.lookup(IpAddr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])));
    let _ = db.lookup_value(IpAddr::V4(Ipv4Addr::new(addr[4], addr[5], addr[6], addr[7])));
});
