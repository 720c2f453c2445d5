//! Geohash encoding for lookup results

/// Characters used per geohash cell (12 is sub-metre precision)
pub const GEOHASH_PRECISION: usize = 12;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode a coordinate as a geohash of `precision` characters
///
/// Bits alternate longitude/latitude starting with longitude; each character
/// carries five bits.
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> String {
    let (mut lat_lo, mut lat_hi) = (-90.0f64, 90.0f64);
    let (mut lon_lo, mut lon_hi) = (-180.0f64, 180.0f64);
    let mut hash = String::with_capacity(precision);
    let mut even = true;
    let mut bits = 0u8;
    let mut idx = 0usize;

    while hash.len() < precision {
        let (lo, hi, value) = if even {
            (&mut lon_lo, &mut lon_hi, longitude)
        } else {
            (&mut lat_lo, &mut lat_hi, latitude)
        };
        let mid = (*lo + *hi) / 2.0;
        idx <<= 1;
        if value >= mid {
            idx |= 1;
            *lo = mid;
        } else {
            *hi = mid;
        }
        even = !even;

        bits += 1;
        if bits == 5 {
            hash.push(BASE32[idx] as char);
            bits = 0;
            idx = 0;
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_geohashes() {
        // Jutland, Denmark
        assert_eq!(encode(57.64911, 10.40744, 11), "u4pruydqqvj");
        assert!(encode(57.64911, 10.40744, GEOHASH_PRECISION).starts_with("u4pruydqqvj"));
        assert_eq!(encode(0.0, 0.0, 5), "s0000");
        assert_eq!(encode(-90.0, -180.0, 4), "0000");
    }

    #[test]
    fn test_precision() {
        assert_eq!(encode(51.5, -0.12, GEOHASH_PRECISION).len(), 12);
        assert_eq!(encode(51.5, -0.12, 1), "g");
        assert_eq!(encode(51.5, -0.12, 0), "");
    }
}
