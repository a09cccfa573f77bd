use crate::core::constants::GEOHASH_MAX_PRECISION;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SpatialPoint;

const BASE32: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

pub fn encode_geohash(point: SpatialPoint, precision: usize) -> Result<String> {
    validate(point)?;

    let mut hash = String::with_capacity(precision);
    let mut lat_range = (-90.0, 90.0);
    let mut lon_range = (-180.0, 180.0);
    let mut bits = 0u8;
    let mut bit = 0;
    let mut even = true;

    while hash.len() < precision {
        let (value, range) = if even {
            (point.longitude, &mut lon_range)
        } else {
            (point.latitude, &mut lat_range)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value > mid {
            bits |= 1 << (4 - bit);
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even = !even;

        bit += 1;
        if bit == 5 {
            hash.push(BASE32[bits as usize] as char);
            bits = 0;
            bit = 0;
        }
    }

    Ok(hash)
}

/// Bounding box `(min_lat, max_lat, min_lon, max_lon)` of a geohash cell.
pub fn decode_geohash(hash: &str) -> Result<(f64, f64, f64, f64)> {
    let mut lat_range = (-90.0, 90.0);
    let mut lon_range = (-180.0, 180.0);
    let mut is_lon = true;

    for c in hash.bytes() {
        let idx = BASE32
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| Error::new(ErrorKind::Parse, format!("invalid geohash character '{}'", c as char)))?;

        for i in (0..5).rev() {
            let range = if is_lon { &mut lon_range } else { &mut lat_range };
            let mid = (range.0 + range.1) / 2.0;
            if (idx >> i) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            is_lon = !is_lon;
        }
    }

    Ok((lat_range.0, lat_range.1, lon_range.0, lon_range.1))
}

/// Every geohash prefix of `point`, from one character up to full precision.
/// These are the terms a spatial field contributes to the index.
pub fn geohash_prefixes(point: SpatialPoint) -> Result<Vec<String>> {
    let full = encode_geohash(point, GEOHASH_MAX_PRECISION)?;
    Ok((1..=full.len()).map(|len| full[..len].to_string()).collect())
}

fn validate(point: SpatialPoint) -> Result<()> {
    if !(-90.0..=90.0).contains(&point.latitude) || !(-180.0..=180.0).contains(&point.longitude) {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("coordinates out of range: ({}, {})", point.latitude, point.longitude),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_geohash() {
        let point = SpatialPoint::new(57.64911, 10.40744);
        assert_eq!(encode_geohash(point, 9).unwrap(), "u4pruydqq");
    }

    #[test]
    fn prefixes_grow_one_char_at_a_time() {
        let prefixes = geohash_prefixes(SpatialPoint::new(57.64911, 10.40744)).unwrap();
        assert_eq!(prefixes.len(), GEOHASH_MAX_PRECISION);
        assert_eq!(prefixes[0], "u");
        assert_eq!(prefixes[3], "u4pr");
    }

    #[test]
    fn decoded_cell_contains_point() {
        let (min_lat, max_lat, min_lon, max_lon) = decode_geohash("u4pruydqq").unwrap();
        assert!(min_lat <= 57.64911 && 57.64911 <= max_lat);
        assert!(min_lon <= 10.40744 && 10.40744 <= max_lon);
        assert!(decode_geohash("u4a").is_err());
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(encode_geohash(SpatialPoint::new(91.0, 0.0), 5).is_err());
        assert!(encode_geohash(SpatialPoint::new(f64::NAN, 0.0), 5).is_err());
    }
}
