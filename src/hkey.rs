//! Fixed binary framing for hashed keys and payload-length prefixes.
//!
//! The on-disk layout is two 64-bit big-endian halves (high half first),
//! chosen explicitly rather than relying on the host's native byte order:
//! this keeps the frame format reproducible in tests regardless of the
//! build host, even though the spec only requires consistency within a
//! single process's own temporary files.

use crate::config::HKEY_SIZE_BYTES;

/// Encodes a 128-bit hashed key as a fixed 16-byte frame.
#[inline]
pub fn encode_hkey(hkey: u128) -> [u8; HKEY_SIZE_BYTES] {
    let hi = ((hkey >> 64) & u128::from(u64::MAX)) as u64;
    let lo = (hkey & u128::from(u64::MAX)) as u64;
    let mut buf = [0u8; HKEY_SIZE_BYTES];
    buf[0..8].copy_from_slice(&hi.to_be_bytes());
    buf[8..16].copy_from_slice(&lo.to_be_bytes());
    buf
}

/// Decodes a 128-bit hashed key from its fixed 16-byte frame.
#[inline]
pub fn decode_hkey(buf: &[u8; HKEY_SIZE_BYTES]) -> u128 {
    let hi = u64::from_be_bytes(buf[0..8].try_into().unwrap());
    let lo = u64::from_be_bytes(buf[8..16].try_into().unwrap());
    (u128::from(hi) << 64) | u128::from(lo)
}

/// Encodes a payload length as a fixed 8-byte frame.
#[inline]
pub fn encode_len(len: u64) -> [u8; 8] {
    len.to_be_bytes()
}

/// Decodes a payload length from its fixed 8-byte frame.
#[inline]
pub fn decode_len(buf: &[u8; 8]) -> u64 {
    u64::from_be_bytes(*buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_boundary_values() {
        for hkey in [0u128, 1, u64::MAX as u128, u128::MAX, 1u128 << 127] {
            assert_eq!(decode_hkey(&encode_hkey(hkey)), hkey);
        }
    }

    #[test]
    fn round_trips_len() {
        for len in [0u64, 1, u32::MAX as u64, u64::MAX] {
            assert_eq!(decode_len(&encode_len(len)), len);
        }
    }

    #[test]
    fn hkey_frame_is_high_half_first() {
        let hkey = (7u128 << 64) | 3u128;
        let buf = encode_hkey(hkey);
        assert_eq!(&buf[0..8], &7u64.to_be_bytes());
        assert_eq!(&buf[8..16], &3u64.to_be_bytes());
    }
}
