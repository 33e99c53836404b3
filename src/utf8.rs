#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
#[inline]
pub fn validate(bytes: &[u8]) -> Option<&str> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).ok()
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).ok()
    }
}

/// Largest `n <= max` such that `bytes[..n]` does not end inside a multi-byte sequence.
///
/// Assumes `bytes` is well-formed UTF-8 as a whole.
#[inline]
pub fn boundary_at_or_before(bytes: &[u8], max: usize) -> usize {
    if max >= bytes.len() {
        return bytes.len();
    }
    let mut n = max;
    while n > 0 && is_continuation(bytes[n]) {
        n -= 1;
    }
    n
}

#[inline]
pub const fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_backs_off_continuation_bytes() {
        let s = "aé€".as_bytes();
        assert_eq!(boundary_at_or_before(s, 2), 1);
        assert_eq!(boundary_at_or_before(s, 3), 3);
        assert_eq!(boundary_at_or_before(s, 5), 3);
        assert_eq!(boundary_at_or_before(s, 100), s.len());
    }

    #[test]
    fn rejects_invalid_sequences() {
        assert!(validate(&[0xff, 0x41]).is_none());
        assert_eq!(validate(b"ok"), Some("ok"));
    }
}
