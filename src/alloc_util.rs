use alloc::vec::Vec;
use core::alloc::Layout;

#[inline]
fn check_reserve_len<T>(len: usize, additional: usize) -> bool {
    len.checked_add(additional)
        .is_some_and(|needed| Layout::array::<T>(needed).is_ok())
}

/// Reserve room for `additional` more elements without aborting on failure.
#[inline]
pub fn try_reserve<T>(v: &mut Vec<T>, additional: usize) -> bool {
    match v.len().checked_add(additional) {
        Some(needed) if needed <= v.capacity() => true,
        Some(_) => check_reserve_len::<T>(v.len(), additional) && v.try_reserve(additional).is_ok(),
        None => false,
    }
}

/// Append `bytes`, growing fallibly.
#[inline]
pub fn try_extend(v: &mut Vec<u8>, bytes: &[u8]) -> bool {
    if !try_reserve(v, bytes.len()) {
        return false;
    }
    v.extend_from_slice(bytes);
    true
}

/// Append `bytes` unless the result would exceed `max` bytes.
#[inline]
pub fn try_extend_bounded(v: &mut Vec<u8>, bytes: &[u8], max: usize) -> bool {
    match v.len().checked_add(bytes.len()) {
        Some(total) if total <= max => try_extend(v, bytes),
        _ => false,
    }
}
