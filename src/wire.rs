use crate::error::ReadError;

#[cfg(feature = "alloc")]
use crate::alloc_util::try_reserve;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

pub const AI_INDEFINITE: u8 = 31;
pub const BREAK: u8 = 0xff;

pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NULL: u8 = 22;

pub fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8, ReadError> {
    let b = *data.get(*pos).ok_or(ReadError::UnexpectedEnd)?;
    *pos += 1;
    Ok(b)
}

pub fn read_exact<'a>(data: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], ReadError> {
    let end = pos.checked_add(n).ok_or(ReadError::UnexpectedEnd)?;
    if end > data.len() {
        return Err(ReadError::UnexpectedEnd);
    }
    let s = &data[*pos..end];
    *pos = end;
    Ok(s)
}

pub fn read_be_u16(data: &[u8], pos: &mut usize) -> Result<u16, ReadError> {
    let s = read_exact(data, pos, 2)?;
    Ok(u16::from_be_bytes([s[0], s[1]]))
}

pub fn read_be_u32(data: &[u8], pos: &mut usize) -> Result<u32, ReadError> {
    let s = read_exact(data, pos, 4)?;
    Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
}

pub fn read_be_u64(data: &[u8], pos: &mut usize) -> Result<u64, ReadError> {
    let s = read_exact(data, pos, 8)?;
    Ok(u64::from_be_bytes([
        s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
    ]))
}

/// Reads the argument that follows an initial byte with additional info `ai`.
///
/// Non-shortest encodings are accepted.
pub fn read_argument(data: &[u8], pos: &mut usize, ai: u8) -> Result<u64, ReadError> {
    match ai {
        0..=23 => Ok(u64::from(ai)),
        24 => Ok(u64::from(read_u8(data, pos)?)),
        25 => Ok(u64::from(read_be_u16(data, pos)?)),
        26 => Ok(u64::from(read_be_u32(data, pos)?)),
        27 => read_be_u64(data, pos),
        _ => Err(ReadError::UnexpectedSymbol),
    }
}

pub fn len_to_usize(len: u64) -> Result<usize, ReadError> {
    usize::try_from(len).map_err(|_| ReadError::UnexpectedEnd)
}

/// Decodes an IEEE 754 half-precision float.
#[allow(clippy::cast_precision_loss)]
pub fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 == 0 { 1.0 } else { -1.0 };
    let exp = (bits >> 10) & 0x1f;
    let mant = f64::from(bits & 0x3ff);
    let magnitude = match exp {
        0 => mant * (2f64).powi(-24),
        0x1f => {
            if mant == 0.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => (1.0 + mant / 1024.0) * (2f64).powi(i32::from(exp) - 15),
    };
    sign * magnitude
}

/// Stack with inline storage that spills to the heap when `alloc` is enabled.
pub struct SmallStack<T: Copy, const N: usize> {
    inline: [T; N],
    len: usize,
    #[cfg(feature = "alloc")]
    overflow: Vec<T>,
    limit: usize,
}

impl<T: Copy, const N: usize> SmallStack<T, N> {
    pub const fn new(fill: T, limit: usize) -> Self {
        Self {
            inline: [fill; N],
            len: 0,
            #[cfg(feature = "alloc")]
            overflow: Vec::new(),
            limit,
        }
    }

    pub fn depth(&self) -> usize {
        #[cfg(feature = "alloc")]
        {
            self.len + self.overflow.len()
        }
        #[cfg(not(feature = "alloc"))]
        {
            self.len
        }
    }

    pub fn push(&mut self, value: T) -> Result<(), ReadError> {
        if self.depth() > self.limit {
            return Err(ReadError::NestingTooDeep);
        }

        #[cfg(feature = "alloc")]
        {
            if !self.overflow.is_empty() {
                if !try_reserve(&mut self.overflow, 1) {
                    return Err(ReadError::NestingTooDeep);
                }
                self.overflow.push(value);
                return Ok(());
            }
        }

        if self.len < N {
            self.inline[self.len] = value;
            self.len += 1;
            return Ok(());
        }

        #[cfg(feature = "alloc")]
        {
            if !try_reserve(&mut self.overflow, 1) {
                return Err(ReadError::NestingTooDeep);
            }
            self.overflow.push(value);
            Ok(())
        }

        #[cfg(not(feature = "alloc"))]
        {
            Err(ReadError::NestingTooDeep)
        }
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        #[cfg(feature = "alloc")]
        {
            if let Some(v) = self.overflow.last_mut() {
                return Some(v);
            }
        }
        if self.len == 0 {
            None
        } else {
            Some(&mut self.inline[self.len - 1])
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        #[cfg(feature = "alloc")]
        {
            if let Some(v) = self.overflow.pop() {
                return Some(v);
            }
        }
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(self.inline[self.len])
        }
    }
}

#[derive(Clone, Copy)]
enum Pending {
    Items(u64),
    UntilBreak,
}

/// Skips one CBOR item starting at `start` and returns the position after it.
///
/// Indefinite-length strings, arrays and maps are accepted; tags are skipped together with
/// their content. Nesting deeper than `max_depth` fails with `NestingTooDeep`.
pub fn skip_item(data: &[u8], start: usize, max_depth: usize) -> Result<usize, ReadError> {
    let mut pos = start;
    let mut stack = SmallStack::<Pending, 16>::new(Pending::Items(0), max_depth);
    stack.push(Pending::Items(1))?;

    while let Some(top) = stack.peek_mut() {
        match *top {
            Pending::Items(0) => {
                stack.pop();
                continue;
            }
            Pending::Items(n) => *top = Pending::Items(n - 1),
            Pending::UntilBreak => {
                if data.get(pos) == Some(&BREAK) {
                    pos += 1;
                    stack.pop();
                    continue;
                }
            }
        }

        let ib = read_u8(data, &mut pos)?;
        let major = ib >> 5;
        let ai = ib & 0x1f;

        match major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => {
                read_argument(data, &mut pos, ai)?;
            }
            MAJOR_BYTES | MAJOR_TEXT => {
                if ai == AI_INDEFINITE {
                    stack.push(Pending::UntilBreak)?;
                } else {
                    let len = len_to_usize(read_argument(data, &mut pos, ai)?)?;
                    read_exact(data, &mut pos, len)?;
                }
            }
            MAJOR_ARRAY | MAJOR_MAP => {
                if ai == AI_INDEFINITE {
                    stack.push(Pending::UntilBreak)?;
                } else {
                    let len = read_argument(data, &mut pos, ai)?;
                    let items = if major == MAJOR_MAP {
                        len.checked_mul(2).ok_or(ReadError::UnexpectedEnd)?
                    } else {
                        len
                    };
                    stack.push(Pending::Items(items))?;
                }
            }
            MAJOR_TAG => {
                read_argument(data, &mut pos, ai)?;
                stack.push(Pending::Items(1))?;
            }
            _ => match ai {
                0..=23 => {}
                24 => {
                    read_u8(data, &mut pos)?;
                }
                25 => {
                    read_be_u16(data, &mut pos)?;
                }
                26 => {
                    read_be_u32(data, &mut pos)?;
                }
                27 => {
                    read_be_u64(data, &mut pos)?;
                }
                _ => return Err(ReadError::UnexpectedSymbol),
            },
        }
    }

    Ok(pos)
}
