//! C1 — Read context: a bounded cursor over a byte buffer plus primitive
//! and LEB128 decoders (spec.md §4.1). Generalizes the teacher's free
//! functions in `leb.rs` (which decoded straight off a `&[u8]`) into
//! cursor methods that also track file offset and can be bounded into
//! sub-contexts (`.debug_loc`/`.debug_ranges` entries, location-expression
//! blocks).

use crate::leb128::{sleb128_decode, uleb128_decode, LebOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    Eof,
    OutOfBounds,
    BadUtf8,
    Leb128Truncated,
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Whether a ULEB128/SLEB128 read was minimal or "bloated" (used more
/// continuation bytes than necessary — spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leb<T> {
    Ok(T),
    Bloated(T),
}

impl<T> Leb<T> {
    pub fn value(&self) -> &T {
        match self {
            Leb::Ok(v) | Leb::Bloated(v) => v,
        }
    }

    pub fn is_bloated(&self) -> bool {
        matches!(self, Leb::Bloated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadContext<'a> {
    buf: &'a [u8],
    /// Offset, within `buf`, of the file position this section begins at.
    /// Added to `pos` to recover a "file offset" per spec.md §3; for
    /// sub-sections this is the section's own base, not 0.
    file_base: u64,
    begin: usize,
    end: usize,
    pos: usize,
    pub big_endian: bool,
}

impl<'a> ReadContext<'a> {
    pub fn init(buf: &'a [u8], file_base: u64, big_endian: bool) -> Self {
        ReadContext {
            buf,
            file_base,
            begin: 0,
            end: buf.len(),
            pos: 0,
            big_endian,
        }
    }

    /// Create a sub-context bounded by `[begin, end)` relative to this
    /// context's own `[begin, end)`. Fails if the requested bounds fall
    /// outside the parent's.
    pub fn init_sub(&self, begin: usize, end: usize) -> ReadResult<ReadContext<'a>> {
        if begin > end || self.begin + end > self.end {
            return Err(ReadError::OutOfBounds);
        }
        Ok(ReadContext {
            buf: self.buf,
            file_base: self.file_base + begin as u64,
            begin: self.begin + begin,
            end: self.begin + end,
            pos: self.begin + begin,
            big_endian: self.big_endian,
        })
    }

    pub fn need_data(&self, n: usize) -> bool {
        self.pos + n <= self.end
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.end
    }

    /// Offset of the cursor relative to the start of this (sub-)context —
    /// what spec.md calls the section-local coordinate used in `Where`.
    pub fn get_offset(&self) -> u64 {
        (self.pos - self.begin) as u64
    }

    /// Absolute file offset of the cursor.
    pub fn file_offset(&self) -> u64 {
        self.file_base + self.get_offset()
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn skip(&mut self, n: usize) -> ReadResult<()> {
        if !self.need_data(n) {
            return Err(ReadError::Eof);
        }
        self.pos += n;
        Ok(())
    }

    fn take(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        if !self.need_data(n) {
            return Err(ReadError::Eof);
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn ubyte(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> ReadResult<u16> {
        let b: [u8; 2] = self.take(2)?.try_into().unwrap();
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    pub fn u32(&mut self) -> ReadResult<u32> {
        let b: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    pub fn u64(&mut self) -> ReadResult<u64> {
        let b: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(if self.big_endian {
            u64::from_be_bytes(b)
        } else {
            u64::from_le_bytes(b)
        })
    }

    /// Reads a fixed-width unsigned value of 1, 2, 4, or 8 bytes.
    pub fn var(&mut self, width: u8) -> ReadResult<u64> {
        match width {
            1 => self.ubyte().map(u64::from),
            2 => self.u16().map(u64::from),
            4 => self.u32().map(u64::from),
            8 => self.u64(),
            _ => Err(ReadError::OutOfBounds),
        }
    }

    /// An "initial-length"-style offset: 4 bytes for 32-bit DWARF, 8 for
    /// 64-bit DWARF (spec.md §3, §8 CU-length escape handling is done by
    /// the caller; this just reads the chosen width).
    pub fn offset(&mut self, dwarf64: bool) -> ReadResult<u64> {
        if dwarf64 {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    /// A NUL-terminated byte string, returned without the terminator.
    pub fn str(&mut self) -> ReadResult<&'a str> {
        let start = self.pos;
        loop {
            if self.eof() {
                return Err(ReadError::Eof);
            }
            let b = self.buf[self.pos];
            self.pos += 1;
            if b == 0 {
                break;
            }
        }
        std::str::from_utf8(&self.buf[start..self.pos - 1]).map_err(|_| ReadError::BadUtf8)
    }

    pub fn uleb128(&mut self) -> ReadResult<Leb<u64>> {
        match uleb128_decode(&self.buf[self.pos..self.end]) {
            LebOutcome::Ok(v, n) => {
                self.pos += n;
                Ok(Leb::Ok(v))
            }
            LebOutcome::Bloated(v, n) => {
                self.pos += n;
                Ok(Leb::Bloated(v))
            }
            LebOutcome::Error => Err(ReadError::Leb128Truncated),
        }
    }

    pub fn sleb128(&mut self) -> ReadResult<Leb<i64>> {
        match sleb128_decode(&self.buf[self.pos..self.end]) {
            LebOutcome::Ok(v, n) => {
                self.pos += n;
                Ok(Leb::Ok(v))
            }
            LebOutcome::Bloated(v, n) => {
                self.pos += n;
                Ok(Leb::Bloated(v))
            }
            LebOutcome::Error => Err(ReadError::Leb128Truncated),
        }
    }

    pub fn peek_bytes(&self, n: usize) -> ReadResult<&'a [u8]> {
        if !self.need_data(n) {
            return Err(ReadError::Eof);
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    pub fn as_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..self.end]
    }
}
