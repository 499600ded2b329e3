//! A single-pass, peek-one-ahead reader over a byte slice.
//!
//! `ByteCursor` is the leaf of the library: it knows nothing about sockets,
//! fragmentation or the A2S wire format, only how to pull fixed-width
//! integers, floats and NUL-terminated strings off a buffer without ever
//! reading past its end.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

/// Errors a [`ByteCursor`] can raise. These carry no endpoint context —
/// callers that know which server produced the buffer attach that via
/// `Error::from_decode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("buffer truncated while reading")]
    Truncated,

    #[error("string ran off the end of the buffer before a NUL terminator")]
    StringTruncated,

    #[error("invalid utf-8 in string field")]
    Encoding,
}

type Result<T> = std::result::Result<T, CursorError>;

pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    peek: Option<u8>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteCursor {
            buf,
            pos: 0,
            peek: buf.first().copied(),
        }
    }

    /// Consumes and returns the current byte, refilling `peek`. `None` at EOF.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek?;
        self.pos += 1;
        self.peek = self.buf.get(self.pos).copied();
        Some(byte)
    }

    /// True once `peek` is exhausted; no further byte is available.
    pub fn is_empty(&self) -> bool {
        self.peek.is_none()
    }

    /// Bytes not yet consumed, as a slice over the original buffer.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(CursorError::Truncated);
        }
        let start = self.pos;
        for _ in 0..n {
            self.advance();
        }
        Ok(&self.buf[start..start + n])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.advance().ok_or(CursorError::Truncated)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// 32-bit IEEE-754 little-endian float.
    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Generic integer read: `bits` must be a multiple of 8. Widens into an
    /// `i128` so callers can sign-extend or mask to whatever width the
    /// protocol field actually needs (kept for parity with the `read_int`
    /// primitive described by the wire format; the typed helpers above cover
    /// everything the decoders actually use).
    pub fn read_int(&mut self, bits: u32, signed: bool, big_endian: bool) -> Result<i128> {
        assert_eq!(bits % 8, 0, "bits must be a multiple of 8");
        let n = (bits / 8) as usize;
        let bytes = self.take(n)?;

        let mut value: u128 = 0;
        if big_endian {
            for b in bytes {
                value = (value << 8) | (*b as u128);
            }
        } else {
            for b in bytes.iter().rev() {
                value = (value << 8) | (*b as u128);
            }
        }

        if signed && bits < 128 {
            let sign_bit = 1u128 << (bits - 1);
            if value & sign_bit != 0 {
                value |= !0u128 << bits;
            }
        }

        Ok(value as i128)
    }

    /// Consumes bytes until a NUL terminator, interpreting the prefix as
    /// UTF-8 and consuming the terminator itself.
    pub fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None => return Err(CursorError::StringTruncated),
                Some(0) => break,
                Some(b) => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|_| CursorError::Encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_width_integers() {
        let mut cur = ByteCursor::new(&[0x01, 0x02, 0xFF, 0xFF]);
        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.read_u8().unwrap(), 0x02);
        assert_eq!(cur.read_i16_le().unwrap(), -1);
        assert!(cur.is_empty());
    }

    #[test]
    fn reads_big_endian_port_like_the_master_server_does() {
        let mut cur = ByteCursor::new(&[0x69, 0x87]);
        assert_eq!(cur.read_u16_be().unwrap(), 0x6987);
    }

    #[test]
    fn truncated_read_is_an_error_not_junk() {
        let mut cur = ByteCursor::new(&[0x01]);
        assert_eq!(cur.read_u16_le(), Err(CursorError::Truncated));
        // the short read must not have consumed the one byte that was there
        assert_eq!(cur.read_u8(), Ok(0x01));
        assert_eq!(cur.read_u8(), Err(CursorError::Truncated));
    }

    #[test]
    fn cstring_reads_up_to_terminator() {
        let mut cur = ByteCursor::new(b"hello\0world");
        assert_eq!(cur.read_cstring().unwrap(), "hello");
        assert_eq!(cur.remaining_slice(), b"world");
    }

    #[test]
    fn cstring_without_terminator_is_truncated() {
        let mut cur = ByteCursor::new(b"hello");
        assert_eq!(cur.read_cstring(), Err(CursorError::StringTruncated));
    }

    #[test]
    fn cstring_rejects_invalid_utf8() {
        let mut cur = ByteCursor::new(&[0xFF, 0xFE, 0x00]);
        assert_eq!(cur.read_cstring(), Err(CursorError::Encoding));
    }

    #[test]
    fn read_int_sign_extends() {
        let mut cur = ByteCursor::new(&[0xFF]);
        assert_eq!(cur.read_int(8, true, false).unwrap(), -1);
        let mut cur = ByteCursor::new(&[0xFF]);
        assert_eq!(cur.read_int(8, false, false).unwrap(), 255);
    }

    #[test]
    fn read_int_big_endian_matches_master_port_encoding() {
        let mut cur = ByteCursor::new(&[0x69, 0x87]);
        assert_eq!(cur.read_int(16, false, true).unwrap(), 0x6987);
    }
}
