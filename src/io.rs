//! Binary scalar I/O.
//!
//! A thin pull/push interface over any [`std::io::Read`]/[`std::io::Write`],
//! fixed to big-endian ("network order") since that's what every CS file
//! uses. Built on [`byteorder`] the way most of the binary-format crates in
//! the wider ecosystem are, rather than hand-rolling `from_be_bytes` calls
//! per scalar type.
//!
//! The reader never buffers beyond what the caller asks for, so a CS
//! stream can be followed by other protocol bytes (e.g. a server
//! sending an ack byte right after the file) without data loss.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Reads big-endian scalars and byte strings from an underlying stream.
pub struct ByteReader<R: Read> {
    inner: R,
}

impl<R: Read> ByteReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the underlying reader directly, for callers (like the
    /// header codec handing off to the block registry) that need to
    /// read unframed bytes without another `ByteReader` layer in the way.
    pub(crate) fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn wrap_eof<T>(r: std::io::Result<T>, wanted: usize) -> Result<T> {
        r.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated { wanted, got: 0 }
            } else {
                Error::Io(e)
            }
        })
    }

    /// Read a single `i8`.
    pub fn read_i8(&mut self) -> Result<i8> {
        Self::wrap_eof(self.inner.read_i8(), 1)
    }

    /// Read a single `u8`.
    pub fn read_u8(&mut self) -> Result<u8> {
        Self::wrap_eof(self.inner.read_u8(), 1)
    }

    /// Read a single big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Self::wrap_eof(self.inner.read_i16::<BigEndian>(), 2)
    }

    /// Read a single big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Self::wrap_eof(self.inner.read_u16::<BigEndian>(), 2)
    }

    /// Read a single big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Self::wrap_eof(self.inner.read_i32::<BigEndian>(), 4)
    }

    /// Read a single big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Self::wrap_eof(self.inner.read_u32::<BigEndian>(), 4)
    }

    /// Read a single big-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Self::wrap_eof(self.inner.read_f32::<BigEndian>(), 4)
    }

    /// Read a single big-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        Self::wrap_eof(self.inner.read_f64::<BigEndian>(), 8)
    }

    /// Read `n` big-endian `f32`s.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        (0..n).map(|_| self.read_f32()).collect()
    }

    /// Read exactly `n` bytes. Fails with [`Error::Truncated`] if fewer
    /// remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated { wanted: n, got: 0 }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }

    /// Read a fixed-width string of exactly `n` bytes. Trailing NUL bytes
    /// are stripped; the remainder is decoded as Latin-1/ASCII (one byte
    /// per character, never multibyte).
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_bytes(n)?;
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        Ok(bytes[..end].iter().map(|&b| b as char).collect())
    }
}

/// Encode `s` as Latin-1 bytes, one byte per `char`, the exact mirror of
/// [`ByteReader::read_string`]'s `b as char` decode. Every string this
/// crate produces either came from `read_string` (so every char is
/// already `<= 0xFF`) or is a plain ASCII literal, so this never loses
/// information in practice; a char outside that range is truncated to
/// its low byte rather than re-encoded as multi-byte UTF-8, since
/// on-wire strings in this format are never UTF-8.
pub(crate) fn latin1_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u8).collect()
}

/// Writes big-endian scalars and byte strings to an underlying stream.
pub struct ByteWriter<W: Write> {
    inner: W,
}

impl<W: Write> ByteWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a single `i8`.
    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        Ok(self.inner.write_i8(v)?)
    }

    /// Write a single `u8`.
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        Ok(self.inner.write_u8(v)?)
    }

    /// Write a single big-endian `i16`.
    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        Ok(self.inner.write_i16::<BigEndian>(v)?)
    }

    /// Write a single big-endian `u16`.
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        Ok(self.inner.write_u16::<BigEndian>(v)?)
    }

    /// Write a single big-endian `i32`.
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        Ok(self.inner.write_i32::<BigEndian>(v)?)
    }

    /// Write a single big-endian `u32`.
    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        Ok(self.inner.write_u32::<BigEndian>(v)?)
    }

    /// Write a single big-endian `f32`.
    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        Ok(self.inner.write_f32::<BigEndian>(v)?)
    }

    /// Write a single big-endian `f64`.
    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        Ok(self.inner.write_f64::<BigEndian>(v)?)
    }

    /// Write a slice of big-endian `f32`s.
    pub fn write_f32_slice(&mut self, v: &[f32]) -> Result<()> {
        for &x in v {
            self.write_f32(x)?;
        }
        Ok(())
    }

    /// Write raw bytes verbatim. The caller controls any padding or length
    /// conventions.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        Ok(self.inner.write_all(v)?)
    }

    /// Write a string's bytes raw (Latin-1, matching [`ByteReader::read_string`]),
    /// with no length prefix and no NUL padding; the caller is responsible
    /// for framing.
    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_bytes(&latin1_bytes(v))
    }
}
