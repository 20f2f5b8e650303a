// src/stream.rs

//! Byte stream abstraction for reading and writing PGF data structures.
//!
//! PGF files are little-endian throughout. The codec only needs four
//! primitives from a stream — read, write, tell and seek — so anything that
//! is `Read + Write + Seek` qualifies (`std::io::Cursor<Vec<u8>>`,
//! `std::fs::File`, ...).

use crate::utils::error::Result;
use bytemuck::{cast_slice, Pod, Zeroable};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Little-endian structured I/O over a seekable byte stream.
pub trait PgfStream: Read + Write + Seek {
    fn read_u8(&mut self) -> Result<u8> {
        Ok(ReadBytesExt::read_u8(self)?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(ReadBytesExt::read_u16::<LittleEndian>(self)?)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(ReadBytesExt::read_u32::<LittleEndian>(self)?)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(WriteBytesExt::write_u8(self, value)?)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(WriteBytesExt::write_u16::<LittleEndian>(self, value)?)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(WriteBytesExt::write_u32::<LittleEndian>(self, value)?)
    }

    /// Current stream position in bytes.
    fn tell(&mut self) -> Result<u64> {
        Ok(self.stream_position()?)
    }

    /// Absolute reposition.
    fn set_pos(&mut self, pos: u64) -> Result<()> {
        self.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Stream length; restores the current position afterwards.
    fn stream_length(&mut self) -> Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    /// Write a slice of u32 values in little-endian format using bytemuck.
    fn write_u32_slice(&mut self, values: &[u32]) -> Result<()> {
        let le_values: Vec<LeU32> = values.iter().map(|&v| v.into()).collect();
        self.write_all(cast_slice(&le_values))?;
        Ok(())
    }

    /// Read a slice of u32 values in little-endian format using bytemuck.
    fn read_u32_slice(&mut self, count: usize) -> Result<Vec<u32>> {
        let mut buffer = vec![0u8; count * 4];
        self.read_exact(&mut buffer)?;
        let le_values: &[LeU32] = cast_slice(&buffer);
        Ok(le_values.iter().map(|&v| v.into()).collect())
    }
}

/// Blanket implementation for any seekable read/write stream.
impl<T: Read + Write + Seek> PgfStream for T {}

/// Little-endian u32 that can be safely cast to/from bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LeU32([u8; 4]);

/// Little-endian i32 that can be safely cast to/from bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LeI32([u8; 4]);

impl From<u32> for LeU32 {
    fn from(value: u32) -> Self {
        LeU32(value.to_le_bytes())
    }
}

impl From<LeU32> for u32 {
    fn from(value: LeU32) -> Self {
        u32::from_le_bytes(value.0)
    }
}

impl From<i32> for LeI32 {
    fn from(value: i32) -> Self {
        LeI32(value.to_le_bytes())
    }
}

impl From<LeI32> for i32 {
    fn from(value: LeI32) -> Self {
        i32::from_le_bytes(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_scalar_round_trip() {
        let mut s = Cursor::new(Vec::new());
        PgfStream::write_u8(&mut s, 0xAB).unwrap();
        PgfStream::write_u16(&mut s, 0x1234).unwrap();
        PgfStream::write_u32(&mut s, 0xDEADBEEF).unwrap();
        s.set_pos(0).unwrap();
        assert_eq!(PgfStream::read_u8(&mut s).unwrap(), 0xAB);
        assert_eq!(PgfStream::read_u16(&mut s).unwrap(), 0x1234);
        assert_eq!(PgfStream::read_u32(&mut s).unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut s = Cursor::new(Vec::new());
        PgfStream::write_u16(&mut s, 0x0102).unwrap();
        assert_eq!(s.get_ref().as_slice(), &[0x02, 0x01]);
    }

    #[test]
    fn test_u32_slice_round_trip() {
        let values = [0u32, 1, 0xFFFF_FFFF, 42];
        let mut s = Cursor::new(Vec::new());
        s.write_u32_slice(&values).unwrap();
        s.set_pos(0).unwrap();
        assert_eq!(s.read_u32_slice(4).unwrap(), values);
    }

    #[test]
    fn test_tell_and_seek() {
        let mut s = Cursor::new(Vec::new());
        PgfStream::write_u32(&mut s, 7).unwrap();
        assert_eq!(s.tell().unwrap(), 4);
        assert_eq!(s.stream_length().unwrap(), 4);
        s.set_pos(0).unwrap();
        assert_eq!(s.tell().unwrap(), 0);
    }
}
