//! On-disk layout constants and the fixed head and tail of a file.
//!
//! ## File Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Head (7 bytes)                                              │
//! │  - Magic: "TsFile" (6 bytes)                                 │
//! │  - Version: u8 (1 byte) = 1                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Chunk Groups (repeated)                                     │
//! │  - 0x00 marker + device id                                   │
//! │  - Chunks: 0x01 marker + chunk header + payload              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Footer                                                      │
//! │  - 0x02 marker + schema list + series index + bloom filter   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tail (14 bytes)                                             │
//! │  - File CRC32: u32 (4 bytes)                                 │
//! │  - Footer length: u32 (4 bytes)                              │
//! │  - Magic: "TsFile" (6 bytes)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All fixed-width fields are little-endian. Strings are a varint byte length
//! followed by UTF-8 bytes. A file without the trailing magic is unsealed and
//! must not be read as complete.

use crate::encoding::varint::MAX_VARINT_LEN;
use crate::error::{Result, TsFileError};
use std::io::{Read, Write};

/// Magic bytes at the start and end of every sealed file.
pub const MAGIC: [u8; 6] = *b"TsFile";

/// Current file format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the head in bytes.
pub const HEAD_SIZE: usize = MAGIC.len() + 1;

/// Size of the tail in bytes.
pub const TAIL_SIZE: usize = 4 + 4 + MAGIC.len();

/// Marker starting a chunk group.
pub const CHUNK_GROUP_MARKER: u8 = 0x00;

/// Marker starting a chunk.
pub const CHUNK_MARKER: u8 = 0x01;

/// Marker starting the footer.
pub const FOOTER_MARKER: u8 = 0x02;

/// Writes the file head.
pub fn write_head<W: Write>(writer: &mut W) -> Result<()> {
    // Magic (6 bytes)
    writer.write_all(&MAGIC)?;
    // Version (1 byte)
    writer.write_all(&[FORMAT_VERSION])?;
    Ok(())
}

/// Reads and validates the file head, returning the version.
///
/// # Errors
///
/// Returns `TsFileError::InvalidMagic` if the magic bytes don't match and
/// `TsFileError::UnsupportedVersion` if the version is newer than this crate.
pub fn read_head<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; HEAD_SIZE];
    reader.read_exact(&mut buf)?;

    if buf[..MAGIC.len()] != MAGIC {
        return Err(TsFileError::InvalidMagic(buf[..MAGIC.len()].to_vec()));
    }

    let version = buf[MAGIC.len()];
    if version > FORMAT_VERSION {
        return Err(TsFileError::UnsupportedVersion(version));
    }
    Ok(version)
}

/// The fixed-size tail that seals a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tail {
    /// CRC32 of every byte from offset 0 through the end of the footer.
    pub file_crc32: u32,
    /// Length of the footer, marker included.
    pub footer_len: u32,
}

impl Tail {
    /// Writes the tail, closing magic last.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        // File CRC32 (4 bytes)
        writer.write_all(&self.file_crc32.to_le_bytes())?;
        // Footer length (4 bytes)
        writer.write_all(&self.footer_len.to_le_bytes())?;
        // Magic (6 bytes)
        writer.write_all(&MAGIC)?;
        Ok(())
    }

    /// Parses the last [`TAIL_SIZE`] bytes of a file.
    ///
    /// # Errors
    ///
    /// Returns `TsFileError::InvalidMagic` if the closing magic is missing,
    /// which is the case for unsealed or aborted files.
    pub fn from_bytes(bytes: &[u8; TAIL_SIZE]) -> Result<Self> {
        let magic = &bytes[8..];
        if magic != MAGIC {
            return Err(TsFileError::InvalidMagic(magic.to_vec()));
        }
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[0..4]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[4..8]);
        Ok(Self {
            file_crc32: u32::from_le_bytes(crc),
            footer_len: u32::from_le_bytes(len),
        })
    }
}

/// Writes a varint length followed by the UTF-8 bytes of `s`.
pub fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let mut len = Vec::with_capacity(MAX_VARINT_LEN);
    crate::encoding::varint::encode_varint_u64(&mut len, s.len() as u64);
    writer.write_all(&len)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// Reads a string written by [`write_str`].
pub fn read_str<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_varint_u64(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| TsFileError::Corrupted(format!("invalid UTF-8: {e}")))
}

/// Reads an unsigned varint one byte at a time.
pub fn read_varint_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut raw = Vec::with_capacity(MAX_VARINT_LEN);
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        raw.push(byte[0]);
        if byte[0] & 0x80 == 0 || raw.len() == MAX_VARINT_LEN {
            break;
        }
    }
    crate::encoding::varint::decode_varint_u64(&mut raw.as_slice())
}

/// Reads a single tag byte.
pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a little-endian u32.
pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads a little-endian u64.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_head_roundtrip() {
        let mut buf = Vec::new();
        write_head(&mut buf).unwrap();
        assert_eq!(buf.len(), HEAD_SIZE);
        assert_eq!(&buf[..6], b"TsFile");

        let version = read_head(&mut Cursor::new(buf)).unwrap();
        assert_eq!(version, FORMAT_VERSION);
    }

    #[test]
    fn test_head_invalid_magic() {
        let buf = b"XXFile\x01".to_vec();
        let result = read_head(&mut Cursor::new(buf));
        assert!(matches!(result, Err(TsFileError::InvalidMagic(_))));
    }

    #[test]
    fn test_head_future_version() {
        let buf = b"TsFile\x09".to_vec();
        let result = read_head(&mut Cursor::new(buf));
        assert!(matches!(result, Err(TsFileError::UnsupportedVersion(9))));
    }

    #[test]
    fn test_tail_roundtrip() {
        let tail = Tail {
            file_crc32: 0x1234_5678,
            footer_len: 99,
        };
        let mut buf = Vec::new();
        tail.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), TAIL_SIZE);

        let bytes: [u8; TAIL_SIZE] = buf.try_into().unwrap();
        assert_eq!(Tail::from_bytes(&bytes).unwrap(), tail);
    }

    #[test]
    fn test_tail_missing_magic() {
        let bytes = [0u8; TAIL_SIZE];
        assert!(matches!(
            Tail::from_bytes(&bytes),
            Err(TsFileError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_str_roundtrip() {
        let mut buf = Vec::new();
        write_str(&mut buf, "root.sg1.d1").unwrap();
        write_str(&mut buf, "").unwrap();
        assert_eq!(buf[0], 11);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_str(&mut cursor).unwrap(), "root.sg1.d1");
        assert_eq!(read_str(&mut cursor).unwrap(), "");
    }
}
