//! Shared helpers for integration tests: parses a sealed file back into its
//! chunk groups, chunks and footer.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use tsfile::format::{
    read_head, read_str, read_u8, Tail, CHUNK_GROUP_MARKER, CHUNK_MARKER, HEAD_SIZE, TAIL_SIZE,
};
use tsfile::{Chunk, FileFooter, Point, Result, TsFileError};

/// A chunk and the offset of its marker.
pub struct ParsedChunk {
    pub offset: u64,
    pub chunk: Chunk,
}

/// One device's chunk group.
pub struct ParsedGroup {
    pub device: String,
    pub chunks: Vec<ParsedChunk>,
}

/// A fully parsed sealed file.
pub struct ParsedFile {
    pub version: u8,
    pub groups: Vec<ParsedGroup>,
    pub footer: FileFooter,
    pub tail: Tail,
}

impl ParsedFile {
    /// Every chunk in file order.
    pub fn chunks(&self) -> impl Iterator<Item = &ParsedChunk> {
        self.groups.iter().flat_map(|g| g.chunks.iter())
    }

    /// Decodes every point of a series, following the footer index.
    pub fn points(&self, device: &str, measurement: &str) -> Vec<Point> {
        let entry = self
            .footer
            .find(device, measurement)
            .unwrap_or_else(|| panic!("{device}.{measurement} not in footer"));

        let mut points = Vec::new();
        for chunk_entry in &entry.chunks {
            let parsed = self
                .chunks()
                .find(|c| c.offset == chunk_entry.offset)
                .expect("footer offset points at a chunk");
            let (timestamps, values) = parsed.chunk.decode().unwrap();
            for (i, ts) in timestamps.into_iter().enumerate() {
                points.push(Point {
                    timestamp: ts,
                    value: values.get(i).unwrap(),
                });
            }
        }
        points
    }
}

/// Parses and validates a sealed file.
pub fn parse(bytes: &[u8]) -> Result<ParsedFile> {
    if bytes.len() < HEAD_SIZE + TAIL_SIZE {
        return Err(TsFileError::Corrupted(format!("file of {} bytes", bytes.len())));
    }

    let tail_start = bytes.len() - TAIL_SIZE;
    let tail_bytes: &[u8; TAIL_SIZE] = bytes[tail_start..].try_into().unwrap();
    let tail = Tail::from_bytes(tail_bytes)?;

    let actual = crc32fast::hash(&bytes[..tail_start]);
    if actual != tail.file_crc32 {
        return Err(TsFileError::ChecksumMismatch {
            expected: tail.file_crc32,
            actual,
        });
    }

    let footer_start = tail_start - tail.footer_len as usize;
    let footer = FileFooter::read_from(&mut &bytes[footer_start..tail_start])?;

    let mut cursor = Cursor::new(&bytes[..footer_start]);
    let version = read_head(&mut cursor)?;
    let mut groups: Vec<ParsedGroup> = Vec::new();
    while (cursor.position() as usize) < footer_start {
        let offset = cursor.position();
        match read_u8(&mut cursor)? {
            CHUNK_GROUP_MARKER => groups.push(ParsedGroup {
                device: read_str(&mut cursor)?,
                chunks: Vec::new(),
            }),
            CHUNK_MARKER => {
                let chunk = Chunk::read_from(&mut cursor)?;
                let group = groups
                    .last_mut()
                    .ok_or_else(|| TsFileError::Corrupted("chunk outside a group".into()))?;
                group.chunks.push(ParsedChunk { offset, chunk });
            }
            tag => {
                return Err(TsFileError::UnknownTag {
                    kind: "body marker",
                    tag,
                })
            }
        }
    }

    Ok(ParsedFile {
        version,
        groups,
        footer,
        tail,
    })
}

/// Reads and parses a sealed file from disk.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    let bytes = std::fs::read(path)?;
    parse(&bytes)
}
