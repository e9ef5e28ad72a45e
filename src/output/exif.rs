//! Minimal EXIF writer: one APP1 segment carrying author/software tags.
//!
//! Layout is a big-endian TIFF structure with IFD0 (Software, Artist,
//! Copyright and the Exif IFD pointer) followed by the Exif IFD
//! (ExifVersion, UserComment). Values longer than four bytes live right
//! after the IFD that references them.

use crate::config::MetadataConfig;
use crate::error::{OutputError, Result};

const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_EXIF_VERSION: u16 = 0x9000;
const TAG_USER_COMMENT: u16 = 0x9286;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;

const TIFF_HEADER_LEN: u32 = 8;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        Self { tag, kind: TYPE_ASCII, count: data.len() as u32, data }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self { tag, kind: TYPE_LONG, count: 1, data: value.to_be_bytes().to_vec() }
    }

    fn undefined(tag: u16, data: Vec<u8>) -> Self {
        Self { tag, kind: TYPE_UNDEFINED, count: data.len() as u32, data }
    }

    /// Bytes this entry occupies outside the IFD (word aligned)
    fn spill_len(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

fn ifd_len(entries: &[Entry]) -> usize {
    2 + 12 * entries.len() + 4 + entries.iter().map(Entry::spill_len).sum::<usize>()
}

/// Append an IFD located at `offset` (relative to the TIFF header) and its
/// out-of-line values; entries must already be sorted by tag
fn write_ifd(out: &mut Vec<u8>, entries: &[Entry], offset: u32) {
    let mut data_offset = offset + 2 + 12 * entries.len() as u32 + 4;
    let mut spill = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_be_bytes());
        out.extend_from_slice(&entry.kind.to_be_bytes());
        out.extend_from_slice(&entry.count.to_be_bytes());
        if entry.data.len() <= 4 {
            let mut inline = entry.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&data_offset.to_be_bytes());
            spill.extend_from_slice(&entry.data);
            if entry.data.len() % 2 == 1 {
                spill.push(0);
            }
            data_offset += entry.spill_len() as u32;
        }
    }
    // No next IFD
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&spill);
}

/// Build a complete APP1 segment (marker, length, `Exif\0\0`, TIFF data)
pub fn build_app1(metadata: &MetadataConfig) -> Result<Vec<u8>> {
    let mut user_comment = b"ASCII\0\0\0".to_vec();
    user_comment.extend_from_slice(metadata.comment.as_bytes());

    let mut ifd0 = vec![
        Entry::ascii(TAG_SOFTWARE, &metadata.software),
        Entry::ascii(TAG_ARTIST, &metadata.artist),
        Entry::ascii(TAG_COPYRIGHT, &metadata.copyright),
        Entry::long(TAG_EXIF_IFD, 0),
    ];
    let exif_offset = TIFF_HEADER_LEN + ifd_len(&ifd0) as u32;
    if let Some(pointer) = ifd0.last_mut() {
        pointer.data = exif_offset.to_be_bytes().to_vec();
    }

    let exif_ifd = vec![
        Entry::undefined(TAG_EXIF_VERSION, b"0230".to_vec()),
        Entry::undefined(TAG_USER_COMMENT, user_comment),
    ];

    let mut tiff = Vec::with_capacity(exif_offset as usize + ifd_len(&exif_ifd));
    tiff.extend_from_slice(b"MM\0\x2A");
    tiff.extend_from_slice(&TIFF_HEADER_LEN.to_be_bytes());
    write_ifd(&mut tiff, &ifd0, TIFF_HEADER_LEN);
    write_ifd(&mut tiff, &exif_ifd, exif_offset);

    let segment_len = 2 + 6 + tiff.len();
    if segment_len > u16::MAX as usize {
        return Err(OutputError::Encode {
            reason: format!("EXIF metadata is {} bytes, larger than one APP1 segment", segment_len),
        }
        .into());
    }

    let mut segment = Vec::with_capacity(2 + segment_len);
    segment.extend_from_slice(&[0xFF, 0xE1]);
    segment.extend_from_slice(&(segment_len as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\0\0");
    segment.extend_from_slice(&tiff);
    Ok(segment)
}

/// Splice an APP1 segment into a JPEG stream, after the JFIF APP0 header
/// when there is one, otherwise right after SOI
pub fn insert_app1(jpeg: &[u8], app1: &[u8]) -> Result<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[0..2] != [0xFFu8, 0xD8] {
        return Err(OutputError::Encode {
            reason: "encoder output is not a JPEG stream".to_string(),
        }
        .into());
    }

    let mut insert_at = 2;
    if jpeg[2..4] == [0xFFu8, 0xE0] && jpeg.len() >= 6 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        if 4 + app0_len <= jpeg.len() {
            insert_at = 4 + app0_len;
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(app1);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExposureError;

    fn be16(data: &[u8], at: usize) -> u16 {
        u16::from_be_bytes([data[at], data[at + 1]])
    }

    fn be32(data: &[u8], at: usize) -> u32 {
        u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    /// (tag, type, count, raw value bytes) for every entry of the IFD at `offset`
    fn read_ifd(tiff: &[u8], offset: usize) -> Vec<(u16, u16, u32, Vec<u8>)> {
        let count = be16(tiff, offset) as usize;
        (0..count)
            .map(|i| {
                let at = offset + 2 + i * 12;
                let tag = be16(tiff, at);
                let kind = be16(tiff, at + 2);
                let n = be32(tiff, at + 4);
                let len = n as usize * if kind == TYPE_LONG { 4 } else { 1 };
                let value = if len <= 4 {
                    tiff[at + 8..at + 8 + len].to_vec()
                } else {
                    let start = be32(tiff, at + 8) as usize;
                    tiff[start..start + len].to_vec()
                };
                (tag, kind, n, value)
            })
            .collect()
    }

    fn sample() -> MetadataConfig {
        MetadataConfig {
            artist: "Jane Doe".to_string(),
            copyright: "Jane Doe 2026".to_string(),
            software: "long-exposure test".to_string(),
            comment: "night sky".to_string(),
        }
    }

    #[test]
    fn test_app1_layout() {
        let segment = build_app1(&sample()).unwrap();
        assert_eq!(&segment[0..2], &[0xFF, 0xE1]);
        assert_eq!(be16(&segment, 2) as usize, segment.len() - 2);
        assert_eq!(&segment[4..10], b"Exif\0\0");

        let tiff = &segment[10..];
        assert_eq!(&tiff[0..4], b"MM\0\x2A");
        assert_eq!(be32(tiff, 4), 8);

        let ifd0 = read_ifd(tiff, 8);
        let tags: Vec<u16> = ifd0.iter().map(|e| e.0).collect();
        assert_eq!(tags, vec![TAG_SOFTWARE, TAG_ARTIST, TAG_COPYRIGHT, TAG_EXIF_IFD]);
        assert_eq!(ifd0[0].3, b"long-exposure test\0");
        assert_eq!(ifd0[1].3, b"Jane Doe\0");
        assert_eq!(ifd0[2].3, b"Jane Doe 2026\0");

        let exif_offset = be32(&ifd0[3].3, 0) as usize;
        let exif = read_ifd(tiff, exif_offset);
        assert_eq!(exif[0].0, TAG_EXIF_VERSION);
        assert_eq!(exif[0].3, b"0230");
        assert_eq!(exif[1].0, TAG_USER_COMMENT);
        assert_eq!(exif[1].3, b"ASCII\0\0\0night sky");
    }

    #[test]
    fn test_insert_after_app0() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xDB, 0xFF, 0xD9];
        let app1 = [0xFF, 0xE1, 0x00, 0x02];
        let out = insert_app1(&jpeg, &app1).unwrap();
        assert_eq!(
            out,
            vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xE1, 0x00, 0x02, 0xFF, 0xDB, 0xFF, 0xD9]
        );
    }

    #[test]
    fn test_insert_without_app0() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDB, 0xFF, 0xD9];
        let out = insert_app1(&jpeg, &[0xFF, 0xE1, 0x00, 0x02]).unwrap();
        assert_eq!(&out[..6], &[0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x02]);
    }

    #[test]
    fn test_rejects_non_jpeg() {
        let err = insert_app1(b"\x89PNG\r\n", &[]).unwrap_err();
        assert!(matches!(err, ExposureError::Output(OutputError::Encode { .. })));
    }

    #[test]
    fn test_oversized_comment() {
        let mut metadata = sample();
        metadata.comment = "x".repeat(70_000);
        assert!(build_app1(&metadata).is_err());
    }
}
