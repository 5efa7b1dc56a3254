//! Content-type sniffing for uploaded packages
//!
//! Looks at no more than the first 512 bytes. Signatures cover what a chart
//! repository realistically receives: gzip'd tarballs, provenance files and
//! the odd JSON/YAML by mistake.

use std::io::{self, Read, Seek, SeekFrom};

/// Bytes inspected when sniffing
pub const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"%PDF-", "application/pdf"),
    (b"-----BEGIN PGP SIGNED MESSAGE-----", "text/plain; charset=utf-8"),
];

/// Detect the content type of `data`, falling back to `application/octet-stream`
pub fn detect(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *mime;
    }

    // ustar magic lives at offset 257 in the header block
    if data.len() >= 262 && &data[257..262] == b"ustar" {
        return "application/x-tar";
    }

    if data.is_empty() || !looks_like_text(data) {
        return OCTET_STREAM;
    }

    let trimmed = data.trim_ascii_start();
    if trimmed.starts_with(b"{") || trimmed.starts_with(b"[") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn looks_like_text(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| !matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f))
}

/// Sniff a seekable source, restoring its read position afterwards
pub fn sniff_reader<R: Read + Seek>(reader: &mut R) -> io::Result<&'static str> {
    let start = reader.stream_position()?;
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut buf)?;
    reader.seek(SeekFrom::Start(start))?;
    Ok(detect(&buf))
}
