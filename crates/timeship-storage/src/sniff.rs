// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Media-type sniffing from leading content bytes.
//!
//! The upstream filesystem records no MIME types, so the server classifies
//! the first [`SNIFF_LEN`] bytes against the well-known content-sniffing
//! table. Signatures are matched in order; the text probe runs last, and
//! anything that still looks binary is `application/octet-stream`.

/// Number of leading bytes considered by the classifier
pub const SNIFF_LEN: usize = 512;

/// Classify `data` (at most the first [`SNIFF_LEN`] bytes are considered).
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());

    for signature in SIGNATURES {
        if let Some(content_type) = signature.matches(data, first_non_ws) {
            return content_type;
        }
    }
    "application/octet-stream"
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

enum Signature {
    /// Literal prefix
    Exact(&'static [u8], &'static str),
    /// Byte-wise `data[i] & mask[i] == pattern[i]`
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        content_type: &'static str,
    },
    /// Masked match applied after leading whitespace
    MaskedWs {
        mask: &'static [u8],
        pattern: &'static [u8],
        content_type: &'static str,
    },
    /// Case-insensitive HTML tag after leading whitespace, terminated by
    /// a space or `>`
    Html(&'static [u8]),
    /// ISO BMFF `ftyp` box
    Mp4,
    /// No binary bytes anywhere in the probe
    Text,
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Exact(prefix, content_type) => {
                data.starts_with(prefix).then_some(*content_type)
            }
            Signature::Masked {
                mask,
                pattern,
                content_type,
            } => masked_match(data, mask, pattern).then_some(*content_type),
            Signature::MaskedWs {
                mask,
                pattern,
                content_type,
            } => masked_match(&data[first_non_ws.min(data.len())..], mask, pattern)
                .then_some(*content_type),
            Signature::Html(tag) => {
                let data = &data[first_non_ws.min(data.len())..];
                // One byte beyond the tag is required for the terminator.
                if data.len() <= tag.len() {
                    return None;
                }
                for (expected, actual) in tag.iter().zip(data) {
                    let actual = if expected.is_ascii_uppercase() {
                        actual.to_ascii_uppercase()
                    } else {
                        *actual
                    };
                    if actual != *expected {
                        return None;
                    }
                }
                let terminator = data[tag.len()];
                (terminator == b' ' || terminator == b'>')
                    .then_some("text/html; charset=utf-8")
            }
            Signature::Mp4 => {
                (data.len() >= 12 && &data[4..8] == b"ftyp").then_some("video/mp4")
            }
            Signature::Text => {
                let data = &data[first_non_ws.min(data.len())..];
                let binary = data.iter().any(|&b| {
                    b <= 0x08 || b == 0x0B || (0x0E..=0x1A).contains(&b) || (0x1C..=0x1F).contains(&b)
                });
                (!binary).then_some("text/plain; charset=utf-8")
            }
        }
    }
}

fn masked_match(data: &[u8], mask: &[u8], pattern: &[u8]) -> bool {
    if data.len() < mask.len() {
        return false;
    }
    mask.iter()
        .zip(pattern)
        .zip(data)
        .all(|((m, p), d)| d & m == *p)
}

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::MaskedWs {
        mask: b"\xFF\xFF\xFF\xFF",
        pattern: b"<!--",
        content_type: "text/html; charset=utf-8",
    },
    Signature::MaskedWs {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        content_type: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    // UTF byte-order marks
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        content_type: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        content_type: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        content_type: "text/plain; charset=utf-8",
    },
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Exact(b"\x89PNG\r\n\x1a\n", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBP",
        content_type: "image/webp",
    },
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b".snd", "audio/basic"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        content_type: "audio/aiff",
    },
    Signature::Exact(b"ID3", "audio/mpeg"),
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        content_type: "video/avi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        content_type: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    Signature::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Signature::Exact(b"OTTO", "font/otf"),
    Signature::Exact(b"ttcf", "font/collection"),
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00asm", "application/wasm"),
    Signature::Text,
];
