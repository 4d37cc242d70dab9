//! Text Decoding
//!
//! Turns raw file bytes into text by trying a fixed list of encodings in
//! order, falling back to lossy UTF-8 when none of them decodes cleanly.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Label used when every strict attempt failed
pub const LOSSY_LABEL: &str = "utf-8 (lossy)";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 code points for bytes 0x80..=0x9F; `None` marks undefined bytes
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// A strict decoder in the trial list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// UTF-8 introduced by a byte-order mark, which is stripped
    Utf8Sig,
    Utf8,
    Latin1,
    Cp1252,
    Iso8859_1,
}

impl Codec {
    /// Trial order used by [`decode`]
    pub const FALLBACK_ORDER: [Codec; 5] = [
        Codec::Utf8Sig,
        Codec::Utf8,
        Codec::Latin1,
        Codec::Cp1252,
        Codec::Iso8859_1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Codec::Utf8Sig => "utf-8-sig",
            Codec::Utf8 => "utf-8",
            Codec::Latin1 => "latin-1",
            Codec::Cp1252 => "cp1252",
            Codec::Iso8859_1 => "iso-8859-1",
        }
    }

    /// Decode strictly, `None` if the bytes are not valid in this encoding
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Codec::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM)?;
                std::str::from_utf8(body).ok().map(str::to_owned)
            }
            Codec::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Codec::Latin1 | Codec::Iso8859_1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Codec::Cp1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
                    _ => Some(char::from(b)),
                })
                .collect(),
        }
    }
}

/// Decoded text and the label of the encoding that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedDocument {
    pub text: String,
    pub encoding: &'static str,
}

impl DecodedDocument {
    pub fn is_lossy(&self) -> bool {
        self.encoding == LOSSY_LABEL
    }
}

/// Reading the file failed; decoding itself never fails
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decode with the default trial list
pub fn decode(bytes: &[u8]) -> DecodedDocument {
    decode_with(bytes, &Codec::FALLBACK_ORDER)
}

/// Decode with a caller-supplied trial list, falling back to lossy UTF-8
pub fn decode_with(bytes: &[u8], codecs: &[Codec]) -> DecodedDocument {
    for codec in codecs {
        if let Some(text) = codec.decode(bytes) {
            log::debug!("decoded {} bytes as {}", bytes.len(), codec.label());
            return DecodedDocument {
                text,
                encoding: codec.label(),
            };
        }
        log::trace!("{} rejected input", codec.label());
    }

    log::warn!("no strict encoding matched; decoding as lossy UTF-8");
    DecodedDocument {
        text: String::from_utf8_lossy(bytes).into_owned(),
        encoding: LOSSY_LABEL,
    }
}

/// Read a whole file and decode it
pub fn read_document(path: &Path) -> Result<DecodedDocument, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode(&bytes))
}
