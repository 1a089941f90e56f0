#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Metainfo (`.torrent`) parsing: info-hash derivation and display-name
//! extraction.
//!
//! The info-hash is the SHA-1 of the raw bencoded `info` value, so the
//! decoder hands back the untouched slice rather than a re-encoded tree.

use bendy::decoding::{Decoder, Object};
use sha1::{Digest, Sha1};
use thiserror::Error;

use hoarder_core::InfoHash;

/// Errors produced while reading metainfo bytes.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The bytes are not well-formed bencode.
    #[error("metainfo is not valid bencode")]
    Bencode {
        /// Decoder diagnostic.
        detail: String,
    },
    /// The top-level value is not a dictionary.
    #[error("metainfo root is not a dictionary")]
    NotADict,
    /// The dictionary has no `info` entry.
    #[error("metainfo has no info dictionary")]
    MissingInfo,
}

impl MetainfoError {
    fn bencode(source: &bendy::decoding::Error) -> Self {
        Self::Bencode {
            detail: source.to_string(),
        }
    }
}

/// Derive the canonical uppercase info-hash from raw metainfo bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a bencoded dictionary containing an
/// `info` dictionary.
pub fn info_hash(metainfo: &[u8]) -> Result<InfoHash, MetainfoError> {
    let raw = raw_info_slice(metainfo)?;
    let digest: [u8; 20] = Sha1::digest(raw).into();
    Ok(InfoHash::from(digest))
}

/// Extract `info.name` when present; used only for log context.
#[must_use]
pub fn display_name(metainfo: &[u8]) -> Option<String> {
    let raw = raw_info_slice(metainfo).ok()?;
    let mut decoder = Decoder::new(raw);
    let Ok(Some(Object::Dict(mut info))) = decoder.next_object() else {
        return None;
    };
    while let Ok(Some((key, value))) = info.next_pair() {
        if key == b"name" {
            if let Object::Bytes(bytes) = value {
                return Some(String::from_utf8_lossy(bytes).into_owned());
            }
            return None;
        }
    }
    None
}

fn raw_info_slice(metainfo: &[u8]) -> Result<&[u8], MetainfoError> {
    let mut decoder = Decoder::new(metainfo);
    let root = decoder
        .next_object()
        .map_err(|err| MetainfoError::bencode(&err))?;
    let Some(Object::Dict(mut dict)) = root else {
        return Err(MetainfoError::NotADict);
    };
    loop {
        let pair = dict
            .next_pair()
            .map_err(|err| MetainfoError::bencode(&err))?;
        let Some((key, value)) = pair else {
            return Err(MetainfoError::MissingInfo);
        };
        if key != b"info" {
            continue;
        }
        return match value {
            Object::Dict(info) => info
                .into_raw()
                .map_err(|err| MetainfoError::bencode(&err)),
            _ => Err(MetainfoError::MissingInfo),
        };
    }
}
