//! Metainfo document builders.

use bendy::encoding::{AsString, Error as BencodeError, SingleItemEncoder, ToBencode};

use hoarder_core::InfoHash;

struct MetainfoDoc<'a> {
    info: InfoDict<'a>,
}

struct InfoDict<'a> {
    name: &'a str,
    length: u64,
}

impl ToBencode for MetainfoDoc<'_> {
    const MAX_DEPTH: usize = 4;

    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_dict(|mut dict| {
            dict.emit_pair(b"announce", "https://tracker.example.test/announce")?;
            dict.emit_pair(b"info", &self.info)
        })
    }
}

impl ToBencode for InfoDict<'_> {
    const MAX_DEPTH: usize = 2;

    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_dict(|mut dict| {
            dict.emit_pair(b"length", self.length)?;
            dict.emit_pair(b"name", self.name)?;
            dict.emit_pair(b"piece length", 262_144_u64)?;
            dict.emit_pair(b"pieces", AsString(&[0_u8; 20][..]))
        })
    }
}

/// Build a minimal single-file metainfo document.
///
/// Returns the bencoded bytes and the info-hash the workspace derives from
/// them, so tests can correlate queue entries with scripted registry records.
///
/// # Panics
///
/// Panics if encoding fails, which cannot happen for the fixed shape built
/// here.
#[must_use]
pub fn metainfo_fixture(name: &str, length: u64) -> (Vec<u8>, InfoHash) {
    let doc = MetainfoDoc {
        info: InfoDict { name, length },
    };
    let bytes = doc.to_bencode().expect("fixture encodes");
    let hash = hoarder_metainfo::info_hash(&bytes).expect("fixture hash");
    (bytes, hash)
}
