//! `.torrent` metainfo and magnet URI parsing.

use data_encoding::BASE32;
use serde::Deserialize;
use serde_bencode::value::Value;
use serde_bytes::ByteBuf;
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{TorrentError, TorrentResult};

const PIECE_HASH_LEN: usize = 20;

/// Single file described by the info dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetainfoFile {
    /// Path relative to the torrent root, `/`-separated.
    pub path: String,
    /// Length in bytes.
    pub length: u64,
}

/// Parsed `.torrent` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetainfo {
    /// Suggested name of the payload.
    pub name: String,
    /// Lowercase hex SHA-1 of the bencoded info dictionary.
    pub info_hash: String,
    /// Bytes per piece.
    pub piece_length: u64,
    /// Number of pieces.
    pub num_pieces: u32,
    /// Files in payload order; single-file torrents have one entry named after the torrent.
    pub files: Vec<MetainfoFile>,
    /// Announce URLs, primary tracker first.
    pub trackers: Vec<String>,
}

#[derive(Deserialize)]
struct RawTorrent {
    info: RawInfo,
    #[serde(default)]
    announce: Option<String>,
    #[serde(rename = "announce-list", default)]
    announce_list: Option<Vec<Vec<String>>>,
}

#[derive(Deserialize)]
struct RawInfo {
    name: String,
    #[serde(rename = "piece length")]
    piece_length: u64,
    pieces: ByteBuf,
    #[serde(default)]
    length: Option<u64>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
}

#[derive(Deserialize)]
struct RawFile {
    length: u64,
    path: Vec<String>,
}

impl TorrentMetainfo {
    /// Decode bencoded metainfo and compute its info-hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not bencode, lacks an `info`
    /// dictionary, or describes no pieces.
    pub fn from_bytes(bytes: &[u8]) -> TorrentResult<Self> {
        let generic: Value =
            serde_bencode::from_bytes(bytes).map_err(|source| TorrentError::Metainfo { source })?;
        let Value::Dict(mut top_level) = generic else {
            return Err(invalid("<metainfo>", "top level is not a dictionary"));
        };
        let info_value = top_level
            .remove("info".as_bytes())
            .ok_or_else(|| invalid("<metainfo>", "missing info dictionary"))?;
        let info_bytes = serde_bencode::to_bytes(&info_value)
            .map_err(|source| TorrentError::Metainfo { source })?;
        let info_hash = hex::encode(Sha1::digest(&info_bytes));

        let raw: RawTorrent =
            serde_bencode::from_bytes(bytes).map_err(|source| TorrentError::Metainfo { source })?;
        let RawTorrent {
            info,
            announce,
            announce_list,
        } = raw;

        if info.piece_length == 0 || info.pieces.is_empty() {
            return Err(invalid(&info.name, "torrent describes no pieces"));
        }
        if info.pieces.len() % PIECE_HASH_LEN != 0 {
            return Err(invalid(&info.name, "piece hash list has a partial entry"));
        }
        let num_pieces = u32::try_from(info.pieces.len() / PIECE_HASH_LEN)
            .map_err(|_| invalid(&info.name, "too many pieces"))?;

        let files = match (info.files, info.length) {
            (Some(files), _) => files
                .into_iter()
                .map(|file| MetainfoFile {
                    path: file.path.join("/"),
                    length: file.length,
                })
                .collect(),
            (None, Some(length)) => vec![MetainfoFile {
                path: info.name.clone(),
                length,
            }],
            (None, None) => return Err(invalid(&info.name, "neither length nor files present")),
        };

        let mut trackers: Vec<String> = announce.into_iter().collect();
        for tier in announce_list.unwrap_or_default() {
            for url in tier {
                if !trackers.contains(&url) {
                    trackers.push(url);
                }
            }
        }

        Ok(Self {
            name: info.name,
            info_hash,
            piece_length: info.piece_length,
            num_pieces,
            files,
            trackers,
        })
    }

    /// Sum of all file lengths.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }
}

/// Parsed magnet URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    /// Original URI.
    pub uri: String,
    /// Lowercase hex info-hash.
    pub info_hash: String,
    /// Display name (`dn`).
    pub name: Option<String>,
    /// Exact payload length (`xl`).
    pub length: Option<u64>,
    /// Tracker URLs (`tr`).
    pub trackers: Vec<String>,
}

impl MagnetLink {
    /// Parse a `magnet:?xt=urn:btih:...` URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is malformed or carries no usable BitTorrent info-hash.
    pub fn parse(uri: &str) -> TorrentResult<Self> {
        let url = Url::parse(uri).map_err(|_| invalid(uri, "malformed magnet URI"))?;
        if url.scheme() != "magnet" {
            return Err(invalid(uri, "not a magnet URI"));
        }

        let mut info_hash = None;
        let mut name = None;
        let mut length = None;
        let mut trackers = Vec::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xt" => {
                    if let Some(encoded) = value.strip_prefix("urn:btih:") {
                        info_hash = Some(normalize_btih(encoded).ok_or_else(|| {
                            invalid(uri, "info-hash must be 40 hex or 32 base32 characters")
                        })?);
                    }
                }
                "dn" => name = Some(value.into_owned()),
                "xl" => length = value.parse::<u64>().ok(),
                "tr" => trackers.push(value.into_owned()),
                _ => {}
            }
        }

        let info_hash = info_hash.ok_or_else(|| invalid(uri, "missing xt=urn:btih parameter"))?;
        Ok(Self {
            uri: uri.to_string(),
            info_hash,
            name,
            length,
            trackers,
        })
    }

    /// Name to show until metadata arrives.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.info_hash.chars().take(12).collect())
    }
}

fn normalize_btih(encoded: &str) -> Option<String> {
    match encoded.len() {
        40 if encoded.chars().all(|c| c.is_ascii_hexdigit()) => Some(encoded.to_ascii_lowercase()),
        32 => BASE32
            .decode(encoded.to_ascii_uppercase().as_bytes())
            .ok()
            .filter(|raw| raw.len() == PIECE_HASH_LEN)
            .map(hex::encode),
        _ => None,
    }
}

fn invalid(source_descriptor: &str, reason: &'static str) -> TorrentError {
    TorrentError::InvalidSource {
        source_descriptor: source_descriptor.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct FixtureTorrent {
        announce: String,
        info: FixtureInfo,
    }

    #[derive(Serialize)]
    struct FixtureInfo {
        length: u64,
        name: String,
        #[serde(rename = "piece length")]
        piece_length: u64,
        pieces: ByteBuf,
    }

    fn fixture_bytes(pieces: usize) -> Vec<u8> {
        let torrent = FixtureTorrent {
            announce: "http://tracker.example/announce".into(),
            info: FixtureInfo {
                length: 40_000,
                name: "sample.iso".into(),
                piece_length: 16_384,
                pieces: ByteBuf::from(vec![7_u8; pieces * PIECE_HASH_LEN]),
            },
        };
        serde_bencode::to_bytes(&torrent).expect("fixture encodes")
    }

    #[test]
    fn parses_single_file_torrent() {
        let parsed = TorrentMetainfo::from_bytes(&fixture_bytes(3)).expect("fixture parses");
        assert_eq!(parsed.name, "sample.iso");
        assert_eq!(parsed.num_pieces, 3);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.total_length(), 40_000);
        assert_eq!(parsed.info_hash.len(), 40);
        assert_eq!(parsed.trackers, vec!["http://tracker.example/announce"]);
    }

    #[test]
    fn info_hash_is_stable_across_parses() {
        let bytes = fixture_bytes(2);
        let first = TorrentMetainfo::from_bytes(&bytes).expect("parses");
        let second = TorrentMetainfo::from_bytes(&bytes).expect("parses");
        assert_eq!(first.info_hash, second.info_hash);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            TorrentMetainfo::from_bytes(b"not bencode"),
            Err(TorrentError::Metainfo { .. })
        ));
    }

    #[test]
    fn magnet_parses_hex_and_metadata_hints() {
        let link = MagnetLink::parse(
            "magnet:?xt=urn:btih:0123456789ABCDEF0123456789ABCDEF01234567&dn=demo&xl=1024&tr=udp%3A%2F%2Ft.example%3A80",
        )
        .expect("magnet parses");
        assert_eq!(link.info_hash, "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(link.name.as_deref(), Some("demo"));
        assert_eq!(link.length, Some(1024));
        assert_eq!(link.trackers, vec!["udp://t.example:80"]);
    }

    #[test]
    fn magnet_accepts_base32_hash() {
        let link = MagnetLink::parse("magnet:?xt=urn:btih:AAAQEAYEAUDAOCAJBIFQYDIOB4IBCEQT")
            .expect("base32 magnet parses");
        assert_eq!(link.info_hash, "000102030405060708090a0b0c0d0e0f10111213");
        assert_eq!(link.display_name(), "000102030405");
    }

    #[test]
    fn magnet_without_btih_is_rejected() {
        let err = MagnetLink::parse("magnet:?dn=nothing").unwrap_err();
        assert!(matches!(err, TorrentError::InvalidSource { .. }));
    }
}
