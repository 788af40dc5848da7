use std::fs;

use anyhow::Result;
use serde::Serialize;
use serde_bytes::ByteBuf;
use tempfile::TempDir;
use tormon_torrent_core::{TorrentError, TorrentSource};

#[derive(Serialize)]
struct MultiFileTorrent {
    #[serde(rename = "announce-list")]
    announce_list: Vec<Vec<String>>,
    info: MultiFileInfo,
}

#[derive(Serialize)]
struct MultiFileInfo {
    files: Vec<FileEntry>,
    name: String,
    #[serde(rename = "piece length")]
    piece_length: u64,
    pieces: ByteBuf,
}

#[derive(Serialize)]
struct FileEntry {
    length: u64,
    path: Vec<String>,
}

fn write_multi_file_torrent(dir: &TempDir) -> Result<String> {
    let torrent = MultiFileTorrent {
        announce_list: vec![
            vec!["http://a.example/announce".into()],
            vec![
                "http://b.example/announce".into(),
                "http://a.example/announce".into(),
            ],
        ],
        info: MultiFileInfo {
            files: vec![
                FileEntry {
                    length: 300,
                    path: vec!["disc".into(), "track01.flac".into()],
                },
                FileEntry {
                    length: 100,
                    path: vec!["cover.jpg".into()],
                },
            ],
            name: "album".into(),
            piece_length: 256,
            pieces: ByteBuf::from(vec![0_u8; 40]),
        },
    };
    let path = dir.path().join("album.torrent");
    fs::write(&path, serde_bencode::to_bytes(&torrent)?)?;
    Ok(path.to_string_lossy().into_owned())
}

#[test]
fn torrent_file_descriptor_is_parsed() -> Result<()> {
    let dir = TempDir::new()?;
    let descriptor = write_multi_file_torrent(&dir)?;

    let source = TorrentSource::from_descriptor(&descriptor)?;
    assert_eq!(source.display_name(), "album");
    assert_eq!(source.info_hash().len(), 40);

    match source {
        TorrentSource::Metainfo { metainfo, .. } => {
            assert_eq!(metainfo.num_pieces, 2);
            assert_eq!(metainfo.total_length(), 400);
            assert_eq!(metainfo.files[0].path, "disc/track01.flac");
            assert_eq!(
                metainfo.trackers,
                vec!["http://a.example/announce", "http://b.example/announce"]
            );
        }
        TorrentSource::Magnet(_) => panic!("expected metainfo source"),
    }
    Ok(())
}

#[test]
fn magnet_descriptor_skips_the_filesystem() -> Result<()> {
    let source = TorrentSource::from_descriptor(
        "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=demo",
    )?;
    assert_eq!(source.display_name(), "demo");
    assert!(matches!(source, TorrentSource::Magnet(_)));
    Ok(())
}

#[test]
fn corrupt_torrent_file_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.torrent");
    fs::write(&path, b"d4:infoi3ee")?;

    let err = TorrentSource::from_descriptor(&path.to_string_lossy()).unwrap_err();
    assert!(matches!(
        err,
        TorrentError::Metainfo { .. } | TorrentError::InvalidSource { .. }
    ));
    Ok(())
}
