//! End-to-end loading of a representative configuration document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hoarder_config::{ConfigError, load};

const FULL_DOCUMENT: &str = r#"
file_download_filemode = 511
file_download_workers = 4
temp_download_path = "/data/.staging"
rtorrent_update_interval = 300000000000
download_jobs = 2
resume_downloads = true
rpc_socket_path = "/run/hoarder/hoarder.sock"
check_disk_space = true
min_disk_space = 10000

[rtorrent]
addr = "https://rt.example.test/RPC2"
insecure_cert = true
username = "hoarder"
password = "secret"

[ssh]
username = "seed"
password = "secret"
addr = "rt.example.test:22"
connect_timeout = 5000000000

[watch_to_download_paths]
"/blackhole/tv" = "/data/tv"
"/blackhole/iso" = "/data/iso"

[watch_to_finish_path]
"/blackhole/tv" = "/blackhole/tv/done"
"#;

#[test]
fn full_document_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hoarder.toml");
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(FULL_DOCUMENT.as_bytes()).expect("write");

    let config = load(&path).expect("valid document");

    assert_eq!(config.rtorrent.addr, "https://rt.example.test/RPC2");
    assert!(config.rtorrent.insecure_cert);
    assert_eq!(config.ssh.effective_connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.file_download_filemode, 0o777);
    assert_eq!(config.file_download_workers(), 4);
    assert_eq!(config.download_jobs(), 2);
    assert!(config.resume_downloads);
    assert!(config.check_disk_space);
    assert_eq!(config.min_disk_space, 10_000);
    assert_eq!(
        config.rtorrent_update_interval,
        Duration::from_secs(300)
    );
    assert_eq!(
        config.temp_download_path.as_deref(),
        Some(Path::new("/data/.staging"))
    );
    assert_eq!(
        config.download_path_for(Path::new("/blackhole/tv")),
        Some(&PathBuf::from("/data/tv"))
    );
    assert_eq!(
        config.finish_path_for(Path::new("/blackhole/tv")),
        Some(&PathBuf::from("/blackhole/tv/done"))
    );
    assert_eq!(config.finish_path_for(Path::new("/blackhole/iso")), None);
}

#[test]
fn missing_rtorrent_section_fails_parse() {
    let doc = r#"
rtorrent_update_interval = 1000000000
rpc_socket_path = "/run/hoarder.sock"

[ssh]
username = "seed"
addr = "host:22"

[watch_to_download_paths]
"/watch" = "/data"
"#;
    let err = hoarder_config::load_from_str(doc).expect_err("must fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
}
