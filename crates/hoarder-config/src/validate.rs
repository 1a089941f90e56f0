//! Startup validation and path normalisation for loaded configuration.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;

/// Lexically normalise a path: drop `.` components and fold `..` onto the
/// preceding component. No filesystem access, so the path may not exist yet.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

pub(crate) fn validate(mut config: Config) -> ConfigResult<Config> {
    if config.rtorrent.addr.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "rtorrent.addr",
        });
    }
    if config.ssh.addr.trim().is_empty() {
        return Err(ConfigError::MissingField { field: "ssh.addr" });
    }
    if config.ssh.username.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "ssh.username",
        });
    }
    if config.rpc_socket_path.as_os_str().is_empty() {
        return Err(ConfigError::MissingField {
            field: "rpc_socket_path",
        });
    }
    if config.watch_to_download_paths.is_empty() {
        return Err(ConfigError::MissingField {
            field: "watch_to_download_paths",
        });
    }

    config.watch_to_download_paths = normalize_map(&config.watch_to_download_paths);
    config.watch_to_finish_path = normalize_map(&config.watch_to_finish_path);
    config.temp_download_path = config
        .temp_download_path
        .as_deref()
        .map(normalize_path)
        .filter(|path| !path.as_os_str().is_empty());

    for watch_dir in config.watch_to_finish_path.keys() {
        if !config.watch_to_download_paths.contains_key(watch_dir) {
            warn!(
                watch_dir = %watch_dir.display(),
                "finish path configured for a directory that is not watched"
            );
        }
    }

    Ok(config)
}

fn normalize_map(map: &BTreeMap<PathBuf, PathBuf>) -> BTreeMap<PathBuf, PathBuf> {
    map.iter()
        .map(|(watch, dest)| (normalize_path(watch), normalize_path(dest)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_from_str;

    const MINIMAL: &str = r#"
rtorrent_update_interval = 60000000000
rpc_socket_path = "/run/hoarder.sock"

[rtorrent]
addr = "https://rt.example.test/RPC2"

[ssh]
username = "seed"
addr = "rt.example.test:22"

[watch_to_download_paths]
"/watch/" = "/data/downloads/./tv"
"#;

    #[test]
    fn normalize_path_cleans_components() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c/")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_path(Path::new("rel/./x")), PathBuf::from("rel/x"));
    }

    #[test]
    fn watch_bindings_are_normalized_on_load() {
        let config = load_from_str(MINIMAL).expect("valid config");
        assert_eq!(
            config.download_path_for(Path::new("/watch")),
            Some(&PathBuf::from("/data/downloads/tv"))
        );
    }

    #[test]
    fn missing_watch_bindings_is_fatal() {
        let doc = MINIMAL.replace("[watch_to_download_paths]", "[watch_to_finish_path]");
        let err = load_from_str(&doc).expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "watch_to_download_paths"
            }
        ));
    }

    #[test]
    fn blank_ssh_username_is_fatal() {
        let doc = MINIMAL.replace("username = \"seed\"", "username = \"  \"");
        let err = load_from_str(&doc).expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "ssh.username"
            }
        ));
    }
}
