//! ssh2-backed production implementation of the session contracts.

use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;

use ssh2::{FileStat, Session, Sftp};
use tracing::{debug, info};

use hoarder_config::SshConfig;

use crate::error::{RemoteError, RemoteResult};
use crate::session::{RemoteConnector, RemoteEntry, RemoteMetadata, RemoteRead, RemoteSession};

/// Connector holding the `ssh` configuration section.
#[derive(Debug, Clone)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    /// Build a connector from the loaded configuration.
    #[must_use]
    pub const fn new(config: SshConfig) -> Self {
        Self { config }
    }
}

impl RemoteConnector for SshConnector {
    fn connect(&self) -> RemoteResult<Arc<dyn RemoteSession>> {
        let addr = self
            .config
            .addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| RemoteError::Resolve {
                addr: self.config.addr.clone(),
            })?;

        let tcp = TcpStream::connect_timeout(&addr, self.config.effective_connect_timeout())
            .map_err(|source| RemoteError::Connect {
                addr: self.config.addr.clone(),
                source,
            })?;

        let mut session = Session::new().map_err(|source| RemoteError::Auth {
            operation: "session",
            source,
        })?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|source| RemoteError::Auth {
            operation: "handshake",
            source,
        })?;

        if let Some(key) = self.config.privkey_path.as_deref() {
            session
                .userauth_pubkey_file(&self.config.username, None, key, None)
                .map_err(|source| RemoteError::Auth {
                    operation: "pubkey",
                    source,
                })?;
        } else {
            session
                .userauth_password(&self.config.username, &self.config.password)
                .map_err(|source| RemoteError::Auth {
                    operation: "password",
                    source,
                })?;
        }

        let sftp = session.sftp().map_err(|source| RemoteError::Auth {
            operation: "sftp",
            source,
        })?;
        info!(addr = %self.config.addr, username = %self.config.username, "sftp session established");

        Ok(Arc::new(SftpSession {
            _session: session,
            sftp,
        }))
    }
}

/// Live SFTP session; the underlying ssh2 session serialises concurrent
/// operations internally, so one session can back parallel readers.
struct SftpSession {
    _session: Session,
    sftp: Sftp,
}

impl RemoteSession for SftpSession {
    fn stat(&self, path: &Path) -> RemoteResult<RemoteMetadata> {
        let stat = self
            .sftp
            .stat(path)
            .map_err(|source| RemoteError::sftp("stat", path, source))?;
        Ok(to_metadata(&stat))
    }

    fn open_read(&self, path: &Path) -> RemoteResult<Box<dyn RemoteRead>> {
        let file = self
            .sftp
            .open(path)
            .map_err(|source| RemoteError::sftp("open", path, source))?;
        Ok(Box::new(file))
    }

    fn walk(&self, path: &Path) -> RemoteResult<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        self.walk_into(path, &mut entries)?;
        debug!(path = %path.display(), entries = entries.len(), "remote walk complete");
        Ok(entries)
    }
}

impl SftpSession {
    fn walk_into(&self, path: &Path, out: &mut Vec<RemoteEntry>) -> RemoteResult<()> {
        let listing = self
            .sftp
            .readdir(path)
            .map_err(|source| RemoteError::sftp("readdir", path, source))?;
        for (entry_path, stat) in listing {
            let metadata = to_metadata(&stat);
            out.push(RemoteEntry {
                path: entry_path.clone(),
                metadata,
            });
            if metadata.is_dir {
                self.walk_into(&entry_path, out)?;
            }
        }
        Ok(())
    }
}

fn to_metadata(stat: &FileStat) -> RemoteMetadata {
    RemoteMetadata {
        size: stat.size.unwrap_or(0),
        is_dir: stat.is_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unresolvable_address_is_reported() {
        let connector = SshConnector::new(SshConfig {
            username: "seed".to_string(),
            password: String::new(),
            privkey_path: None,
            addr: "not a host".to_string(),
            connect_timeout: Duration::from_millis(10),
        });
        let err = connector.connect().expect_err("must fail");
        assert!(matches!(err, RemoteError::Resolve { .. }));
    }
}
