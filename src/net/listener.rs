//! Listener acquisition.
//!
//! # Responsibilities
//! - Probe the supervisor for a pre-opened listening socket (zero-downtime
//!   restart: the supervisor keeps accepting while the process is replaced)
//! - Fall back to binding the configured address when no socket is offered
//! - Log which mode was used and the bound address
//!
//! # Design Decisions
//! - The supervisor hand-off uses the `SERVER_STARTER_PORT` environment
//!   protocol: `addr=fd` entries separated by `;`, or a single bare fd
//! - A malformed hand-off is logged and ignored, not fatal; failing to
//!   bind the fallback address is fatal
//! - Only the first inherited descriptor is adopted; the portal serves a
//!   single listener

use tokio::net::TcpListener;

/// Environment variable carrying inherited listener descriptors.
pub const SERVER_STARTER_ENV: &str = "SERVER_STARTER_PORT";

/// Error type for listener acquisition.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("inherited listener is unusable: {0}")]
    Inherit(std::io::Error),
}

/// Produce exactly one bound, listening socket: inherited from the
/// supervisor when offered, freshly bound otherwise.
pub async fn acquire(bind_address: &str) -> Result<TcpListener, ListenerError> {
    if let Some(inherited) = inherited_listener() {
        inherited
            .set_nonblocking(true)
            .map_err(ListenerError::Inherit)?;
        let listener = TcpListener::from_std(inherited).map_err(ListenerError::Inherit)?;
        let addr = listener.local_addr().map_err(ListenerError::Inherit)?;
        tracing::info!(address = %addr, "running under supervisor; adopted inherited listener");
        return Ok(listener);
    }

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|source| ListenerError::Bind {
            addr: bind_address.to_string(),
            source,
        })?;
    let addr = listener.local_addr().map_err(|source| ListenerError::Bind {
        addr: bind_address.to_string(),
        source,
    })?;
    tracing::info!(address = %addr, "standalone mode; listener bound");
    Ok(listener)
}

/// Probe the supervisor hand-off. `None` means "not offered" for any
/// reason worth only a log line: variable absent, malformed, empty, or an
/// unsupported platform.
fn inherited_listener() -> Option<std::net::TcpListener> {
    let raw = match std::env::var(SERVER_STARTER_ENV) {
        Ok(raw) => raw,
        Err(std::env::VarError::NotPresent) => return None,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable {SERVER_STARTER_ENV}");
            return None;
        }
    };

    let fd = match parse_server_starter(&raw) {
        Ok(entries) => {
            if entries.len() > 1 {
                tracing::warn!(
                    offered = entries.len(),
                    "supervisor offered multiple listeners; adopting the first"
                );
            }
            tracing::debug!(
                addr = ?entries[0].addr,
                fd = entries[0].fd,
                "adopting inherited listener"
            );
            entries[0].fd
        }
        Err(err) => {
            tracing::warn!(error = %err, value = %raw, "ignoring malformed {SERVER_STARTER_ENV}");
            return None;
        }
    };

    adopt_fd(fd)
}

#[cfg(unix)]
fn adopt_fd(fd: i32) -> Option<std::net::TcpListener> {
    use std::os::unix::io::FromRawFd;

    // Safety: the supervisor transfers ownership of this descriptor to the
    // child exactly once; nothing else in this process uses it.
    Some(unsafe { std::net::TcpListener::from_raw_fd(fd) })
}

#[cfg(not(unix))]
fn adopt_fd(_fd: i32) -> Option<std::net::TcpListener> {
    tracing::warn!("socket inheritance is not supported on this platform");
    None
}

/// One `addr=fd` entry from the supervisor hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InheritedEntry {
    addr: Option<String>,
    fd: i32,
}

#[derive(Debug, thiserror::Error)]
enum HandOffError {
    #[error("empty hand-off")]
    Empty,

    #[error("invalid descriptor in entry {0:?}")]
    InvalidFd(String),
}

/// Parse the `SERVER_STARTER_PORT` value: `addr=fd` entries joined by `;`,
/// or a single bare descriptor number.
fn parse_server_starter(value: &str) -> Result<Vec<InheritedEntry>, HandOffError> {
    let mut entries = Vec::new();
    for part in value.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (addr, fd_part) = match part.rsplit_once('=') {
            Some((addr, fd_part)) => (Some(addr.to_string()), fd_part),
            None => (None, part),
        };
        let fd = fd_part
            .parse::<i32>()
            .map_err(|_| HandOffError::InvalidFd(part.to_string()))?;
        if fd < 0 {
            return Err(HandOffError::InvalidFd(part.to_string()));
        }
        entries.push(InheritedEntry { addr, fd });
    }

    if entries.is_empty() {
        return Err(HandOffError::Empty);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addr_fd_pairs() {
        let entries = parse_server_starter("0.0.0.0:3333=3;0.0.0.0:3334=4").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].addr.as_deref(), Some("0.0.0.0:3333"));
        assert_eq!(entries[0].fd, 3);
        assert_eq!(entries[1].fd, 4);
    }

    #[test]
    fn parses_a_bare_descriptor() {
        let entries = parse_server_starter("5").unwrap();
        assert_eq!(entries, vec![InheritedEntry { addr: None, fd: 5 }]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_server_starter("").is_err());
        assert!(parse_server_starter(";;").is_err());
        assert!(parse_server_starter("0.0.0.0:3333=banana").is_err());
        assert!(parse_server_starter("0.0.0.0:3333=-7").is_err());
    }
}
