use anyhow::{Context, Result};
use std::{
    io::{Read, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crate::config::SOCKET_NAME;

const PEER_TIMEOUT: Duration = Duration::from_millis(500);
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound notification socket; the socket file is removed on drop.
pub struct NotifyListener {
    path: PathBuf,
}

impl Drop for NotifyListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn runtime_socket_path() -> PathBuf {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    runtime_dir.join(SOCKET_NAME)
}

/// Accepts connections on a helper thread and calls `on_changed` once per
/// connection. Messages carry no payload; receivers re-read the settings.
pub fn listen<F>(path: &Path, on_changed: F) -> Result<NotifyListener>
where
    F: Fn() + Send + 'static,
{
    let listener = bind_listener(path)?;
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            // A client that connects and stays silent must not hold up the next one.
            if stream.set_read_timeout(Some(PEER_TIMEOUT)).is_err() {
                continue;
            }
            let mut buf = [0u8; 32];
            let Ok(len) = stream.read(&mut buf) else {
                continue;
            };
            let _ = stream.write_all(b"ok");
            if len > 0 {
                on_changed();
            }
        }
    });
    Ok(NotifyListener {
        path: path.to_path_buf(),
    })
}

fn bind_listener(path: &Path) -> Result<UnixListener> {
    if let Ok(mut stream) = UnixStream::connect(path) {
        let mut buf = [0u8; 8];
        let _ = stream.write_all(b"ping");
        let _ = stream.read(&mut buf);
        return Err(anyhow::anyhow!(
            "a clock is already listening on {}",
            path.display()
        ));
    }
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path).with_context(|| format!("bind {}", path.display()))?;
    Ok(listener)
}

/// Tells a running clock that its settings changed. Returns `false` when
/// nothing is listening.
pub fn send_changed(path: &Path) -> Result<bool> {
    let mut stream = match UnixStream::connect(path) {
        Ok(stream) => stream,
        Err(_) => return Ok(false),
    };
    stream
        .set_read_timeout(Some(REPLY_TIMEOUT))
        .context("set socket timeout")?;
    stream.write_all(b"changed").context("send change notice")?;
    let mut reply = Vec::new();
    stream
        .read_to_end(&mut reply)
        .context("read change reply")?;
    if reply != b"ok" {
        return Err(anyhow::anyhow!("unexpected reply from clock"));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn notices_reach_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let (tx, rx) = mpsc::channel();
        let listener = listen(&path, move || {
            let _ = tx.send(());
        })
        .unwrap();

        assert!(send_changed(&path).unwrap());
        assert!(send_changed(&path).unwrap());
        for _ in 0..2 {
            rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }

        drop(listener);
        assert!(!path.exists());
    }

    #[test]
    fn silent_client_does_not_block_notices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let (tx, rx) = mpsc::channel();
        let _listener = listen(&path, move || {
            let _ = tx.send(());
        })
        .unwrap();

        let _idle = UnixStream::connect(&path).unwrap();
        assert!(send_changed(&path).unwrap());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn send_without_listener_reports_nobody_home() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!send_changed(&dir.path().join("missing.sock")).unwrap());
    }

    #[test]
    fn second_listener_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let _first = listen(&path, || {}).unwrap();
        assert!(listen(&path, || {}).is_err());
    }
}
