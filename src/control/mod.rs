//! Unix-socket control channel for status queries.
//!
//! The accept loop polls a non-blocking listener so it can notice shutdown;
//! each accepted connection is served on its own short-lived thread.

mod protocol;

pub use protocol::{ControlContext, Request};

use protocol::handle_line;

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ControlServer {
    path: PathBuf,
    handle: Option<JoinHandle<()>>,
}

impl ControlServer {
    /// Bind `path` (replacing a stale socket) and start accepting.
    pub fn spawn(path: &Path, ctx: ControlContext, running: Arc<AtomicBool>) -> io::Result<Self> {
        remove_stale_socket(path)?;
        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;

        let handle = std::thread::Builder::new()
            .name("fmon-control".into())
            .spawn(move || accept_loop(listener, ctx, running))?;

        crate::log!("control"; "listening on {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            handle: Some(handle),
        })
    }

    /// Join the accept loop (after `running` was cleared) and remove the socket.
    pub fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            crate::log!("warn"; "cannot remove {}: {}", self.path.display(), e);
        }
    }
}

fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn accept_loop(listener: UnixListener, ctx: ControlContext, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                let ctx = ctx.clone();
                let spawned = std::thread::Builder::new()
                    .name("fmon-control-conn".into())
                    .spawn(move || {
                        if let Err(e) = serve(stream, &ctx) {
                            crate::debug!("control"; "connection closed: {}", e);
                        }
                    });
                if let Err(e) = spawned {
                    crate::log!("warn"; "cannot serve control connection: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::sleep(ACCEPT_POLL),
            Err(e) => {
                crate::log!("warn"; "control accept failed: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn serve(stream: UnixStream, ctx: &ControlContext) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let response = handle_line(&line, ctx);
    let mut writer = stream;
    writeln!(writer, "{response}")?;
    writer.flush()
}

/// Send one request and wait for the response (client side).
pub fn send_request(path: &Path, request: &Request) -> io::Result<serde_json::Value> {
    let mut stream = UnixStream::connect(path)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;

    let body = serde_json::to_string(request).map_err(io::Error::other)?;
    writeln!(stream, "{body}")?;
    stream.flush()?;

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line)?;
    serde_json::from_str(&line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
