use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn label(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Default)]
struct Buffers {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Cumulative stdout/stderr of one process.
///
/// Bytes are kept raw and decoded once in [`snapshot`](Self::snapshot), so a
/// multi-byte character split across two reads survives intact.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<Buffers>>,
}

/// Decoded view of an [`OutputBuffer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl OutputBuffer {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn append(&self, stream: Stream, chunk: &[u8]) {
        let mut guard = self.inner.lock();
        match stream {
            Stream::Stdout => guard.stdout.extend_from_slice(chunk),
            Stream::Stderr => guard.stderr.extend_from_slice(chunk),
        }
    }

    pub fn snapshot(&self) -> CapturedOutput {
        let guard = self.inner.lock();
        CapturedOutput {
            stdout: String::from_utf8_lossy(&guard.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&guard.stderr).into_owned(),
        }
    }

    /// Spawn a reader that appends everything from `reader` until EOF.
    pub fn attach<R>(&self, stream: Stream, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => {
                        debug!(stream = stream.label(), "stream closed");
                        break;
                    }
                    Ok(n) => {
                        debug!(
                            stream = stream.label(),
                            bytes = n,
                            text = %String::from_utf8_lossy(&buf[..n]),
                            "biometric program output"
                        );
                        sink.append(stream, &buf[..n]);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        warn!(stream = stream.label(), error = %err, "failed reading program output");
                        break;
                    }
                }
            }
        })
    }
}
