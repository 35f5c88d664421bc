//! Child stdout/stderr capture.

use crate::descriptor::OutputCapture;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Attach line readers to a child's piped streams.
///
/// Each line becomes a `process output` event; with [`OutputCapture::Both`]
/// it is also echoed to the harness's own stdout/stderr as `[name] line`.
pub(crate) fn attach_output_streams(
    child: &mut Child,
    process_name: &str,
    capture: OutputCapture,
) -> Vec<JoinHandle<()>> {
    if !capture.is_captured() {
        return Vec::new();
    }

    let echo = capture == OutputCapture::Both;
    let mut tasks = Vec::new();

    if let Some(stdout) = child.stdout.take() {
        tasks.push(spawn_reader(stdout, process_name, Stream::Stdout, echo));
    } else {
        debug!(process = %process_name, stream = "stdout", "stdout unavailable for capture");
    }

    if let Some(stderr) = child.stderr.take() {
        tasks.push(spawn_reader(stderr, process_name, Stream::Stderr, echo));
    } else {
        debug!(process = %process_name, stream = "stderr", "stderr unavailable for capture");
    }

    tasks
}

fn spawn_reader<R>(stream: R, process_name: &str, which: Stream, echo: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let process_name = process_name.to_string();
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']);
                    if line.is_empty() {
                        continue;
                    }
                    info!(
                        process = %process_name,
                        stream = which.as_str(),
                        line = %line,
                        "process output"
                    );
                    if echo {
                        match which {
                            Stream::Stdout => println!("[{}] {}", process_name, line),
                            Stream::Stderr => eprintln!("[{}] {}", process_name, line),
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        process = %process_name,
                        stream = which.as_str(),
                        error = %err,
                        "process output read failed"
                    );
                    break;
                }
            }
        }

        debug!(process = %process_name, stream = which.as_str(), "process output closed");
    })
}
