// API client module: a small blocking client for the Telegram Bot API.
// It only knows one call, `sendDocument`, which posts a file as a
// multipart/form-data body together with the destination chat and a caption.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use reqwest::blocking::{multipart, Client};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Error opening file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error opening file {}: not a regular file", path.display())]
    NotAFile { path: PathBuf },
    #[error("Error building HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("Error creating form file")]
    Form(#[source] reqwest::Error),
    #[error("Error sending HTTP request")]
    Transport(#[source] reqwest::Error),
    #[error("Upload timed out after {after:?}")]
    TimedOut {
        after: Duration,
        #[source]
        source: reqwest::Error,
    },
    #[error("Upload cancelled")]
    Cancelled,
    #[error("Error sending file to Telegram: {status}")]
    Rejected { status: StatusCode },
}

/// What the server acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub bytes: u64,
    pub status: StatusCode,
}

/// Shared flag that aborts an upload in flight. Clones observe the same
/// state, so one can be handed to another thread and set from there.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reader that reports every chunk it hands out to a progress bar, so the
/// bar follows the request body as it is streamed rather than after the fact.
pub struct ProgressReader<R> {
    inner: R,
    progress: ProgressBar,
    cancel: CancelFlag,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, progress: ProgressBar, cancel: CancelFlag) -> Self {
        Self {
            inner,
            progress,
            cancel,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "upload cancelled"));
        }
        let n = self.inner.read(buf)?;
        self.progress.inc(n as u64);
        Ok(n)
    }
}

/// A file opened for upload and the chat it is addressed to.
#[derive(Debug)]
pub struct Upload {
    path: PathBuf,
    file_name: String,
    file: File,
    len: u64,
    channel_id: String,
}

impl Upload {
    pub fn open(
        path: impl AsRef<Path>,
        channel_id: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let open_err = |source| UploadError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;
        let metadata = file.metadata().map_err(open_err)?;
        if !metadata.is_file() {
            return Err(UploadError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        Ok(Upload {
            path: path.to_path_buf(),
            file_name,
            file,
            len: metadata.len(),
            channel_id: channel_id.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

/// Caption sent along with the document. The `document` part always carries
/// the whole file, so the attached share is reported as 100%.
pub fn caption(len: u64) -> String {
    format!("[*] File size: {} bytes ({:.2}%)", len, 100.0)
}

/// Blocking client bound to one Bot API base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ApiClient {
    /// Build a client for `base_url`. `timeout` bounds the whole request,
    /// body upload included; `None` waits indefinitely.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, UploadError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(UploadError::Client)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(ApiClient {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn send_document_url(&self, token: &str) -> String {
        format!("{}/bot{}/sendDocument", self.base_url, token)
    }

    /// POST `upload` to `sendDocument`. Only HTTP 200 counts as delivered;
    /// the response body is not inspected.
    pub fn send_document(
        &self,
        token: &str,
        upload: Upload,
        progress: &ProgressBar,
        cancel: &CancelFlag,
    ) -> Result<Delivery, UploadError> {
        let Upload {
            path,
            file_name,
            file,
            len,
            channel_id,
        } = upload;

        progress.set_length(len);
        progress.set_position(0);

        // The part is sized from metadata, so reqwest can send a
        // Content-Length and the whole file is attached.
        let reader = ProgressReader::new(file, progress.clone(), cancel.clone());
        let document = multipart::Part::reader_with_length(reader, len)
            .file_name(file_name)
            .mime_str(DOCUMENT_MIME)
            .map_err(UploadError::Form)?;
        let form = multipart::Form::new()
            .part("document", document)
            .text("chat_id", channel_id)
            .text("caption", caption(len));

        debug!(path = %path.display(), bytes = len, "sending document");
        let response = match self
            .client
            .post(self.send_document_url(token))
            .multipart(form)
            .send()
        {
            Ok(response) => response,
            Err(_) if cancel.is_cancelled() => {
                progress.abandon();
                return Err(UploadError::Cancelled);
            }
            Err(e) => {
                progress.abandon();
                // The URL carries the bot token; keep it out of messages.
                let e = e.without_url();
                return Err(if e.is_timeout() {
                    let after = match self.timeout {
                        Some(timeout) if !e.is_connect() => timeout,
                        _ => CONNECT_TIMEOUT,
                    };
                    UploadError::TimedOut { after, source: e }
                } else {
                    UploadError::Transport(e)
                });
            }
        };
        progress.finish_and_clear();

        let status = response.status();
        if status != StatusCode::OK {
            info!(%status, "telegram rejected the document");
            return Err(UploadError::Rejected { status });
        }
        info!(path = %path.display(), bytes = len, "document delivered");
        Ok(Delivery { bytes: len, status })
    }
}
