use core_types::{LoadStatus, RequestId};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Scripts larger than this are treated as failed loads.
const MAX_SCRIPT_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("client build error: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),
    #[error("script exceeds {MAX_SCRIPT_BYTES} bytes")]
    TooLarge,
}

pub struct ScriptFetch {
    pub request_id: RequestId,
    pub url: String,
    pub status: LoadStatus,
    pub duration_ms: u128,
}

pub type FetchCallback = Arc<dyn Fn(ScriptFetch) + Send + Sync>;

/// Fetch a script body on a worker thread and report the outcome through `cb`.
///
/// The body itself is discarded; callers only learn whether it loaded.
pub fn fetch_script(request_id: RequestId, url: String, cb: FetchCallback) {
    thread::spawn(move || {
        let start = Instant::now();
        let status = match fetch_blocking(&url) {
            Ok(bytes) => LoadStatus::Loaded { bytes },
            Err(err) => LoadStatus::Failed {
                error: err.to_string(),
            },
        };
        log::debug!(target: "net", "script fetch {url} -> {status:?}");
        cb(ScriptFetch {
            request_id,
            url,
            status,
            duration_ms: start.elapsed().as_millis(),
        });
    });
}

fn fetch_blocking(url: &str) -> Result<usize, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent("linktrail/0.1")
        .build()
        .map_err(FetchError::Client)?;

    let resp = client.get(url).send().map_err(FetchError::Request)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let mut limited = resp.take(MAX_SCRIPT_BYTES + 1);
    let mut buf = Vec::new();
    limited.read_to_end(&mut buf).map_err(FetchError::Read)?;
    if buf.len() as u64 > MAX_SCRIPT_BYTES {
        return Err(FetchError::TooLarge);
    }
    Ok(buf.len())
}
