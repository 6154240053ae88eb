//! Streamed HTTP download.
//!
//! A single 30-second request timeout, no retry (the caller is the retry
//! boundary, since a failed input prep already has a defined failure
//! path), and the partial destination file is removed on any error so a
//! later listing of the job directory never shows a truncated archive as
//! if it were real.

use crate::error::TransferError;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Download `url` into `dest_dir`, naming the file `name` if given or the
/// last path segment of `url` otherwise.
pub async fn fetch(url: &str, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf, TransferError> {
    let file_name = match name {
        Some(n) => n.to_string(),
        None => filename_from_url(url)?,
    };
    let dest_path = dest_dir.join(file_name);

    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    tracing::debug!(url, dest = %dest_path.display(), "fetching input");
    match fetch_into(&client, url, &dest_path).await {
        Ok(()) => Ok(dest_path),
        Err(err) => {
            tracing::warn!(url, error = %err, "fetch failed, removing partial file");
            let _ = tokio::fs::remove_file(&dest_path).await;
            Err(err)
        }
    }
}

async fn fetch_into(client: &reqwest::Client, url: &str, dest_path: &Path) -> Result<(), TransferError> {
    let response = client.get(url).send().await?.error_for_status()?;

    let mut file = tokio::fs::File::create(dest_path)
        .await
        .map_err(|source| io_error(dest_path, source))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|source| io_error(dest_path, source))?;
    }
    file.flush().await.map_err(|source| io_error(dest_path, source))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::Io { path: path.to_path_buf(), source }
}

fn filename_from_url(raw_url: &str) -> Result<String, TransferError> {
    let parsed = url::Url::parse(raw_url).map_err(|_| TransferError::NoFilename(raw_url.to_string()))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .ok_or_else(|| TransferError::NoFilename(raw_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_takes_last_path_segment() {
        assert_eq!(
            filename_from_url("http://primary.example/data/abc-123/input.zip").unwrap(),
            "input.zip"
        );
    }

    #[test]
    fn filename_from_url_rejects_trailing_slash() {
        assert!(filename_from_url("http://primary.example/data/abc-123/").is_err());
    }

    #[tokio::test]
    async fn fetch_removes_partial_file_on_http_error() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens on this port; the connection attempt itself
        // fails before any bytes are written, which already exercises the
        // "no partial file left behind" contract trivially. A 4xx/5xx
        // response additionally exercises `error_for_status` without a
        // real server, so this test is limited to asserting the
        // not-found destination path after a guaranteed-to-fail fetch.
        let result = fetch("http://127.0.0.1:1/input.zip", dir.path(), Some("input.zip")).await;
        assert!(result.is_err());
        assert!(!dir.path().join("input.zip").exists());
    }
}
