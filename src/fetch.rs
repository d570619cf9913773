use crate::error::RenderError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Downloads a URL into memory, failing on any non-success status.
pub fn download_bytes(url: &str) -> Result<Vec<u8>, RenderError> {
    let parsed = url::Url::parse(url.trim()).map_err(|e| RenderError::DownloadFailed {
        url: url.to_owned(),
        reason: format!("invalid URL: {e}"),
    })?;

    let response = reqwest::blocking::get(parsed).map_err(|e| RenderError::DownloadFailed {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RenderError::DownloadFailed {
            url: url.to_owned(),
            reason: format!("HTTP status {status}"),
        });
    }

    let body = response.bytes().map_err(|e| RenderError::DownloadFailed {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(body.to_vec())
}

/// A downloaded media file that unlinks itself when dropped, so remote
/// video jobs never leave temp files behind, success or not.
pub struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Downloads a remote video to `<tmp-dir>/sakura_video_<unix_seconds>`.
pub fn download_to_temp(url: &str) -> Result<TempMedia, RenderError> {
    let body = download_bytes(url)?;
    let path = temp_video_path(now_unix());
    fs::write(&path, &body)?;
    Ok(TempMedia { path })
}

#[must_use]
pub fn temp_video_path(unix_seconds: u64) -> PathBuf {
    std::env::temp_dir().join(format!("sakura_video_{unix_seconds}"))
}

#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::{download_bytes, temp_video_path, TempMedia};
    use crate::error::RenderError;
    use std::fs;

    #[test]
    fn malformed_urls_fail_before_any_request() {
        let result = download_bytes("not a url");
        assert!(matches!(
            result,
            Err(RenderError::DownloadFailed { .. })
        ));
    }

    #[test]
    fn temp_path_carries_the_unix_timestamp() {
        let path = temp_video_path(1_700_000_000);
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("sakura_video_1700000000")
        );
        assert!(path.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn temp_media_unlinks_its_file_on_drop() {
        let path = std::env::temp_dir().join("sakura_video_droptest");
        fs::write(&path, b"payload").unwrap();
        assert!(path.exists());
        drop(TempMedia { path: path.clone() });
        assert!(!path.exists());
    }
}
