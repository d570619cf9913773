use thiserror::Error;

/// Error kinds surfaced by the renderers and the playback engine.
///
/// Per-frame failures (`EncodeFailed`, `ResizeFailed`) are handled locally
/// by the engine and counted as drops; the remaining kinds terminate the
/// job that raised them.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("failed to open media source {0}")]
    OpenFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("encoder produced no payload")]
    EncodeFailed,

    #[error("resize produced an empty frame")]
    ResizeFailed,

    #[error("audio player failed to launch: {0}")]
    AudioFailed(String),

    #[error("terminal write failed: {0}")]
    IoFailed(#[from] std::io::Error),

    #[error("playback cancelled")]
    CancelRequested,
}
