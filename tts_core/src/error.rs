use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while loading a canned audio asset.
///
/// These never cross the frame-sequence boundary to the playback
/// pipeline: [`CannedTts::synthesize`](crate::CannedTts::synthesize) logs
/// them and ends the sequence with zero frames instead. Operations on an
/// already-closed engine or session are no-ops, not errors.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("audio asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    #[error("failed to decode {}: {detail}", path.display())]
    Decode { path: PathBuf, detail: String },
}
