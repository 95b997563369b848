mod error;
mod events;
mod frame;
mod intent;
mod stream;
mod wav;

pub use error::TtsError;
pub use events::{EventEmitter, PlaybackMetrics, Subscription};
pub use frame::{frame_size, AudioFrame, FRAME_DURATION};
pub use intent::{IntentResolver, IntentRule, GREETING_ASSET};
pub use stream::TtsStream;
pub use wav::{read_asset, AudioAsset};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{debug, error, warn};

/// Advertised format before any asset has been decoded.
const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const DEFAULT_NUM_CHANNELS: u32 = 1;

/// Canned-audio synthesis engine.
///
/// Plays pre-recorded assets in place of real speech synthesis: each
/// [`synthesize`](CannedTts::synthesize) call re-reads the named asset
/// from the audio directory, publishes one [`PlaybackMetrics`], then
/// yields paced 20 ms frames. The engine holds no utterance state of its
/// own, only the cancel handle of the synthesis currently in flight;
/// sessions are opened with [`CannedTts::stream`]. At most one synthesis
/// call is expected in flight per engine at a time.
///
/// Engines are shared handles: constructors return `Arc<CannedTts>`.
pub struct CannedTts {
    audio_dir: PathBuf,
    intents: IntentResolver,
    emitter: EventEmitter,
    // Advertised format tracks the most recently decoded asset.
    sample_rate: AtomicU32,
    num_channels: AtomicU32,
    active: Mutex<Option<Arc<AtomicBool>>>,
    closed: AtomicBool,
    weak_self: Weak<CannedTts>,
}

impl CannedTts {
    pub fn new<P: AsRef<Path>>(audio_dir: P) -> Arc<Self> {
        Self::with_intents(audio_dir, IntentResolver::default())
    }

    pub fn with_intents<P: AsRef<Path>>(audio_dir: P, intents: IntentResolver) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            audio_dir: audio_dir.as_ref().to_path_buf(),
            intents,
            emitter: EventEmitter::default(),
            sample_rate: AtomicU32::new(DEFAULT_SAMPLE_RATE),
            num_channels: AtomicU32::new(DEFAULT_NUM_CHANNELS),
            active: Mutex::new(None),
            closed: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        })
    }

    /// Open a new utterance session backed by this engine.
    pub fn stream(&self) -> TtsStream {
        TtsStream::new(self.weak_self.clone(), self.intents.clone())
    }

    /// Register a listener for per-utterance playback metrics.
    pub fn on_metrics<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PlaybackMetrics) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.emitter.unsubscribe(subscription);
    }

    /// Sample rate of the most recently decoded asset, 24 kHz before any
    /// synthesis has happened.
    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Channel count of the most recently decoded asset.
    pub fn num_channels(&self) -> u16 {
        self.num_channels.load(Ordering::Relaxed) as u16
    }

    /// Whether a synthesis call currently holds the decode handle.
    pub fn is_synthesizing(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Stream the asset named `filename` as paced audio frames.
    ///
    /// Load failures never surface to the consumer: they are logged, no
    /// metrics are emitted for the call, and the sequence ends after zero
    /// frames.
    pub fn synthesize(&self, filename: &str) -> impl Stream<Item = AudioFrame> + Send + 'static {
        let handle = self.weak_self.upgrade();
        let filename = filename.to_string();
        stream! {
            let Some(tts) = handle else {
                return;
            };
            if tts.closed.load(Ordering::Relaxed) {
                debug!(%filename, "engine closed, skipping synthesis");
                return;
            }
            let Some(path) = tts.asset_path(&filename) else {
                warn!(%filename, "rejected asset name outside the audio directory");
                return;
            };

            let cancel = Arc::new(AtomicBool::new(false));
            tts.set_active(&cancel);
            let _release = ReleaseOnExit {
                tts: Arc::clone(&tts),
                token: Arc::clone(&cancel),
            };

            let read_path = path.clone();
            let asset =
                match tokio::task::spawn_blocking(move || wav::read_asset(&read_path)).await {
                    Ok(Ok(asset)) => asset,
                    Ok(Err(e)) => {
                        error!(path = %path.display(), "failed to load asset: {e}");
                        return;
                    }
                    Err(e) => {
                        error!(path = %path.display(), "asset read task failed: {e}");
                        return;
                    }
                };

            tts.sample_rate.store(asset.sample_rate, Ordering::Relaxed);
            tts.num_channels
                .store(asset.num_channels as u32, Ordering::Relaxed);

            let metrics = PlaybackMetrics {
                characters: filename.chars().count(),
                duration_ms: asset.duration_ms(),
                cost_usd: 0.0,
            };
            tts.emitter.emit(&metrics);

            let frames = frame::paced_frames(asset, Arc::clone(&cancel));
            tokio::pin!(frames);
            while let Some(frame) = frames.next().await {
                yield frame;
            }
        }
    }

    /// Cancel the in-flight synthesis, if any. Idempotent.
    pub fn stop(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(token) = active.take() {
                token.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Shut the engine down: cancel any active synthesis and make later
    /// `synthesize` calls yield empty sequences. Idempotent and safe to
    /// call repeatedly.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.stop();
    }

    fn set_active(&self, token: &Arc<AtomicBool>) {
        if let Ok(mut active) = self.active.lock() {
            *active = Some(Arc::clone(token));
        }
    }

    fn clear_active(&self, token: &Arc<AtomicBool>) {
        if let Ok(mut active) = self.active.lock() {
            if active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, token))
            {
                *active = None;
            }
        }
    }

    /// Map an asset name to a path inside the audio directory, rejecting
    /// names that carry path components.
    fn asset_path(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        Some(self.audio_dir.join(filename))
    }
}

/// Releases the engine's decode handle on every synthesis exit path:
/// normal completion, load failure and consumer drop.
struct ReleaseOnExit {
    tts: Arc<CannedTts>,
    token: Arc<AtomicBool>,
}

impl Drop for ReleaseOnExit {
    fn drop(&mut self) {
        self.tts.clear_active(&self.token);
    }
}
