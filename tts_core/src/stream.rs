//! Session-scoped utterance streaming.
//!
//! A [`TtsStream`] accumulates the text fragments of one language-model
//! response, resolves the finished utterance to an asset filename, and
//! drains the engine's frames as a lazy, cancellable sequence. One
//! producer pushes text, one consumer pulls frames; sessions are
//! independent of each other and share the engine only.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::info;

use crate::frame::AudioFrame;
use crate::intent::IntentResolver;
use crate::CannedTts;

/// Poll interval while waiting for the current response to finish.
const IDLE_POLL: Duration = Duration::from_millis(100);

struct SessionState {
    accumulated: String,
    queue: VecDeque<String>,
    ended: bool,
    closed: bool,
}

/// One conversational turn's worth of text-in, frames-out state.
pub struct TtsStream {
    tts: Weak<CannedTts>,
    intents: IntentResolver,
    state: Arc<Mutex<SessionState>>,
}

impl TtsStream {
    pub(crate) fn new(tts: Weak<CannedTts>, intents: IntentResolver) -> Self {
        Self {
            tts,
            intents,
            state: Arc::new(Mutex::new(SessionState {
                accumulated: String::new(),
                queue: VecDeque::new(),
                ended: false,
                closed: false,
            })),
        }
    }

    /// Append a response fragment. Ignored once input has ended or the
    /// session is closed.
    pub fn push_text(&self, fragment: &str) {
        if let Ok(mut state) = self.state.lock() {
            if state.ended || state.closed {
                return;
            }
            state.accumulated.push_str(fragment);
        }
    }

    /// Mark the response complete: resolve the accumulated text to an
    /// asset filename and queue it for synthesis. Whitespace-only
    /// responses queue nothing.
    pub fn end_input(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.ended || state.closed {
            return;
        }
        state.ended = true;

        let text = state.accumulated.trim().to_string();
        if text.is_empty() {
            return;
        }
        info!(response = %text, "language model response complete");

        let asset = self.intents.resolve(&text).to_string();
        state.queue.push_back(asset);
    }

    /// Close the session: drop queued work, clear the accumulator and
    /// stop the engine. Safe to call more than once; frame iteration
    /// also closes the session on exhaustion or drop.
    pub fn close(&self) {
        close_session(&self.tts, &self.state);
    }

    /// Lazily drain audio frames for every queued utterance, in FIFO
    /// order. Closing the session mid-emission stops the sequence within
    /// one pacing interval.
    pub fn frames(&self) -> impl Stream<Item = AudioFrame> + Send + 'static {
        let tts = self.tts.clone();
        let state = self.state.clone();
        stream! {
            let _guard = CloseOnDrop {
                tts: tts.clone(),
                state: state.clone(),
            };

            loop {
                let next = {
                    let Ok(mut locked) = state.lock() else {
                        break;
                    };
                    if locked.closed {
                        break;
                    }
                    match locked.queue.pop_front() {
                        Some(asset) => Some(asset),
                        None if locked.ended => break,
                        None => None,
                    }
                };

                let Some(asset) = next else {
                    tokio::time::sleep(IDLE_POLL).await;
                    continue;
                };

                let Some(engine) = tts.upgrade() else {
                    break;
                };
                let frames = engine.synthesize(&asset);
                tokio::pin!(frames);
                while let Some(frame) = frames.next().await {
                    let closed = state.lock().map(|s| s.closed).unwrap_or(true);
                    if closed {
                        break;
                    }
                    yield frame;
                }
            }
        }
    }
}

fn close_session(tts: &Weak<CannedTts>, state: &Arc<Mutex<SessionState>>) {
    {
        let Ok(mut locked) = state.lock() else {
            return;
        };
        if locked.closed {
            return;
        }
        locked.closed = true;
        locked.queue.clear();
        locked.accumulated.clear();
    }
    if let Some(engine) = tts.upgrade() {
        engine.stop();
    }
}

/// Closes the session when the frame sequence is exhausted or dropped,
/// so cleanup does not depend on the consumer calling `close`.
struct CloseOnDrop {
    tts: Weak<CannedTts>,
    state: Arc<Mutex<SessionState>>,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        close_session(&self.tts, &self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached() -> TtsStream {
        TtsStream::new(Weak::new(), IntentResolver::default())
    }

    #[test]
    fn fragments_accumulate_into_one_utterance() {
        let session = detached();
        for fragment in ["Hel", "lo the", "re"] {
            session.push_text(fragment);
        }
        session.end_input();

        let state = session.state.lock().unwrap();
        assert_eq!(state.accumulated, "Hello there");
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.queue[0], "greetings.wav");
    }

    #[test]
    fn whitespace_only_input_queues_nothing() {
        let session = detached();
        session.push_text("   ");
        session.push_text("\n\t");
        session.end_input();

        let state = session.state.lock().unwrap();
        assert!(state.queue.is_empty());
    }

    #[test]
    fn text_after_end_input_is_ignored() {
        let session = detached();
        session.push_text("hello");
        session.end_input();
        session.push_text(" world");

        let state = session.state.lock().unwrap();
        assert_eq!(state.accumulated, "hello");
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn close_clears_state_and_ignores_later_pushes() {
        let session = detached();
        session.push_text("hello");
        session.close();
        session.push_text("more");
        session.end_input();

        let state = session.state.lock().unwrap();
        assert!(state.closed);
        assert!(state.accumulated.is_empty());
        assert!(state.queue.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let session = detached();
        session.close();
        session.close();
        assert!(session.state.lock().unwrap().closed);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_yields_no_frames() {
        let session = detached();
        session.push_text("hello");
        session.end_input();
        session.close();

        let frames: Vec<_> = session.frames().collect().await;
        assert!(frames.is_empty());
    }
}
