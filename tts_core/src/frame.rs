//! Fixed-duration frame packetization.
//!
//! A decoded sample buffer is split into 20 ms frames of the source
//! format, the last frame zero-padded to full size. Emission is paced in
//! real time, one frame per 20 ms of wall clock, so a downstream
//! real-time sink neither starves nor overflows. The sequence stops
//! within one pacing interval once the cancel flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_core::Stream;

use crate::wav::AudioAsset;

/// Wall-clock time covered by a single frame.
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// Samples per channel in one frame at the given rate.
pub fn frame_size(sample_rate: u32) -> usize {
    (sample_rate as f64 * FRAME_DURATION.as_secs_f64()).round() as usize
}

/// One fixed-duration slice of interleaved PCM samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Interleaved samples; always `samples_per_channel * num_channels` long.
    pub data: Vec<i16>,
    pub samples_per_channel: usize,
    pub sample_rate: u32,
    pub num_channels: u16,
}

impl AudioFrame {
    /// Little-endian byte view for byte-oriented sinks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 2);
        for sample in &self.data {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }
}

/// Split `asset` into paced 20 ms frames, stopping early when `cancel`
/// is raised.
pub(crate) fn paced_frames(
    asset: AudioAsset,
    cancel: Arc<AtomicBool>,
) -> impl Stream<Item = AudioFrame> + Send {
    stream! {
        let samples_per_channel = frame_size(asset.sample_rate);
        let step = samples_per_channel * asset.num_channels as usize;
        if step == 0 || asset.samples.is_empty() {
            return;
        }

        let mut offset = 0usize;
        while offset < asset.samples.len() {
            if cancel.load(Ordering::Relaxed) {
                return;
            }

            let end = (offset + step).min(asset.samples.len());
            let mut data = asset.samples[offset..end].to_vec();
            data.resize(step, 0);

            yield AudioFrame {
                data,
                samples_per_channel,
                sample_rate: asset.sample_rate,
                num_channels: asset.num_channels,
            };

            offset = end;
            if offset < asset.samples.len() {
                tokio::time::sleep(FRAME_DURATION).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn asset(sample_rate: u32, num_channels: u16, samples_per_channel: usize) -> AudioAsset {
        let total = samples_per_channel * num_channels as usize;
        AudioAsset {
            sample_rate,
            num_channels,
            samples: (0..total).map(|i| (i % 100) as i16 + 1).collect(),
        }
    }

    fn unset() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn frame_size_rounds_to_nearest_sample() {
        assert_eq!(frame_size(24_000), 480);
        assert_eq!(frame_size(22_050), 441);
        assert_eq!(frame_size(8000), 160);
        assert_eq!(frame_size(44_100), 882);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_cover_the_buffer_with_padded_tail() {
        // 12345 samples at 24 kHz: 25 full frames plus a 345-sample tail.
        let frames: Vec<_> = paced_frames(asset(24_000, 1, 12_345), unset())
            .collect()
            .await;

        assert_eq!(frames.len(), 26);
        assert!(frames.iter().all(|f| f.data.len() == 480));
        assert!(frames.iter().all(|f| f.samples_per_channel == 480));

        let tail = frames.last().unwrap();
        assert!(tail.data[..345].iter().all(|&s| s != 0));
        assert!(tail.data[345..].iter().all(|&s| s == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn stereo_frames_keep_the_interleaved_layout() {
        let frames: Vec<_> = paced_frames(asset(8000, 2, 400), unset()).collect().await;

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.data.len() == 320));
        assert!(frames.iter().all(|f| f.num_channels == 2));
        // 400 = 2 * 160 + 80: half of the last frame is padding.
        let tail = frames.last().unwrap();
        assert!(tail.data[160..].iter().all(|&s| s == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn emission_is_paced_between_frames() {
        let start = tokio::time::Instant::now();
        let frames: Vec<_> = paced_frames(asset(24_000, 1, 2400), unset()).collect().await;

        assert_eq!(frames.len(), 5);
        // Four sleeps between five frames, none after the last.
        assert_eq!(start.elapsed(), FRAME_DURATION * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_sequence_within_one_interval() {
        let cancel = unset();
        let stream = paced_frames(asset(24_000, 1, 24_000), cancel.clone());
        tokio::pin!(stream);

        assert!(stream.next().await.is_some());
        cancel.store(true, Ordering::Relaxed);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_buffer_yields_no_frames() {
        let empty = AudioAsset {
            sample_rate: 24_000,
            num_channels: 1,
            samples: Vec::new(),
        };
        let frames: Vec<_> = paced_frames(empty, unset()).collect().await;
        assert!(frames.is_empty());
    }

    #[test]
    fn frames_serialize_to_little_endian_bytes() {
        let frame = AudioFrame {
            data: vec![1, -2, 256],
            samples_per_channel: 3,
            sample_rate: 24_000,
            num_channels: 1,
        };
        assert_eq!(frame.to_bytes(), vec![1, 0, 0xFE, 0xFF, 0, 1]);
    }
}
