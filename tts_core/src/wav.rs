//! WAV asset loading.
//!
//! Assets are 16-bit PCM RIFF files, mono or interleaved multi-channel.
//! No resampling or channel conversion happens here: frames built from an
//! asset always carry the source file's exact format. Every synthesis
//! call re-reads its asset from disk; nothing is cached.

use std::path::Path;

use crate::error::TtsError;

/// A fully decoded audio asset.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub sample_rate: u32,
    pub num_channels: u16,
    /// Interleaved 16-bit PCM samples.
    pub samples: Vec<i16>,
}

impl AudioAsset {
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / self.num_channels.max(1) as usize
    }

    /// Playback time derived from the sample count.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples_per_channel() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Read and decode a 16-bit PCM WAV file.
pub fn read_asset(path: &Path) -> Result<AudioAsset, TtsError> {
    if !path.is_file() {
        return Err(TtsError::AssetNotFound(path.to_path_buf()));
    }

    let decode_err = |detail: String| TtsError::Decode {
        path: path.to_path_buf(),
        detail,
    };

    let mut reader = hound::WavReader::open(path).map_err(|e| decode_err(e.to_string()))?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(decode_err(format!(
            "unsupported format: {:?} {} bit, expected 16-bit integer PCM",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(|e| decode_err(e.to_string()))?;

    Ok(AudioAsset {
        sample_rate: spec.sample_rate,
        num_channels: spec.channels,
        samples,
    })
}
