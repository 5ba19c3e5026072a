//! Playback-rate adjustment for 16-bit PCM WAV audio.
//!
//! Speeding up by `factor` keeps the sample rate and shortens the stream to
//! `frames / factor`, which is what overriding the frame rate and resampling
//! back to the original rate does. Pitch moves with the speed.

use crate::providers::ProviderError;
use bytes::Bytes;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Resample `audio` (a WAV file in memory) so it plays `factor` times faster.
/// A factor of 1.0 returns the input untouched.
pub fn adjust_playback_rate(audio: Bytes, factor: f32) -> Result<Bytes, ProviderError> {
    if (factor - 1.0).abs() <= f32::EPSILON {
        return Ok(audio);
    }
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ProviderError::Engine(format!(
            "invalid playback rate factor: {}",
            factor
        )));
    }

    let reader = WavReader::new(Cursor::new(audio.as_ref()))
        .map_err(|e| ProviderError::Engine(format!("unreadable WAV: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(ProviderError::Engine(format!(
            "unsupported WAV format: {:?} {} bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(|e| ProviderError::Engine(format!("corrupt WAV data: {}", e)))?;

    let resampled = resample_linear(&samples, spec.channels.max(1) as usize, factor as f64);
    write_wav(spec, &resampled).map(Bytes::from)
}

/// Linear-interpolation resampling of interleaved frames by `factor`
fn resample_linear(samples: &[i16], channels: usize, factor: f64) -> Vec<i16> {
    let frames = samples.len() / channels;
    if frames == 0 {
        return Vec::new();
    }
    let out_frames = ((frames as f64) / factor).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for j in 0..out_frames {
        let pos = j as f64 * factor;
        let i0 = (pos.floor() as usize).min(frames - 1);
        let i1 = (i0 + 1).min(frames - 1);
        let frac = pos - i0 as f64;
        for c in 0..channels {
            let a = samples[i0 * channels + c] as f64;
            let b = samples[i1 * channels + c] as f64;
            let v = a + (b - a) * frac;
            out.push(v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
        }
    }
    out
}

fn write_wav(spec: WavSpec, samples: &[i16]) -> Result<Vec<u8>, ProviderError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| ProviderError::Engine(format!("WAV writer: {}", e)))?;
        for s in samples {
            writer
                .write_sample(*s)
                .map_err(|e| ProviderError::Engine(format!("WAV write: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| ProviderError::Engine(format!("WAV finalize: {}", e)))?;
    }
    Ok(cursor.into_inner())
}
