//! Spectral feature extraction
//!
//! Computes the numeric fingerprint from mono samples at the source sample
//! rate: a log-mel spectrogram feeds 13 MFCC means, 7 octave-band spectral
//! contrast means, a 12-bin chroma profile, and an onset-autocorrelation
//! tempo estimate. All values are averaged over analysis frames so each
//! file reduces to fixed-length vectors.
//!
//! # Frame parameters
//!
//! - **N_FFT = 2048**: ~46ms windows at 44.1kHz, enough frequency
//!   resolution to separate mel bands and pitch classes.
//! - **HOP_LENGTH = 512**: 75% overlap, smooth onset envelope for tempo
//!   autocorrelation.

use crate::analysis::traits::FeatureExtractor;
use crate::error::{AudioprintError, Result};
use crate::types::{AudioBuffer, FeatureSet};
use rustfft::{num_complex::Complex, FftPlanner};
use std::path::PathBuf;
use tracing::debug;

/// FFT window size
pub const N_FFT: usize = 2048;

/// Hop length between frames
pub const HOP_LENGTH: usize = 512;

/// Number of frequency bins in the positive-frequency half of the spectrum
pub const NUM_FREQ_BINS: usize = N_FFT / 2 + 1;

const N_MELS: usize = 40;
const N_MFCC: usize = 13;
const N_CHROMA: usize = 12;

/// Octave band edges for spectral contrast (Hz); the top band runs to
/// Nyquist, giving 7 bands
const CONTRAST_EDGES_HZ: [f32; 7] = [0.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0];
const N_CONTRAST_BANDS: usize = 7;

/// Tempo search range in BPM
const TEMPO_MIN_BPM: f32 = 30.0;
const TEMPO_MAX_BPM: f32 = 300.0;

/// Feature extractor backed by an in-process STFT analysis chain
pub struct SpectralExtractor;

impl SpectralExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpectralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for SpectralExtractor {
    fn extract(&self, buffer: &AudioBuffer) -> Result<FeatureSet> {
        if buffer.sample_rate == 0 {
            return Err(feature_error("invalid sample rate (0 Hz)"));
        }

        let spectrogram = power_spectrogram(&buffer.samples);
        if spectrogram.is_empty() {
            return Err(feature_error(format!(
                "Audio too short for analysis ({} samples, need at least {})",
                buffer.len(),
                N_FFT
            )));
        }

        debug!(
            "Extracting features: {} frames @ {}Hz",
            spectrogram.len(),
            buffer.sample_rate
        );

        // MFCC is the required core of the fingerprint; everything after it
        // is best-effort and omitted rather than failing the file.
        let mfcc = mfcc_means(&spectrogram, buffer.sample_rate);
        if mfcc.is_empty() {
            return Err(feature_error("MFCC computation produced no coefficients"));
        }

        let spectral_contrast = contrast_means(&spectrogram, buffer.sample_rate);
        let chroma = chroma_means(&spectrogram, buffer.sample_rate);
        let tempo = estimate_tempo(&spectrogram, buffer.sample_rate);

        Ok(FeatureSet {
            mfcc,
            spectral_contrast,
            chroma,
            tempo,
        })
    }

    fn name(&self) -> &'static str {
        "spectral"
    }
}

fn feature_error(reason: impl Into<String>) -> AudioprintError {
    // The orchestrator re-attaches the file path at the state-machine boundary
    AudioprintError::FeatureError {
        path: PathBuf::new(),
        reason: reason.into(),
    }
}

// =============================================================================
// Spectrogram
// =============================================================================

/// Power spectrogram: one Vec of NUM_FREQ_BINS power values per frame
fn power_spectrogram(samples: &[f32]) -> Vec<Vec<f32>> {
    if samples.len() < N_FFT {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let window = hann_window(N_FFT);

    let num_frames = (samples.len() - N_FFT) / HOP_LENGTH + 1;
    let mut spectrogram = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_LENGTH;

        let mut buffer: Vec<Complex<f32>> = samples[start..start + N_FFT]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        fft.process(&mut buffer);

        let frame: Vec<f32> = buffer[..NUM_FREQ_BINS]
            .iter()
            .map(|c| c.norm_sqr())
            .collect();
        spectrogram.push(frame);
    }

    spectrogram
}

/// Generate Hann window of given size
fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

// =============================================================================
// MFCC
// =============================================================================

/// Mel filterbank → log energies → DCT-II → per-coefficient time means
fn mfcc_means(spectrogram: &[Vec<f32>], sample_rate: u32) -> Vec<f32> {
    let filters = mel_filterbank(N_MELS, sample_rate);
    let num_frames = spectrogram.len();

    // Pre-compute DCT-II basis vectors
    let mut dct_basis = vec![vec![0.0f32; N_MELS]; N_MFCC];
    for (k, row) in dct_basis.iter_mut().enumerate() {
        for (n, v) in row.iter_mut().enumerate() {
            *v = (std::f32::consts::PI * k as f32 * (n as f32 + 0.5) / N_MELS as f32).cos();
        }
    }

    let mut sums = vec![0.0f32; N_MFCC];

    for frame in spectrogram {
        // Log mel energies
        let log_energies: Vec<f32> = filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .map(|&(bin, weight)| frame[bin] * weight)
                    .sum();
                (energy + 1e-10).ln()
            })
            .collect();

        // Apply DCT-II to get the cepstral coefficients
        for (k, sum) in sums.iter_mut().enumerate() {
            let coeff: f32 = log_energies
                .iter()
                .zip(dct_basis[k].iter())
                .map(|(&e, &b)| e * b)
                .sum();
            *sum += coeff;
        }
    }

    sums.iter().map(|s| s / num_frames as f32).collect()
}

/// Triangular mel filterbank as sparse (bin, weight) lists
fn mel_filterbank(num_filters: usize, sample_rate: u32) -> Vec<Vec<(usize, f32)>> {
    let nyquist = sample_rate as f32 / 2.0;
    let mel_max = hz_to_mel(nyquist);

    // num_filters + 2 evenly spaced points on the mel scale
    let mel_points: Vec<f32> = (0..num_filters + 2)
        .map(|i| mel_max * i as f32 / (num_filters + 1) as f32)
        .collect();
    let bin_points: Vec<f32> = mel_points
        .iter()
        .map(|&m| mel_to_hz(m) * N_FFT as f32 / sample_rate as f32)
        .collect();

    (0..num_filters)
        .map(|f| {
            let (left, center, right) = (bin_points[f], bin_points[f + 1], bin_points[f + 2]);
            let mut filter = Vec::new();
            let lo = left.floor().max(0.0) as usize;
            let hi = (right.ceil() as usize).min(NUM_FREQ_BINS - 1);
            for bin in lo..=hi {
                let b = bin as f32;
                let weight = if b < center {
                    (b - left) / (center - left).max(1e-6)
                } else {
                    (right - b) / (right - center).max(1e-6)
                };
                if weight > 0.0 {
                    filter.push((bin, weight));
                }
            }
            filter
        })
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

// =============================================================================
// Spectral contrast
// =============================================================================

/// Per octave-band peak-to-valley contrast, averaged over frames
///
/// Needs the full band layout below Nyquist; too low a sample rate omits
/// the feature rather than producing degenerate bands.
fn contrast_means(spectrogram: &[Vec<f32>], sample_rate: u32) -> Option<Vec<f32>> {
    let nyquist = sample_rate as f32 / 2.0;
    if nyquist <= CONTRAST_EDGES_HZ[N_CONTRAST_BANDS - 1] {
        return None;
    }

    let hz_to_bin = |hz: f32| ((hz * N_FFT as f32 / sample_rate as f32) as usize).min(NUM_FREQ_BINS);
    let mut edges: Vec<usize> = CONTRAST_EDGES_HZ.iter().map(|&hz| hz_to_bin(hz)).collect();
    edges.push(NUM_FREQ_BINS);

    let mut sums = vec![0.0f32; N_CONTRAST_BANDS];

    for frame in spectrogram {
        for band in 0..N_CONTRAST_BANDS {
            let start = edges[band];
            let end = edges[band + 1].max(start + 1).min(NUM_FREQ_BINS);

            let mut magnitudes: Vec<f32> = frame[start..end].to_vec();
            magnitudes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let peak = *magnitudes.last().unwrap_or(&0.0);
            let valley = *magnitudes.first().unwrap_or(&0.0);
            // Log-scale contrast (dB-like)
            sums[band] += ((peak + 1e-10) / (valley + 1e-10)).log10();
        }
    }

    let num_frames = spectrogram.len() as f32;
    Some(sums.iter().map(|s| s / num_frames).collect())
}

// =============================================================================
// Chroma
// =============================================================================

/// 12-bin pitch-class energy profile, L1-normalized per frame then averaged
fn chroma_means(spectrogram: &[Vec<f32>], sample_rate: u32) -> Option<Vec<f32>> {
    if spectrogram.is_empty() {
        return None;
    }

    // Map each bin to a pitch class; bins outside the melodic range carry
    // no weight
    let bin_to_class: Vec<Option<usize>> = (0..NUM_FREQ_BINS)
        .map(|bin| {
            let freq = bin as f32 * sample_rate as f32 / N_FFT as f32;
            if !(20.0..=8000.0).contains(&freq) {
                return None;
            }
            // MIDI note = 69 + 12*log2(freq/440)
            let midi = 69.0 + 12.0 * (freq / 440.0).log2();
            Some(((midi.round() as i32 % 12 + 12) % 12) as usize)
        })
        .collect();

    let mut sums = [0.0f32; N_CHROMA];

    for frame in spectrogram {
        let mut profile = [0.0f32; N_CHROMA];
        for (bin, &power) in frame.iter().enumerate() {
            if let Some(class) = bin_to_class[bin] {
                profile[class] += power;
            }
        }
        // L1 normalize
        let total: f32 = profile.iter().sum::<f32>().max(1e-10);
        for (sum, p) in sums.iter_mut().zip(profile.iter()) {
            *sum += p / total;
        }
    }

    let num_frames = spectrogram.len() as f32;
    Some(sums.iter().map(|s| s / num_frames).collect())
}

// =============================================================================
// Tempo
// =============================================================================

/// Tempo from autocorrelation of the spectral-flux onset envelope
///
/// Returns None when the signal is too short to cover the slowest searched
/// period or has no onset energy at all.
fn estimate_tempo(spectrogram: &[Vec<f32>], sample_rate: u32) -> Option<f64> {
    let frames_per_sec = sample_rate as f32 / HOP_LENGTH as f32;

    // Half-wave rectified spectral flux
    let mut envelope = Vec::with_capacity(spectrogram.len());
    for pair in spectrogram.windows(2) {
        let flux: f32 = pair[1]
            .iter()
            .zip(pair[0].iter())
            .map(|(&cur, &prev)| (cur.sqrt() - prev.sqrt()).max(0.0))
            .sum();
        envelope.push(flux);
    }

    let lag_min = (frames_per_sec * 60.0 / TEMPO_MAX_BPM).round().max(1.0) as usize;
    let lag_max = (frames_per_sec * 60.0 / TEMPO_MIN_BPM).round() as usize;
    if envelope.len() <= lag_max {
        return None;
    }

    // Center the envelope so steady broadband energy does not dominate
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let denom: f32 = centered.iter().map(|v| v * v).sum();
    if denom <= 1e-10 {
        return None;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f32;
    for lag in lag_min..=lag_max {
        let corr: f32 = centered[..centered.len() - lag]
            .iter()
            .zip(centered[lag..].iter())
            .map(|(&a, &b)| a * b)
            .sum::<f32>()
            / denom;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_corr <= 0.0 {
        return None;
    }

    Some((60.0 * frames_per_sec / best_lag as f32) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(freq: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
        use std::f32::consts::PI;
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let samples: Vec<f32> = (0..num_samples)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    /// Clicks at regular intervals matching the given BPM
    fn click_buffer(bpm: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;
        let impulse_samples = (0.005 * sample_rate as f32) as usize;

        let samples: Vec<f32> = (0..num_samples)
            .map(|i| {
                let position_in_beat = i % samples_per_beat;
                if position_in_beat < impulse_samples {
                    let decay =
                        (-5.0 * position_in_beat as f32 / impulse_samples as f32).exp();
                    0.8 * decay
                } else {
                    0.0
                }
            })
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    /// Allow half-time/double-time confusions, like any autocorrelation
    /// tempo estimator
    fn is_bpm_match(detected: f64, target: f64, tolerance: f64) -> bool {
        (detected - target).abs() <= tolerance
            || (detected * 2.0 - target).abs() <= tolerance
            || (detected / 2.0 - target).abs() <= tolerance
    }

    #[test]
    fn sine_yields_full_feature_set() {
        let extractor = SpectralExtractor::new();
        let features = extractor.extract(&sine_buffer(440.0, 3.0, 22050)).unwrap();

        assert_eq!(features.mfcc.len(), 13);
        assert_eq!(features.spectral_contrast.as_ref().unwrap().len(), 7);
        assert_eq!(features.chroma.as_ref().unwrap().len(), 12);
        assert!(features.mfcc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = SpectralExtractor::new();
        let buffer = sine_buffer(330.0, 2.0, 22050);
        let a = extractor.extract(&buffer).unwrap();
        let b = extractor.extract(&buffer).unwrap();
        assert_eq!(a.mfcc, b.mfcc);
        assert_eq!(a.chroma, b.chroma);
        assert_eq!(a.tempo, b.tempo);
    }

    #[test]
    fn chroma_peaks_at_the_played_pitch_class() {
        let extractor = SpectralExtractor::new();
        // 440 Hz = A
        let features = extractor.extract(&sine_buffer(440.0, 3.0, 22050)).unwrap();
        let chroma = features.chroma.unwrap();
        let argmax = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(argmax, 9, "chroma should peak at pitch class A, got bin {argmax}");
    }

    #[test]
    fn click_track_tempo_is_recovered() {
        let extractor = SpectralExtractor::new();
        let features = extractor
            .extract(&click_buffer(120.0, 10.0, 22050))
            .unwrap();
        let tempo = features.tempo.expect("click track should have a tempo");
        assert!(
            is_bpm_match(tempo, 120.0, 6.0),
            "detected {tempo} BPM for a 120 BPM click track"
        );
    }

    #[test]
    fn too_short_audio_fails_with_feature_error() {
        let extractor = SpectralExtractor::new();
        let buffer = AudioBuffer::new(vec![0.1; 100], 22050);
        let err = extractor.extract(&buffer).unwrap_err();
        assert!(matches!(err, AudioprintError::FeatureError { .. }));
    }

    #[test]
    fn short_audio_omits_tempo_but_keeps_mfcc() {
        let extractor = SpectralExtractor::new();
        // One second is enough for frames but not for the slowest tempo lag
        let features = extractor.extract(&sine_buffer(440.0, 1.0, 22050)).unwrap();
        assert_eq!(features.mfcc.len(), 13);
        assert!(features.tempo.is_none());
    }

    #[test]
    fn silence_has_no_tempo() {
        let extractor = SpectralExtractor::new();
        let buffer = AudioBuffer::new(vec![0.0; 22050 * 5], 22050);
        let features = extractor.extract(&buffer).unwrap();
        assert!(features.tempo.is_none());
    }

    #[test]
    fn low_sample_rate_omits_spectral_contrast() {
        let extractor = SpectralExtractor::new();
        let features = extractor.extract(&sine_buffer(100.0, 2.0, 4000)).unwrap();
        assert!(features.spectral_contrast.is_none());
        assert_eq!(features.mfcc.len(), 13);
    }

    #[test]
    fn duplicate_buffers_produce_identical_mfcc() {
        let extractor = SpectralExtractor::new();
        let a = sine_buffer(261.63, 2.0, 22050);
        let b = sine_buffer(261.63, 2.0, 22050);
        assert_eq!(
            extractor.extract(&a).unwrap().mfcc,
            extractor.extract(&b).unwrap().mfcc
        );
    }
}
