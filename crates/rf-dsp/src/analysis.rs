//! Spectrum analysis of rendered lanes
//!
//! Offline measurement used to verify the decimators: pull one lane out of a
//! run of [`PolyFloat`] frames, window it, and read tone levels in dBFS.

use realfft::{RealFftPlanner, RealToComplex};
use rf_core::{POLY_LANES, PolyFloat, RfError, RfResult};
use rustfft::num_complex::Complex;
use std::sync::Arc;

const MIN_FFT_SIZE: usize = 64;
const MAX_FFT_SIZE: usize = 65536;

/// Floor for magnitudes before conversion to dB
const SILENCE_DB: f32 = -200.0;

/// Hann-windowed magnitude spectrum
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    scratch: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> RfResult<Self> {
        if !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) || !fft_size.is_power_of_two() {
            return Err(RfError::Dsp(format!("invalid FFT size {fft_size}")));
        }

        let mut planner = RealFftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2 + 1;

        // periodic Hann
        let window = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / fft_size as f64;
                (0.5 * (1.0 - phase.cos())) as f32
            })
            .collect();

        Ok(Self {
            fft,
            fft_size,
            window,
            scratch: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); bins],
            magnitudes: vec![SILENCE_DB; bins],
        })
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn bin_to_freq(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }

    pub fn freq_to_bin(&self, frequency: f64, sample_rate: f64) -> usize {
        ((frequency * self.fft_size as f64) / sample_rate).round() as usize
    }

    /// Spectrum of the last `fft_size` samples of `signal`, in dB relative
    /// to a full-scale sine
    pub fn magnitudes_db(&mut self, signal: &[f32]) -> RfResult<&[f32]> {
        if signal.len() < self.fft_size {
            return Err(RfError::Dsp(format!(
                "need {} samples, got {}",
                self.fft_size,
                signal.len()
            )));
        }

        let tail = &signal[signal.len() - self.fft_size..];
        for ((slot, &sample), &win) in self.scratch.iter_mut().zip(tail).zip(&self.window) {
            *slot = sample * win;
        }

        self.fft
            .process(&mut self.scratch, &mut self.spectrum)
            .map_err(|e| RfError::Dsp(e.to_string()))?;

        // Hann coherent gain is 1/2, a one-sided sine bin holds A * N / 2
        let scale = 4.0 / self.fft_size as f32;
        for (db, c) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            let magnitude = c.norm() * scale;
            *db = if magnitude > 0.0 {
                (20.0 * magnitude.log10()).max(SILENCE_DB)
            } else {
                SILENCE_DB
            };
        }

        Ok(&self.magnitudes)
    }

    /// Level of the tone at `frequency`: the loudest of the nearest bin and
    /// its direct neighbours
    pub fn tone_level_db(
        &mut self,
        signal: &[f32],
        frequency: f64,
        sample_rate: f64,
    ) -> RfResult<f32> {
        let bin = self.freq_to_bin(frequency, sample_rate);
        let magnitudes = self.magnitudes_db(signal)?;
        if bin >= magnitudes.len() {
            return Err(RfError::Dsp(format!(
                "{frequency} Hz is above Nyquist at {sample_rate} Hz"
            )));
        }

        let lo = bin.saturating_sub(1);
        let hi = (bin + 1).min(magnitudes.len() - 1);
        Ok(magnitudes[lo..=hi]
            .iter()
            .copied()
            .fold(SILENCE_DB, f32::max))
    }
}

/// One lane of a run of frames
pub fn lane_signal(buffer: &[PolyFloat], lane: usize) -> Vec<f32> {
    debug_assert!(lane < POLY_LANES);
    buffer.iter().map(|frame| frame.lane(lane)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f64, sample_rate: f64, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate;
                amplitude * phase.sin() as f32
            })
            .collect()
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(SpectrumAnalyzer::new(100).is_err());
        assert!(SpectrumAnalyzer::new(32).is_err());
        assert!(SpectrumAnalyzer::new(1024).is_ok());
    }

    #[test]
    fn test_full_scale_bin_centred_sine_reads_zero_db() {
        let mut analyzer = SpectrumAnalyzer::new(1024).unwrap();
        // bin 64
        let signal = sine(3000.0, 48000.0, 1.0, 1024);
        let level = analyzer.tone_level_db(&signal, 3000.0, 48000.0).unwrap();
        assert!(level.abs() < 0.1, "level = {level}");
    }

    #[test]
    fn test_level_tracks_amplitude() {
        let mut analyzer = SpectrumAnalyzer::new(2048).unwrap();
        let signal = sine(6000.0, 48000.0, 0.1, 4096);
        let level = analyzer.tone_level_db(&signal, 6000.0, 48000.0).unwrap();
        assert!((level + 20.0).abs() < 0.1, "level = {level}");

        let quiet = analyzer.tone_level_db(&signal, 15000.0, 48000.0).unwrap();
        assert!(quiet < -80.0, "leakage = {quiet}");
    }

    #[test]
    fn test_short_signal_is_an_error() {
        let mut analyzer = SpectrumAnalyzer::new(256).unwrap();
        assert!(analyzer.magnitudes_db(&[0.0; 100]).is_err());
        assert!(analyzer.tone_level_db(&[0.0; 256], 30000.0, 48000.0).is_err());
    }

    #[test]
    fn test_lane_signal() {
        let frames = [
            PolyFloat::from_array([1.0, 2.0, 3.0, 4.0]),
            PolyFloat::from_array([5.0, 6.0, 7.0, 8.0]),
        ];
        assert_eq!(lane_signal(&frames, 2), vec![3.0, 7.0]);
    }
}
