//! Level and pitch summary of a rendered channel.

use std::fmt;

use rustfft::{num_complex::Complex, FftPlanner};

/// Longest stretch analysed for the dominant frequency.
const MAX_FFT_LEN: usize = 1 << 16;

pub struct ChannelReport {
    pub peak: f32,
    pub rms: f32,
    /// Strongest FFT bin, in Hz. `None` for silence or very short renders.
    pub dominant: Option<f64>,
}

impl ChannelReport {
    pub fn analyze(samples: &[f32], sample_rate: f32) -> Self {
        let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        let rms = if samples.is_empty() {
            0.0
        } else {
            let power: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
            (power / samples.len() as f64).sqrt() as f32
        };

        Self {
            peak,
            rms,
            dominant: dominant_frequency(samples, sample_rate),
        }
    }
}

/// Frequency of the strongest bin of a Hann-windowed FFT, skipping DC.
fn dominant_frequency(samples: &[f32], sample_rate: f32) -> Option<f64> {
    let len = samples.len().min(MAX_FFT_LEN);
    if len < 4 {
        return None;
    }
    let samples = &samples[..len];

    // Hann window - reduces spectral leakage
    let denom = (len - 1) as f32;
    let mut spectrum: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos());
            Complex::new(s * w, 0.0)
        })
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(len).process(&mut spectrum);

    let (bin, power) = spectrum[1..len / 2]
        .iter()
        .map(|c| c.re * c.re + c.im * c.im)
        .enumerate()
        .fold((0, 0.0f32), |best, (i, p)| if p > best.1 { (i + 1, p) } else { best });

    (power > 1e-12).then(|| bin as f64 * sample_rate as f64 / len as f64)
}

impl fmt::Display for ChannelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let db = |v: f32| 20.0 * v.max(1e-9).log10();
        write!(
            f,
            "peak {:.4} ({:.1} dBFS), rms {:.4} ({:.1} dBFS)",
            self.peak,
            db(self.peak),
            self.rms,
            db(self.rms)
        )?;
        match self.dominant {
            Some(hz) => write!(f, ", dominant {hz:.1} Hz"),
            None => Ok(()),
        }
    }
}
