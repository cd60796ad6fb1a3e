//! Time Crystal Transform: decomposes a real-valued signal into a
//! prime-indexed activation spectrum using the PPM encoder.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::atomspace::Handle;
use crate::config::TCTransformConfig;
use crate::constants::PI;
use crate::error::{NanoBrainError, Result};
use crate::kernel::UnifiedKernel;
use crate::ppm::{compute_ppm_coherence, prime_encode};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TCTransformResult {
    /// Activation per prime touched, ascending by prime.
    pub prime_spectrum: BTreeMap<u32, f64>,
    /// Phase angle of the signal at each spectrum prime's frequency.
    pub phase_values: BTreeMap<u32, f64>,
    /// Highest-activation primes first; ties go to the smaller prime.
    pub dominant_primes: Vec<u32>,
    pub overall_coherence: f64,
    /// RMS of the input signal.
    pub signal_energy: f64,
    pub signal_length: usize,
}

pub struct TCTransformEngine {
    config: TCTransformConfig,
    kernel: Option<Arc<UnifiedKernel>>,
}

impl TCTransformEngine {
    pub fn new(config: TCTransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            kernel: None,
        })
    }

    /// Engine that can feed its results back into `kernel`.
    pub fn bound(kernel: Arc<UnifiedKernel>, config: TCTransformConfig) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.kernel = Some(kernel);
        Ok(engine)
    }

    pub fn config(&self) -> &TCTransformConfig {
        &self.config
    }

    pub fn kernel(&self) -> Option<&Arc<UnifiedKernel>> {
        self.kernel.as_ref()
    }

    pub fn transform(&self, signal: &[f64]) -> Result<TCTransformResult> {
        if signal.is_empty() {
            return Err(NanoBrainError::InvalidSignal("signal is empty".into()));
        }
        let k = self.config.num_prime_components;

        let mut spectrum: BTreeMap<u32, f64> = BTreeMap::new();
        for &sample in signal {
            for p in prime_encode(sample, k)? {
                *spectrum.entry(p).or_default() += 1.0;
            }
        }

        let mut ranked: Vec<(u32, f64)> = spectrum.iter().map(|(&p, &a)| (p, a)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let dominant_primes: Vec<u32> = ranked.iter().take(k).map(|(p, _)| *p).collect();

        if self.config.normalize_output {
            let max = ranked.first().map_or(1.0, |(_, a)| *a);
            for activation in spectrum.values_mut() {
                *activation /= max;
            }
        }

        let phase_values = spectrum
            .keys()
            .map(|&p| (p, phase_at(signal, p)))
            .collect();

        let energy = (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt();

        Ok(TCTransformResult {
            overall_coherence: compute_ppm_coherence(&dominant_primes),
            prime_spectrum: spectrum,
            phase_values,
            dominant_primes,
            signal_energy: energy,
            signal_length: signal.len(),
        })
    }

    /// Rebuild a signal of `length` samples (default `signal_resolution`) as a
    /// sum of cosines at the dominant primes.
    pub fn inverse_transform(&self, result: &TCTransformResult, length: Option<usize>) -> Vec<f64> {
        let length = length.unwrap_or(self.config.signal_resolution);
        let max = result
            .prime_spectrum
            .values()
            .copied()
            .fold(0.0f64, f64::max);
        let mut out = vec![0.0; length];
        if max <= 0.0 || length == 0 {
            return out;
        }
        for p in &result.dominant_primes {
            let amplitude = result.prime_spectrum.get(p).copied().unwrap_or(0.0) / max;
            let phase = result.phase_values.get(p).copied().unwrap_or(0.0);
            for (i, sample) in out.iter_mut().enumerate() {
                let t = i as f64 / length as f64;
                *sample += amplitude * (2.0 * PI * *p as f64 * t - phase).cos();
            }
        }
        out
    }

    /// The dominant primes describing `pattern`.
    pub fn extract_prime_encoding(&self, pattern: &[f64]) -> Result<Vec<u32>> {
        Ok(self.transform(pattern)?.dominant_primes)
    }

    /// Stimulate the bound kernel's `Prime{p}` number nodes by each dominant
    /// prime's normalized activation times `stimulus`, creating missing nodes.
    pub fn stimulate_kernel(&self, result: &TCTransformResult, stimulus: f64) -> Result<Vec<Handle>> {
        let kernel = self
            .kernel
            .as_ref()
            .ok_or(NanoBrainError::NotActive("transform engine kernel binding"))?;
        let max = result
            .prime_spectrum
            .values()
            .copied()
            .fold(0.0f64, f64::max);
        // Every amount is checked before the first node is created.
        let amounts: Vec<(u32, f64)> = result
            .dominant_primes
            .iter()
            .map(|p| {
                let share = match result.prime_spectrum.get(p) {
                    Some(a) if max > 0.0 => a / max,
                    _ => 0.0,
                };
                (*p, share * stimulus)
            })
            .collect();
        if let Some((p, amount)) = amounts.iter().find(|(_, a)| !a.is_finite()) {
            return Err(NanoBrainError::InvalidSignal(format!(
                "stimulus for prime {p} must be finite, got {amount}"
            )));
        }

        let mut touched = Vec::with_capacity(amounts.len());
        for (p, amount) in amounts {
            let id = kernel.ensure_atom("NumberNode", &format!("Prime{p}"), 1.0, 0.9)?;
            kernel.stimulate(id, amount)?;
            touched.push(id);
        }
        Ok(touched)
    }
}

/// `atan2` of the sine and cosine correlation at frequency `prime` over the
/// normalized time axis.
fn phase_at(signal: &[f64], prime: u32) -> f64 {
    let n = signal.len() as f64;
    let omega = 2.0 * PI * prime as f64;
    let (c, s) = signal
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(c, s), (i, x)| {
            let t = i as f64 / n;
            (c + x * (omega * t).cos(), s + x * (omega * t).sin())
        });
    s.atan2(c)
}
