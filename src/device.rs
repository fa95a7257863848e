//! Accelerator selection.
//!
//! Mirrors the usual training setup: prefer CUDA when the binary was built
//! with it, fall back to CPU with a warning otherwise, and honor an explicit
//! CPU override for debugging.

use candle_core::Device;

/// Environment variable forcing CPU execution (`1` or `true`).
pub const FORCE_CPU_ENV: &str = "LEARNER_FORCE_CPU";

/// Returns the device batches and parameters should live on.
///
/// Deterministic for a given process environment, which makes device
/// relocation through it idempotent.
#[must_use]
pub fn accelerator() -> Device {
    let force_cpu = std::env::var(FORCE_CPU_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if force_cpu {
        tracing::warn!("CPU mode forced via {FORCE_CPU_ENV}");
        return Device::Cpu;
    }
    match Device::cuda_if_available(0) {
        Ok(device @ Device::Cuda(_)) => {
            tracing::info!("using CUDA device 0");
            device
        }
        Ok(_) => {
            tracing::warn!("CUDA not available; staying on CPU");
            Device::Cpu
        }
        Err(err) => {
            tracing::warn!("CUDA init failed ({err}); staying on CPU");
            Device::Cpu
        }
    }
}
