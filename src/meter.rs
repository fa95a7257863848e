//! Running statistics over streamed scalar loss values.
//!
//! Each loss channel a core tracks gets its own [`AverageMeter`]. The meter
//! exposes two readings: the plain arithmetic mean of everything seen since
//! the last reset, and a debiased exponential moving average that corrects
//! the EMA's cold-start bias toward zero.

/// Default EMA decay for the debiased reading.
pub const DEFAULT_DECAY: f64 = 0.98;

/// Numerically stable accumulator for a stream of scalar values.
///
/// # Example
/// ```
/// use learner_cores_rs::AverageMeter;
///
/// let mut meter = AverageMeter::new();
/// meter.update(2.0);
/// meter.update(4.0);
/// assert!((meter.avg() - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct AverageMeter {
    sum: f64,
    count: u64,
    /// EMA decay (weight kept from the previous average per update).
    decay: f64,
    mov_avg: f64,
}

impl AverageMeter {
    /// Creates a meter with the default decay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_decay(DEFAULT_DECAY)
    }

    /// Creates a meter with an explicit EMA decay.
    ///
    /// # Panics
    /// Panics if `decay` is not in `(0, 1)`.
    #[must_use]
    pub fn with_decay(decay: f64) -> Self {
        assert!(
            decay > 0.0 && decay < 1.0,
            "decay must be in (0, 1), got {decay}"
        );
        Self {
            sum: 0.0,
            count: 0,
            decay,
            mov_avg: 0.0,
        }
    }

    /// Appends one observation.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.mov_avg = self.decay * self.mov_avg + (1.0 - self.decay) * value;
    }

    /// Arithmetic mean of all observations since the last reset.
    ///
    /// Returns 0.0 before the first observation; an empty meter is "no value
    /// yet", never a division by zero.
    #[must_use]
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Debiased exponential moving average.
    ///
    /// The raw EMA starts at zero and is biased toward it for small counts;
    /// dividing by `1 - decay^n` corrects this. After exactly one update the
    /// reading equals that update's value.
    #[must_use]
    pub fn debias(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let correction = 1.0 - self.decay.powi(self.count.min(i32::MAX as u64) as i32);
        self.mov_avg / correction
    }

    /// Number of observations since the last reset.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether no observation has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Restores the empty state, keeping the configured decay.
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
        self.mov_avg = 0.0;
    }
}

impl Default for AverageMeter {
    fn default() -> Self {
        Self::new()
    }
}
