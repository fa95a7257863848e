//! Fixed-shape log records and the snapshot view the external loop reads.
//!
//! Each core variant keeps a record type whose fields are statically known,
//! so what the external loop may read is checked at compile time. The loop
//! itself consumes the uniform [`LogSnapshot`] mapping, whose keys match the
//! record fields one-to-one.

use std::collections::BTreeMap;

use serde::Serialize;

/// Batch-level metrics of the classification core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationBatchLogs {
    /// This batch's criterion loss.
    pub loss: f64,
}

/// Epoch-level metric of the classification core.
///
/// The core reports the debiased running loss under exactly one of the two
/// names, depending on which step type it last ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ClassificationEpochLogs {
    /// Debiased running loss over training batches ("train loss").
    Train(f64),
    /// Debiased running loss over validation batches ("valid loss").
    Valid(f64),
}

/// Log record of the classification core.
///
/// Updated incrementally: batch and epoch entries persist across batches
/// within an epoch, each replaced when its step type runs again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassificationLogs {
    /// Latest batch metrics, if a loss-computing step has run this epoch.
    pub batch: Option<ClassificationBatchLogs>,
    /// Latest epoch metric, if a loss-computing step has run this epoch.
    pub epoch: Option<ClassificationEpochLogs>,
}

impl ClassificationLogs {
    /// Whether nothing has been recorded yet this epoch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_none() && self.epoch.is_none()
    }

    /// Renders the record as the uniform snapshot mapping.
    #[must_use]
    pub fn snapshot(&self) -> LogSnapshot {
        let mut snap = LogSnapshot::default();
        if let Some(batch) = &self.batch {
            snap.batch_logs.insert("loss", batch.loss);
        }
        match self.epoch {
            Some(ClassificationEpochLogs::Train(v)) => {
                snap.epoch_logs.insert("train loss", v);
            }
            Some(ClassificationEpochLogs::Valid(v)) => {
                snap.epoch_logs.insert("valid loss", v);
            }
            None => {}
        }
        snap
    }
}

/// Instantaneous batch metrics of the adversarial core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdversarialBatchLogs {
    /// This batch's total generator loss.
    pub g_loss: f64,
    /// This batch's total discriminator loss.
    pub d_loss: f64,
}

/// Cumulative epoch metrics of the adversarial core.
///
/// All six values are running arithmetic means over the epoch to date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdversarialEpochLogs {
    /// Mean total generator loss.
    pub generator: f64,
    /// Mean total discriminator loss.
    pub discriminator: f64,
    /// Mean reconstruction term.
    pub mse: f64,
    /// Mean adversarial term.
    pub adversarial: f64,
    /// Mean perceptual (feature) term.
    pub vgg: f64,
    /// Mean total-variation term.
    pub tv: f64,
}

/// Log record of the adversarial core.
///
/// Overwritten wholesale on every batch: training fills both entries,
/// validation and eval leave the record empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdversarialLogs {
    /// This batch's totals, if the batch was a training batch.
    pub batch: Option<AdversarialBatchLogs>,
    /// Epoch-to-date means, if the batch was a training batch.
    pub epoch: Option<AdversarialEpochLogs>,
}

impl AdversarialLogs {
    /// Whether nothing has been recorded for the current batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_none() && self.epoch.is_none()
    }

    /// Renders the record as the uniform snapshot mapping.
    #[must_use]
    pub fn snapshot(&self) -> LogSnapshot {
        let mut snap = LogSnapshot::default();
        if let Some(batch) = &self.batch {
            snap.batch_logs.insert("g_loss", batch.g_loss);
            snap.batch_logs.insert("d_loss", batch.d_loss);
        }
        if let Some(epoch) = &self.epoch {
            snap.epoch_logs.insert("generator", epoch.generator);
            snap.epoch_logs.insert("discriminator", epoch.discriminator);
            snap.epoch_logs.insert("mse", epoch.mse);
            snap.epoch_logs.insert("adversarial", epoch.adversarial);
            snap.epoch_logs.insert("vgg", epoch.vgg);
            snap.epoch_logs.insert("tv", epoch.tv);
        }
        snap
    }
}

/// The batch/epoch metric snapshot exposed to the external training loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSnapshot {
    /// Metrics of the batch just processed.
    pub batch_logs: BTreeMap<&'static str, f64>,
    /// Epoch-to-date cumulative metrics.
    pub epoch_logs: BTreeMap<&'static str, f64>,
}

impl LogSnapshot {
    /// Whether no metric has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch_logs.is_empty() && self.epoch_logs.is_empty()
    }
}
