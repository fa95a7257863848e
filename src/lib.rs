//! # learner-cores-rs
//!
//! Swappable training cores for an external learner loop.
//!
//! A *core* encapsulates everything needed to push one batch through one or
//! more models: the models themselves, their optimizers, and the loss
//! criteria. The external loop owns epoch iteration, callbacks, and
//! checkpointing; it drives whichever core it was handed through the uniform
//! [`TrainingCore`] protocol and reads per-batch and per-epoch statistics
//! back through [`LogSnapshot`](logs::LogSnapshot).
//!
//! Two cores are provided:
//!
//! - [`ClassificationCore`] - single-model supervised training/eval.
//! - [`AdversarialCore`] - generator/discriminator adversarial training with
//!   alternating optimization and six running loss statistics.
//!
//! ## Driving a core
//!
//! ```rust,ignore
//! use learner_cores_rs::{ClassificationCore, Step, TrainingCore};
//!
//! let mut core = ClassificationCore::new(model, optimizer, criterion);
//! core.to_gpu()?;
//! for epoch in 0..epochs {
//!     core.on_new_epoch();
//!     core.on_train_mode();
//!     for (inputs, targets) in &train_batches {
//!         let logits = core.on_forward_batch(Step::Training, inputs, Some(targets))?;
//!         let logs = core.logs();
//!         // display / checkpoint decisions from logs
//!     }
//! }
//! ```
//!
//! ## Tensor substrate
//!
//! Cores are built on candle. Gradients come from [`Tensor::backward`], which
//! returns a fresh gradient store per call; since candle graphs are immutable
//! DAGs, two loss heads may share one forward computation and each take their
//! own backward pass, which is exactly what the adversarial core does.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)]
// Loss bookkeeping freely converts between f32 tensors and f64 statistics.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;

use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Tensor, Var};
use serde::{Deserialize, Serialize};

pub mod adversarial;
pub mod classification;
pub mod config;
pub mod criterion;
pub mod device;
pub mod error;
pub mod logs;
pub mod meter;

pub use adversarial::AdversarialCore;
pub use classification::ClassificationCore;
pub use config::AdversarialConfig;
pub use criterion::{
    ClassificationCriterion, CrossEntropy, GeneratorCriterion, GeneratorLossTerms, Mse,
    SrganGeneratorCriterion,
};
pub use error::{CoreError, Result};
pub use logs::LogSnapshot;
pub use meter::AverageMeter;

/// Which sub-protocol of a core a batch invocation requests.
///
/// The step selects both the computation performed (loss or not, backward or
/// not) and whether model parameters may be mutated. Only [`Step::Training`]
/// updates parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// Forward, loss, backward, and optimizer step.
    Training,
    /// Forward and loss bookkeeping only; parameters are never touched.
    Validation,
    /// Forward only, for prediction. No targets, no loss, no logging.
    Eval,
}

impl Step {
    /// Returns a human-readable name for the step.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Step::Training => "training",
            Step::Validation => "validation",
            Step::Eval => "eval",
        }
    }

    /// Returns whether this step computes a loss against targets.
    #[must_use]
    pub fn computes_loss(&self) -> bool {
        matches!(self, Step::Training | Step::Validation)
    }
}

/// Trait for models a core can drive.
///
/// # Why This Trait?
///
/// The cores never inspect layer graphs. They need exactly four things from a
/// model: run a forward pass, flip between training and inference behavior
/// (dropout and friends), hand out the trainable variables so optimizers can
/// be bound to them, and relocate to a device. Anything candle can express
/// behind those four operations works as a core model.
pub trait Model {
    /// Executes the forward pass.
    ///
    /// # Errors
    ///
    /// Propagates any tensor failure (shape mismatch, device error) unchanged.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor>;

    /// Switches the model between training and inference behavior.
    ///
    /// Affects stochastic regularization layers only; parameters are not
    /// touched.
    fn set_training(&mut self, training: bool);

    /// Returns the trainable variables.
    ///
    /// Used for optimizer binding and for parameter inspection by the
    /// external loop. The returned `Var`s share storage with the model, so
    /// reads observe optimizer updates.
    fn variables(&self) -> Vec<Var>;

    /// Relocates the model parameters to the given device.
    ///
    /// Must be idempotent: relocating to the current device is a no-op.
    /// Relocate before binding optimizers; candle optimizers hold the
    /// variables they were constructed from.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter transfer fails.
    fn to_device(&mut self, device: &Device) -> Result<()>;
}

/// Trait for optimizers that update model parameters from a gradient store.
///
/// Blanket-implemented for every [`candle_nn::Optimizer`], so `SGD`, `AdamW`,
/// and custom candle optimizers plug in directly.
///
/// There is no `zero_grad` operation: [`Tensor::backward`] produces a fresh
/// [`GradStore`] per call, so gradients never accumulate across batches.
pub trait ModelOptimizer {
    /// Applies one optimization step from the given gradients.
    ///
    /// Only the variables this optimizer was bound to are updated, even when
    /// the store holds gradients for other variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter update fails.
    fn step(&mut self, grads: &GradStore) -> Result<()>;

    /// Returns the current learning rate.
    fn learning_rate(&self) -> f64;

    /// Sets the learning rate (for schedulers).
    fn set_learning_rate(&mut self, lr: f64);
}

impl<O: candle_nn::Optimizer> ModelOptimizer for O {
    fn step(&mut self, grads: &GradStore) -> Result<()> {
        candle_nn::Optimizer::step(self, grads)?;
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        candle_nn::Optimizer::learning_rate(self)
    }

    fn set_learning_rate(&mut self, lr: f64) {
        candle_nn::Optimizer::set_learning_rate(self, lr);
    }
}

/// The uniform protocol an external learner loop drives a core through.
///
/// Exactly one core is active per training run. The loop calls
/// [`on_new_epoch`](TrainingCore::on_new_epoch) once before the first batch
/// of each epoch, then [`on_forward_batch`](TrainingCore::on_forward_batch)
/// per batch, reading [`logs`](TrainingCore::logs) after each call. Mode
/// switches and device relocation happen around the epoch loop.
///
/// A missing operation on a variant is a compile error here, not a runtime
/// `NotImplemented`; the trait is the contract.
///
/// Cores are single-threaded by contract: state is mutated in place and a
/// core must not be driven from multiple threads without external
/// synchronization.
pub trait TrainingCore {
    /// Switches every owned model to training behavior.
    fn on_train_mode(&mut self);

    /// Switches every owned model to inference behavior.
    fn on_eval_mode(&mut self);

    /// Resets all running statistics and clears the logs.
    ///
    /// Must be called exactly once before the first batch of each epoch.
    /// Model and optimizer state are untouched.
    fn on_new_epoch(&mut self);

    /// Relocates every owned model to the accelerator device.
    ///
    /// Idempotent. Falls back to CPU with a warning when no accelerator is
    /// available (see [`device::accelerator`]).
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter transfer fails.
    fn to_gpu(&mut self) -> Result<()>;

    /// Returns the owned models keyed by a stable identifier, for
    /// checkpointing and inspection by the external loop.
    fn models(&self) -> BTreeMap<&'static str, &dyn Model>;

    /// Returns the current log snapshot.
    ///
    /// Empty until the first batch of the epoch has been processed. After any
    /// [`on_forward_batch`](TrainingCore::on_forward_batch) call the snapshot
    /// reflects exactly that call's batch values plus the epoch-to-date
    /// cumulative values.
    fn logs(&self) -> LogSnapshot;

    /// Executes one batch under the given step and returns the output
    /// tensor(s) for downstream metric computation.
    ///
    /// Side effects: mutates logs; mutates model parameters when
    /// `step == Step::Training`.
    ///
    /// # Errors
    ///
    /// Numeric and framework failures propagate unmodified; a failed batch is
    /// fatal to the current run. Logs are only updated after the
    /// corresponding loss value has been computed.
    fn on_forward_batch(
        &mut self,
        step: Step,
        inputs: &Tensor,
        targets: Option<&Tensor>,
    ) -> Result<Tensor>;
}

/// Extracts a scalar loss value from a rank-0 tensor.
pub(crate) fn tensor_scalar(t: &Tensor) -> Result<f64> {
    Ok(t.to_dtype(DType::F64)?.to_scalar::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names() {
        assert_eq!(Step::Training.name(), "training");
        assert_eq!(Step::Validation.name(), "validation");
        assert_eq!(Step::Eval.name(), "eval");
    }

    #[test]
    fn eval_computes_no_loss() {
        assert!(Step::Training.computes_loss());
        assert!(Step::Validation.computes_loss());
        assert!(!Step::Eval.computes_loss());
    }

    #[test]
    fn tensor_scalar_reads_rank0() {
        let t = Tensor::new(2.5f32, &Device::Cpu).unwrap();
        let v = tensor_scalar(&t).unwrap();
        assert!((v - 2.5).abs() < 1e-6);
    }
}
