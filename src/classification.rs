//! Single-model supervised training core.

use std::collections::BTreeMap;

use candle_core::Tensor;

use crate::error::{CoreError, Result};
use crate::logs::{
    ClassificationBatchLogs, ClassificationEpochLogs, ClassificationLogs, LogSnapshot,
};
use crate::meter::AverageMeter;
use crate::{
    device, tensor_scalar, ClassificationCriterion, Model, ModelOptimizer, Step, TrainingCore,
};

/// Training core for supervised single-model workloads.
///
/// Runs two logical phases per batch: forward (always), then backward and
/// optimize (training step only). Validation computes the loss for the
/// running statistics without touching parameters; eval returns the raw
/// model output and records nothing.
pub struct ClassificationCore<M, O, C> {
    model: M,
    optim: O,
    criterion: C,
    meter: AverageMeter,
    logs: ClassificationLogs,
}

impl<M, O, C> ClassificationCore<M, O, C>
where
    M: Model,
    O: ModelOptimizer,
    C: ClassificationCriterion,
{
    /// Creates a core from a model, its optimizer, and the loss criterion.
    ///
    /// The optimizer must already be bound to the model's variables.
    pub fn new(model: M, optimizer: O, criterion: C) -> Self {
        Self {
            model,
            optim: optimizer,
            criterion,
            meter: AverageMeter::new(),
            logs: ClassificationLogs::default(),
        }
    }

    /// Overrides the EMA decay of the running loss meter.
    #[must_use]
    pub fn with_meter_decay(mut self, decay: f64) -> Self {
        self.meter = AverageMeter::with_decay(decay);
        self
    }

    /// Returns the typed log record.
    #[must_use]
    pub fn log_record(&self) -> &ClassificationLogs {
        &self.logs
    }

    /// Returns the current learning rate of the owned optimizer.
    pub fn learning_rate(&self) -> f64 {
        self.optim.learning_rate()
    }

    /// Sets the learning rate of the owned optimizer.
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.optim.set_learning_rate(lr);
    }
}

impl<M, O, C> TrainingCore for ClassificationCore<M, O, C>
where
    M: Model,
    O: ModelOptimizer,
    C: ClassificationCriterion,
{
    fn on_train_mode(&mut self) {
        self.model.set_training(true);
    }

    fn on_eval_mode(&mut self) {
        self.model.set_training(false);
    }

    fn on_new_epoch(&mut self) {
        tracing::debug!("resetting classification epoch statistics");
        self.logs = ClassificationLogs::default();
        self.meter.reset();
    }

    fn to_gpu(&mut self) -> Result<()> {
        self.model.to_device(&device::accelerator())
    }

    fn models(&self) -> BTreeMap<&'static str, &dyn Model> {
        BTreeMap::from([("model", &self.model as &dyn Model)])
    }

    fn logs(&self) -> LogSnapshot {
        self.logs.snapshot()
    }

    fn on_forward_batch(
        &mut self,
        step: Step,
        inputs: &Tensor,
        targets: Option<&Tensor>,
    ) -> Result<Tensor> {
        let logits = self.model.forward(inputs)?;

        if step.computes_loss() {
            let targets = targets.ok_or(CoreError::MissingTargets { step })?;
            let loss = self.criterion.loss(&logits, targets)?;
            let loss_value = tensor_scalar(&loss)?;

            self.meter.update(loss_value);
            self.logs.batch = Some(ClassificationBatchLogs { loss: loss_value });

            if step == Step::Training {
                let grads = loss.backward()?;
                self.optim.step(&grads)?;
                self.logs.epoch = Some(ClassificationEpochLogs::Train(self.meter.debias()));
            } else {
                self.logs.epoch = Some(ClassificationEpochLogs::Valid(self.meter.debias()));
            }
        }

        Ok(logits)
    }
}
