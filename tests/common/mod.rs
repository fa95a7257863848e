//! Shared fixtures: a tiny dense model and degenerate test criteria.

#![allow(dead_code)]

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::loss;
use learner_cores_rs::{
    ClassificationCriterion, GeneratorCriterion, GeneratorLossTerms, Model, Result,
};

/// Single dense layer with deterministic initialization.
pub struct TinyNet {
    weight: Var,
    bias: Var,
    device: Device,
    pub training: bool,
}

impl TinyNet {
    pub fn new(in_dim: usize, out_dim: usize, scale: f64) -> Result<Self> {
        let device = Device::Cpu;
        let init = (Tensor::ones((in_dim, out_dim), DType::F32, &device)? * scale)?;
        let weight = Var::from_tensor(&init)?;
        let bias = Var::zeros(out_dim, DType::F32, &device)?;
        Ok(Self {
            weight,
            bias,
            device,
            training: false,
        })
    }
}

impl Model for TinyNet {
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        Ok(inputs
            .matmul(self.weight.as_tensor())?
            .broadcast_add(self.bias.as_tensor())?)
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn variables(&self) -> Vec<Var> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    fn to_device(&mut self, device: &Device) -> Result<()> {
        if !self.device.same_device(device) {
            self.weight = Var::from_tensor(&self.weight.as_tensor().to_device(device)?)?;
            self.bias = Var::from_tensor(&self.bias.as_tensor().to_device(device)?)?;
        }
        self.device = device.clone();
        Ok(())
    }
}

/// Reads every parameter of a model as flat f32 values.
pub fn read_parameters(model: &dyn Model) -> Vec<Vec<f32>> {
    model
        .variables()
        .iter()
        .map(|v| {
            v.as_tensor()
                .flatten_all()
                .unwrap()
                .to_vec1::<f32>()
                .unwrap()
        })
        .collect()
}

/// Generator criterion with a real reconstruction and adversarial path and
/// constant-zero perceptual and total-variation terms.
pub struct TestGanCriterion;

impl GeneratorCriterion for TestGanCriterion {
    fn evaluate(
        &self,
        _eps: f64,
        d_sr_out: &Tensor,
        sr_images: &Tensor,
        hr_images: &Tensor,
    ) -> Result<GeneratorLossTerms> {
        let mse = loss::mse(sr_images, hr_images)?;
        let adversarial = loss::binary_cross_entropy_with_logit(d_sr_out, &d_sr_out.ones_like()?)?;
        let zero = Tensor::zeros((), sr_images.dtype(), sr_images.device())?;
        Ok(GeneratorLossTerms {
            mse,
            adversarial,
            vgg: zero.clone(),
            tv: zero,
        })
    }
}

/// Criterion that ignores its inputs and reports a fixed loss value.
pub struct ConstantCriterion(pub f64);

impl ClassificationCriterion for ConstantCriterion {
    fn loss(&self, logits: &Tensor, _targets: &Tensor) -> Result<Tensor> {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.0 as f32;
        Ok(Tensor::new(value, logits.device())?)
    }
}
