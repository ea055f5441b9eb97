//! Batch normalization using stored running statistics.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::ArrayD;

const DEFAULT_EPSILON: f32 = 1e-5;

/// Normalizes each channel with its recorded mean and variance:
/// `y = (x - mean) / sqrt(variance + epsilon)`.
struct BatchNorm {
    name: String,
    mean: Vec<f32>,
    variance: Vec<f32>,
    epsilon: f32,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let mean = desc.param_array("mean")?.to_vec();
    let variance = desc.param_array("variance")?.to_vec();
    if mean.len() != variance.len() {
        return Err(ModelError::Malformed(format!(
            "layer '{}': mean ({}) and variance ({}) lengths differ",
            desc.name,
            mean.len(),
            variance.len()
        )));
    }
    Ok(Box::new(BatchNorm {
        name: desc.name.clone(),
        mean,
        variance,
        epsilon: desc.param_f32_or("epsilon", DEFAULT_EPSILON)?,
    }))
}

impl Layer for BatchNorm {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        if shape.first().copied().unwrap_or(0) != self.mean.len() {
            return Err(ModelError::Malformed(format!(
                "layer '{}': statistics length {} does not match leading axis of input shape {shape:?}",
                self.name,
                self.mean.len()
            )));
        }
        Ok(shape.to_vec())
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let mut out = inputs[0].clone();
        for (c, mut lane) in out.outer_iter_mut().enumerate() {
            let inv_std = 1.0 / (self.variance[c] + self.epsilon).sqrt();
            lane.mapv_inplace(|v| (v - self.mean[c]) * inv_std);
        }
        out
    }
}
