//! Per-channel bias addition.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::ArrayD;

/// Adds a learned offset along the leading (channel) axis.
struct BiasAdd {
    name: String,
    bias: Vec<f32>,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    Ok(Box::new(BiasAdd {
        name: desc.name.clone(),
        bias: desc.param_array("bias")?.to_vec(),
    }))
}

impl Layer for BiasAdd {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        if shape.first().copied().unwrap_or(0) != self.bias.len() {
            return Err(ModelError::Malformed(format!(
                "layer '{}': bias length {} does not match leading axis of input shape {shape:?}",
                self.name,
                self.bias.len()
            )));
        }
        Ok(shape.to_vec())
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let mut out = inputs[0].clone();
        for (c, mut lane) in out.outer_iter_mut().enumerate() {
            lane += self.bias[c];
        }
        out
    }
}
