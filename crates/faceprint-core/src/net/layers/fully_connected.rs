//! Fully connected (inner product) layer.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Dense matrix product over the flattened input. Weights are flat in
/// `[out_feature][in_feature]` order.
struct FullyConnected {
    name: String,
    out_features: usize,
    weights: Vec<f32>,
    bias: Option<Vec<f32>>,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let out_features = desc.param_usize("out_features")?;
    if out_features == 0 {
        return Err(ModelError::Malformed(format!(
            "layer '{}': out_features must be positive",
            desc.name
        )));
    }
    let bias = desc.param_array_opt("bias")?.map(<[f32]>::to_vec);
    if let Some(b) = &bias {
        if b.len() != out_features {
            return Err(ModelError::Malformed(format!(
                "layer '{}': bias length {} does not match out_features {out_features}",
                desc.name,
                b.len()
            )));
        }
    }
    Ok(Box::new(FullyConnected {
        name: desc.name.clone(),
        out_features,
        weights: desc.param_array("weights")?.to_vec(),
        bias,
    }))
}

impl Layer for FullyConnected {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        let in_features: usize = shape.iter().product();
        if self.weights.len() != self.out_features * in_features {
            return Err(ModelError::Malformed(format!(
                "layer '{}': weight length {} does not match {}x{in_features}",
                self.name,
                self.weights.len(),
                self.out_features
            )));
        }
        Ok(vec![self.out_features])
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let flat: Vec<f32> = inputs[0].iter().copied().collect();
        let in_features = flat.len();

        let mut out = ArrayD::zeros(IxDyn(&[self.out_features]));
        for o in 0..self.out_features {
            let row = &self.weights[o * in_features..(o + 1) * in_features];
            let mut acc = self.bias.as_ref().map_or(0.0, |b| b[o]);
            for (w, v) in row.iter().zip(&flat) {
                acc += w * v;
            }
            out[[o]] = acc;
        }
        out
    }
}
