//! Spatial zero padding.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Pads the two spatial axes of a CHW tensor by a constant border.
struct Pad {
    name: String,
    amount: usize,
    value: f32,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    Ok(Box::new(Pad {
        name: desc.name.clone(),
        amount: desc.param_usize("amount")?,
        value: desc.param_f32_or("value", 0.0)?,
    }))
}

impl Layer for Pad {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        let &[c, h, w] = shape else {
            return Err(ModelError::Malformed(format!(
                "layer '{}': expects a CHW input, got shape {shape:?}",
                self.name
            )));
        };
        Ok(vec![c, h + 2 * self.amount, w + 2 * self.amount])
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let x = inputs[0];
        let (c, h, w) = (x.shape()[0], x.shape()[1], x.shape()[2]);
        let a = self.amount;

        let mut out =
            ArrayD::from_elem(IxDyn(&[c, h + 2 * a, w + 2 * a]), self.value);
        for ch in 0..c {
            for y in 0..h {
                for xx in 0..w {
                    out[[ch, y + a, xx + a]] = x[[ch, y, xx]];
                }
            }
        }
        out
    }
}
