//! Max pooling.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Square-window max pooling over a CHW tensor. Stride defaults to the
/// window size (non-overlapping).
struct MaxPool {
    name: String,
    kernel: usize,
    stride: usize,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let kernel = desc.param_usize("kernel")?;
    let stride = desc.param_usize_or("stride", kernel)?;
    if kernel == 0 || stride == 0 {
        return Err(ModelError::Malformed(format!(
            "layer '{}': kernel and stride must be positive",
            desc.name
        )));
    }
    Ok(Box::new(MaxPool {
        name: desc.name.clone(),
        kernel,
        stride,
    }))
}

impl Layer for MaxPool {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        let &[c, in_h, in_w] = shape else {
            return Err(ModelError::Malformed(format!(
                "layer '{}': expects a CHW input, got shape {shape:?}",
                self.name
            )));
        };
        if in_h < self.kernel || in_w < self.kernel {
            return Err(ModelError::Malformed(format!(
                "layer '{}': window {} exceeds input {in_h}x{in_w}",
                self.name, self.kernel
            )));
        }
        Ok(vec![
            c,
            (in_h - self.kernel) / self.stride + 1,
            (in_w - self.kernel) / self.stride + 1,
        ])
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let x = inputs[0];
        let (c, in_h, in_w) = (x.shape()[0], x.shape()[1], x.shape()[2]);
        let out_h = (in_h - self.kernel) / self.stride + 1;
        let out_w = (in_w - self.kernel) / self.stride + 1;

        let mut out = ArrayD::zeros(IxDyn(&[c, out_h, out_w]));
        for ch in 0..c {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let mut best = f32::NEG_INFINITY;
                    for ky in 0..self.kernel {
                        for kx in 0..self.kernel {
                            best = best
                                .max(x[[ch, oy * self.stride + ky, ox * self.stride + kx]]);
                        }
                    }
                    out[[ch, oy, ox]] = best;
                }
            }
        }
        out
    }
}
