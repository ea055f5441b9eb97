//! 2-D convolution, direct form.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Square-kernel convolution over a CHW tensor, no implicit padding
/// (models pad explicitly with a `pad` layer).
///
/// Weights are flat in `[out_channel][in_channel][ky][kx]` order; the input
/// channel count is only known at build time, so the weight length is
/// validated in [`Layer::output_shape`].
struct Convolution {
    name: String,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    weights: Vec<f32>,
    bias: Option<Vec<f32>>,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let out_channels = desc.param_usize("out_channels")?;
    let kernel = desc.param_usize("kernel")?;
    let stride = desc.param_usize_or("stride", 1)?;
    if out_channels == 0 || kernel == 0 || stride == 0 {
        return Err(ModelError::Malformed(format!(
            "layer '{}': out_channels, kernel and stride must be positive",
            desc.name
        )));
    }

    let bias = desc.param_array_opt("bias")?.map(<[f32]>::to_vec);
    if let Some(b) = &bias {
        if b.len() != out_channels {
            return Err(ModelError::Malformed(format!(
                "layer '{}': bias length {} does not match out_channels {out_channels}",
                desc.name,
                b.len()
            )));
        }
    }

    Ok(Box::new(Convolution {
        name: desc.name.clone(),
        out_channels,
        kernel,
        stride,
        weights: desc.param_array("weights")?.to_vec(),
        bias,
    }))
}

impl Layer for Convolution {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        let &[in_c, in_h, in_w] = shape else {
            return Err(ModelError::Malformed(format!(
                "layer '{}': expects a CHW input, got shape {shape:?}",
                self.name
            )));
        };
        if in_h < self.kernel || in_w < self.kernel {
            return Err(ModelError::Malformed(format!(
                "layer '{}': kernel {} exceeds input {in_h}x{in_w}",
                self.name, self.kernel
            )));
        }
        let expected_weights = self.out_channels * in_c * self.kernel * self.kernel;
        if self.weights.len() != expected_weights {
            return Err(ModelError::Malformed(format!(
                "layer '{}': weight length {} does not match {}x{in_c}x{}x{} = {expected_weights}",
                self.name,
                self.weights.len(),
                self.out_channels,
                self.kernel,
                self.kernel
            )));
        }
        Ok(vec![
            self.out_channels,
            (in_h - self.kernel) / self.stride + 1,
            (in_w - self.kernel) / self.stride + 1,
        ])
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let x = inputs[0];
        let (in_c, in_h, in_w) = (x.shape()[0], x.shape()[1], x.shape()[2]);
        let k = self.kernel;
        let out_h = (in_h - k) / self.stride + 1;
        let out_w = (in_w - k) / self.stride + 1;

        let mut out = ArrayD::zeros(IxDyn(&[self.out_channels, out_h, out_w]));
        for oc in 0..self.out_channels {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let mut acc = self.bias.as_ref().map_or(0.0, |b| b[oc]);
                    for ic in 0..in_c {
                        for ky in 0..k {
                            for kx in 0..k {
                                let w = self.weights[((oc * in_c + ic) * k + ky) * k + kx];
                                acc += w * x[[ic, oy * self.stride + ky, ox * self.stride + kx]];
                            }
                        }
                    }
                    out[[oc, oy, ox]] = acc;
                }
            }
        }
        out
    }
}
