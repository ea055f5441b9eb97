//! Affine resampling inside the graph.

use crate::net::{expect_single_input, Layer, LayerDescriptor, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Resamples a CHW tensor to a fixed spatial size with bilinear
/// interpolation.
///
/// Without a `matrix` parameter this is a plain resize (edge pixels clamp).
/// With one, output coordinates map to source coordinates as
/// `(sx, sy) = (a*x + b*y + tx, c*x + d*y + ty)` for
/// `matrix = [a, b, tx, c, d, ty]`, and samples outside the source read zero.
struct SpatialTransform {
    name: String,
    out_width: usize,
    out_height: usize,
    matrix: Option<[f32; 6]>,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let out_width = desc.param_usize("width")?;
    let out_height = desc.param_usize("height")?;
    if out_width == 0 || out_height == 0 {
        return Err(ModelError::Malformed(format!(
            "layer '{}': width and height must be positive",
            desc.name
        )));
    }
    let matrix = match desc.param_array_opt("matrix")? {
        None => None,
        Some(m) => Some(<[f32; 6]>::try_from(m).map_err(|_| {
            ModelError::Malformed(format!(
                "layer '{}': matrix must have exactly 6 entries",
                desc.name
            ))
        })?),
    };
    Ok(Box::new(SpatialTransform {
        name: desc.name.clone(),
        out_width,
        out_height,
        matrix,
    }))
}

impl Layer for SpatialTransform {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let shape = expect_single_input(&self.name, inputs)?;
        let &[c, _, _] = shape else {
            return Err(ModelError::Malformed(format!(
                "layer '{}': expects a CHW input, got shape {shape:?}",
                self.name
            )));
        };
        Ok(vec![c, self.out_height, self.out_width])
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let x = inputs[0];
        let (c, in_h, in_w) = (x.shape()[0], x.shape()[1], x.shape()[2]);

        // Default map: align pixel centers of the two grids.
        let scale_x = in_w as f32 / self.out_width as f32;
        let scale_y = in_h as f32 / self.out_height as f32;

        let mut out = ArrayD::zeros(IxDyn(&[c, self.out_height, self.out_width]));
        for oy in 0..self.out_height {
            for ox in 0..self.out_width {
                let (sx, sy) = match self.matrix {
                    Some([a, b, tx, cc, d, ty]) => (
                        a * ox as f32 + b * oy as f32 + tx,
                        cc * ox as f32 + d * oy as f32 + ty,
                    ),
                    None => (
                        (ox as f32 + 0.5) * scale_x - 0.5,
                        (oy as f32 + 0.5) * scale_y - 0.5,
                    ),
                };

                let x0 = sx.floor() as i64;
                let y0 = sy.floor() as i64;
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let clamp_edges = self.matrix.is_none();
                for ch in 0..c {
                    let sample = |px: i64, py: i64| -> f32 {
                        if clamp_edges {
                            let px = px.clamp(0, in_w as i64 - 1) as usize;
                            let py = py.clamp(0, in_h as i64 - 1) as usize;
                            x[[ch, py, px]]
                        } else if px >= 0 && px < in_w as i64 && py >= 0 && py < in_h as i64 {
                            x[[ch, py as usize, px as usize]]
                        } else {
                            0.0
                        }
                    };
                    out[[ch, oy, ox]] = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
                        + sample(x0 + 1, y0) * fx * (1.0 - fy)
                        + sample(x0, y0 + 1) * (1.0 - fx) * fy
                        + sample(x0 + 1, y0 + 1) * fx * fy;
                }
            }
        }
        out
    }
}
