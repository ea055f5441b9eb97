//! Element-wise combination of two or more inputs.

use crate::net::{Layer, LayerDescriptor, ModelError};
use ndarray::ArrayD;

enum Op {
    Sum,
    Prod,
    Max,
}

/// Combines same-shaped inputs element by element. `sum` accepts optional
/// per-input coefficients.
struct Eltwise {
    name: String,
    op: Op,
    coeffs: Option<Vec<f32>>,
}

pub(crate) fn build(desc: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
    let op = match desc.param_text_or("op", "sum")? {
        "sum" => Op::Sum,
        "prod" => Op::Prod,
        "max" => Op::Max,
        other => {
            return Err(ModelError::Malformed(format!(
                "layer '{}': unknown eltwise op '{other}'",
                desc.name
            )))
        }
    };
    let coeffs = desc.param_array_opt("coeffs")?.map(<[f32]>::to_vec);
    if coeffs.is_some() && !matches!(op, Op::Sum) {
        return Err(ModelError::Malformed(format!(
            "layer '{}': coefficients only apply to the sum op",
            desc.name
        )));
    }
    Ok(Box::new(Eltwise {
        name: desc.name.clone(),
        op,
        coeffs,
    }))
}

impl Layer for Eltwise {
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        let Some((first, rest)) = inputs.split_first() else {
            return Err(ModelError::Malformed(format!(
                "layer '{}': needs at least two inputs",
                self.name
            )));
        };
        if rest.is_empty() {
            return Err(ModelError::Malformed(format!(
                "layer '{}': needs at least two inputs",
                self.name
            )));
        }
        if rest.iter().any(|s| s != first) {
            return Err(ModelError::Malformed(format!(
                "layer '{}': all inputs must share one shape, got {inputs:?}",
                self.name
            )));
        }
        if let Some(coeffs) = &self.coeffs {
            if coeffs.len() != inputs.len() {
                return Err(ModelError::Malformed(format!(
                    "layer '{}': {} coefficients for {} inputs",
                    self.name,
                    coeffs.len(),
                    inputs.len()
                )));
            }
        }
        Ok(first.to_vec())
    }

    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32> {
        let coeff = |i: usize| self.coeffs.as_ref().map_or(1.0, |c| c[i]);
        let mut out = match self.op {
            Op::Sum => inputs[0].mapv(|v| v * coeff(0)),
            _ => inputs[0].clone(),
        };
        for (i, &x) in inputs.iter().enumerate().skip(1) {
            match self.op {
                Op::Sum => {
                    let c = coeff(i);
                    out.zip_mut_with(x, |o, &v| *o += v * c);
                }
                Op::Prod => out.zip_mut_with(x, |o, &v| *o *= v),
                Op::Max => out.zip_mut_with(x, |o, &v| *o = o.max(v)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::layers::testutil::{arr, descriptor, tensor};
    use crate::net::ParamValue;

    fn text(s: &str) -> ParamValue {
        ParamValue::Text(s.to_string())
    }

    #[test]
    fn test_sum_default_op() {
        let layer = build(&descriptor("eltwise", &[])).unwrap();
        let a = tensor(&[1, 2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let b = tensor(&[1, 2, 2], &[10.0, 20.0, 30.0, 40.0]);
        let y = layer.forward(&[&a, &b]);
        assert_eq!(y.as_slice().unwrap(), &[11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_weighted_sum() {
        let layer = build(&descriptor(
            "eltwise",
            &[("op", text("sum")), ("coeffs", arr(&[1.0, -1.0]))],
        ))
        .unwrap();
        let a = tensor(&[2], &[5.0, 7.0]);
        let b = tensor(&[2], &[2.0, 3.0]);
        let y = layer.forward(&[&a, &b]);
        assert_eq!(y.as_slice().unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn test_prod_and_max() {
        let prod = build(&descriptor("eltwise", &[("op", text("prod"))])).unwrap();
        let max = build(&descriptor("eltwise", &[("op", text("max"))])).unwrap();
        let a = tensor(&[2], &[2.0, -1.0]);
        let b = tensor(&[2], &[3.0, 4.0]);
        assert_eq!(prod.forward(&[&a, &b]).as_slice().unwrap(), &[6.0, -4.0]);
        assert_eq!(max.forward(&[&a, &b]).as_slice().unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn test_rejects_single_input_and_shape_mismatch() {
        let layer = build(&descriptor("eltwise", &[])).unwrap();
        assert!(layer.output_shape(&[&[2, 2]]).is_err());
        assert!(layer.output_shape(&[&[2, 2], &[2, 3]]).is_err());
        assert!(layer.output_shape(&[&[2, 2], &[2, 2], &[2, 2]]).is_ok());
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(build(&descriptor("eltwise", &[("op", text("div"))])).is_err());
    }

    #[test]
    fn test_coeffs_require_sum() {
        let result = build(&descriptor(
            "eltwise",
            &[("op", text("max")), ("coeffs", arr(&[1.0, 1.0]))],
        ));
        assert!(result.is_err());
    }
}
