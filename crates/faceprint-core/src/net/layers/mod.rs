//! Built-in layer kinds.
//!
//! Each kind lives in its own module and exposes a `build` constructor; the
//! explicit [`BUILTINS`] list is what [`LayerRegistry::with_builtins`]
//! registers, so no registration depends on global initialization order.
//!
//! [`LayerRegistry::with_builtins`]: super::LayerRegistry::with_builtins

pub mod batch_norm;
pub mod bias_add;
pub mod convolution;
pub mod eltwise;
pub mod fully_connected;
pub mod max_pool;
pub mod pad;
pub mod spatial_transform;

use super::registry::LayerFactory;

pub(crate) const BUILTINS: &[(&str, LayerFactory)] = &[
    ("batch_norm", batch_norm::build),
    ("bias_add", bias_add::build),
    ("convolution", convolution::build),
    ("eltwise", eltwise::build),
    ("fully_connected", fully_connected::build),
    ("max_pool", max_pool::build),
    ("pad", pad::build),
    ("spatial_transform", spatial_transform::build),
];

#[cfg(test)]
pub(crate) mod testutil {
    use crate::net::{LayerDescriptor, ParamValue};
    use ndarray::{ArrayD, IxDyn};

    /// Descriptor with the given kind/params, for layer unit tests.
    pub fn descriptor(kind: &str, params: &[(&str, ParamValue)]) -> LayerDescriptor {
        LayerDescriptor {
            name: format!("test_{kind}"),
            kind: kind.to_string(),
            inputs: vec![],
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    pub fn num(n: f64) -> ParamValue {
        ParamValue::Number(n)
    }

    pub fn arr(values: &[f32]) -> ParamValue {
        ParamValue::Array(values.to_vec())
    }

    pub fn tensor(shape: &[usize], values: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(shape), values.to_vec()).unwrap()
    }
}
