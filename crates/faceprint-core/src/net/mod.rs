//! Forward-inference network assembly and execution.
//!
//! A model arrives as an ordered list of [`LayerDescriptor`]s. Each descriptor
//! names a layer kind; the [`LayerRegistry`] maps kinds to constructors so the
//! graph builder can instantiate kinds it has no compile-time knowledge of.
//! [`NetworkGraph::build`] wires the instances together and freezes the
//! topology; [`NetworkGraph::forward`] executes it with call-local scratch
//! only, so one built graph can serve concurrent extractions.

use ndarray::ArrayD;
use thiserror::Error;

pub mod descriptor;
pub mod graph;
pub mod layers;
pub mod registry;

pub use descriptor::{InputShape, LayerDescriptor, ModelDescription, ParamValue};
pub use graph::NetworkGraph;
pub use registry::{LayerFactory, LayerRegistry};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unknown layer kind: {0}")]
    UnknownLayerKind(String),
    #[error("malformed model: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error(
        "input shape mismatch: graph expects {expected:?} (width, height, channels), got {actual:?}"
    )]
    ShapeMismatch {
        expected: (u32, u32, u32),
        actual: (u32, u32, u32),
    },
}

/// A single computation node.
///
/// Implementations hold only read-only parameters after construction;
/// `forward` must not keep state between calls so a built graph stays safe to
/// share across threads.
pub trait Layer: Send + Sync {
    /// Infer the output shape from the input shapes, validating arity and
    /// parameter/shape compatibility. Called once per node at build time.
    fn output_shape(&self, inputs: &[&[usize]]) -> Result<Vec<usize>, ModelError>;

    /// Execute the node. Input tensors are guaranteed to match the shapes this
    /// layer accepted in [`Layer::output_shape`].
    fn forward(&self, inputs: &[&ArrayD<f32>]) -> ArrayD<f32>;
}

impl std::fmt::Debug for dyn Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Layer")
    }
}

/// Build-time check that a node received exactly one input.
pub(crate) fn expect_single_input<'a>(
    name: &str,
    inputs: &[&'a [usize]],
) -> Result<&'a [usize], ModelError> {
    match inputs {
        &[only] => Ok(only),
        _ => Err(ModelError::Malformed(format!(
            "layer '{name}' expects exactly one input, got {}",
            inputs.len()
        ))),
    }
}
