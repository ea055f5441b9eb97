//! Assembled forward-inference graph.

use super::{GraphError, Layer, LayerRegistry, ModelDescription, ModelError};
use crate::image::ImageBuffer;
use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;

#[derive(Debug)]
struct Node {
    layer: Box<dyn Layer>,
    /// Indices of upstream nodes; empty = reads the graph input.
    inputs: Vec<usize>,
}

/// An executable computation graph.
///
/// Built once from a [`ModelDescription`]; topology, parameters and shapes
/// are frozen afterwards. `forward` uses only call-local buffers, so a graph
/// shared behind `&` can serve concurrent extractions.
#[derive(Debug)]
pub struct NetworkGraph {
    nodes: Vec<Node>,
    /// (width, height, channels) of the expected input buffer.
    input_shape: (u32, u32, u32),
    output_size: usize,
}

impl NetworkGraph {
    /// Assemble a graph, instantiating each layer kind through `registry`.
    ///
    /// Layers are constructed in declaration order and may only reference
    /// already-constructed upstream layers, which rules out forward
    /// references and cycles by construction.
    pub fn build(
        description: &ModelDescription,
        registry: &LayerRegistry,
    ) -> Result<Self, ModelError> {
        let input = description.input;
        if input.width == 0 || input.height == 0 || input.channels == 0 {
            return Err(ModelError::Malformed(format!(
                "input shape {}x{}x{} has a zero dimension",
                input.width, input.height, input.channels
            )));
        }
        if description.layers.is_empty() {
            return Err(ModelError::Malformed("model has no layers".into()));
        }

        let input_chw: Vec<usize> = vec![
            input.channels as usize,
            input.height as usize,
            input.width as usize,
        ];

        let mut index_by_name: HashMap<&str, usize> = HashMap::new();
        let mut nodes: Vec<Node> = Vec::with_capacity(description.layers.len());
        let mut shapes: Vec<Vec<usize>> = Vec::with_capacity(description.layers.len());

        for descriptor in &description.layers {
            if index_by_name.contains_key(descriptor.name.as_str()) {
                return Err(ModelError::Malformed(format!(
                    "duplicate layer name '{}'",
                    descriptor.name
                )));
            }

            let mut input_indices = Vec::with_capacity(descriptor.inputs.len());
            for reference in &descriptor.inputs {
                let Some(&idx) = index_by_name.get(reference.as_str()) else {
                    return Err(ModelError::Malformed(format!(
                        "layer '{}' references '{reference}', which is not an \
                         already-declared layer",
                        descriptor.name
                    )));
                };
                input_indices.push(idx);
            }

            let layer = registry.construct(descriptor)?;

            let input_shapes: Vec<&[usize]> = if input_indices.is_empty() {
                vec![input_chw.as_slice()]
            } else {
                input_indices.iter().map(|&i| shapes[i].as_slice()).collect()
            };
            let output_shape = layer.output_shape(&input_shapes)?;

            index_by_name.insert(descriptor.name.as_str(), nodes.len());
            nodes.push(Node {
                layer,
                inputs: input_indices,
            });
            shapes.push(output_shape);
        }

        let final_shape = &shapes[shapes.len() - 1];
        let output_size: usize = final_shape.iter().product();
        if output_size == 0 {
            return Err(ModelError::Malformed(format!(
                "final layer produces an empty output (shape {final_shape:?})"
            )));
        }
        if output_size != description.feature_len {
            return Err(ModelError::Malformed(format!(
                "declared feature length {} does not match final layer output {output_size}",
                description.feature_len
            )));
        }

        tracing::info!(
            name = description.name.as_deref().unwrap_or("<unnamed>"),
            layers = nodes.len(),
            input = ?(input.width, input.height, input.channels),
            output_size,
            "network graph assembled"
        );

        Ok(Self {
            nodes,
            input_shape: (input.width, input.height, input.channels),
            output_size,
        })
    }

    /// Assemble using the process-wide registry of built-in kinds.
    pub fn build_with_builtins(description: &ModelDescription) -> Result<Self, ModelError> {
        Self::build(description, LayerRegistry::global())
    }

    /// Fixed descriptor length, constant after build.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// The exact (width, height, channels) the graph expects.
    pub fn input_shape(&self) -> (u32, u32, u32) {
        self.input_shape
    }

    /// Execute every layer in order and return the final output flattened.
    ///
    /// All intermediates live on this call's stack; `&self` is never written,
    /// so concurrent calls against one graph cannot interfere.
    pub fn forward(&self, input: &ImageBuffer) -> Result<Vec<f32>, GraphError> {
        if input.shape() != self.input_shape {
            return Err(GraphError::ShapeMismatch {
                expected: self.input_shape,
                actual: input.shape(),
            });
        }

        let input_tensor = image_to_tensor(input);
        let mut computed: Vec<ArrayD<f32>> = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let output = if node.inputs.is_empty() {
                node.layer.forward(&[&input_tensor])
            } else {
                // Build guarantees every index points at an earlier node.
                let upstream: Vec<&ArrayD<f32>> =
                    node.inputs.iter().map(|&i| &computed[i]).collect();
                node.layer.forward(&upstream)
            };
            computed.push(output);
        }

        // Non-empty by construction; the final node's output is the descriptor.
        Ok(computed
            .pop()
            .map(|last| last.into_iter().collect())
            .unwrap_or_default())
    }
}

/// u8 HWC pixels to an f32 CHW tensor, raw 0–255 values. Any mean/scale
/// normalization belongs to the model's own layers.
fn image_to_tensor(image: &ImageBuffer) -> ArrayD<f32> {
    let (w, h, c) = image.shape();
    let (w, h, c) = (w as usize, h as usize, c as usize);

    let mut tensor = ArrayD::zeros(IxDyn(&[c, h, w]));
    for ch in 0..c {
        for y in 0..h {
            for x in 0..w {
                tensor[[ch, y, x]] = image.pixel(x as u32, y as u32, ch as u32) as f32;
            }
        }
    }
    tensor
}
