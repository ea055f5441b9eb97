//! Descriptor extraction: alignment followed by forward inference.

use crate::alignment::{self, AlignError};
use crate::image::ImageBuffer;
use crate::net::{GraphError, LayerRegistry, ModelDescription, ModelError, NetworkGraph};
use crate::similarity::{self, SIMILARITY_UNDEFINED};
use crate::types::FacialLandmarks;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("input image is empty")]
    EmptyInput,
    #[error("model declares a zero-length descriptor")]
    IncompatibleGraph,
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Forward(#[from] GraphError),
}

/// Face identifier: owns a built [`NetworkGraph`] and turns aligned crops
/// (or raw images plus landmarks) into fixed-length descriptors.
///
/// All methods take `&self`; one identifier can serve concurrent extractions.
pub struct FaceIdentifier {
    graph: NetworkGraph,
}

impl FaceIdentifier {
    /// Build the inference graph from a model description using the
    /// process-wide registry of built-in layer kinds.
    pub fn new(description: &ModelDescription) -> Result<Self, ModelError> {
        Self::with_registry(description, LayerRegistry::global())
    }

    /// Build with a caller-composed layer registry.
    pub fn with_registry(
        description: &ModelDescription,
        registry: &LayerRegistry,
    ) -> Result<Self, ModelError> {
        let graph = NetworkGraph::build(description, registry)?;
        tracing::info!(
            descriptor_len = graph.output_size(),
            crop_shape = ?graph.input_shape(),
            "face identifier ready"
        );
        Ok(Self { graph })
    }

    /// Length of every descriptor this identifier produces.
    pub fn descriptor_len(&self) -> usize {
        self.graph.output_size()
    }

    /// The (width, height, channels) of the canonical crop the graph consumes.
    pub fn crop_shape(&self) -> (u32, u32, u32) {
        self.graph.input_shape()
    }

    /// Align a face to this identifier's canonical crop size.
    pub fn crop_face(
        &self,
        image: &ImageBuffer,
        landmarks: &FacialLandmarks,
    ) -> Result<ImageBuffer, ExtractError> {
        if image.is_empty() {
            return Err(ExtractError::EmptyInput);
        }
        let (width, height, _) = self.graph.input_shape();
        Ok(alignment::crop(image, landmarks, width, height)?)
    }

    /// Extract a descriptor from an already aligned crop.
    ///
    /// The crop must match [`crop_shape`](Self::crop_shape) exactly. On any
    /// failure no descriptor is returned; the identifier stays usable.
    pub fn extract(&self, crop: &ImageBuffer) -> Result<Vec<f32>, ExtractError> {
        if crop.is_empty() {
            return Err(ExtractError::EmptyInput);
        }
        if self.graph.output_size() == 0 {
            return Err(ExtractError::IncompatibleGraph);
        }
        Ok(self.graph.forward(crop)?)
    }

    /// Align a raw face region with its landmarks, then extract.
    pub fn extract_with_alignment(
        &self,
        image: &ImageBuffer,
        landmarks: &FacialLandmarks,
    ) -> Result<Vec<f32>, ExtractError> {
        let aligned = self.crop_face(image, landmarks)?;
        self.extract(&aligned)
    }

    /// Cosine similarity of two descriptors this identifier produced.
    ///
    /// Same metric as [`similarity::cosine`]; the comparison length is pinned
    /// to [`descriptor_len`](Self::descriptor_len), so any other input length
    /// yields [`SIMILARITY_UNDEFINED`].
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        let len = self.descriptor_len();
        if a.len() != len || b.len() != len {
            return SIMILARITY_UNDEFINED;
        }
        similarity::cosine(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::descriptor::InputShape;
    use crate::net::{LayerDescriptor, ParamValue};

    /// 8x8 grayscale input -> 2x2 max pool -> fully connected to 4 features.
    fn test_description() -> ModelDescription {
        let fc_weights: Vec<f32> = (0..4 * 16)
            .map(|i| if i % 17 == 0 { 1.0 } else { 0.01 })
            .collect();
        ModelDescription {
            name: Some("test-net".into()),
            input: InputShape {
                width: 8,
                height: 8,
                channels: 1,
            },
            feature_len: 4,
            layers: vec![
                LayerDescriptor {
                    name: "pool".into(),
                    kind: "max_pool".into(),
                    inputs: vec![],
                    params: [("kernel".to_string(), ParamValue::Number(2.0))]
                        .into_iter()
                        .collect(),
                },
                LayerDescriptor {
                    name: "fc".into(),
                    kind: "fully_connected".into(),
                    inputs: vec!["pool".into()],
                    params: [
                        ("out_features".to_string(), ParamValue::Number(4.0)),
                        ("weights".to_string(), ParamValue::Array(fc_weights)),
                    ]
                    .into_iter()
                    .collect(),
                },
            ],
        }
    }

    fn gradient_crop() -> ImageBuffer {
        let pixels: Vec<u8> = (0..64u32).map(|i| (i * 3) as u8).collect();
        ImageBuffer::from_pixels(8, 8, 1, pixels).unwrap()
    }

    #[test]
    fn test_extract_descriptor_length() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let features = identifier.extract(&gradient_crop()).unwrap();
        assert_eq!(features.len(), identifier.descriptor_len());
        assert_eq!(features.len(), 4);
    }

    #[test]
    fn test_extract_rejects_empty_input() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let empty = ImageBuffer::zeroed(0, 0, 1);
        assert!(matches!(
            identifier.extract(&empty),
            Err(ExtractError::EmptyInput)
        ));
    }

    #[test]
    fn test_extract_rejects_wrong_crop_shape() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let wrong = ImageBuffer::zeroed(9, 8, 1);
        assert!(matches!(
            identifier.extract(&wrong),
            Err(ExtractError::Forward(GraphError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_crop_face_matches_graph_input() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let image = ImageBuffer::zeroed(100, 100, 1);
        let landmarks = FacialLandmarks::new([
            (40.0, 30.0),
            (60.0, 30.0),
            (50.0, 42.0),
            (42.0, 55.0),
            (58.0, 55.0),
        ]);
        let aligned = identifier.crop_face(&image, &landmarks).unwrap();
        assert_eq!(aligned.shape(), identifier.crop_shape());
    }

    #[test]
    fn test_extract_with_alignment_end_to_end() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let pixels: Vec<u8> = (0..100u32 * 100)
            .map(|i| (i.wrapping_mul(31) % 251) as u8)
            .collect();
        let image = ImageBuffer::from_pixels(100, 100, 1, pixels).unwrap();
        let landmarks = FacialLandmarks::new([
            (40.0, 30.0),
            (60.0, 30.0),
            (50.0, 42.0),
            (42.0, 55.0),
            (58.0, 55.0),
        ]);

        let features = identifier
            .extract_with_alignment(&image, &landmarks)
            .unwrap();
        assert_eq!(features.len(), 4);

        // Self-similarity of a real descriptor is 1.0
        assert!((identifier.similarity(&features, &features) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bound_similarity_pins_length() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let good = vec![1.0f32; 4];
        let short = vec![1.0f32; 3];
        assert!((identifier.similarity(&good, &good) - 1.0).abs() < 1e-9);
        assert_eq!(identifier.similarity(&good, &short), SIMILARITY_UNDEFINED);
        assert_eq!(identifier.similarity(&short, &short), SIMILARITY_UNDEFINED);
    }

    #[test]
    fn test_zero_descriptor_yields_sentinel() {
        let identifier = FaceIdentifier::new(&test_description()).unwrap();
        let features = identifier.extract(&gradient_crop()).unwrap();
        let zeros = vec![0.0f32; identifier.descriptor_len()];
        assert_eq!(
            identifier.similarity(&features, &zeros),
            SIMILARITY_UNDEFINED
        );
    }
}
