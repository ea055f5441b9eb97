//! faceprint-core — Face descriptor extraction and matching.
//!
//! Turns an unaligned face image plus five landmarks into a canonical-pose
//! crop, runs it through a registry-assembled inference graph, and scores
//! descriptor similarity. Face detection and landmark localization are
//! external collaborators; this crate starts where their outputs end.

pub mod alignment;
pub mod extractor;
pub mod image;
pub mod net;
pub mod similarity;
pub mod types;

pub use extractor::{ExtractError, FaceIdentifier};
pub use image::ImageBuffer;
pub use net::{LayerRegistry, ModelDescription, NetworkGraph};
pub use similarity::{cosine, SIMILARITY_UNDEFINED};
pub use types::{BoundingBox, FacialLandmarks};
