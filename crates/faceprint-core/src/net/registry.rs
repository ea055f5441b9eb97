//! Layer-kind catalogue.
//!
//! Maps a kind name to a constructor so [`NetworkGraph::build`] can
//! instantiate kinds it has no compile-time knowledge of. The process-wide
//! instance is populated exactly once, on first use, and is read-only
//! afterwards.
//!
//! [`NetworkGraph::build`]: super::NetworkGraph::build

use super::layers;
use super::{Layer, LayerDescriptor, ModelError};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Constructs a layer instance from its descriptor.
pub type LayerFactory = fn(&LayerDescriptor) -> Result<Box<dyn Layer>, ModelError>;

/// Catalogue of layer kinds available to the graph builder.
#[derive(Default)]
pub struct LayerRegistry {
    factories: BTreeMap<String, LayerFactory>,
}

static GLOBAL: OnceLock<LayerRegistry> = OnceLock::new();

impl LayerRegistry {
    /// An empty registry. Useful for callers composing a custom layer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in layer kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for &(kind, factory) in layers::BUILTINS {
            registry.register(kind, factory);
        }
        registry
    }

    /// The process-wide registry, populated with the built-in kinds on first
    /// use. Initialization runs at most once even under concurrent first
    /// callers; afterwards the registry is immutable.
    pub fn global() -> &'static LayerRegistry {
        GLOBAL.get_or_init(|| {
            let registry = Self::with_builtins();
            tracing::debug!(kinds = registry.factories.len(), "layer registry initialized");
            registry
        })
    }

    /// Add a kind. Registering an already-known kind is a no-op, so repeated
    /// initialization attempts are harmless; returns whether the entry was
    /// actually added.
    pub fn register(&mut self, kind: &str, factory: LayerFactory) -> bool {
        if self.factories.contains_key(kind) {
            return false;
        }
        self.factories.insert(kind.to_string(), factory);
        true
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate the layer a descriptor names.
    pub fn construct(&self, descriptor: &LayerDescriptor) -> Result<Box<dyn Layer>, ModelError> {
        let factory = self
            .factories
            .get(&descriptor.kind)
            .ok_or_else(|| ModelError::UnknownLayerKind(descriptor.kind.clone()))?;
        factory(descriptor)
    }
}
