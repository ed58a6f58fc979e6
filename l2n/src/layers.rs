//! The layer registry.
//!
//! The registry tracks, for every layer handle the engine knows about,
//! where it came from (an original input layer or a derived computation),
//! what it may hold, whether it carries a name, and whether it is written
//! out on save.

use std::collections::HashMap;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::layout::LayerId;

/// What a layer is allowed to hold.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LayerContent {
    /// Polygons and texts.
    #[default]
    Everything,
    /// Polygons only.
    Polygons,
    /// Texts only.
    Texts,
}

/// Where a layer came from.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LayerOrigin {
    /// Materialized from the original input layer with the given index.
    Original(u32),
    /// Created empty by the engine and filled by derived computations.
    Derived,
}

/// The registry record for one layer handle.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// The layer handle.
    pub layer: LayerId,
    /// Where the layer came from.
    pub origin: LayerOrigin,
    /// The layer name, if any. Named layers are always persisted.
    pub name: Option<ArcStr>,
    /// Whether the layer is written out on save.
    pub persisted: bool,
    /// What the layer holds.
    pub content: LayerContent,
}

/// The set of layers known to the engine.
///
/// Invariants: a name maps to exactly one handle, a handle carries at most
/// one name, and a named layer is always persisted.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LayerRegistry {
    infos: IndexMap<LayerId, LayerInfo>,
    by_name: HashMap<ArcStr, LayerId>,
    by_original: HashMap<(u32, LayerContent), LayerId>,
}

impl LayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a layer.
    ///
    /// Naming a layer persists it regardless of the `persisted` flag in
    /// `info`.
    ///
    /// # Panics
    ///
    /// Panics if the name is already bound to a different handle, or the
    /// handle is already registered.
    pub fn register(&mut self, mut info: LayerInfo) {
        assert!(
            !self.infos.contains_key(&info.layer),
            "layer {} is already registered",
            info.layer
        );
        if let Some(name) = &info.name {
            assert!(
                !self.by_name.contains_key(name),
                "layer name {name:?} is already in use"
            );
            self.by_name.insert(name.clone(), info.layer);
            info.persisted = true;
        }
        if let LayerOrigin::Original(index) = info.origin {
            self.by_original
                .entry((index, info.content))
                .or_insert(info.layer);
        }
        self.infos.insert(info.layer, info);
    }

    /// The registry record for the given handle, if registered.
    pub fn info(&self, layer: LayerId) -> Option<&LayerInfo> {
        self.infos.get(&layer)
    }

    /// The handle bound to the given name, if any.
    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    /// The handle materialized from the given original input layer index
    /// with the given content restriction, if any.
    pub fn layer_by_original(&self, index: u32, content: LayerContent) -> Option<LayerId> {
        self.by_original.get(&(index, content)).copied()
    }

    /// Returns `true` if the given layer is written out on save.
    pub fn is_persisted(&self, layer: LayerId) -> bool {
        self.infos.get(&layer).is_some_and(|info| info.persisted)
    }

    /// The name of the given layer, if it has one.
    pub fn name_of(&self, layer: LayerId) -> Option<&ArcStr> {
        self.infos.get(&layer).and_then(|info| info.name.as_ref())
    }

    /// Iterates over all registered layers, in registration order.
    pub fn layers(&self) -> impl Iterator<Item = &LayerInfo> {
        self.infos.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_layers_are_persisted() {
        let mut registry = LayerRegistry::new();
        let layer = LayerId::from_raw(1);
        registry.register(LayerInfo {
            layer,
            origin: LayerOrigin::Derived,
            name: Some(arcstr::literal!("poly")),
            persisted: false,
            content: LayerContent::Everything,
        });
        assert!(registry.is_persisted(layer));
        assert_eq!(registry.layer_by_name("poly"), Some(layer));
        assert_eq!(registry.name_of(layer).map(|n| n.as_str()), Some("poly"));
    }

    #[test]
    fn original_lookup_is_keyed_by_content() {
        let mut registry = LayerRegistry::new();
        let polygons = LayerId::from_raw(1);
        let texts = LayerId::from_raw(2);
        registry.register(LayerInfo {
            layer: polygons,
            origin: LayerOrigin::Original(7),
            name: None,
            persisted: false,
            content: LayerContent::Polygons,
        });
        registry.register(LayerInfo {
            layer: texts,
            origin: LayerOrigin::Original(7),
            name: None,
            persisted: false,
            content: LayerContent::Texts,
        });
        assert_eq!(
            registry.layer_by_original(7, LayerContent::Polygons),
            Some(polygons)
        );
        assert_eq!(registry.layer_by_original(7, LayerContent::Texts), Some(texts));
        assert_eq!(registry.layer_by_original(7, LayerContent::Everything), None);
    }
}
