//! Layer model: named image layers, their draw parameters, and the fixed store.
//!
//! The store is built once from an ordered list of `(name, image)` pairs and
//! never grows or shrinks afterwards. The render loop reads it through
//! [`LayerStore::sort_for_draw`], which orders records by stacking order while
//! keeping insertion order among equal keys.

#[cfg(test)]
#[path = "layer_test.rs"]
mod layer_test;

/// Draw offset of a layer in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One named image plus the parameters used to composite it.
#[derive(Debug, Clone)]
pub struct Layer<I> {
    /// Handle to the image drawn for this layer.
    pub image: I,
    /// Asset name, unique within the store.
    pub name: String,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z_index: i32,
    /// Top-left corner of the image on the surface.
    pub position: Position,
    opacity: f64,
}

impl<I> Layer<I> {
    /// Create a layer at the origin with full opacity and stacking order 0.
    #[must_use]
    pub fn new(name: impl Into<String>, image: I) -> Self {
        Self { image, name: name.into(), z_index: 0, position: Position::default(), opacity: 1.0 }
    }

    /// Global alpha applied while drawing this layer.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Set the opacity, clamped to `[0.0, 1.0]`. NaN is stored as fully transparent.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    }
}

/// Owns every layer of the composition. Its length and names are fixed at construction.
#[derive(Debug, Clone)]
pub struct LayerStore<I> {
    layers: Vec<Layer<I>>,
}

impl<I> LayerStore<I> {
    /// Build the store from `(name, image)` pairs in back-to-front order.
    #[must_use]
    pub fn new(images: impl IntoIterator<Item = (String, I)>) -> Self {
        let layers = images
            .into_iter()
            .map(|(name, image)| Layer::new(name, image))
            .collect();
        Self { layers }
    }

    /// All layers in their current order.
    #[must_use]
    pub fn layers(&self) -> &[Layer<I>] {
        &self.layers
    }

    /// Layer names in their current order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Layer<I>> {
        self.layers.iter().find(|l| l.name == name)
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer<I>> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// Move a layer. Returns `false` if no layer has that name.
    pub fn set_position(&mut self, name: &str, x: f64, y: f64) -> bool {
        let Some(layer) = self.get_mut(name) else {
            return false;
        };
        layer.position = Position::new(x, y);
        true
    }

    /// Change a layer's opacity. Returns `false` if no layer has that name.
    pub fn set_opacity(&mut self, name: &str, opacity: f64) -> bool {
        let Some(layer) = self.get_mut(name) else {
            return false;
        };
        layer.set_opacity(opacity);
        true
    }

    /// Change a layer's stacking order. Returns `false` if no layer has that name.
    pub fn set_z_index(&mut self, name: &str, z_index: i32) -> bool {
        let Some(layer) = self.get_mut(name) else {
            return false;
        };
        layer.z_index = z_index;
        true
    }

    /// Stable-sort the layers in place by stacking order, lowest first.
    ///
    /// Returns the sorted layers for drawing.
    pub fn sort_for_draw(&mut self) -> &[Layer<I>] {
        self.layers.sort_by_key(|l| l.z_index);
        &self.layers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// URL of the image backing the layer `name`: `<dir>/layer_<name>.<ext>`.
#[must_use]
pub fn asset_path(dir: &str, name: &str, ext: &str) -> String {
    let dir = dir.trim_end_matches('/');
    format!("{dir}/layer_{name}.{ext}")
}
