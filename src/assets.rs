//! Layer image loading and the "assets settled" gate.
//!
//! Images start loading as soon as their handles are created; nothing blocks
//! on them. [`LoadTracker`] counts `load` and `error` events so the host can
//! optionally hold the first frame until every image has either arrived or
//! failed.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use web_sys::HtmlImageElement;

use crate::config::AppConfig;
use crate::error::ParallaxError;
use crate::layer::asset_path;

/// Progress of the layer image downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadTracker {
    expected: usize,
    loaded: usize,
    failed: Vec<String>,
}

impl LoadTracker {
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self { expected, loaded: 0, failed: Vec::new() }
    }

    /// Record a finished image. Returns `true` if this completed the set.
    pub fn record_loaded(&mut self) -> bool {
        let was_settled = self.is_settled();
        self.loaded += 1;
        !was_settled && self.is_settled()
    }

    /// Record an image that failed to load. Returns `true` if this completed the set.
    pub fn record_failed(&mut self, name: impl Into<String>) -> bool {
        let was_settled = self.is_settled();
        self.failed.push(name.into());
        !was_settled && self.is_settled()
    }

    /// Every image has reported either success or failure.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.loaded + self.failed.len() >= self.expected
    }

    #[must_use]
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    /// Names of the layers whose image failed.
    #[must_use]
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }
}

/// Decides when the first frame may be drawn.
///
/// The gate opens once the page `load` event has fired and, when
/// `wait_for_assets` is set, every layer image has settled. It opens at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartGate {
    wait_for_assets: bool,
    page_loaded: bool,
    assets_settled: bool,
    opened: bool,
}

impl StartGate {
    #[must_use]
    pub fn new(wait_for_assets: bool) -> Self {
        Self { wait_for_assets, ..Self::default() }
    }

    /// The page finished loading. Returns `true` if the gate opens now.
    pub fn page_loaded(&mut self) -> bool {
        self.page_loaded = true;
        self.try_open()
    }

    /// Every layer image settled. Returns `true` if the gate opens now.
    pub fn assets_settled(&mut self) -> bool {
        self.assets_settled = true;
        self.try_open()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.opened
    }

    fn try_open(&mut self) -> bool {
        if self.opened || !self.page_loaded || (self.wait_for_assets && !self.assets_settled) {
            return false;
        }
        self.opened = true;
        true
    }
}

/// Callback run once, when the last image settles.
pub type OnSettled = Box<dyn FnOnce(&LoadTracker)>;

/// Image elements for every layer plus the listeners tracking their loads.
pub struct LayerImages {
    pub images: Vec<(String, HtmlImageElement)>,
    /// Dropping these detaches the `load`/`error` handlers.
    pub listeners: Vec<EventListener>,
}

/// Create one `<img>` per configured layer and start loading it.
///
/// `on_settled` fires once after every image has loaded or failed. The
/// images are in configuration order, ready for a [`crate::layer::LayerStore`].
///
/// # Errors
///
/// Returns `Err` if an image element cannot be constructed.
pub fn load_layer_images(config: &AppConfig, on_settled: OnSettled) -> Result<LayerImages, ParallaxError> {
    let tracker = Rc::new(RefCell::new(LoadTracker::new(config.layers.len())));
    let on_settled = Rc::new(RefCell::new(Some(on_settled)));
    let mut images = Vec::with_capacity(config.layers.len());
    let mut listeners = Vec::with_capacity(config.layers.len() * 2);

    for name in &config.layers {
        let image = HtmlImageElement::new()?;

        listeners.push({
            let tracker = Rc::clone(&tracker);
            let on_settled = Rc::clone(&on_settled);
            let name = name.clone();
            EventListener::once(&image, "load", move |_| {
                log::debug!("layer image {name} loaded");
                let done = tracker.borrow_mut().record_loaded();
                if done {
                    settle(&tracker, &on_settled);
                }
            })
        });
        listeners.push({
            let tracker = Rc::clone(&tracker);
            let on_settled = Rc::clone(&on_settled);
            let name = name.clone();
            EventListener::once(&image, "error", move |_| {
                log::warn!("layer image {name} failed to load");
                let done = tracker.borrow_mut().record_failed(name.clone());
                if done {
                    settle(&tracker, &on_settled);
                }
            })
        });

        image.set_src(&asset_path(&config.image_dir, name, &config.image_ext));
        images.push((name.clone(), image));
    }

    Ok(LayerImages { images, listeners })
}

fn settle(tracker: &Rc<RefCell<LoadTracker>>, on_settled: &Rc<RefCell<Option<OnSettled>>>) {
    let Some(callback) = on_settled.borrow_mut().take() else {
        return;
    };
    let tracker = tracker.borrow();
    log::debug!("{} of {} layer images loaded", tracker.loaded(), tracker.expected());
    callback(&tracker);
}
