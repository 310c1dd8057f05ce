//! Composition root: wires the host page to the render loop and the
//! orientation pipeline.
//!
//! JS creates one [`App`] with `new App()` after the wasm module has loaded
//! and keeps it for the lifetime of the page. Everything the app starts is
//! owned by it, so `app.stop()` (or `app.free()`) tears the scene down:
//! the animation frame is cancelled, the orientation subscription released,
//! and every DOM listener removed.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use gloo_events::EventListener;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, Window};

use crate::assets::{LayerImages, StartGate, load_layer_images};
use crate::browser::BrowserOrientation;
use crate::config::{AppConfig, ProbePolicy};
use crate::consts::CONFIG_SCRIPT_ID;
use crate::error::ParallaxError;
use crate::layer::LayerStore;
use crate::orientation::{OrientationPipeline, Subscription};
use crate::raf::RafLoop;
use crate::render::RenderLoop;
use crate::surface::CanvasSurface;

/// Runs once when the wasm module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// The mounted parallax scene.
#[wasm_bindgen]
pub struct App {
    scene: Rc<Scene>,
    render_loop: Rc<RefCell<RenderLoop<CanvasSurface>>>,
    subscription: Rc<SubscriptionSlot>,
    listeners: Vec<EventListener>,
}

/// The live orientation subscription of one [`App`].
///
/// Negotiation finishes asynchronously, so a subscription can arrive after
/// [`SubscriptionSlot::stop`]; it is released on arrival instead of installed.
#[derive(Debug, Default)]
struct SubscriptionSlot {
    current: RefCell<Option<Subscription>>,
    stopped: Cell<bool>,
}

impl SubscriptionSlot {
    /// Install `sub`, releasing the subscription it replaces. Returns `false`
    /// (and releases `sub`) if the slot was already stopped.
    fn install(&self, sub: Subscription) -> bool {
        if self.stopped.get() {
            log::debug!("app stopped during negotiation; releasing {:?} subscription", sub.source());
            sub.cancel();
            return false;
        }
        log::info!("orientation source: {:?}", sub.source());
        let previous = self.current.borrow_mut().replace(sub);
        if let Some(previous) = previous {
            previous.cancel();
        }
        true
    }

    /// Release the current subscription and refuse any later ones.
    fn stop(&self) {
        self.stopped.set(true);
        let current = self.current.borrow_mut().take();
        if let Some(sub) = current {
            sub.cancel();
        }
    }

    fn is_active(&self) -> bool {
        self.current.borrow().is_some()
    }
}

/// Start-up state shared with the `load` handlers.
struct Scene {
    gate: RefCell<StartGate>,
    raf: RafLoop,
    loading: Option<HtmlElement>,
}

impl Scene {
    fn page_loaded(&self) {
        let open = self.gate.borrow_mut().page_loaded();
        if open {
            self.begin();
        }
    }

    fn assets_settled(&self) {
        let open = self.gate.borrow_mut().assets_settled();
        if open {
            self.begin();
        }
    }

    fn begin(&self) {
        if let Some(loading) = &self.loading {
            if let Err(e) = loading.style().set_property("display", "none") {
                log::warn!("could not hide loading screen: {}", ParallaxError::from(e));
            }
        }
        if let Err(e) = self.raf.start() {
            log::error!("render loop failed to start: {e}");
        }
    }
}

#[wasm_bindgen]
impl App {
    /// Mount the scene on the current document.
    ///
    /// # Errors
    ///
    /// Throws if the config is invalid or a required element is missing.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<App, JsValue> {
        Self::mount().map_err(JsValue::from)
    }

    /// Cancel the render loop, release the orientation subscription and detach listeners.
    pub fn stop(&mut self) {
        self.scene.raf.stop();
        self.subscription.stop();
        self.listeners.clear();
        log::debug!("parallax stopped");
    }

    /// Whether an orientation source is currently subscribed.
    #[wasm_bindgen(getter)]
    pub fn subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Frames rendered so far, saturating at `u32::MAX`.
    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> u32 {
        u32::try_from(self.render_loop.borrow().frames()).unwrap_or(u32::MAX)
    }

    /// Frames in which at least one layer failed to draw, saturating at `u32::MAX`.
    #[wasm_bindgen(getter, js_name = failedFrames)]
    pub fn failed_frames(&self) -> u32 {
        u32::try_from(self.render_loop.borrow().failed_frames()).unwrap_or(u32::MAX)
    }

    /// Move the layer `name`. Returns `false` for unknown layers.
    pub fn set_layer_position(&self, name: &str, x: f64, y: f64) -> bool {
        self.render_loop.borrow_mut().store_mut().set_position(name, x, y)
    }

    /// Fade the layer `name`. Returns `false` for unknown layers.
    pub fn set_layer_opacity(&self, name: &str, opacity: f64) -> bool {
        self.render_loop.borrow_mut().store_mut().set_opacity(name, opacity)
    }

    /// Restack the layer `name`. Returns `false` for unknown layers.
    pub fn set_layer_z_index(&self, name: &str, z_index: i32) -> bool {
        self.render_loop.borrow_mut().store_mut().set_z_index(name, z_index)
    }
}

impl App {
    fn mount() -> Result<Self, ParallaxError> {
        let window = web_sys::window().ok_or_else(|| ParallaxError::Js("no global window".into()))?;
        let document = window.document().ok_or_else(|| ParallaxError::Js("no document".into()))?;

        let config = read_config(&document)?;
        init_logging(&config)?;

        let (canvas, ctx) = canvas_context(&document, &config.canvas_id)?;

        // Filled in once the scene exists; image events always arrive later.
        let scene_slot: Rc<RefCell<Weak<Scene>>> = Rc::new(RefCell::new(Weak::new()));
        let LayerImages { images, mut listeners } = load_layer_images(&config, {
            let slot = Rc::clone(&scene_slot);
            Box::new(move |tracker| {
                if !tracker.failed().is_empty() {
                    log::warn!(
                        "{} of {} layers without images: {}",
                        tracker.failed().len(),
                        tracker.expected(),
                        tracker.failed().join(", ")
                    );
                }
                if let Some(scene) = slot.borrow().upgrade() {
                    scene.assets_settled();
                }
            })
        })?;

        let store = LayerStore::new(images);
        log::debug!("layers: {}", store.names().collect::<Vec<_>>().join(", "));
        let render_loop = Rc::new(RefCell::new(RenderLoop::new(CanvasSurface::new(canvas, ctx), store)));

        let scene = Rc::new(Scene {
            gate: RefCell::new(StartGate::new(config.wait_for_assets)),
            raf: RafLoop::new(window.clone(), Rc::clone(&render_loop)),
            loading: html_element(&document, &config.loading_id),
        });
        *scene_slot.borrow_mut() = Rc::downgrade(&scene);

        if document.ready_state() == "complete" {
            scene.page_loaded();
        } else {
            let weak = Rc::downgrade(&scene);
            listeners.push(EventListener::once(&window, "load", move |_| {
                if let Some(scene) = weak.upgrade() {
                    scene.page_loaded();
                }
            }));
        }

        let subscription = Rc::new(SubscriptionSlot::default());
        let button = document
            .get_element_by_id(&config.start_button_id)
            .ok_or_else(|| ParallaxError::MissingElement(config.start_button_id.clone()))?;
        listeners.push({
            let window = window.clone();
            let slot = Rc::downgrade(&subscription);
            let frequency_hz = config.sensor_frequency_hz;
            let policy = config.probe_policy;
            EventListener::new(&button, "click", move |_| {
                wasm_bindgen_futures::spawn_local(negotiate(window.clone(), frequency_hz, policy, slot.clone()));
            })
        });

        log::info!("parallax mounted on #{}", config.canvas_id);
        Ok(Self { scene, render_loop, subscription, listeners })
    }
}

/// One user gesture's worth of orientation negotiation.
async fn negotiate(window: Window, frequency_hz: f64, policy: ProbePolicy, slot: Weak<SubscriptionSlot>) {
    let host = BrowserOrientation::new(window);
    let outcome = OrientationPipeline::new(&host, frequency_hz, policy).run().await;
    let Some(sub) = outcome.subscription() else {
        return;
    };
    match slot.upgrade() {
        Some(slot) => {
            slot.install(sub);
        }
        // The app was freed while permission was pending.
        None => sub.cancel(),
    }
}

fn read_config(document: &Document) -> Result<AppConfig, ParallaxError> {
    match document.get_element_by_id(CONFIG_SCRIPT_ID) {
        Some(script) => AppConfig::from_json(&script.text_content().unwrap_or_default()),
        None => Ok(AppConfig::default()),
    }
}

fn init_logging(config: &AppConfig) -> Result<(), ParallaxError> {
    if console_log::init_with_level(config.level()?).is_err() {
        log::debug!("console logger already installed");
    }
    Ok(())
}

fn canvas_context(document: &Document, id: &str) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), ParallaxError> {
    let canvas = document
        .get_element_by_id(id)
        .ok_or_else(|| ParallaxError::MissingElement(id.to_owned()))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| ParallaxError::Js(format!("#{id} is not a <canvas>")))?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| ParallaxError::Js("2d context unavailable".into()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| ParallaxError::Js("2d context has unexpected type".into()))?;
    Ok((canvas, ctx))
}

fn html_element(document: &Document, id: &str) -> Option<HtmlElement> {
    let element = document.get_element_by_id(id)?;
    match element.dyn_into::<HtmlElement>() {
        Ok(el) => Some(el),
        Err(_) => None,
    }
}
