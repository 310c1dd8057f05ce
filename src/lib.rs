//! Layered parallax renderer and device orientation input for the browser.
//!
//! This crate is compiled to WebAssembly. It paints a stack of image layers
//! onto a 2D canvas once per animation frame, in z-order with per-layer
//! opacity, and, after a user gesture, negotiates access to the device's
//! orientation sensor and streams its readings to the console log. The host
//! page supplies the `<canvas>`, the start button and an optional JSON
//! config block; [`app::App`] does the rest.
//!
//! Everything that does not touch the DOM (layer state, frame composition,
//! the permission/fallback pipeline, config) is plain Rust behind small
//! traits and is tested natively.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`app`] | Composition root exported to JS as `App` |
//! | [`layer`] | Layer records and the z-ordered [`layer::LayerStore`] |
//! | [`render`] | Per-frame drawing and the cancellable [`render::RenderLoop`] |
//! | [`surface`] | [`surface::Surface`] drawing seam and its canvas implementation |
//! | [`raf`] | `requestAnimationFrame` driver |
//! | [`assets`] | Layer image loading and the start gate |
//! | [`orientation`] | Permission negotiation, source fallback and reading formats |
//! | [`browser`] | Browser implementation of [`orientation::OrientationHost`] |
//! | [`config`] | JSON configuration with defaults |
//! | [`error`] | Crate error type |
//! | [`consts`] | Default layer names, element ids and sensor settings |

pub mod app;
pub mod assets;
pub mod browser;
pub mod config;
pub mod consts;
pub mod error;
pub mod layer;
pub mod orientation;
pub mod raf;
pub mod render;
pub mod surface;
