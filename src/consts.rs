//! Shared constants for the parallax crate.

// ── Layers ──────────────────────────────────────────────────────

/// Asset names of the default composition, back to front.
pub const DEFAULT_LAYER_NAMES: [&str; 8] = ["background", "didot", "shadow", "man", "headlines", "title", "frame", "gloss"];

/// Directory the layer images are served from.
pub const DEFAULT_IMAGE_DIR: &str = "./images";

/// File extension of the layer images.
pub const DEFAULT_IMAGE_EXT: &str = "png";

// ── Host page ───────────────────────────────────────────────────

pub const DEFAULT_CANVAS_ID: &str = "canvas";
pub const DEFAULT_START_BUTTON_ID: &str = "startButton";
pub const DEFAULT_LOADING_ID: &str = "loading";

/// `<script type="application/json">` element holding optional overrides.
pub const CONFIG_SCRIPT_ID: &str = "parallax-config";

// ── Sensors ─────────────────────────────────────────────────────

/// Sample rate requested from the absolute orientation sensor.
pub const DEFAULT_SENSOR_FREQUENCY_HZ: f64 = 60.0;

/// Permission name probed before starting the absolute orientation sensor.
pub const GYROSCOPE_PERMISSION: &str = "gyroscope";

/// Legacy orientation event type.
pub const DEVICE_ORIENTATION_EVENT: &str = "deviceorientation";
