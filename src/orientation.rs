//! Orientation pipeline: permission negotiation and sensor subscription.
//!
//! The pipeline is a short linear state machine:
//!
//! ```text
//! Start ──▶ PermissionCheck ──▶ Subscribe ──▶ Subscribed(Subscription)
//!                 │                  │
//!                 └──────────────────┴──▶ Halted(ParallaxError)
//! ```
//!
//! It never retries and never falls back from the absolute sensor to the
//! legacy event once the sensor path was chosen. Every failure is logged where
//! it happens and reported as [`PipelineOutcome::Halted`].
//!
//! Platform access goes through [`OrientationHost`] so the negotiation can be
//! exercised without a browser; [`crate::browser::BrowserOrientation`] is the
//! real implementation.

#[cfg(test)]
#[path = "orientation_test.rs"]
mod orientation_test;

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::config::ProbePolicy;
use crate::consts::GYROSCOPE_PERMISSION;
use crate::error::ParallaxError;

// =============================================================
// Readings
// =============================================================

/// One orientation sample, shaped by the source that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationReading {
    /// Unit quaternion `[x, y, z, w]` from the absolute orientation sensor.
    AbsoluteOrientation([f64; 4]),
    /// Euler-like angles in degrees from the legacy event. The platform may
    /// leave any of them unset.
    LegacyTilt { alpha: Option<f64>, beta: Option<f64>, gamma: Option<f64> },
}

impl fmt::Display for OrientationReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbsoluteOrientation([x, y, z, w]) => write!(f, "orientation: [{x}, {y}, {z}, {w}]"),
            Self::LegacyTilt { alpha, beta, gamma } => {
                write!(f, "alpha: {} beta: {} gamma: {}", Angle(*alpha), Angle(*beta), Angle(*gamma))
            }
        }
    }
}

struct Angle(Option<f64>);

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(deg) => write!(f, "{deg}"),
            None => f.write_str("null"),
        }
    }
}

/// Everything a subscribed source can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Reading(OrientationReading),
    /// The sensor reported an error; carries the error's name.
    Error(String),
}

/// Receives events from whichever source was subscribed.
pub type EventSink = Rc<dyn Fn(SensorEvent)>;

/// The logging sink: readings at `info`, sensor errors at `error`.
pub fn log_sensor_event(event: SensorEvent) {
    match event {
        SensorEvent::Reading(reading) => log::info!("{reading}"),
        SensorEvent::Error(name) => log::error!("sensor error: {name}"),
    }
}

// =============================================================
// Permissions and subscriptions
// =============================================================

/// Answer from either permission surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

impl PermissionState {
    /// Parse the string form used by both browser permission APIs.
    /// Anything unrecognized counts as [`PermissionState::Denied`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "granted" => Self::Granted,
            "prompt" | "default" => Self::Prompt,
            _ => Self::Denied,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Prompt => "prompt",
        }
    }
}

/// Which orientation source a [`Subscription`] is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    AbsoluteSensor,
    LegacyEvent,
}

/// Live orientation subscription. Cancelling or dropping it detaches the
/// listeners and stops the sensor.
pub struct Subscription {
    source: SourceKind,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    #[must_use]
    pub fn new(source: SourceKind, release: impl FnOnce() + 'static) -> Self {
        Self { source, release: Some(Box::new(release)) }
    }

    #[must_use]
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Detach from the source now.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!("releasing {:?} subscription", self.source);
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("source", &self.source)
            .field("active", &self.release.is_some())
            .finish()
    }
}

// =============================================================
// Host capabilities
// =============================================================

/// The platform surface the pipeline negotiates with.
pub trait OrientationHost {
    /// A constructed but not yet started absolute orientation sensor.
    type Sensor;

    /// The legacy event type exposes an explicit permission request.
    fn can_request_permission(&self) -> bool;

    /// Ask the user for orientation access through the legacy event type.
    fn request_permission(&self) -> impl Future<Output = Result<PermissionState, ParallaxError>>;

    /// A generic permissions query is available.
    fn can_query_permission(&self) -> bool;

    /// Query the current state of the permission `name`.
    fn query_permission(&self, name: &str) -> impl Future<Output = Result<PermissionState, ParallaxError>>;

    /// The absolute orientation sensor can be constructed.
    fn has_absolute_sensor(&self) -> bool;

    /// Construct the sensor at `frequency_hz` with reading and error handlers feeding `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::Sensor`] if construction throws.
    fn construct_sensor(&self, frequency_hz: f64, sink: EventSink) -> Result<Self::Sensor, ParallaxError>;

    /// Start a constructed sensor.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::Sensor`] if `start()` throws.
    fn start_sensor(&self, sensor: Self::Sensor) -> Result<Subscription, ParallaxError>;

    /// The legacy orientation event exists.
    fn has_legacy_events(&self) -> bool;

    /// Listen for legacy orientation events, forwarding each to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the listener cannot be attached.
    fn subscribe_legacy(&self, sink: EventSink) -> Result<Subscription, ParallaxError>;
}

// =============================================================
// Pipeline
// =============================================================

/// Where the pipeline ended up.
#[derive(Debug)]
pub enum PipelineOutcome {
    Subscribed(Subscription),
    Halted(ParallaxError),
}

impl PipelineOutcome {
    #[must_use]
    pub fn subscription(self) -> Option<Subscription> {
        match self {
            Self::Subscribed(sub) => Some(sub),
            Self::Halted(_) => None,
        }
    }
}

/// Permission negotiation and source selection for one user gesture.
pub struct OrientationPipeline<'h, H: OrientationHost> {
    host: &'h H,
    frequency_hz: f64,
    probe_policy: ProbePolicy,
    sink: EventSink,
}

impl<'h, H: OrientationHost> OrientationPipeline<'h, H> {
    /// Pipeline that logs every event through [`log_sensor_event`].
    #[must_use]
    pub fn new(host: &'h H, frequency_hz: f64, probe_policy: ProbePolicy) -> Self {
        Self::with_sink(host, frequency_hz, probe_policy, Rc::new(log_sensor_event))
    }

    #[must_use]
    pub fn with_sink(host: &'h H, frequency_hz: f64, probe_policy: ProbePolicy, sink: EventSink) -> Self {
        Self { host, frequency_hz, probe_policy, sink }
    }

    /// Run the whole pipeline: permission check, then subscribe.
    pub async fn run(&self) -> PipelineOutcome {
        if let Err(e) = self.check_permission().await {
            return PipelineOutcome::Halted(e);
        }
        self.subscribe().await
    }

    /// PermissionCheck: only gates when the explicit request exists.
    async fn check_permission(&self) -> Result<(), ParallaxError> {
        if !self.host.can_request_permission() {
            log::debug!("no explicit orientation permission request; continuing");
            return Ok(());
        }
        match self.host.request_permission().await {
            Ok(PermissionState::Granted) => Ok(()),
            Ok(state) => {
                log::warn!("orientation permission denied ({})", state.as_str());
                Err(ParallaxError::PermissionDenied(state.as_str().to_owned()))
            }
            Err(e) => {
                log::error!("orientation permission request error: {e}");
                Err(e)
            }
        }
    }

    /// Subscribe: absolute sensor, else legacy event, else give up.
    pub async fn subscribe(&self) -> PipelineOutcome {
        if self.host.has_absolute_sensor() {
            return match self.start_absolute().await {
                Ok(sub) => PipelineOutcome::Subscribed(sub),
                Err(e) => PipelineOutcome::Halted(e),
            };
        }

        if self.host.has_legacy_events() {
            return match self.host.subscribe_legacy(Rc::clone(&self.sink)) {
                Ok(sub) => {
                    log::debug!("listening for legacy orientation events");
                    PipelineOutcome::Subscribed(sub)
                }
                Err(e) => {
                    log::error!("legacy orientation subscribe failed: {e}");
                    PipelineOutcome::Halted(e)
                }
            };
        }

        log::warn!("no orientation sensor available");
        PipelineOutcome::Halted(ParallaxError::NoOrientationSource)
    }

    async fn start_absolute(&self) -> Result<Subscription, ParallaxError> {
        self.probe_gyroscope().await?;

        let started = self
            .host
            .construct_sensor(self.frequency_hz, Rc::clone(&self.sink))
            .and_then(|sensor| self.host.start_sensor(sensor));
        match started {
            Ok(sub) => {
                log::debug!("absolute orientation sensor started at {} Hz", self.frequency_hz);
                Ok(sub)
            }
            Err(e) => {
                log::error!("error initializing sensor: {e}");
                Err(e)
            }
        }
    }

    /// Best-effort gyroscope probe. Query failures never block; a denial
    /// blocks only under [`ProbePolicy::Blocking`].
    async fn probe_gyroscope(&self) -> Result<(), ParallaxError> {
        if !self.host.can_query_permission() {
            return Ok(());
        }
        match self.host.query_permission(GYROSCOPE_PERMISSION).await {
            Ok(PermissionState::Denied) => {
                log::warn!("gyroscope permission denied");
                match self.probe_policy {
                    ProbePolicy::Blocking => Err(ParallaxError::PermissionDenied(GYROSCOPE_PERMISSION.to_owned())),
                    ProbePolicy::Advisory => Ok(()),
                }
            }
            Ok(_) => Ok(()),
            Err(e) => {
                log::warn!("permissions query unsupported or failed: {e}");
                Ok(())
            }
        }
    }
}
