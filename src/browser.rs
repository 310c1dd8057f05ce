//! Browser implementation of [`OrientationHost`].
//!
//! Capabilities are probed on the global object with `Reflect`, the way a
//! page script would test `'AbsoluteOrientationSensor' in window`. The Generic
//! Sensor API has no `web-sys` binding, so the sensor class is declared here.

use gloo_events::EventListener;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{DeviceOrientationEvent, PermissionStatus, Window};

use crate::consts::DEVICE_ORIENTATION_EVENT;
use crate::error::{ParallaxError, describe_js};
use crate::orientation::{EventSink, OrientationHost, OrientationReading, PermissionState, SensorEvent, SourceKind, Subscription};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = web_sys::EventTarget)]
    #[derive(Debug, Clone)]
    type AbsoluteOrientationSensor;

    #[wasm_bindgen(constructor, catch)]
    fn new(options: &Object) -> Result<AbsoluteOrientationSensor, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn start(this: &AbsoluteOrientationSensor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn stop(this: &AbsoluteOrientationSensor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, getter)]
    fn quaternion(this: &AbsoluteOrientationSensor) -> JsValue;
}

/// A constructed sensor with its `reading` and `error` listeners attached.
pub struct PendingSensor {
    sensor: AbsoluteOrientationSensor,
    listeners: [EventListener; 2],
}

/// Orientation capabilities of the current window.
pub struct BrowserOrientation {
    window: Window,
}

impl BrowserOrientation {
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn global(&self, name: &str) -> Option<JsValue> {
        let value = Reflect::get(&self.window, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED);
        if value.is_undefined() || value.is_null() { None } else { Some(value) }
    }

    /// `DeviceOrientationEvent` and its `requestPermission` static, when both exist.
    fn request_function(&self) -> Option<(JsValue, Function)> {
        let ctor = self.global("DeviceOrientationEvent")?;
        let request = Reflect::get(&ctor, &JsValue::from_str("requestPermission")).unwrap_or(JsValue::UNDEFINED);
        let Ok(request) = request.dyn_into::<Function>() else {
            return None;
        };
        Some((ctor, request))
    }
}

async fn call_request(ctor: &JsValue, request: &Function) -> Result<JsValue, JsValue> {
    let promise: Promise = request.call0(ctor)?.dyn_into()?;
    JsFuture::from(promise).await
}

async fn query_status(window: &Window, name: &str) -> Result<PermissionStatus, JsValue> {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &JsValue::from_str("name"), &JsValue::from_str(name))?;
    let promise = window.navigator().permissions()?.query(&descriptor)?;
    JsFuture::from(promise).await?.dyn_into::<PermissionStatus>()
}

impl OrientationHost for BrowserOrientation {
    type Sensor = PendingSensor;

    fn can_request_permission(&self) -> bool {
        self.request_function().is_some()
    }

    async fn request_permission(&self) -> Result<PermissionState, ParallaxError> {
        let Some((ctor, request)) = self.request_function() else {
            return Ok(PermissionState::Granted);
        };
        let answer = call_request(&ctor, &request)
            .await
            .map_err(|e| ParallaxError::PermissionRequest(describe_js(&e)))?;
        Ok(PermissionState::parse(&answer.as_string().unwrap_or_default()))
    }

    fn can_query_permission(&self) -> bool {
        Reflect::has(&self.window.navigator(), &JsValue::from_str("permissions")).unwrap_or(false)
    }

    async fn query_permission(&self, name: &str) -> Result<PermissionState, ParallaxError> {
        let status = query_status(&self.window, name)
            .await
            .map_err(|e| ParallaxError::PermissionQuery(describe_js(&e)))?;

        Ok(match status.state() {
            web_sys::PermissionState::Granted => PermissionState::Granted,
            web_sys::PermissionState::Prompt => PermissionState::Prompt,
            _ => PermissionState::Denied,
        })
    }

    fn has_absolute_sensor(&self) -> bool {
        self.global("AbsoluteOrientationSensor").is_some()
    }

    fn construct_sensor(&self, frequency_hz: f64, sink: EventSink) -> Result<PendingSensor, ParallaxError> {
        let options = Object::new();
        Reflect::set(&options, &JsValue::from_str("frequency"), &JsValue::from_f64(frequency_hz))?;
        let sensor = AbsoluteOrientationSensor::new(&options).map_err(|e| ParallaxError::Sensor(describe_js(&e)))?;

        let on_reading = {
            let reader = sensor.clone();
            let sink = sink.clone();
            EventListener::new(&sensor, "reading", move |_| {
                if let Some(q) = read_quaternion(&reader.quaternion()) {
                    sink(SensorEvent::Reading(OrientationReading::AbsoluteOrientation(q)));
                }
            })
        };
        let on_error = EventListener::new(&sensor, "error", move |event| {
            let error = Reflect::get(event, &JsValue::from_str("error")).unwrap_or(JsValue::UNDEFINED);
            let name = Reflect::get(&error, &JsValue::from_str("name"))
                .map(|n| n.as_string())
                .unwrap_or_default()
                .unwrap_or_else(|| describe_js(&error));
            sink(SensorEvent::Error(name));
        });

        Ok(PendingSensor { sensor, listeners: [on_reading, on_error] })
    }

    fn start_sensor(&self, pending: PendingSensor) -> Result<Subscription, ParallaxError> {
        let PendingSensor { sensor, listeners } = pending;
        sensor.start().map_err(|e| ParallaxError::Sensor(describe_js(&e)))?;
        Ok(Subscription::new(SourceKind::AbsoluteSensor, move || {
            drop(listeners);
            if let Err(e) = sensor.stop() {
                log::warn!("sensor stop failed: {}", describe_js(&e));
            }
        }))
    }

    fn has_legacy_events(&self) -> bool {
        self.global("DeviceOrientationEvent").is_some()
    }

    fn subscribe_legacy(&self, sink: EventSink) -> Result<Subscription, ParallaxError> {
        let listener = EventListener::new(&self.window, DEVICE_ORIENTATION_EVENT, move |event| {
            let Some(event) = event.dyn_ref::<DeviceOrientationEvent>() else {
                return;
            };
            sink(SensorEvent::Reading(OrientationReading::LegacyTilt {
                alpha: event.alpha(),
                beta: event.beta(),
                gamma: event.gamma(),
            }));
        });
        Ok(Subscription::new(SourceKind::LegacyEvent, move || drop(listener)))
    }
}

/// Convert the sensor's `quaternion` property (a 4-element array, or null
/// before the first reading) into `[x, y, z, w]`.
fn read_quaternion(value: &JsValue) -> Option<[f64; 4]> {
    let array = value.dyn_ref::<Array>()?;
    if array.length() != 4 {
        return None;
    }
    let mut q = [0.0; 4];
    for (slot, component) in q.iter_mut().zip(array.iter()) {
        *slot = component.as_f64()?;
    }
    Some(q)
}
