//! Thin adapters exposing one capability of the shared controller each to the host framework.

mod power_switch;
mod status_sensor;

pub use power_switch::PowerSwitch;
pub(crate) use power_switch::SwitchShared;
pub use status_sensor::{render, StatusTextSensor};
pub(crate) use status_sensor::SensorShared;
