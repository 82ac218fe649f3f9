//! Two-channel device model behind the demo endpoint.
//!
//! The heart and temperature channels are never stored as state. Each call
//! starts from the readings of the latest record and flips one channel.

use rand::Rng;
use serde_json::Value;
use std::ops::RangeInclusive;

use crate::models::SimulateRequest;
use crate::record::VitalsRecord;

pub const AMBIENT_TEMP: f64 = 25.5;
pub const SIMULATED_SPO2: f64 = 98.0;
pub const HEART_RATE_RANGE: RangeInclusive<u32> = 72..=85;
pub const BODY_TEMP_RANGE: RangeInclusive<f64> = 36.5..=37.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Channel {
    Heart,
    Temp,
    Device,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Switch {
    On,
    Off,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Command {
    pub channel: Channel,
    pub switch: Switch,
}

impl Command {
    pub fn from_request(request: &SimulateRequest) -> Self {
        let channel = match request.kind.as_ref().and_then(Value::as_str) {
            Some("heart") => Channel::Heart,
            Some("temp") => Channel::Temp,
            Some("device") => Channel::Device,
            _ => Channel::Other,
        };
        let switch = match request.status.as_ref().and_then(Value::as_str) {
            Some("on") => Switch::On,
            Some("off") => Switch::Off,
            _ => Switch::Other,
        };
        Self { channel, switch }
    }
}

/// Sensor values carried from one simulated record to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Readings {
    pub heartbeat: f64,
    pub bp: f64,
    pub temp: f64,
}

impl Readings {
    /// Both channels off, used before the device has reported anything.
    pub fn idle() -> Self {
        Self {
            heartbeat: 0.0,
            bp: 0.0,
            temp: AMBIENT_TEMP,
        }
    }

    pub fn carried_from(record: Option<&VitalsRecord>) -> Self {
        match record {
            Some(record) => Self {
                heartbeat: record.heartbeat,
                bp: record.bp,
                temp: record.temp,
            },
            None => Self::idle(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Device switched off: nothing is recorded.
    PoweredOff,
    Record(Readings),
}

pub fn apply<R: Rng>(prior: Readings, command: Command, rng: &mut R) -> Outcome {
    let mut next = prior;
    match (command.channel, command.switch) {
        (Channel::Device, Switch::Off) => return Outcome::PoweredOff,
        (Channel::Heart, Switch::On) => {
            next.heartbeat = f64::from(rng.gen_range(HEART_RATE_RANGE));
            next.bp = SIMULATED_SPO2;
        }
        (Channel::Heart, Switch::Off) => {
            next.heartbeat = 0.0;
            next.bp = 0.0;
        }
        (Channel::Temp, Switch::On) => {
            next.temp = round_tenth(rng.gen_range(BODY_TEMP_RANGE));
        }
        (Channel::Temp, Switch::Off) => {
            next.temp = AMBIENT_TEMP;
        }
        _ => {}
    }
    Outcome::Record(next)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
