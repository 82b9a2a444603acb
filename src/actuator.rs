//! Actuator state.
//!
//! Tri-valued shared state for the LED, motor, and buzzer channels. Remote
//! writes set a channel authoritatively; analyzer actions toggle it. The
//! control loop publishes every mutation immediately so the remote view
//! never observably diverges from this state.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;

/// One controllable output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Status LED.
    Led,
    /// Ventilation motor.
    Motor,
    /// Alarm buzzer.
    Buzzer,
}

impl Channel {
    /// Outbound topic carrying this channel's state.
    pub fn topic(&self) -> &'static str {
        match self {
            Channel::Led => crate::remote::topics::LED,
            Channel::Motor => crate::remote::topics::MOTOR,
            Channel::Buzzer => crate::remote::topics::BUZZER,
        }
    }

    fn index(self) -> usize {
        match self {
            Channel::Led => 0,
            Channel::Motor => 1,
            Channel::Buzzer => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Led => write!(f, "LED"),
            Channel::Motor => write!(f, "MOTOR"),
            Channel::Buzzer => write!(f, "BUZZER"),
        }
    }
}

/// Shared on/off state of the three actuator channels.
///
/// Lifetime = process lifetime; never persisted.
#[derive(Debug, Default)]
pub struct ActuatorState {
    values: Mutex<[u8; 3]>,
}

impl ActuatorState {
    /// Create the state with every channel off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a channel.
    pub async fn get(&self, channel: Channel) -> u8 {
        self.values.lock().await[channel.index()]
    }

    /// Authoritative set, used for remote writes. Values are clamped to 0|1.
    pub async fn set(&self, channel: Channel, value: u8) -> u8 {
        let value = u8::from(value != 0);
        self.values.lock().await[channel.index()] = value;
        value
    }

    /// Flip a channel and return the new value, used for analyzer actions.
    pub async fn toggle(&self, channel: Channel) -> u8 {
        let mut values = self.values.lock().await;
        let new_value = 1 - values[channel.index()];
        values[channel.index()] = new_value;
        new_value
    }
}
