//! Thrusters of a spacecraft.
//!
//! Twelve independent channels hold a burn level each. Every tick the
//! channels that burn turn into timed forces and torques on the driven body,
//! lasting one [`TIME_UNIT_MS`].

use std::sync::Arc;

use na::{Unit, Vector3};

use crate::{MIN_BURN, TIME_UNIT_MS, classes::PropulsionClass, physical::PhysicalObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrusterChannel {
    Forward,
    Reverse,
    StrafeLeft,
    StrafeRight,
    Raise,
    Lower,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
}

impl ThrusterChannel {
    pub const COUNT: usize = 12;

    pub const ALL: [ThrusterChannel; Self::COUNT] = [
        ThrusterChannel::Forward,
        ThrusterChannel::Reverse,
        ThrusterChannel::StrafeLeft,
        ThrusterChannel::StrafeRight,
        ThrusterChannel::Raise,
        ThrusterChannel::Lower,
        ThrusterChannel::YawLeft,
        ThrusterChannel::YawRight,
        ThrusterChannel::PitchUp,
        ThrusterChannel::PitchDown,
        ThrusterChannel::RollLeft,
        ThrusterChannel::RollRight,
    ];

    /// Also the name of the force or torque this channel renews.
    pub fn name(self) -> &'static str {
        match self {
            ThrusterChannel::Forward => "forward",
            ThrusterChannel::Reverse => "reverse",
            ThrusterChannel::StrafeLeft => "strafeLeft",
            ThrusterChannel::StrafeRight => "strafeRight",
            ThrusterChannel::Raise => "raise",
            ThrusterChannel::Lower => "lower",
            ThrusterChannel::YawLeft => "yawLeft",
            ThrusterChannel::YawRight => "yawRight",
            ThrusterChannel::PitchUp => "pitchUp",
            ThrusterChannel::PitchDown => "pitchDown",
            ThrusterChannel::RollLeft => "rollLeft",
            ThrusterChannel::RollRight => "rollRight",
        }
    }

    /// Whether this channel produces torque rather than force.
    pub fn is_rotation(self) -> bool {
        matches!(
            self,
            ThrusterChannel::YawLeft
                | ThrusterChannel::YawRight
                | ThrusterChannel::PitchUp
                | ThrusterChannel::PitchDown
                | ThrusterChannel::RollLeft
                | ThrusterChannel::RollRight
        )
    }

    /// Body-frame direction of the force, or axis of the torque.
    pub fn local_axis(self) -> Unit<Vector3<f64>> {
        let v = match self {
            ThrusterChannel::Forward | ThrusterChannel::RollRight => Vector3::new(0.0, 1.0, 0.0),
            ThrusterChannel::Reverse | ThrusterChannel::RollLeft => Vector3::new(0.0, -1.0, 0.0),
            ThrusterChannel::StrafeRight | ThrusterChannel::PitchUp => Vector3::new(1.0, 0.0, 0.0),
            ThrusterChannel::StrafeLeft | ThrusterChannel::PitchDown => {
                Vector3::new(-1.0, 0.0, 0.0)
            }
            // Turning right is a negative rotation around up.
            ThrusterChannel::Raise | ThrusterChannel::YawLeft => Vector3::new(0.0, 0.0, 1.0),
            ThrusterChannel::Lower | ThrusterChannel::YawRight => Vector3::new(0.0, 0.0, -1.0),
        };
        Unit::new_unchecked(v)
    }

    /// Position of the channel in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
pub struct Propulsion {
    class: Arc<PropulsionClass>,
    burn: [f64; ThrusterChannel::COUNT],
}

impl Propulsion {
    pub fn new(class: Arc<PropulsionClass>) -> Self {
        Propulsion {
            class,
            burn: [0.0; ThrusterChannel::COUNT],
        }
    }

    pub fn class(&self) -> &PropulsionClass {
        &self.class
    }

    /// N
    pub fn thrust(&self) -> f64 {
        self.class.thrust
    }

    /// N·m
    pub fn angular_thrust(&self) -> f64 {
        self.class.angular_thrust
    }

    pub fn burn(&self, channel: ThrusterChannel) -> f64 {
        self.burn[channel.index()]
    }

    /// Iterate over every channel with its current burn level.
    pub fn burns(&self) -> impl Iterator<Item = (ThrusterChannel, f64)> + '_ {
        ThrusterChannel::ALL
            .into_iter()
            .map(move |channel| (channel, self.burn(channel)))
    }

    /// Overwrite a channel. Values that are not zero but at or below
    /// [`MIN_BURN`] are ignored.
    pub fn set_thruster_burn(&mut self, channel: ThrusterChannel, value: f64) {
        if value != 0.0 && value <= MIN_BURN {
            return;
        }
        self.burn[channel.index()] = value;
    }

    /// Increase a channel by `value`, ignoring increments at or below
    /// [`MIN_BURN`].
    pub fn add_thruster_burn(&mut self, channel: ThrusterChannel, value: f64) {
        if value <= MIN_BURN {
            return;
        }
        self.burn[channel.index()] += value;
    }

    /// Like [`Self::add_thruster_burn`], but never raises the channel above
    /// `max`.
    pub fn add_thruster_burn_capped(&mut self, channel: ThrusterChannel, value: f64, max: f64) {
        if value <= MIN_BURN {
            return;
        }
        let burn = &mut self.burn[channel.index()];
        *burn = (*burn + value).min(max);
    }

    pub fn reset_thruster_burn(&mut self) {
        self.burn = [0.0; ThrusterChannel::COUNT];
    }

    /// Push the current burn levels onto `physical` as one time unit long
    /// forces and torques.
    pub fn simulate(&self, physical: &mut PhysicalObject) {
        for (channel, burn) in self.burns() {
            if burn <= MIN_BURN {
                continue;
            }
            let direction = physical.axis(&channel.local_axis());
            if channel.is_rotation() {
                let magnitude = 2.0 * self.class.angular_thrust * burn;
                physical.add_or_renew_torque(channel.name(), magnitude, direction, TIME_UNIT_MS);
            } else {
                let magnitude = 2.0 * self.class.thrust * burn;
                physical.add_or_renew_force(channel.name(), magnitude, direction, TIME_UNIT_MS);
            }
        }
    }
}
