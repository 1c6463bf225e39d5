//! Drivers: the things that decide what a spacecraft should do each tick.
//!
//! A driver only ever reads the world and produces [`Intent`]s. The level
//! applies them to the driven spacecraft before it is simulated, so the
//! core does not care whether a human or the AI is flying.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    maneuvering::FlightMode,
    spacecraft::{Spacecraft, SpacecraftId},
};

/// One piloting request. Everything but [`Intent::Fire`] maps onto a
/// target-setting call of the maneuvering computer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    YawLeft(Option<f64>),
    YawRight(Option<f64>),
    PitchUp(Option<f64>),
    PitchDown(Option<f64>),
    RollLeft(Option<f64>),
    RollRight(Option<f64>),
    Forward(Option<f64>),
    Reverse(Option<f64>),
    StopForward,
    StopReverse,
    ResetSpeed,
    SlideLeft(Option<f64>),
    SlideRight(Option<f64>),
    SlideUp(Option<f64>),
    SlideDown(Option<f64>),
    StopLeftSlide,
    StopRightSlide,
    StopUpSlide,
    StopDownSlide,
    SetMode(FlightMode),
    ToggleMode,
    Fire,
}

/// A control a human pilot holds down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Command {
    Forward,
    Reverse,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    Fire,
}

impl Command {
    /// Intent issued every tick while held.
    fn held(self) -> Intent {
        match self {
            Command::Forward => Intent::Forward(None),
            Command::Reverse => Intent::Reverse(None),
            Command::SlideLeft => Intent::SlideLeft(None),
            Command::SlideRight => Intent::SlideRight(None),
            Command::SlideUp => Intent::SlideUp(None),
            Command::SlideDown => Intent::SlideDown(None),
            Command::YawLeft => Intent::YawLeft(None),
            Command::YawRight => Intent::YawRight(None),
            Command::PitchUp => Intent::PitchUp(None),
            Command::PitchDown => Intent::PitchDown(None),
            Command::RollLeft => Intent::RollLeft(None),
            Command::RollRight => Intent::RollRight(None),
            Command::Fire => Intent::Fire,
        }
    }

    /// Intent issued once on release. Turns need none since turn targets
    /// only last a tick anyway.
    fn released(self) -> Option<Intent> {
        match self {
            Command::Forward => Some(Intent::StopForward),
            Command::Reverse => Some(Intent::StopReverse),
            Command::SlideLeft => Some(Intent::StopLeftSlide),
            Command::SlideRight => Some(Intent::StopRightSlide),
            Command::SlideUp => Some(Intent::StopUpSlide),
            Command::SlideDown => Some(Intent::StopDownSlide),
            _ => None,
        }
    }
}

/// Keyboard-style driver. The host reports which commands are held; one
/// shot requests such as a mode toggle are queued with [`PlayerInput::trigger`].
#[derive(Debug, Clone, Default)]
pub struct PlayerInput {
    held: BTreeSet<Command>,
    released: Vec<Command>,
    queued: Vec<Intent>,
}

impl PlayerInput {
    pub fn press(&mut self, command: Command) {
        self.held.insert(command);
    }

    pub fn release(&mut self, command: Command) {
        if self.held.remove(&command) {
            self.released.push(command);
        }
    }

    pub fn set_held(&mut self, command: Command, held: bool) {
        if held {
            self.press(command);
        } else {
            self.release(command);
        }
    }

    pub fn is_held(&self, command: Command) -> bool {
        self.held.contains(&command)
    }

    /// Queue an intent for the next tick only.
    pub fn trigger(&mut self, intent: Intent) {
        self.queued.push(intent);
    }

    fn intents(&mut self) -> Vec<Intent> {
        let mut intents: Vec<Intent> = self.queued.drain(..).collect();
        intents.extend(self.released.drain(..).filter_map(Command::released));
        intents.extend(self.held.iter().map(|c| c.held()));
        intents
    }
}

/// Gain from heading error (rad) to turn rate (rad/s).
const AI_TURN_GAIN: f64 = 2.0;

/// Chases a single target: turns toward it, holds a cruising speed in
/// compensated mode and fires once it is lined up and in range.
#[derive(Debug, Clone, PartialEq)]
pub struct AiController {
    target: Option<SpacecraftId>,
    /// m/s
    cruise_speed: f64,
    /// Half angle, rad.
    firing_cone: f64,
    /// m
    firing_range: f64,
}

impl AiController {
    pub fn new(target: Option<SpacecraftId>) -> Self {
        AiController {
            target,
            cruise_speed: 20.0,
            firing_cone: 5f64.to_radians(),
            firing_range: 800.0,
        }
    }

    pub fn with_cruise_speed(mut self, speed: f64) -> Self {
        self.cruise_speed = speed;
        self
    }

    pub fn with_firing_cone(mut self, half_angle: f64, range: f64) -> Self {
        self.firing_cone = half_angle;
        self.firing_range = range;
        self
    }

    pub fn target(&self) -> Option<SpacecraftId> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<SpacecraftId>) {
        self.target = target;
    }

    fn intents(&mut self, me: &Spacecraft, fleet: &[Spacecraft]) -> Vec<Intent> {
        // Without propulsion there is nothing to steer; a turret only shoots.
        let powered = me.propulsion().is_some();
        let maneuvering = me.maneuvering();
        if powered && maneuvering.mode() != FlightMode::Compensated {
            // The speed target is only known after the switch; steer next tick.
            return vec![Intent::SetMode(FlightMode::Compensated)];
        }

        let target = self
            .target
            .and_then(|id| fleet.iter().find(|s| s.id() == id && !s.to_be_deleted()));
        if target.is_none() && self.target.is_some() {
            debug!("{}: target {:?} is gone", me.id(), self.target);
            self.target = None;
        }

        let mut intents = Vec::new();
        if powered {
            let cruise = if target.is_some() { self.cruise_speed } else { 0.0 };
            let delta = cruise - maneuvering.speed_target();
            if delta > 0.0 {
                intents.push(Intent::Forward(Some(delta)));
            } else if delta < 0.0 {
                intents.push(Intent::Reverse(Some(-delta)));
            }
        }

        let Some(target) = target else {
            return intents;
        };

        let physical = me.physical();
        let offset = target.physical().position() - physical.position();
        let local = physical.orientation().inverse() * offset;
        let yaw = local.x.atan2(local.y);
        let pitch = local.z.atan2(local.x.hypot(local.y));

        if powered {
            if yaw > 0.0 {
                intents.push(Intent::YawRight(Some(yaw * AI_TURN_GAIN)));
            } else if yaw < 0.0 {
                intents.push(Intent::YawLeft(Some(-yaw * AI_TURN_GAIN)));
            }
            if pitch > 0.0 {
                intents.push(Intent::PitchUp(Some(pitch * AI_TURN_GAIN)));
            } else if pitch < 0.0 {
                intents.push(Intent::PitchDown(Some(-pitch * AI_TURN_GAIN)));
            }
        }

        let distance = offset.norm();
        if distance > 0.0 && distance <= self.firing_range {
            let off_axis = (local.y / distance).clamp(-1.0, 1.0).acos();
            if off_axis <= self.firing_cone {
                intents.push(Intent::Fire);
            }
        }
        intents
    }
}

#[derive(Debug, Clone)]
pub enum Controller {
    Player(PlayerInput),
    Ai(AiController),
}

impl Controller {
    /// This tick's intents for `me`. `fleet` is every spacecraft of the
    /// level, `me` included.
    pub fn intents(&mut self, me: &Spacecraft, fleet: &[Spacecraft]) -> Vec<Intent> {
        match self {
            Controller::Player(input) => input.intents(),
            Controller::Ai(ai) => ai.intents(me, fleet),
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerInput> {
        match self {
            Controller::Player(input) => Some(input),
            Controller::Ai(_) => None,
        }
    }

    pub fn as_ai_mut(&mut self) -> Option<&mut AiController> {
        match self {
            Controller::Ai(ai) => Some(ai),
            Controller::Player(_) => None,
        }
    }
}
