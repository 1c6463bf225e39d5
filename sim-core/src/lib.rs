//! Flight and combat simulation core for spacecraft.
//!
//! Everything in here is driven by an explicit `dt` in milliseconds; the core
//! never reads a clock. The body frame is right handed and Z-up, with +Y as
//! the forward axis and +X pointing to the right.

// Recommended alias.
extern crate nalgebra as na;

pub mod attitude;
pub mod classes;
pub mod control;
pub mod error;
pub mod level;
pub mod maneuvering;
pub mod physical;
pub mod projectile;
pub mod propulsion;
pub mod spacecraft;
pub mod visual;
pub mod weapon;

pub use classes::ClassRegistry;
pub use control::{AiController, Command, Controller, Intent, PlayerInput};
pub use error::ConfigError;
pub use level::{HitEvent, Level, LevelDescriptor, Pilot, Placement, TickReport};
pub use maneuvering::{FlightMode, ManeuveringComputer};
pub use physical::{HitBox, PhysicalObject, TimedImpulse};
pub use projectile::{Projectile, ProjectileId, ProjectileList};
pub use propulsion::{Propulsion, ThrusterChannel};
pub use spacecraft::{Spacecraft, SpacecraftId};
pub use visual::{NullSink, VisualEvent, VisualHandle, VisualSink};
pub use weapon::{Barrel, Weapon};

/// Duration of a single thruster pulse or launch impulse, in milliseconds.
///
/// Propulsion renews its forces for this long, and the maneuvering computer
/// sizes its burn levels so that one pulse closes the measured velocity gap.
pub const TIME_UNIT_MS: f64 = 50.0;

/// Burn levels at or below this are treated as float noise.
pub const MIN_BURN: f64 = 0.0001;

/// The most a single axis of the maneuvering computer may ask of a channel.
pub const MAX_AXIS_BURN: f64 = 0.5;

/// Dead zone for angular velocity control, rad/s.
pub const ANGULAR_VELOCITY_THRESHOLD: f64 = 0.0005;

/// Dead zone for linear velocity control, m/s.
pub const SPEED_THRESHOLD: f64 = 0.01;

/// Turning limit is angular thrust / mass scaled by this many seconds.
pub const TURNING_LIMIT_FACTOR: f64 = 0.2;

/// Default change of the speed target per `forward`/`reverse` call in
/// compensated mode, m/s.
pub const SPEED_INCREMENT: f64 = 1.0;

/// Milliseconds to seconds.
#[inline]
pub(crate) fn ms_to_s(ms: f64) -> f64 {
    ms / 1000.0
}
