//! Rigid body model shared by spacecraft and projectiles.
//!
//! Motion is driven by timed forces and torques: each entry pushes on the
//! body for a limited number of milliseconds and then expires. Entries are
//! keyed by name so a thruster that fires every tick keeps renewing one
//! entry instead of stacking new ones.
//!
//! Angular dynamics divide torque by the scalar mass in place of a moment of
//! inertia tensor. The thrust figures in the class data are tuned against
//! exactly this model.

use std::{borrow::Cow, sync::Arc};

use na::{Rotation3, Unit, Vector3};

use crate::{TIME_UNIT_MS, attitude, error::ConfigError, ms_to_s};

/// A force or torque that acts for a limited time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedImpulse {
    name: Cow<'static, str>,
    magnitude: f64,
    direction: Unit<Vector3<f64>>,
    /// Remaining duration, ms.
    remaining: f64,
}

impl TimedImpulse {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        magnitude: f64,
        direction: Unit<Vector3<f64>>,
        duration: f64,
    ) -> Self {
        TimedImpulse {
            name: name.into(),
            magnitude,
            direction,
            remaining: duration,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn direction(&self) -> &Unit<Vector3<f64>> {
        &self.direction
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// The force (or torque) as a vector, N (or N·m).
    pub fn vector(&self) -> Vector3<f64> {
        self.direction.into_inner() * self.magnitude
    }

    /// Consume up to `dt` ms of the remaining duration, returning how many
    /// milliseconds this entry actually acted for.
    fn exert(&mut self, dt: f64) -> f64 {
        let acted = self.remaining.min(dt).max(0.0);
        self.remaining -= dt;
        acted
    }

    fn renew(&mut self, magnitude: f64, direction: Unit<Vector3<f64>>, duration: f64) {
        self.magnitude = magnitude;
        self.direction = direction;
        self.remaining = duration;
    }
}

/// An oriented box in the body frame of its object, before scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct HitBox {
    pub center: Vector3<f64>,
    pub half_extents: Vector3<f64>,
    pub orientation: Rotation3<f64>,
}

impl HitBox {
    /// An axis aligned box of the given full size.
    pub fn new(center: Vector3<f64>, size: Vector3<f64>) -> Self {
        HitBox {
            center,
            half_extents: size * 0.5,
            orientation: Rotation3::identity(),
        }
    }

    pub fn with_orientation(mut self, orientation: Rotation3<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Whether a body-frame point lies inside the box grown by `margin`.
    pub fn contains(&self, local: &Vector3<f64>, margin: f64) -> bool {
        let p = self.orientation.inverse_transform_vector(&(local - self.center));
        p.x.abs() <= self.half_extents.x + margin
            && p.y.abs() <= self.half_extents.y + margin
            && p.z.abs() <= self.half_extents.z + margin
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalObject {
    /// kg
    mass: f64,
    /// World position, m.
    position: Vector3<f64>,
    /// BODY -> WORLD.
    orientation: Rotation3<f64>,
    /// Uniform scale of the hit boxes.
    scale: f64,
    /// World frame, m/s.
    velocity: Vector3<f64>,
    /// World frame, rad/s.
    angular_velocity: Vector3<f64>,
    forces: Vec<TimedImpulse>,
    torques: Vec<TimedImpulse>,
    bodies: Arc<[HitBox]>,
}

impl PhysicalObject {
    /// Construct a body at rest.
    ///
    /// Mass and scale must be finite and positive; a zero mass would turn the
    /// first force into NaN and poison the state from there on.
    pub fn new(
        mass: f64,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
        scale: f64,
        bodies: Arc<[HitBox]>,
    ) -> Result<Self, ConfigError> {
        crate::error::require_positive("physical object", "mass", mass)?;
        crate::error::require_positive("physical object", "scale", scale)?;
        if position.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid(
                "physical object",
                "position",
                "must be finite",
            ));
        }
        Ok(PhysicalObject {
            mass,
            position,
            orientation,
            scale,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            forces: Vec::new(),
            torques: Vec::new(),
            bodies,
        })
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn orientation(&self) -> &Rotation3<f64> {
        &self.orientation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn velocity(&self) -> &Vector3<f64> {
        &self.velocity
    }

    pub fn angular_velocity(&self) -> &Vector3<f64> {
        &self.angular_velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    pub fn forces(&self) -> &[TimedImpulse] {
        &self.forces
    }

    pub fn torques(&self) -> &[TimedImpulse] {
        &self.torques
    }

    pub fn bodies(&self) -> &[HitBox] {
        &self.bodies
    }

    /// A body axis expressed in the world frame.
    pub fn axis(&self, local: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
        self.orientation * *local
    }

    pub fn forward_axis(&self) -> Unit<Vector3<f64>> {
        self.axis(&Vector3::y_axis())
    }

    /// Velocity in the body frame: x strafe, y forward, z lift.
    pub fn relative_velocity(&self) -> Vector3<f64> {
        self.orientation.inverse_transform_vector(&self.velocity)
    }

    /// Angular velocity in the body frame.
    pub fn relative_angular_velocity(&self) -> Vector3<f64> {
        self.orientation
            .inverse_transform_vector(&self.angular_velocity)
    }

    /// Body-frame rotation performed over one time unit at the current
    /// angular velocity.
    pub fn turning_matrix(&self) -> Rotation3<f64> {
        attitude::turning_matrix(
            &self.orientation,
            &self.angular_velocity,
            ms_to_s(TIME_UNIT_MS),
        )
    }

    /// Add a force, or replace the force of the same name and restart its
    /// countdown.
    pub fn add_or_renew_force(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        magnitude: f64,
        direction: Unit<Vector3<f64>>,
        duration: f64,
    ) {
        add_or_renew(&mut self.forces, name.into(), magnitude, direction, duration);
    }

    /// Same as [`Self::add_or_renew_force`], for torques.
    pub fn add_or_renew_torque(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        magnitude: f64,
        direction: Unit<Vector3<f64>>,
        duration: f64,
    ) {
        add_or_renew(&mut self.torques, name.into(), magnitude, direction, duration);
    }

    /// Advance the body by `dt` ms.
    ///
    /// Forces change the velocity for the part of `dt` they are still active,
    /// then the position and orientation move with the updated velocities.
    pub fn simulate(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }

        for force in &mut self.forces {
            let acted = force.exert(dt);
            self.velocity += force.vector() * (ms_to_s(acted) / self.mass);
        }
        self.forces.retain(|f| f.remaining > 0.0);

        for torque in &mut self.torques {
            let acted = torque.exert(dt);
            self.angular_velocity += torque.vector() * (ms_to_s(acted) / self.mass);
        }
        self.torques.retain(|t| t.remaining > 0.0);

        let dt_s = ms_to_s(dt);
        self.position += self.velocity * dt_s;
        self.orientation = attitude::rotate(&self.orientation, &self.angular_velocity, dt_s);
    }

    /// Whether a world-space point lies within any of the hit boxes, grown by
    /// `margin` metres.
    pub fn check_hit(&self, point: &Vector3<f64>, margin: f64) -> bool {
        let local = self
            .orientation
            .inverse_transform_vector(&(point - self.position))
            / self.scale;
        let margin = margin / self.scale;
        self.bodies.iter().any(|b| b.contains(&local, margin))
    }
}

fn add_or_renew(
    list: &mut Vec<TimedImpulse>,
    name: Cow<'static, str>,
    magnitude: f64,
    direction: Unit<Vector3<f64>>,
    duration: f64,
) {
    match list.iter_mut().find(|i| i.name == name) {
        Some(existing) => existing.renew(magnitude, direction, duration),
        None => list.push(TimedImpulse::new(name, magnitude, direction, duration)),
    }
}
