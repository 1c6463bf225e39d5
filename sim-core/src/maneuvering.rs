//! The maneuvering computer turns piloting intent into thruster burn.
//!
//! Drivers set targets (turn rates, speed, strafe and lift speed) any number
//! of times during a tick, then [`ManeuveringComputer::control_thrusters`]
//! runs once. It measures the current motion and, for every axis, commands
//! the burn that would close the gap within one time unit, capped at
//! [`MAX_AXIS_BURN`]. There is no integrator state: every tick estimates the
//! needed burn from scratch.
//!
//! Turn targets only last for the tick they were set in. Speed targets are
//! held until changed.

use log::trace;

use crate::{
    ANGULAR_VELOCITY_THRESHOLD, MAX_AXIS_BURN, SPEED_INCREMENT, SPEED_THRESHOLD, TIME_UNIT_MS,
    TURNING_LIMIT_FACTOR,
    attitude::TurnRates,
    classes::PropulsionClass,
    control::Intent,
    ms_to_s,
    physical::PhysicalObject,
    propulsion::{Propulsion, ThrusterChannel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightMode {
    /// Drift freely; only the forward speed is steered.
    #[default]
    Free,
    /// Actively hold the forward, strafe and lift speed targets.
    Compensated,
}

/// Burn level that changes the speed by `dv` m/s within one time unit.
pub fn required_burn_for_speed_change(dv: f64, mass: f64, thrust: f64) -> f64 {
    dv * mass / thrust / 2.0 / ms_to_s(TIME_UNIT_MS)
}

/// Burn level that changes the turn rate by `dw` rad/s within one time unit.
pub fn required_burn_for_angular_velocity_change(dw: f64, mass: f64, angular_thrust: f64) -> f64 {
    dw * mass / angular_thrust / 2.0 / ms_to_s(TIME_UNIT_MS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManeuveringComputer {
    mode: FlightMode,
    /// rad/s, positive to the right.
    yaw_target: f64,
    /// rad/s, positive up.
    pitch_target: f64,
    /// rad/s, positive to the right.
    roll_target: f64,
    /// m/s along the body Y axis.
    speed_target: f64,
    /// m/s along the body X axis.
    strafe_target: f64,
    /// m/s along the body Z axis.
    lift_target: f64,
    /// rad/s
    turning_limit: f64,
}

impl ManeuveringComputer {
    /// A computer for a spacecraft of `mass` kg. Without propulsion the
    /// turning limit is zero and nothing may be controlled.
    pub fn new(mass: f64, propulsion: Option<&PropulsionClass>) -> Self {
        let turning_limit = propulsion
            .map(|p| p.angular_thrust / mass * TURNING_LIMIT_FACTOR)
            .unwrap_or(0.0);
        ManeuveringComputer {
            mode: FlightMode::default(),
            yaw_target: 0.0,
            pitch_target: 0.0,
            roll_target: 0.0,
            speed_target: 0.0,
            strafe_target: 0.0,
            lift_target: 0.0,
            turning_limit,
        }
    }

    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    pub fn turning_limit(&self) -> f64 {
        self.turning_limit
    }

    pub fn yaw_target(&self) -> f64 {
        self.yaw_target
    }

    pub fn pitch_target(&self) -> f64 {
        self.pitch_target
    }

    pub fn roll_target(&self) -> f64 {
        self.roll_target
    }

    pub fn speed_target(&self) -> f64 {
        self.speed_target
    }

    pub fn strafe_target(&self) -> f64 {
        self.strafe_target
    }

    pub fn lift_target(&self) -> f64 {
        self.lift_target
    }

    /// Switch flight mode. Entering compensated mode holds the current
    /// forward speed.
    pub fn set_mode(&mut self, mode: FlightMode, physical: &PhysicalObject) {
        if mode == FlightMode::Compensated && self.mode != FlightMode::Compensated {
            self.speed_target = physical.relative_velocity().y;
        }
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self, physical: &PhysicalObject) {
        let next = match self.mode {
            FlightMode::Free => FlightMode::Compensated,
            FlightMode::Compensated => FlightMode::Free,
        };
        self.set_mode(next, physical);
    }

    pub fn yaw_left(&mut self, intensity: Option<f64>) {
        turn(&mut self.yaw_target, -1.0, intensity, self.turning_limit);
    }

    pub fn yaw_right(&mut self, intensity: Option<f64>) {
        turn(&mut self.yaw_target, 1.0, intensity, self.turning_limit);
    }

    pub fn pitch_up(&mut self, intensity: Option<f64>) {
        turn(&mut self.pitch_target, 1.0, intensity, self.turning_limit);
    }

    pub fn pitch_down(&mut self, intensity: Option<f64>) {
        turn(&mut self.pitch_target, -1.0, intensity, self.turning_limit);
    }

    pub fn roll_left(&mut self, intensity: Option<f64>) {
        turn(&mut self.roll_target, -1.0, intensity, self.turning_limit);
    }

    pub fn roll_right(&mut self, intensity: Option<f64>) {
        turn(&mut self.roll_target, 1.0, intensity, self.turning_limit);
    }

    /// Compensated: raise the held speed by `intensity` (or
    /// [`SPEED_INCREMENT`]). Free: accelerate as hard as possible.
    pub fn forward(&mut self, intensity: Option<f64>) {
        match self.mode {
            FlightMode::Compensated => {
                self.speed_target += intensity.unwrap_or(SPEED_INCREMENT);
            }
            FlightMode::Free => self.speed_target = f64::MAX,
        }
    }

    pub fn reverse(&mut self, intensity: Option<f64>) {
        match self.mode {
            FlightMode::Compensated => {
                self.speed_target -= intensity.unwrap_or(SPEED_INCREMENT);
            }
            FlightMode::Free => self.speed_target = -f64::MAX,
        }
    }

    /// Free mode only: stop asking for more forward speed than the current.
    pub fn stop_forward(&mut self, physical: &PhysicalObject) {
        if self.mode == FlightMode::Free {
            let speed = physical.relative_velocity().y;
            if self.speed_target > speed {
                self.speed_target = speed;
            }
        }
    }

    /// Free mode only: stop asking for more reverse speed than the current.
    pub fn stop_reverse(&mut self, physical: &PhysicalObject) {
        if self.mode == FlightMode::Free {
            let speed = physical.relative_velocity().y;
            if self.speed_target < speed {
                self.speed_target = speed;
            }
        }
    }

    pub fn slide_left(&mut self, intensity: Option<f64>) {
        slide(&mut self.strafe_target, -1.0, intensity);
    }

    pub fn slide_right(&mut self, intensity: Option<f64>) {
        slide(&mut self.strafe_target, 1.0, intensity);
    }

    pub fn slide_up(&mut self, intensity: Option<f64>) {
        slide(&mut self.lift_target, 1.0, intensity);
    }

    pub fn slide_down(&mut self, intensity: Option<f64>) {
        slide(&mut self.lift_target, -1.0, intensity);
    }

    pub fn stop_left_slide(&mut self) {
        stop_slide(&mut self.strafe_target, -1.0);
    }

    pub fn stop_right_slide(&mut self) {
        stop_slide(&mut self.strafe_target, 1.0);
    }

    pub fn stop_up_slide(&mut self) {
        stop_slide(&mut self.lift_target, 1.0);
    }

    pub fn stop_down_slide(&mut self) {
        stop_slide(&mut self.lift_target, -1.0);
    }

    /// Compensated mode only: come to a full stop.
    pub fn reset_speed(&mut self) {
        if self.mode == FlightMode::Compensated {
            self.speed_target = 0.0;
        }
    }

    /// Dispatch a piloting intent. [`Intent::Fire`] is not a maneuver and is
    /// ignored here.
    pub fn apply(&mut self, intent: Intent, physical: &PhysicalObject) {
        match intent {
            Intent::YawLeft(i) => self.yaw_left(i),
            Intent::YawRight(i) => self.yaw_right(i),
            Intent::PitchUp(i) => self.pitch_up(i),
            Intent::PitchDown(i) => self.pitch_down(i),
            Intent::RollLeft(i) => self.roll_left(i),
            Intent::RollRight(i) => self.roll_right(i),
            Intent::Forward(i) => self.forward(i),
            Intent::Reverse(i) => self.reverse(i),
            Intent::StopForward => self.stop_forward(physical),
            Intent::StopReverse => self.stop_reverse(physical),
            Intent::ResetSpeed => self.reset_speed(),
            Intent::SlideLeft(i) => self.slide_left(i),
            Intent::SlideRight(i) => self.slide_right(i),
            Intent::SlideUp(i) => self.slide_up(i),
            Intent::SlideDown(i) => self.slide_down(i),
            Intent::StopLeftSlide => self.stop_left_slide(),
            Intent::StopRightSlide => self.stop_right_slide(),
            Intent::StopUpSlide => self.stop_up_slide(),
            Intent::StopDownSlide => self.stop_down_slide(),
            Intent::SetMode(mode) => self.set_mode(mode, physical),
            Intent::ToggleMode => self.toggle_mode(physical),
            Intent::Fire => {}
        }
    }

    /// Recompute every thruster channel of `propulsion` for this tick, then
    /// drop the turn targets.
    pub fn control_thrusters(&mut self, physical: &PhysicalObject, propulsion: &mut Propulsion) {
        propulsion.reset_thruster_burn();

        let mass = physical.mass();
        let per_rad = required_burn_for_angular_velocity_change(1.0, mass, propulsion.angular_thrust());
        let per_ms = required_burn_for_speed_change(1.0, mass, propulsion.thrust());

        let rates =
            TurnRates::from_turning_matrix(&physical.turning_matrix(), ms_to_s(TIME_UNIT_MS));
        let angular = [
            (self.yaw_target - rates.yaw, ThrusterChannel::YawRight, ThrusterChannel::YawLeft),
            (self.pitch_target - rates.pitch, ThrusterChannel::PitchUp, ThrusterChannel::PitchDown),
            (self.roll_target - rates.roll, ThrusterChannel::RollRight, ThrusterChannel::RollLeft),
        ];
        for (gap, positive, negative) in angular {
            command(propulsion, gap, ANGULAR_VELOCITY_THRESHOLD, per_rad, positive, negative);
        }

        let velocity = physical.relative_velocity();
        command(
            propulsion,
            self.speed_target - velocity.y,
            SPEED_THRESHOLD,
            per_ms,
            ThrusterChannel::Forward,
            ThrusterChannel::Reverse,
        );
        let compensated = self.mode == FlightMode::Compensated;
        if compensated || self.strafe_target != 0.0 {
            command(
                propulsion,
                self.strafe_target - velocity.x,
                SPEED_THRESHOLD,
                per_ms,
                ThrusterChannel::StrafeRight,
                ThrusterChannel::StrafeLeft,
            );
        }
        if compensated || self.lift_target != 0.0 {
            command(
                propulsion,
                self.lift_target - velocity.z,
                SPEED_THRESHOLD,
                per_ms,
                ThrusterChannel::Raise,
                ThrusterChannel::Lower,
            );
        }

        trace!(
            "turn {:.4}/{:.4}/{:.4} -> {:.4}/{:.4}/{:.4}, speed {:.3} -> {:.3}",
            rates.yaw,
            rates.pitch,
            rates.roll,
            self.yaw_target,
            self.pitch_target,
            self.roll_target,
            velocity.y,
            self.speed_target
        );

        self.yaw_target = 0.0;
        self.pitch_target = 0.0;
        self.roll_target = 0.0;
    }
}

/// Set a turn target. With no intensity, turn at the limit, unless a turn
/// the other way is pending, which cancels both. An intensity of zero or
/// less releases a pending turn in this direction.
fn turn(target: &mut f64, direction: f64, intensity: Option<f64>, limit: f64) {
    match intensity {
        None if *target * direction < 0.0 => *target = 0.0,
        None => *target = direction * limit,
        Some(i) if i > 0.0 => *target = direction * i.min(limit),
        Some(_) => {
            if *target * direction > 0.0 {
                *target = 0.0;
            }
        }
    }
}

fn slide(target: &mut f64, direction: f64, intensity: Option<f64>) {
    match intensity {
        None => *target = direction * f64::MAX,
        Some(i) if i > 0.0 => *target = direction * i,
        Some(_) => stop_slide(target, direction),
    }
}

fn stop_slide(target: &mut f64, direction: f64) {
    if *target * direction > 0.0 {
        *target = 0.0;
    }
}

/// Fire `positive` or `negative` to close `gap`, ignoring gaps within the
/// dead zone.
fn command(
    propulsion: &mut Propulsion,
    gap: f64,
    threshold: f64,
    burn_per_unit: f64,
    positive: ThrusterChannel,
    negative: ThrusterChannel,
) {
    if gap > threshold {
        propulsion.add_thruster_burn(positive, MAX_AXIS_BURN.min(gap * burn_per_unit));
    } else if gap < -threshold {
        propulsion.add_thruster_burn(negative, MAX_AXIS_BURN.min(-gap * burn_per_unit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::HitBox;
    use na::{Rotation3, Vector3};
    use std::sync::Arc;

    fn class() -> PropulsionClass {
        PropulsionClass {
            name: "test".into(),
            thrust: 20000.0,
            angular_thrust: 5000.0,
        }
    }

    fn setup() -> (ManeuveringComputer, PhysicalObject, Propulsion) {
        let class = class();
        let physical = PhysicalObject::new(
            1000.0,
            Vector3::zeros(),
            Rotation3::identity(),
            1.0,
            Arc::from(Vec::<HitBox>::new()),
        )
        .unwrap();
        let computer = ManeuveringComputer::new(1000.0, Some(&class));
        (computer, physical, Propulsion::new(Arc::new(class)))
    }

    #[test]
    fn turning_limit_scales_with_thrust_over_mass() {
        let (computer, _, _) = setup();
        assert!((computer.turning_limit() - 5.0 * TURNING_LIMIT_FACTOR).abs() < 1e-12);
        assert_eq!(ManeuveringComputer::new(10.0, None).turning_limit(), 0.0);
    }

    #[test]
    fn turn_targets_respect_limit_and_cancel() {
        let (mut c, _, _) = setup();
        let limit = c.turning_limit();

        c.yaw_right(None);
        assert_eq!(c.yaw_target(), limit);
        c.yaw_left(None);
        assert_eq!(c.yaw_target(), 0.0);

        c.pitch_up(Some(limit * 10.0));
        assert_eq!(c.pitch_target(), limit);
        c.pitch_up(Some(limit / 4.0));
        assert_eq!(c.pitch_target(), limit / 4.0);
        // Releasing the other direction leaves the pending turn alone.
        c.pitch_down(Some(0.0));
        assert_eq!(c.pitch_target(), limit / 4.0);
        c.pitch_up(Some(0.0));
        assert_eq!(c.pitch_target(), 0.0);

        c.roll_left(None);
        assert_eq!(c.roll_target(), -limit);
    }

    #[test]
    fn turn_targets_last_one_tick_speed_targets_persist() {
        let (mut c, physical, mut propulsion) = setup();
        c.set_mode(FlightMode::Compensated, &physical);
        c.yaw_left(None);
        c.forward(Some(30.0));
        c.slide_right(Some(2.0));
        c.control_thrusters(&physical, &mut propulsion);

        assert_eq!(c.yaw_target(), 0.0);
        assert_eq!(c.speed_target(), 30.0);
        assert_eq!(c.strafe_target(), 2.0);
        assert!(propulsion.burn(ThrusterChannel::YawLeft) > 0.0);
        assert!(propulsion.burn(ThrusterChannel::Forward) > 0.0);
        assert!(propulsion.burn(ThrusterChannel::StrafeRight) > 0.0);
    }

    #[test]
    fn required_burn_closes_gap_in_one_time_unit() {
        let burn = required_burn_for_speed_change(2.0, 1000.0, 20000.0);
        // Force is 2 * thrust * burn, acting for one time unit.
        let dv = 2.0 * 20000.0 * burn / 1000.0 * ms_to_s(TIME_UNIT_MS);
        assert!((dv - 2.0).abs() < 1e-12);

        let burn = required_burn_for_angular_velocity_change(0.1, 1000.0, 5000.0);
        let dw = 2.0 * 5000.0 * burn / 1000.0 * ms_to_s(TIME_UNIT_MS);
        assert!((dw - 0.1).abs() < 1e-12);
    }

    #[test]
    fn burns_are_capped_per_axis() {
        let (mut c, physical, mut propulsion) = setup();
        c.forward(None);
        c.yaw_right(None);
        c.control_thrusters(&physical, &mut propulsion);
        assert_eq!(propulsion.burn(ThrusterChannel::Forward), MAX_AXIS_BURN);
        assert_eq!(propulsion.burn(ThrusterChannel::YawRight), MAX_AXIS_BURN);
        assert_eq!(propulsion.burn(ThrusterChannel::Reverse), 0.0);
    }

    #[test]
    fn dead_zone_commands_nothing() {
        let (mut c, mut physical, mut propulsion) = setup();
        c.set_mode(FlightMode::Compensated, &physical);
        physical.set_velocity(Vector3::new(SPEED_THRESHOLD / 2.0, -SPEED_THRESHOLD / 2.0, 0.0));
        physical.set_angular_velocity(Vector3::new(0.0, 0.0, ANGULAR_VELOCITY_THRESHOLD / 2.0));
        c.control_thrusters(&physical, &mut propulsion);
        assert!(propulsion.burns().all(|(_, b)| b == 0.0));
    }

    #[test]
    fn mode_switch_keeps_current_speed() {
        let (mut c, mut physical, mut propulsion) = setup();
        physical.set_velocity(Vector3::new(0.0, 42.0, 0.0));
        c.set_mode(FlightMode::Compensated, &physical);
        assert_eq!(c.mode(), FlightMode::Compensated);
        assert_eq!(c.speed_target(), 42.0);

        c.control_thrusters(&physical, &mut propulsion);
        assert_eq!(propulsion.burn(ThrusterChannel::Forward), 0.0);
        assert_eq!(propulsion.burn(ThrusterChannel::Reverse), 0.0);

        c.reset_speed();
        assert_eq!(c.speed_target(), 0.0);
        c.control_thrusters(&physical, &mut propulsion);
        assert_eq!(propulsion.burn(ThrusterChannel::Reverse), MAX_AXIS_BURN);
    }

    #[test]
    fn free_mode_throttle_release_holds_speed() {
        let (mut c, mut physical, _) = setup();
        c.forward(None);
        assert_eq!(c.speed_target(), f64::MAX);
        physical.set_velocity(Vector3::new(0.0, 12.0, 0.0));
        c.stop_forward(&physical);
        assert_eq!(c.speed_target(), 12.0);

        c.reverse(None);
        c.stop_reverse(&physical);
        assert_eq!(c.speed_target(), 12.0);

        // Reset only applies when compensated.
        c.reset_speed();
        assert_eq!(c.speed_target(), 12.0);
    }

    #[test]
    fn free_mode_lets_sideways_drift_alone() {
        let (mut c, mut physical, mut propulsion) = setup();
        physical.set_velocity(Vector3::new(5.0, 0.0, -3.0));
        c.control_thrusters(&physical, &mut propulsion);
        assert_eq!(propulsion.burn(ThrusterChannel::StrafeLeft), 0.0);
        assert_eq!(propulsion.burn(ThrusterChannel::Raise), 0.0);

        c.toggle_mode(&physical);
        c.control_thrusters(&physical, &mut propulsion);
        assert!(propulsion.burn(ThrusterChannel::StrafeLeft) > 0.0);
        assert!(propulsion.burn(ThrusterChannel::Raise) > 0.0);

        c.toggle_mode(&physical);
        assert_eq!(c.mode(), FlightMode::Free);
    }

    #[test]
    fn slides_set_and_release() {
        let (mut c, _, _) = setup();
        c.slide_left(Some(3.0));
        assert_eq!(c.strafe_target(), -3.0);
        c.stop_right_slide();
        assert_eq!(c.strafe_target(), -3.0);
        c.stop_left_slide();
        assert_eq!(c.strafe_target(), 0.0);

        c.slide_up(None);
        assert_eq!(c.lift_target(), f64::MAX);
        c.slide_down(Some(1.0));
        assert_eq!(c.lift_target(), -1.0);
        c.stop_down_slide();
        assert_eq!(c.lift_target(), 0.0);
    }
}
