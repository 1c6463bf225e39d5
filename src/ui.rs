//! The basic UI.
//!
//! At this level, we display some information about the player's spacecraft
//! and keep the main camera behind it. The overlay has its own 2d camera.

use std::fmt::Write;

use bevy::{camera::visibility::RenderLayers, color::palettes::css::GOLD, prelude::*};
use sim_core::{FlightMode, TIME_UNIT_MS, ThrusterChannel, attitude::TurnRates};

use crate::{
    level::{Sim, ThrusterBurns},
    ship::PlayerShip,
};

pub const UI_LAYER: RenderLayers = RenderLayers::layer(8);

#[derive(Component)]
pub struct InfoText;

#[derive(Component)]
pub struct MainCameraMarker;

#[derive(Default)]
pub struct UIPlugin;

impl Plugin for UIPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_ui);
        app.add_systems(Update, (update_ui, follow_player));
    }
}

fn setup_ui(mut commands: Commands) {
    // 2D camera for UI.
    commands.spawn((
        Camera2d,
        Camera {
            order: 8,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        UI_LAYER,
        Name::new("UI Camera"),
    ));

    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(GOLD.into()),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(5.0),
            left: Val::Px(5.0),
            ..default()
        },
        UI_LAYER,
        Name::new("Info Text"),
        InfoText,
    ));

    commands.spawn((
        Camera3d::default(),
        Camera {
            order: 0,
            ..default()
        },
        Name::new("Main 3D Camera"),
        Transform::from_xyz(0.0, 10.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_3,
            near: 0.5,
            far: 100_000.0,
            ..default()
        }),
        MainCameraMarker,
    ));

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 10_000.0,
            ..default()
        },
        Transform::default().looking_to(Vec3::new(0.3, -1.0, -0.5).normalize(), Vec3::Y),
        Name::new("Main Light"),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        ..default()
    });
}

fn update_ui(
    mut text: Query<&mut Text, With<InfoText>>,
    time: Res<Time<Virtual>>,
    sim: Res<Sim>,
    burns: Query<&ThrusterBurns, With<PlayerShip>>,
) {
    let Ok(mut text) = text.single_mut() else {
        return;
    };

    let level = &sim.level;
    let mut message = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(message, "Time: {:.3} s", time.elapsed_secs_f64());
    let _ = writeln!(
        message,
        "Spacecraft: {}  projectiles: {}",
        level.fleet().len(),
        level.projectiles().len()
    );

    let Some(ship) = level.player().and_then(|id| level.spacecraft(id)) else {
        let _ = writeln!(message, "Destroyed.");
        **text = message;
        return;
    };

    let physical = ship.physical();
    let maneuvering = ship.maneuvering();
    let rates = TurnRates::from_turning_matrix(&physical.turning_matrix(), TIME_UNIT_MS / 1000.0);
    let velocity = physical.relative_velocity();

    let mode = match maneuvering.mode() {
        FlightMode::Free => "free",
        FlightMode::Compensated => "compensated",
    };
    let _ = writeln!(message, "Mode: {mode} (R toggles, X stops)");
    let _ = writeln!(
        message,
        "Speed: {:.2} m/s (target {}), strafe {:.2}, lift {:.2}",
        velocity.y,
        speed_target(maneuvering.speed_target()),
        velocity.x,
        velocity.z
    );
    let _ = writeln!(
        message,
        "Turn: yaw {:.3} pitch {:.3} roll {:.3} rad/s (limit {:.3})",
        rates.yaw,
        rates.pitch,
        rates.roll,
        maneuvering.turning_limit()
    );
    let _ = writeln!(
        message,
        "Hull: {} hits",
        sim.damage.get(&ship.id()).copied().unwrap_or(0)
    );

    if let Ok(burns) = burns.single() {
        let active: Vec<_> = ThrusterChannel::ALL
            .into_iter()
            .filter(|c| burns.0[c.index()] > 0.0)
            .map(|c| format!("{} {:.2}", c.name(), burns.0[c.index()]))
            .collect();
        let _ = writeln!(message, "Thrusters: {}", active.join(", "));
    }

    **text = message;
}

fn speed_target(target: f64) -> String {
    if target >= f64::MAX {
        "full".to_string()
    } else if target <= -f64::MAX {
        "full reverse".to_string()
    } else {
        format!("{target:.2}")
    }
}

/// Keep the main camera behind and a little above the player.
fn follow_player(
    ship: Query<&Transform, (With<PlayerShip>, Without<MainCameraMarker>)>,
    mut camera: Query<&mut Transform, With<MainCameraMarker>>,
) {
    let (Ok(ship), Ok(mut camera)) = (ship.single(), camera.single_mut()) else {
        return;
    };
    let back = ship.rotation * sim_to_bevy(&na::Vector3::new(0.0, -30.0, 8.0));
    let up = ship.rotation * Vec3::Y;
    camera.translation = ship.translation + back;
    camera.look_at(ship.translation, up);
}

/// Convert a sim vector (Z-up) to a bevy one (Y-up).
pub fn sim_to_bevy(v: &na::Vector3<f64>) -> Vec3 {
    Vec3::new(v.x as f32, v.z as f32, -v.y as f32)
}

/// Convert a sim rotation (f64) to a bevy quaternion (f32). This includes
/// the basis change between the Z-up sim and the Y-up bevy.
pub fn sim_rot_to_bevy(r: &na::Rotation3<f64>) -> Quat {
    let q = na::UnitQuaternion::from_rotation_matrix(r);
    let basis =
        na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), -std::f64::consts::FRAC_PI_2);
    let q = basis * q * basis.conjugate();
    Quat::from_array([q.i as f32, q.j as f32, q.k as f32, q.w as f32])
}
