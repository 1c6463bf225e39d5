//! Flying the player's spacecraft.
//!
//! Keys are read every frame and mapped onto the held commands of the
//! player's `PlayerInput`; the simulation picks them up on its next tick.

use bevy::prelude::*;
use sim_core::{Command, Controller, Intent};

use crate::level::Sim;

#[derive(Component)]
pub struct PlayerShip;

/// Plugin to fly the player's ship from the keyboard.
#[derive(Default)]
pub struct ShipPlugin;

impl Plugin for ShipPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, keys_to_commands);
    }
}

const KEYMAP: [(KeyCode, Command); 13] = [
    (KeyCode::KeyW, Command::Forward),
    (KeyCode::KeyS, Command::Reverse),
    (KeyCode::KeyA, Command::SlideLeft),
    (KeyCode::KeyD, Command::SlideRight),
    (KeyCode::KeyF, Command::SlideUp),
    (KeyCode::KeyV, Command::SlideDown),
    (KeyCode::ArrowLeft, Command::YawLeft),
    (KeyCode::ArrowRight, Command::YawRight),
    (KeyCode::ArrowDown, Command::PitchUp),
    (KeyCode::ArrowUp, Command::PitchDown),
    (KeyCode::KeyQ, Command::RollLeft),
    (KeyCode::KeyE, Command::RollRight),
    (KeyCode::Space, Command::Fire),
];

fn keys_to_commands(kb: Res<ButtonInput<KeyCode>>, mut sim: ResMut<Sim>) {
    let Some(player) = sim.level.player() else {
        return;
    };
    let Some(input) = sim
        .level
        .controller_mut(player)
        .and_then(Controller::as_player_mut)
    else {
        return;
    };

    for (key, command) in KEYMAP {
        input.set_held(command, kb.pressed(key));
    }

    if kb.just_pressed(KeyCode::KeyR) {
        input.trigger(Intent::ToggleMode);
    }
    if kb.just_pressed(KeyCode::KeyX) {
        input.trigger(Intent::ResetSpeed);
    }
}

