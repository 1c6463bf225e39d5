//! A small space dogfight.
//!
//! The simulation lives in `sim-core` and runs on the fixed schedule; this
//! binary loads the class and level files, maps the keyboard onto the
//! player's spacecraft and draws whatever the simulation reports.
//!
//! Notably, the simulation is Z-up right handed while Bevy is Y-up.

// Recommended alias.
extern crate nalgebra as na;

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use bevy::prelude::*;
use sim_core::{ClassRegistry, Level, LevelDescriptor};

mod config;
mod level;
mod ship;
mod ui;

use config::GameConfig;

const CONFIG_PATH: &str = "assets/config.json";

fn main() -> Result<()> {
    let config = GameConfig::load(Path::new(CONFIG_PATH))?;

    let classes = fs::read_to_string(&config.classes)
        .with_context(|| format!("reading classes {}", config.classes.display()))?;
    let registry = ClassRegistry::from_json(&classes)
        .with_context(|| format!("loading classes {}", config.classes.display()))?;

    let descriptor = fs::read_to_string(&config.level)
        .with_context(|| format!("reading level {}", config.level.display()))?;
    let descriptor = LevelDescriptor::from_json(&descriptor)
        .with_context(|| format!("parsing level {}", config.level.display()))?;
    let level = Level::load(Arc::new(registry), &descriptor, Vec::new())
        .with_context(|| format!("building level {}", config.level.display()))?;

    let exit = App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(Time::<Fixed>::from_hz(config.tick_hz))
        .insert_resource(level::Sim::new(level))
        .insert_resource(config)
        .add_plugins((level::LevelPlugin, ship::ShipPlugin, ui::UIPlugin))
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("exited with code {code}"),
    }
}
