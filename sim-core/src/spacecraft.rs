//! Spacecraft: a body with optional thrusters, weapons and a maneuvering
//! computer.

use std::{fmt, sync::Arc};

use log::debug;
use na::{Rotation3, Vector3};

use crate::{
    classes::{Loadout, SpacecraftClass},
    control::Intent,
    error::ConfigError,
    maneuvering::ManeuveringComputer,
    physical::PhysicalObject,
    projectile::ProjectileList,
    propulsion::Propulsion,
    weapon::Weapon,
};

/// Stable handle of a spacecraft within a level. Projectiles remember the
/// id of the spacecraft that fired them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpacecraftId(u32);

impl SpacecraftId {
    pub const fn new(raw: u32) -> Self {
        SpacecraftId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpacecraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spacecraft#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Spacecraft {
    id: SpacecraftId,
    class: Arc<SpacecraftClass>,
    physical: PhysicalObject,
    propulsion: Option<Propulsion>,
    weapons: Vec<Weapon>,
    maneuvering: ManeuveringComputer,
    fire_requested: bool,
    to_be_deleted: bool,
}

impl Spacecraft {
    /// Build a spacecraft of `class` equipped with the named loadout.
    pub fn new(
        id: SpacecraftId,
        class: Arc<SpacecraftClass>,
        loadout: &str,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
    ) -> Result<Self, ConfigError> {
        let loadout = class.loadout(loadout)?.clone();
        Self::equipped(id, class, &loadout, position, orientation)
    }

    /// Build a spacecraft with an explicit equipment profile.
    pub fn equipped(
        id: SpacecraftId,
        class: Arc<SpacecraftClass>,
        loadout: &Loadout,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
    ) -> Result<Self, ConfigError> {
        let physical = PhysicalObject::new(
            class.mass,
            position,
            orientation,
            class.scale,
            class.bodies.clone(),
        )?;

        let mut weapons = Vec::with_capacity(loadout.weapons.len());
        for (slot, weapon) in &loadout.weapons {
            let mount = class
                .weapon_slots
                .get(*slot)
                .ok_or_else(|| ConfigError::MissingSlot {
                    class: class.name.clone(),
                    loadout: loadout.name.clone(),
                    slot: *slot,
                    slots: class.weapon_slots.len(),
                })?;
            weapons.push(Weapon::new(weapon.clone(), mount.clone()));
        }

        let maneuvering = ManeuveringComputer::new(class.mass, loadout.propulsion.as_deref());
        let propulsion = loadout.propulsion.clone().map(Propulsion::new);

        debug!(
            "{id}: {} with loadout {} ({} weapons, {})",
            class.name,
            loadout.name,
            weapons.len(),
            if propulsion.is_some() { "powered" } else { "unpowered" }
        );

        Ok(Spacecraft {
            id,
            class,
            physical,
            propulsion,
            weapons,
            maneuvering,
            fire_requested: false,
            to_be_deleted: false,
        })
    }

    pub fn id(&self) -> SpacecraftId {
        self.id
    }

    pub fn class(&self) -> &SpacecraftClass {
        &self.class
    }

    pub fn physical(&self) -> &PhysicalObject {
        &self.physical
    }

    pub fn physical_mut(&mut self) -> &mut PhysicalObject {
        &mut self.physical
    }

    pub fn propulsion(&self) -> Option<&Propulsion> {
        self.propulsion.as_ref()
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn maneuvering(&self) -> &ManeuveringComputer {
        &self.maneuvering
    }

    pub fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }

    /// Flag the spacecraft for removal at the start of the next tick.
    pub fn destroy(&mut self) {
        self.to_be_deleted = true;
    }

    /// Forward speed in m/s.
    pub fn speed(&self) -> f64 {
        self.physical.relative_velocity().y
    }

    /// Record a piloting intent for this tick.
    ///
    /// Maneuvers are ignored on spacecraft without propulsion; there is
    /// nothing for the maneuvering computer to drive.
    pub fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::Fire => self.fire_requested = true,
            _ if self.propulsion.is_none() => {
                debug!("{} has no propulsion, ignoring {intent:?}", self.id);
            }
            _ => self.maneuvering.apply(intent, &self.physical),
        }
    }

    /// Advance by `dt` ms: steer, push, move, then fire any weapons that were
    /// triggered. Returns the number of projectiles launched into
    /// `projectiles`.
    pub fn simulate(&mut self, dt: f64, now: f64, projectiles: &mut ProjectileList) -> usize {
        if let Some(propulsion) = &mut self.propulsion {
            self.maneuvering.control_thrusters(&self.physical, propulsion);
            propulsion.simulate(&mut self.physical);
        }

        self.physical.simulate(dt);

        if !std::mem::take(&mut self.fire_requested) {
            return 0;
        }
        self.weapons
            .iter_mut()
            .map(|weapon| weapon.fire(now, &self.physical, self.id, projectiles))
            .sum()
    }
}
