//! Weapons mounted on spacecraft.

use std::sync::Arc;

use log::{debug, warn};
use na::Vector3;

use crate::{
    TIME_UNIT_MS,
    classes::{ProjectileClass, Slot, WeaponClass},
    physical::PhysicalObject,
    projectile::{Projectile, ProjectileList},
    spacecraft::SpacecraftId,
};

/// One muzzle of a weapon.
#[derive(Debug, Clone)]
pub struct Barrel {
    /// Offset within the weapon, m.
    pub position: Vector3<f64>,
    pub projectile: Arc<ProjectileClass>,
    /// Launch force, N.
    pub force: f64,
}

#[derive(Debug, Clone)]
pub struct Weapon {
    class: Arc<WeaponClass>,
    slot: Slot,
    /// Time of the last shot, ms. `None` until the first one.
    last_fire: Option<f64>,
}

impl Weapon {
    pub fn new(class: Arc<WeaponClass>, slot: Slot) -> Self {
        Weapon {
            class,
            slot,
            last_fire: None,
        }
    }

    pub fn class(&self) -> &WeaponClass {
        &self.class
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// ms
    pub fn cooldown(&self) -> f64 {
        self.class.cooldown
    }

    pub fn last_fire(&self) -> Option<f64> {
        self.last_fire
    }

    pub fn can_fire(&self, now: f64) -> bool {
        match self.last_fire {
            Some(last) => now - last >= self.class.cooldown,
            None => true,
        }
    }

    /// Fire every barrel at time `now` (ms), if the cooldown has passed.
    ///
    /// The projectiles start with the spacecraft's velocity and receive their
    /// launch force as a one time unit impulse. They go straight into
    /// `projectiles`; the weapon does not keep track of them. Returns the
    /// number of projectiles spawned.
    pub fn fire(
        &mut self,
        now: f64,
        ship: &PhysicalObject,
        origin: SpacecraftId,
        projectiles: &mut ProjectileList,
    ) -> usize {
        if !self.can_fire(now) {
            return 0;
        }
        self.last_fire = Some(now);

        let orientation = ship.orientation() * self.slot.orientation;
        let mut spawned = 0;
        for barrel in &self.class.barrels {
            let local = self.slot.position + self.slot.orientation * barrel.position;
            let position = ship.position() + ship.orientation() * (local * ship.scale());

            let mut projectile = match Projectile::new(
                barrel.projectile.clone(),
                position,
                orientation,
                *ship.velocity(),
                origin,
            ) {
                Ok(projectile) => projectile,
                Err(e) => {
                    warn!("{} on {origin} could not launch: {e}", self.class.name);
                    continue;
                }
            };
            let forward = projectile.physical().forward_axis();
            projectile
                .physical_mut()
                .add_or_renew_force("launch", barrel.force, forward, TIME_UNIT_MS);
            projectiles.push(projectile);
            spawned += 1;
        }

        debug!("{origin} fired {} ({spawned} projectiles)", self.class.name);
        spawned
    }
}
