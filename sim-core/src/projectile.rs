//! Short lived projectiles and the list that owns them.

use std::{fmt, sync::Arc};

use log::debug;
use na::{Rotation3, Vector3};

use crate::{
    classes::ProjectileClass,
    error::ConfigError,
    physical::{HitBox, PhysicalObject},
    spacecraft::{Spacecraft, SpacecraftId},
};

/// Stable handle of a projectile within its [`ProjectileList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u64);

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projectile#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    id: ProjectileId,
    class: Arc<ProjectileClass>,
    physical: PhysicalObject,
    /// ms
    remaining: f64,
    origin: SpacecraftId,
    to_be_deleted: bool,
}

impl Projectile {
    /// A projectile at `position`, already moving with `base_velocity`.
    pub fn new(
        class: Arc<ProjectileClass>,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
        base_velocity: Vector3<f64>,
        origin: SpacecraftId,
    ) -> Result<Self, ConfigError> {
        // Projectiles are never hit themselves; they need no boxes.
        let mut physical = PhysicalObject::new(
            class.mass,
            position,
            orientation,
            1.0,
            Arc::from(Vec::<HitBox>::new()),
        )?;
        physical.set_velocity(base_velocity);
        Ok(Projectile {
            id: ProjectileId(0),
            remaining: class.duration,
            class,
            physical,
            origin,
            to_be_deleted: false,
        })
    }

    pub fn id(&self) -> ProjectileId {
        self.id
    }

    pub fn class(&self) -> &ProjectileClass {
        &self.class
    }

    pub fn physical(&self) -> &PhysicalObject {
        &self.physical
    }

    pub fn physical_mut(&mut self) -> &mut PhysicalObject {
        &mut self.physical
    }

    /// Remaining lifetime, ms.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn origin(&self) -> SpacecraftId {
        self.origin
    }

    pub fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }

    /// Advance the projectile by `dt` ms and test it against `candidates`.
    ///
    /// The spacecraft that fired it is never hit. A hit drops the lifetime
    /// to zero, so the projectile is flagged for deletion on its next
    /// update, not on this one. Returns the spacecraft that was hit.
    pub fn simulate(&mut self, dt: f64, candidates: &[Spacecraft]) -> Option<SpacecraftId> {
        if self.to_be_deleted {
            return None;
        }

        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.to_be_deleted = true;
            return None;
        }

        self.physical.simulate(dt);
        let position = *self.physical.position();
        let margin = self.class.size * 0.5;

        let hit = candidates
            .iter()
            .filter(|c| c.id() != self.origin && !c.to_be_deleted())
            .find(|c| c.physical().check_hit(&position, margin))
            .map(Spacecraft::id);

        if let Some(target) = hit {
            debug!("{} from {} hit {target}", self.id, self.origin);
            self.remaining = 0.0;
        }
        hit
    }
}

/// Dense storage of live projectiles with stable ids.
#[derive(Debug, Clone, Default)]
pub struct ProjectileList {
    items: Vec<Projectile>,
    next_id: u64,
}

impl ProjectileList {
    /// Take ownership of `projectile`, giving it a fresh id.
    pub fn push(&mut self, mut projectile: Projectile) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id += 1;
        projectile.id = id;
        self.items.push(projectile);
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.items.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.items.iter_mut()
    }

    /// Drop every projectile flagged for deletion, returning their ids.
    pub fn prune(&mut self) -> Vec<ProjectileId> {
        let mut pruned = Vec::new();
        self.items.retain(|p| {
            if p.to_be_deleted {
                pruned.push(p.id);
            }
            !p.to_be_deleted
        });
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::tests::registry;

    fn plasma(duration: f64) -> Arc<ProjectileClass> {
        Arc::new(ProjectileClass {
            name: "plasma".into(),
            mass: 1.0,
            duration,
            size: 0.0,
        })
    }

    fn fighter_at(id: u32, position: Vector3<f64>) -> Spacecraft {
        let registry = registry();
        let class = registry.spacecraft("fighter").unwrap();
        Spacecraft::new(
            SpacecraftId::new(id),
            class,
            "hulk",
            position,
            Rotation3::identity(),
        )
        .unwrap()
    }

    fn projectile_at(position: Vector3<f64>, origin: u32) -> Projectile {
        Projectile::new(
            plasma(2000.0),
            position,
            Rotation3::identity(),
            Vector3::zeros(),
            SpacecraftId::new(origin),
        )
        .unwrap()
    }

    #[test]
    fn expires_after_its_duration() {
        let mut p = projectile_at(Vector3::new(1000.0, 0.0, 0.0), 1);
        for _ in 0..3 {
            p.simulate(500.0, &[]);
        }
        assert!(!p.to_be_deleted());
        assert_eq!(p.remaining(), 500.0);

        p.simulate(500.0, &[]);
        assert!(p.to_be_deleted());
    }

    #[test]
    fn moves_with_its_velocity() {
        let mut p = projectile_at(Vector3::zeros(), 1);
        p.physical_mut().set_velocity(Vector3::new(0.0, 100.0, 0.0));
        p.simulate(100.0, &[]);
        assert!((p.physical().position().y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn never_hits_its_origin() {
        let shooter = fighter_at(1, Vector3::zeros());
        for offset in [-1.5, 0.0, 1.5, 3.5] {
            let mut p = projectile_at(Vector3::new(0.0, offset, 0.0), 1);
            assert_eq!(p.simulate(16.0, std::slice::from_ref(&shooter)), None);
            assert!(p.remaining() > 0.0);
        }
    }

    #[test]
    fn hit_is_deleted_one_update_later() {
        let ships = [fighter_at(1, Vector3::zeros()), fighter_at(2, Vector3::new(50.0, 0.0, 0.0))];
        let mut p = projectile_at(Vector3::new(50.0, 1.0, 0.0), 1);

        assert_eq!(p.simulate(16.0, &ships), Some(SpacecraftId::new(2)));
        assert_eq!(p.remaining(), 0.0);
        assert!(!p.to_be_deleted());

        assert_eq!(p.simulate(16.0, &ships), None);
        assert!(p.to_be_deleted());
    }

    #[test]
    fn skips_candidates_flagged_for_deletion() {
        let mut target = fighter_at(2, Vector3::zeros());
        target.destroy();
        let mut p = projectile_at(Vector3::zeros(), 1);
        assert_eq!(p.simulate(16.0, std::slice::from_ref(&target)), None);
    }

    #[test]
    fn list_assigns_ids_and_prunes() {
        let mut list = ProjectileList::default();
        let a = list.push(projectile_at(Vector3::zeros(), 1));
        let b = list.push(projectile_at(Vector3::zeros(), 1));
        assert_ne!(a, b);
        assert_eq!(list.get(b).map(Projectile::id), Some(b));

        for p in list.iter_mut() {
            if p.id() == a {
                p.simulate(5000.0, &[]);
            }
        }
        assert_eq!(list.prune(), vec![a]);
        assert_eq!(list.len(), 1);
        assert!(list.get(a).is_none());
    }
}
