//! A level: every spacecraft and projectile, advanced together.
//!
//! Each [`Level::tick`] runs the same fixed sequence:
//!
//! 1. spacecraft flagged for deletion are removed,
//! 2. drivers produce intents, which are applied to their spacecraft,
//! 3. every spacecraft steers, moves and fires,
//! 4. projectiles flagged for deletion are removed,
//! 5. every projectile moves and is tested against the spacecraft that
//!    survived step 1.
//!
//! Deletion is always deferred: something flagged during a tick is still
//! present until the start of the next one. A projectile's visual is
//! detached as soon as it is flagged.

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info, warn};
use na::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    classes::{AxisRotation, ClassRegistry, to_rotation},
    control::{AiController, Controller, PlayerInput},
    error::ConfigError,
    projectile::{ProjectileId, ProjectileList},
    spacecraft::{Spacecraft, SpacecraftId},
    visual::{NullSink, VisualHandle, VisualSink},
};

/// Who flies a placed spacecraft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Pilot {
    #[default]
    None,
    Player,
    Ai {
        /// Index into the level's placements.
        #[serde(default)]
        target: Option<usize>,
        #[serde(default, rename = "cruiseSpeed")]
        cruise_speed: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub class: String,
    #[serde(default = "default_loadout")]
    pub loadout: String,
    pub position: Vector3<f64>,
    #[serde(default)]
    pub rotations: Vec<AxisRotation>,
    /// m/s
    #[serde(default)]
    pub velocity: Option<Vector3<f64>>,
    #[serde(default)]
    pub pilot: Pilot,
}

fn default_loadout() -> String {
    "default".to_string()
}

/// The initial state of a level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDescriptor {
    pub spacecraft: Vec<Placement>,
}

impl LevelDescriptor {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A projectile struck a spacecraft. What that does to the spacecraft is up
/// to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub projectile: ProjectileId,
    pub origin: SpacecraftId,
    pub target: SpacecraftId,
    pub position: Vector3<f64>,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub hits: Vec<HitEvent>,
    /// Projectiles fired.
    pub spawned: usize,
    pub pruned_spacecraft: usize,
    pub pruned_projectiles: usize,
}

pub struct Level<S: VisualSink = NullSink> {
    registry: Arc<ClassRegistry>,
    sink: S,
    spacecraft: Vec<Spacecraft>,
    controllers: BTreeMap<SpacecraftId, Controller>,
    projectiles: ProjectileList,
    /// ms since the level started.
    now: f64,
    next_id: u32,
}

impl Level<NullSink> {
    pub fn headless(registry: Arc<ClassRegistry>) -> Self {
        Level::new(registry, NullSink)
    }
}

impl<S: VisualSink> Level<S> {
    /// An empty level.
    pub fn new(registry: Arc<ClassRegistry>, sink: S) -> Self {
        Level {
            registry,
            sink,
            spacecraft: Vec::new(),
            controllers: BTreeMap::new(),
            projectiles: ProjectileList::default(),
            now: 0.0,
            next_id: 0,
        }
    }

    /// Build a level from its descriptor. AI targets refer to other
    /// placements by index.
    pub fn load(
        registry: Arc<ClassRegistry>,
        descriptor: &LevelDescriptor,
        sink: S,
    ) -> Result<Self, ConfigError> {
        let count = descriptor.spacecraft.len();
        let mut level = Level::new(registry, sink);

        let mut ids = Vec::with_capacity(count);
        for placement in &descriptor.spacecraft {
            let id = level.spawn_spacecraft(
                &placement.class,
                &placement.loadout,
                placement.position,
                to_rotation(&placement.rotations),
            )?;
            if let (Some(velocity), Some(ship)) = (placement.velocity, level.spacecraft.last_mut()) {
                ship.physical_mut().set_velocity(velocity);
            }
            ids.push(id);
        }

        for (placement, id) in descriptor.spacecraft.iter().zip(&ids) {
            let controller = match &placement.pilot {
                Pilot::None => continue,
                Pilot::Player => Controller::Player(PlayerInput::default()),
                Pilot::Ai {
                    target,
                    cruise_speed,
                } => {
                    let target = target
                        .map(|index| {
                            ids.get(index)
                                .copied()
                                .ok_or(ConfigError::UnknownSpacecraft { index, count })
                        })
                        .transpose()?;
                    let mut ai = AiController::new(target);
                    if let Some(speed) = cruise_speed {
                        ai = ai.with_cruise_speed(*speed);
                    }
                    Controller::Ai(ai)
                }
            };
            level.controllers.insert(*id, controller);
        }

        info!(
            "level loaded: {count} spacecraft, {} driven",
            level.controllers.len()
        );
        Ok(level)
    }

    /// Place a new spacecraft. It takes part from the next tick on.
    pub fn spawn_spacecraft(
        &mut self,
        class: &str,
        loadout: &str,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
    ) -> Result<SpacecraftId, ConfigError> {
        let class = self.registry.spacecraft(class)?;
        let id = SpacecraftId::new(self.next_id);
        let ship = Spacecraft::new(id, class, loadout, position, orientation)?;
        self.next_id += 1;

        let handle = VisualHandle::Spacecraft(id);
        self.sink
            .attach(handle, &ship.class().name, ship.physical().scale());
        self.sink.set_transform(
            handle,
            ship.physical().position(),
            ship.physical().orientation(),
        );
        self.spacecraft.push(ship);
        Ok(id)
    }

    pub fn set_controller(&mut self, id: SpacecraftId, controller: Controller) {
        self.controllers.insert(id, controller);
    }

    pub fn controller_mut(&mut self, id: SpacecraftId) -> Option<&mut Controller> {
        self.controllers.get_mut(&id)
    }

    /// The first spacecraft flown by a [`PlayerInput`].
    pub fn player(&self) -> Option<SpacecraftId> {
        self.spacecraft
            .iter()
            .map(Spacecraft::id)
            .find(|id| matches!(self.controllers.get(id), Some(Controller::Player(_))))
    }

    /// Flag a spacecraft for removal at the start of the next tick. Returns
    /// false if there is no such spacecraft.
    pub fn destroy(&mut self, id: SpacecraftId) -> bool {
        match self.spacecraft.iter_mut().find(|s| s.id() == id) {
            Some(ship) => {
                ship.destroy();
                true
            }
            None => false,
        }
    }

    pub fn spacecraft(&self, id: SpacecraftId) -> Option<&Spacecraft> {
        self.spacecraft.iter().find(|s| s.id() == id)
    }

    pub fn spacecraft_mut(&mut self, id: SpacecraftId) -> Option<&mut Spacecraft> {
        self.spacecraft.iter_mut().find(|s| s.id() == id)
    }

    pub fn fleet(&self) -> &[Spacecraft] {
        &self.spacecraft
    }

    pub fn projectiles(&self) -> &ProjectileList {
        &self.projectiles
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// ms since the level started.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Advance the level by `dt` ms.
    ///
    /// A `dt` that is negative or not finite is dropped with a warning and
    /// nothing moves.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport::default();
        if !(dt.is_finite() && dt >= 0.0) {
            warn!("ignoring tick of {dt} ms");
            return report;
        }
        self.now += dt;

        let sink = &mut self.sink;
        let mut removed = Vec::new();
        self.spacecraft.retain(|ship| {
            if ship.to_be_deleted() {
                sink.detach(VisualHandle::Spacecraft(ship.id()));
                removed.push(ship.id());
            }
            !ship.to_be_deleted()
        });
        for id in &removed {
            self.controllers.remove(id);
            debug!("{id} removed");
        }
        report.pruned_spacecraft = removed.len();

        for index in 0..self.spacecraft.len() {
            let ship = &self.spacecraft[index];
            let Some(controller) = self.controllers.get_mut(&ship.id()) else {
                continue;
            };
            let intents = controller.intents(ship, &self.spacecraft);
            let ship = &mut self.spacecraft[index];
            for intent in intents {
                ship.apply(intent);
            }
        }

        let first_new = self.projectiles.len();
        for ship in &mut self.spacecraft {
            report.spawned += ship.simulate(dt, self.now, &mut self.projectiles);

            let id = ship.id();
            let physical = ship.physical();
            self.sink.set_transform(
                VisualHandle::Spacecraft(id),
                physical.position(),
                physical.orientation(),
            );
            if let Some(propulsion) = ship.propulsion() {
                for (channel, burn) in propulsion.burns() {
                    self.sink.set_thruster_burn(id, channel, burn);
                }
            }
        }
        for projectile in self.projectiles.iter().skip(first_new) {
            self.sink.attach(
                VisualHandle::Projectile(projectile.id()),
                &projectile.class().name,
                projectile.class().size,
            );
        }

        // Their visuals went away when they were flagged.
        report.pruned_projectiles = self.projectiles.prune().len();

        for projectile in self.projectiles.iter_mut() {
            if let Some(target) = projectile.simulate(dt, &self.spacecraft) {
                report.hits.push(HitEvent {
                    projectile: projectile.id(),
                    origin: projectile.origin(),
                    target,
                    position: *projectile.physical().position(),
                });
            }
            let handle = VisualHandle::Projectile(projectile.id());
            if projectile.to_be_deleted() {
                self.sink.detach(handle);
            } else {
                let physical = projectile.physical();
                self.sink
                    .set_transform(handle, physical.position(), physical.orientation());
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classes::tests::registry,
        control::{Command, Intent},
        visual::VisualEvent,
    };

    const LEVEL: &str = r#"{
        "spacecraft": [
            { "class": "fighter", "position": [0, 0, 0], "pilot": { "kind": "player" } },
            {
                "class": "fighter",
                "position": [0, 300, 0],
                "rotations": [ { "axis": "z", "degrees": 180 } ],
                "pilot": { "kind": "ai", "target": 0, "cruiseSpeed": 5 }
            },
            { "class": "station", "loadout": "hulk", "position": [500, 0, 0], "velocity": [0, 0, 1] }
        ]
    }"#;

    fn registry_arc() -> Arc<ClassRegistry> {
        Arc::new(registry())
    }

    #[test]
    fn loads_placements_and_pilots() {
        let descriptor = LevelDescriptor::from_json(LEVEL).unwrap();
        let level = Level::load(registry_arc(), &descriptor, NullSink).unwrap();

        assert_eq!(level.fleet().len(), 3);
        assert_eq!(level.player(), Some(SpacecraftId::new(0)));
        let station = level.spacecraft(SpacecraftId::new(2)).unwrap();
        assert_eq!(station.physical().velocity(), &Vector3::new(0.0, 0.0, 1.0));
        let enemy = level.spacecraft(SpacecraftId::new(1)).unwrap();
        assert!((enemy.physical().forward_axis().y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_ai_target() {
        let json = r#"{ "spacecraft": [
            { "class": "fighter", "position": [0, 0, 0], "pilot": { "kind": "ai", "target": 4 } }
        ] }"#;
        let descriptor = LevelDescriptor::from_json(json).unwrap();
        assert!(matches!(
            Level::load(registry_arc(), &descriptor, NullSink),
            Err(ConfigError::UnknownSpacecraft { index: 4, count: 1 })
        ));
    }

    #[test]
    fn rejects_unknown_class() {
        let mut level = Level::headless(registry_arc());
        assert!(matches!(
            level.spawn_spacecraft("cruiser", "default", Vector3::zeros(), Rotation3::identity()),
            Err(ConfigError::UnknownClass { kind: "spacecraft", .. })
        ));
        assert!(level.fleet().is_empty());
    }

    #[test]
    fn player_input_drives_its_spacecraft() {
        let mut level = Level::headless(registry_arc());
        let id = level
            .spawn_spacecraft("fighter", "default", Vector3::zeros(), Rotation3::identity())
            .unwrap();
        level.set_controller(id, Controller::Player(PlayerInput::default()));

        let input = level.controller_mut(id).and_then(Controller::as_player_mut).unwrap();
        input.press(Command::Forward);
        input.press(Command::Fire);
        let report = level.tick(20.0);

        assert_eq!(report.spawned, 2);
        assert!(level.spacecraft(id).unwrap().speed() > 0.0);
        assert_eq!(level.projectiles().len(), 2);
        assert_eq!(level.now(), 20.0);
    }

    #[test]
    fn destroyed_spacecraft_leave_on_the_next_tick() {
        let mut level = Level::new(registry_arc(), Vec::<VisualEvent>::new());
        let id = level
            .spawn_spacecraft("fighter", "hulk", Vector3::zeros(), Rotation3::identity())
            .unwrap();
        level.set_controller(id, Controller::Player(PlayerInput::default()));
        assert!(level.destroy(id));
        assert!(level.spacecraft(id).is_some());

        let report = level.tick(16.0);
        assert_eq!(report.pruned_spacecraft, 1);
        assert!(level.spacecraft(id).is_none());
        assert!(level.controller_mut(id).is_none());
        assert!(!level.destroy(id));
        assert!(level.sink().iter().any(|e| *e
            == VisualEvent::Detach {
                handle: VisualHandle::Spacecraft(id)
            }));
    }

    #[test]
    fn sink_sees_attach_transform_and_detach() {
        let mut level = Level::new(registry_arc(), Vec::<VisualEvent>::new());
        let id = level
            .spawn_spacecraft("fighter", "default", Vector3::zeros(), Rotation3::identity())
            .unwrap();
        level.spacecraft_mut(id).unwrap().apply(Intent::Fire);
        level.tick(16.0);

        let events = std::mem::take(level.sink_mut());
        let projectile_attaches = events
            .iter()
            .filter(|e| matches!(e, VisualEvent::Attach { handle: VisualHandle::Projectile(_), class, .. } if class == "plasma"))
            .count();
        assert_eq!(projectile_attaches, 2);
        assert!(events.iter().any(|e| matches!(
            e,
            VisualEvent::ThrusterBurn { spacecraft, .. } if *spacecraft == id
        )));

        // Plasma lives 2000 ms: detached on the tick it runs out, dropped
        // from the list on the one after.
        let report = level.tick(2000.0);
        assert_eq!(report.pruned_projectiles, 0);
        assert_eq!(projectile_detaches(level.sink()), 2);
        let report = level.tick(16.0);
        assert_eq!(report.pruned_projectiles, 2);
        assert_eq!(projectile_detaches(level.sink()), 2);
        assert!(level.projectiles().is_empty());
    }

    fn projectile_detaches(events: &[VisualEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, VisualEvent::Detach { handle: VisualHandle::Projectile(_) }))
            .count()
    }

    #[test]
    fn bad_time_steps_are_ignored() {
        let mut level = Level::headless(registry_arc());
        let id = level
            .spawn_spacecraft("fighter", "default", Vector3::zeros(), Rotation3::identity())
            .unwrap();
        level.spacecraft_mut(id).unwrap().apply(Intent::Fire);
        level.tick(16.0);
        assert_eq!(level.projectiles().len(), 2);

        for dt in [f64::NAN, f64::INFINITY, -500.0] {
            let report = level.tick(dt);
            assert_eq!(report.spawned, 0);
            assert!(report.hits.is_empty());
            assert_eq!(level.now(), 16.0);
        }
        assert!(level.projectiles().iter().all(|p| p.remaining() == 2000.0 - 16.0));

        // Time still moves on, so cooldowns expire and projectiles run out.
        level.spacecraft_mut(id).unwrap().apply(Intent::Fire);
        assert_eq!(level.tick(300.0).spawned, 2);
        for _ in 0..8 {
            level.tick(300.0);
        }
        assert!(level.projectiles().is_empty());
    }

    #[test]
    fn turret_fires_at_a_target_ahead() {
        let mut level = Level::headless(registry_arc());
        let turret = level
            .spawn_spacecraft("fighter", "turret", Vector3::zeros(), Rotation3::identity())
            .unwrap();
        let target = level
            .spawn_spacecraft("fighter", "hulk", Vector3::new(0.0, 100.0, 0.0), Rotation3::identity())
            .unwrap();
        level.set_controller(turret, Controller::Ai(AiController::new(Some(target))));

        let spawned: usize = (0..60).map(|_| level.tick(50.0).spawned).sum();
        assert!(spawned > 0);
        assert_eq!(
            level.spacecraft(turret).unwrap().maneuvering().mode(),
            crate::maneuvering::FlightMode::Free
        );
    }
}
