//! Running the simulation inside Bevy.
//!
//! The level ticks on `FixedUpdate`. It records what should be drawn into a
//! plain event list, which is drained once per frame into Bevy entities.

use std::collections::HashMap;

use bevy::prelude::*;
use sim_core::{
    Level, SpacecraftId, ThrusterChannel, VisualEvent, VisualHandle, classes::SpacecraftClass,
};

use crate::{
    config::GameConfig,
    ship::PlayerShip,
    ui::{sim_rot_to_bevy, sim_to_bevy},
};

#[derive(Resource)]
pub struct Sim {
    pub level: Level<Vec<VisualEvent>>,
    /// Hits taken so far, per spacecraft.
    pub damage: HashMap<SpacecraftId, u32>,
}

impl Sim {
    pub fn new(level: Level<Vec<VisualEvent>>) -> Self {
        Sim {
            level,
            damage: HashMap::new(),
        }
    }

    /// Count one hit on `target`, destroying it at `hull_hits`. Returns true
    /// if this hit destroyed it. Hits on wrecks already on their way out do
    /// not count.
    pub fn record_hit(&mut self, target: SpacecraftId, hull_hits: u32) -> bool {
        match self.level.spacecraft(target) {
            Some(ship) if !ship.to_be_deleted() => {}
            _ => return false,
        }
        let damage = self.damage.entry(target).or_default();
        *damage += 1;
        *damage >= hull_hits && self.level.destroy(target)
    }

    /// Drop the damage of spacecraft no longer in the level.
    pub fn forget_departed(&mut self) {
        let level = &self.level;
        self.damage.retain(|id, _| level.spacecraft(*id).is_some());
    }
}

/// Marks the entity mirroring a simulated spacecraft or projectile.
#[derive(Component, Debug)]
pub struct SimEntity(pub VisualHandle);

/// Last reported burn of every thruster channel.
#[derive(Component, Debug, Default)]
pub struct ThrusterBurns(pub [f32; ThrusterChannel::COUNT]);

/// Entity and scale of every attached visual.
#[derive(Resource, Default)]
struct VisualEntities(HashMap<VisualHandle, (Entity, f32)>);

#[derive(Default)]
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VisualEntities>();
        app.add_systems(FixedUpdate, tick_level);
        app.add_systems(Update, sync_visuals);
    }
}

fn tick_level(mut sim: ResMut<Sim>, config: Res<GameConfig>, time: Res<Time>) {
    let sim = &mut *sim;
    let report = sim.level.tick(time.delta_secs_f64() * 1000.0);
    if report.pruned_spacecraft > 0 {
        sim.forget_departed();
    }

    for hit in report.hits {
        let destroyed = sim.record_hit(hit.target, config.hull_hits);
        if let Some(damage) = sim.damage.get(&hit.target) {
            info!(
                "{} hit {} ({}/{})",
                hit.origin, hit.target, damage, config.hull_hits
            );
        }
        if destroyed {
            info!("{} destroyed", hit.target);
        }
    }
}

fn sync_visuals(
    mut commands: Commands,
    mut sim: ResMut<Sim>,
    mut entities: ResMut<VisualEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut burns: Query<&mut ThrusterBurns>,
) {
    let events = std::mem::take(sim.level.sink_mut());
    let player = sim.level.player();

    for event in events {
        match event {
            VisualEvent::Attach {
                handle,
                class,
                scale,
            } => {
                let entity = match handle {
                    VisualHandle::Spacecraft(id) => {
                        let entity = match sim.level.registry().spacecraft(&class) {
                            Ok(class) => {
                                spawn_hull(&mut commands, &class, &mut meshes, &mut materials)
                            }
                            Err(e) => {
                                warn!("no hull for {id}: {e}");
                                commands.spawn((Transform::default(), Visibility::default())).id()
                            }
                        };
                        commands
                            .entity(entity)
                            .insert((Name::new(format!("{id} ({class})")), ThrusterBurns::default()));
                        if player == Some(id) {
                            commands.entity(entity).insert(PlayerShip);
                        }
                        entity
                    }
                    VisualHandle::Projectile(id) => commands
                        .spawn((
                            Mesh3d(meshes.add(Sphere::new(0.5))),
                            MeshMaterial3d(materials.add(StandardMaterial {
                                base_color: Color::srgb(1.0, 0.6, 0.1),
                                emissive: LinearRgba::rgb(4.0, 2.0, 0.4),
                                ..default()
                            })),
                            Name::new(format!("{id} ({class})")),
                        ))
                        .id(),
                };
                commands.entity(entity).insert(SimEntity(handle));
                entities.0.insert(handle, (entity, scale.max(0.05) as f32));
            }
            VisualEvent::Transform {
                handle,
                position,
                orientation,
            } => {
                if let Some((entity, scale)) = entities.0.get(&handle) {
                    commands.entity(*entity).insert(Transform {
                        translation: sim_to_bevy(&position),
                        rotation: sim_rot_to_bevy(&orientation),
                        scale: Vec3::splat(*scale),
                    });
                }
            }
            VisualEvent::ThrusterBurn {
                spacecraft,
                channel,
                burn,
            } => {
                let Some((entity, _)) = entities.0.get(&VisualHandle::Spacecraft(spacecraft))
                else {
                    continue;
                };
                // Entities spawned this frame have no components yet.
                if let Ok(mut burns) = burns.get_mut(*entity) {
                    burns.0[channel.index()] = burn as f32;
                }
            }
            VisualEvent::Detach { handle } => {
                if let Some((entity, _)) = entities.0.remove(&handle) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

/// One box per hit box of the class, so what is drawn is what can be hit.
fn spawn_hull(
    commands: &mut Commands,
    class: &SpacecraftClass,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> Entity {
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.65, 0.7),
        perceptual_roughness: 0.85,
        reflectance: 0.02,
        ..default()
    });

    commands
        .spawn((Transform::default(), Visibility::default()))
        .with_children(|parent| {
            for body in class.bodies.iter() {
                let size = body.half_extents * 2.0;
                parent.spawn((
                    Mesh3d(meshes.add(Cuboid::new(size.x as f32, size.z as f32, size.y as f32))),
                    MeshMaterial3d(material.clone()),
                    Transform {
                        translation: sim_to_bevy(&body.center),
                        rotation: sim_rot_to_bevy(&body.orientation),
                        ..default()
                    },
                ));
            }
        })
        .id()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sim_core::ClassRegistry;

    use super::*;

    fn sim_with_fighter() -> (Sim, SpacecraftId) {
        let registry = ClassRegistry::from_json(include_str!("../assets/classes.json")).unwrap();
        let mut level = Level::new(Arc::new(registry), Vec::new());
        let id = level
            .spawn_spacecraft(
                "fighter",
                "default",
                na::Vector3::zeros(),
                na::Rotation3::identity(),
            )
            .unwrap();
        (Sim::new(level), id)
    }

    #[test]
    fn destroyed_once_at_hull_hits() {
        let (mut sim, id) = sim_with_fighter();
        assert!(!sim.record_hit(id, 2));
        assert!(sim.record_hit(id, 2));
        // Another hit in the same tick lands on the wreck.
        assert!(!sim.record_hit(id, 2));
        assert_eq!(sim.damage[&id], 2);
    }

    #[test]
    fn damage_is_forgotten_once_pruned() {
        let (mut sim, id) = sim_with_fighter();
        assert!(sim.record_hit(id, 1));
        sim.forget_departed();
        assert_eq!(sim.damage.len(), 1);

        assert_eq!(sim.level.tick(16.0).pruned_spacecraft, 1);
        sim.forget_departed();
        assert!(sim.damage.is_empty());
        assert!(!sim.record_hit(id, 1));
    }
}
