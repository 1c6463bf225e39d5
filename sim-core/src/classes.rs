//! Class data: the immutable description of every kind of spacecraft,
//! weapon, projectile and propulsion system.
//!
//! Classes are decoded from JSON, validated and cross-linked once, before the
//! first tick. After that every reference is an `Arc` and no lookups by name
//! happen inside the simulation.

use std::{collections::HashMap, sync::Arc};

use log::info;
use na::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    attitude,
    error::{ConfigError, require_non_negative, require_positive},
    physical::HitBox,
    weapon::Barrel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

/// One step of an orientation, applied in list order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRotation {
    pub axis: Axis,
    pub degrees: f64,
}

pub(crate) fn to_rotation(steps: &[AxisRotation]) -> Rotation3<f64> {
    let steps: Vec<_> = steps
        .iter()
        .map(|s| (s.axis.unit(), s.degrees.to_radians()))
        .collect();
    attitude::from_axis_rotations(&steps)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileDescription {
    pub name: String,
    /// kg
    pub mass: f64,
    /// Lifetime, ms.
    pub duration: f64,
    /// Edge length of the projectile, m. Also widens hit tests by half.
    pub size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarrelDescription {
    /// Offset within the weapon, m.
    pub position: Vector3<f64>,
    pub projectile: String,
    /// Launch force, N, applied for one time unit.
    pub force: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponDescription {
    pub name: String,
    /// ms
    pub cooldown: f64,
    pub barrels: Vec<BarrelDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropulsionDescription {
    pub name: String,
    pub thrust: f64,
    pub angular_thrust: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyDescription {
    pub position: Vector3<f64>,
    pub size: Vector3<f64>,
    #[serde(default)]
    pub rotations: Vec<AxisRotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDescription {
    pub position: Vector3<f64>,
    #[serde(default)]
    pub rotations: Vec<AxisRotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquippedWeapon {
    pub class: String,
    pub slot: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadoutDescription {
    pub name: String,
    #[serde(default)]
    pub weapons: Vec<EquippedWeapon>,
    #[serde(default)]
    pub propulsion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacecraftDescription {
    pub name: String,
    pub mass: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub bodies: Vec<BodyDescription>,
    #[serde(default)]
    pub weapon_slots: Vec<SlotDescription>,
    #[serde(default)]
    pub loadouts: Vec<LoadoutDescription>,
}

fn default_scale() -> f64 {
    1.0
}

/// The whole class file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassesDescription {
    #[serde(default)]
    pub projectiles: Vec<ProjectileDescription>,
    #[serde(default)]
    pub weapons: Vec<WeaponDescription>,
    #[serde(default)]
    pub propulsions: Vec<PropulsionDescription>,
    #[serde(default)]
    pub spacecraft: Vec<SpacecraftDescription>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileClass {
    pub name: String,
    pub mass: f64,
    pub duration: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct WeaponClass {
    pub name: String,
    pub cooldown: f64,
    pub barrels: Vec<Barrel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropulsionClass {
    pub name: String,
    pub thrust: f64,
    pub angular_thrust: f64,
}

/// A mount point on a spacecraft, in its body frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub position: Vector3<f64>,
    pub orientation: Rotation3<f64>,
}

/// An equipment profile.
#[derive(Debug, Clone)]
pub struct Loadout {
    pub name: String,
    pub weapons: Vec<(usize, Arc<WeaponClass>)>,
    pub propulsion: Option<Arc<PropulsionClass>>,
}

#[derive(Debug, Clone)]
pub struct SpacecraftClass {
    pub name: String,
    pub mass: f64,
    pub scale: f64,
    pub bodies: Arc<[HitBox]>,
    pub weapon_slots: Vec<Slot>,
    pub loadouts: Vec<Loadout>,
}

impl SpacecraftClass {
    pub fn loadout(&self, name: &str) -> Result<&Loadout, ConfigError> {
        self.loadouts
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| ConfigError::UnknownLoadout {
                class: self.name.clone(),
                loadout: name.to_string(),
            })
    }
}

/// All classes, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    projectiles: HashMap<String, Arc<ProjectileClass>>,
    weapons: HashMap<String, Arc<WeaponClass>>,
    propulsions: HashMap<String, Arc<PropulsionClass>>,
    spacecraft: HashMap<String, Arc<SpacecraftClass>>,
}

impl ClassRegistry {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let description: ClassesDescription = serde_json::from_str(json)?;
        Self::from_description(&description)
    }

    /// Validate and link a decoded class file. Classes may only refer to
    /// classes of kinds resolved before them: projectiles, then weapons and
    /// propulsion, then spacecraft.
    pub fn from_description(description: &ClassesDescription) -> Result<Self, ConfigError> {
        let mut registry = ClassRegistry::default();

        for p in &description.projectiles {
            require_positive(&p.name, "mass", p.mass)?;
            require_positive(&p.name, "duration", p.duration)?;
            require_non_negative(&p.name, "size", p.size)?;
            let class = ProjectileClass {
                name: p.name.clone(),
                mass: p.mass,
                duration: p.duration,
                size: p.size,
            };
            insert_unique(&mut registry.projectiles, "projectile", &p.name, class)?;
        }

        for w in &description.weapons {
            require_non_negative(&w.name, "cooldown", w.cooldown)?;
            if w.barrels.is_empty() {
                return Err(ConfigError::invalid(&w.name, "barrels", "needs at least one barrel"));
            }
            let barrels = w
                .barrels
                .iter()
                .map(|b| {
                    require_positive(&w.name, "force", b.force)?;
                    Ok(Barrel {
                        position: b.position,
                        projectile: lookup(&registry.projectiles, "projectile", &b.projectile)?,
                        force: b.force,
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            let class = WeaponClass {
                name: w.name.clone(),
                cooldown: w.cooldown,
                barrels,
            };
            insert_unique(&mut registry.weapons, "weapon", &w.name, class)?;
        }

        for p in &description.propulsions {
            require_positive(&p.name, "thrust", p.thrust)?;
            require_positive(&p.name, "angularThrust", p.angular_thrust)?;
            let class = PropulsionClass {
                name: p.name.clone(),
                thrust: p.thrust,
                angular_thrust: p.angular_thrust,
            };
            insert_unique(&mut registry.propulsions, "propulsion", &p.name, class)?;
        }

        for s in &description.spacecraft {
            let class = registry.resolve_spacecraft(s)?;
            insert_unique(&mut registry.spacecraft, "spacecraft", &s.name, class)?;
        }

        info!(
            "loaded {} spacecraft, {} weapon, {} propulsion and {} projectile classes",
            registry.spacecraft.len(),
            registry.weapons.len(),
            registry.propulsions.len(),
            registry.projectiles.len()
        );
        Ok(registry)
    }

    fn resolve_spacecraft(&self, s: &SpacecraftDescription) -> Result<SpacecraftClass, ConfigError> {
        require_positive(&s.name, "mass", s.mass)?;
        require_positive(&s.name, "scale", s.scale)?;

        let mut bodies = Vec::with_capacity(s.bodies.len());
        for b in &s.bodies {
            if b.size.iter().any(|c| !(c.is_finite() && *c >= 0.0)) {
                return Err(ConfigError::invalid(&s.name, "bodies", "box sizes must be finite and not negative"));
            }
            bodies.push(HitBox::new(b.position, b.size).with_orientation(to_rotation(&b.rotations)));
        }

        let weapon_slots: Vec<Slot> = s
            .weapon_slots
            .iter()
            .map(|slot| Slot {
                position: slot.position,
                orientation: to_rotation(&slot.rotations),
            })
            .collect();

        let mut loadouts = Vec::with_capacity(s.loadouts.len());
        for l in &s.loadouts {
            let mut weapons = Vec::with_capacity(l.weapons.len());
            for equipped in &l.weapons {
                if equipped.slot >= weapon_slots.len() {
                    return Err(ConfigError::MissingSlot {
                        class: s.name.clone(),
                        loadout: l.name.clone(),
                        slot: equipped.slot,
                        slots: weapon_slots.len(),
                    });
                }
                weapons.push((equipped.slot, self.weapon(&equipped.class)?));
            }
            let propulsion = l
                .propulsion
                .as_deref()
                .map(|name| self.propulsion(name))
                .transpose()?;
            loadouts.push(Loadout {
                name: l.name.clone(),
                weapons,
                propulsion,
            });
        }

        Ok(SpacecraftClass {
            name: s.name.clone(),
            mass: s.mass,
            scale: s.scale,
            bodies: Arc::from(bodies),
            weapon_slots,
            loadouts,
        })
    }

    pub fn projectile(&self, name: &str) -> Result<Arc<ProjectileClass>, ConfigError> {
        lookup(&self.projectiles, "projectile", name)
    }

    pub fn weapon(&self, name: &str) -> Result<Arc<WeaponClass>, ConfigError> {
        lookup(&self.weapons, "weapon", name)
    }

    pub fn propulsion(&self, name: &str) -> Result<Arc<PropulsionClass>, ConfigError> {
        lookup(&self.propulsions, "propulsion", name)
    }

    pub fn spacecraft(&self, name: &str) -> Result<Arc<SpacecraftClass>, ConfigError> {
        lookup(&self.spacecraft, "spacecraft", name)
    }

    pub fn spacecraft_names(&self) -> impl Iterator<Item = &str> {
        self.spacecraft.keys().map(String::as_str)
    }
}

fn lookup<T>(
    map: &HashMap<String, Arc<T>>,
    kind: &'static str,
    name: &str,
) -> Result<Arc<T>, ConfigError> {
    map.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownClass {
            kind,
            name: name.to_string(),
        })
}

fn insert_unique<T>(
    map: &mut HashMap<String, Arc<T>>,
    kind: &'static str,
    name: &str,
    class: T,
) -> Result<(), ConfigError> {
    if map.contains_key(name) {
        return Err(ConfigError::DuplicateClass {
            kind,
            name: name.to_string(),
        });
    }
    map.insert(name.to_string(), Arc::new(class));
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small but complete class file used across the crate's tests.
    pub(crate) const CLASSES: &str = r#"{
        "projectiles": [
            { "name": "plasma", "mass": 0.5, "duration": 2000, "size": 0.5 }
        ],
        "weapons": [
            {
                "name": "twin",
                "cooldown": 250,
                "barrels": [
                    { "position": [-0.5, 0, 0], "projectile": "plasma", "force": 500 },
                    { "position": [0.5, 0, 0], "projectile": "plasma", "force": 500 }
                ]
            }
        ],
        "propulsions": [
            { "name": "light", "thrust": 20000, "angularThrust": 5000 }
        ],
        "spacecraft": [
            {
                "name": "fighter",
                "mass": 1000,
                "bodies": [ { "position": [0, 0, 0], "size": [4, 8, 2] } ],
                "weaponSlots": [ { "position": [0, 4, 0] } ],
                "loadouts": [
                    { "name": "default", "weapons": [ { "class": "twin", "slot": 0 } ], "propulsion": "light" },
                    { "name": "unarmed", "propulsion": "light" },
                    { "name": "turret", "weapons": [ { "class": "twin", "slot": 0 } ] },
                    { "name": "hulk" }
                ]
            },
            {
                "name": "station",
                "mass": 100000,
                "scale": 10,
                "bodies": [
                    { "position": [0, 0, 0], "size": [2, 2, 2], "rotations": [ { "axis": "z", "degrees": 45 } ] }
                ],
                "loadouts": [ { "name": "hulk" } ]
            }
        ]
    }"#;

    pub(crate) fn registry() -> ClassRegistry {
        ClassRegistry::from_json(CLASSES).unwrap()
    }

    #[test]
    fn links_classes_by_reference() {
        let registry = registry();
        let fighter = registry.spacecraft("fighter").unwrap();
        let loadout = fighter.loadout("default").unwrap();
        let (slot, weapon) = &loadout.weapons[0];
        assert_eq!(*slot, 0);
        assert_eq!(weapon.barrels.len(), 2);
        assert!(Arc::ptr_eq(
            &weapon.barrels[0].projectile,
            &registry.projectile("plasma").unwrap()
        ));
        assert_eq!(loadout.propulsion.as_ref().unwrap().angular_thrust, 5000.0);
        assert!(fighter.loadout("hulk").unwrap().propulsion.is_none());
        assert!(matches!(
            fighter.loadout("nope"),
            Err(ConfigError::UnknownLoadout { .. })
        ));
    }

    #[test]
    fn applies_rotations_and_defaults() {
        let registry = registry();
        let station = registry.spacecraft("station").unwrap();
        assert_eq!(station.scale, 10.0);
        let turned = station.bodies[0].orientation * Vector3::x();
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((turned - Vector3::new(half, half, 0.0)).norm() < 1e-12);

        let fighter = registry.spacecraft("fighter").unwrap();
        assert_eq!(fighter.scale, 1.0);
        assert_eq!(fighter.weapon_slots[0].orientation, Rotation3::identity());
    }

    #[test]
    fn hit_test_follows_rotated_bodies() {
        use crate::spacecraft::{Spacecraft, SpacecraftId};

        let station = Spacecraft::new(
            SpacecraftId::new(0),
            registry().spacecraft("station").unwrap(),
            "hulk",
            Vector3::zeros(),
            Rotation3::identity(),
        )
        .unwrap();
        let physical = station.physical();

        // The box is 20 m wide at scale 10, turned 45 degrees about z.
        assert!(physical.check_hit(&Vector3::new(13.0, 0.0, 0.0), 0.0));
        assert!(physical.check_hit(&Vector3::new(0.0, -13.0, 5.0), 0.0));
        assert!(!physical.check_hit(&Vector3::new(9.5, 9.5, 0.0), 0.0));
        assert!(physical.check_hit(&Vector3::new(9.5, 9.5, 0.0), 7.0));
    }

    #[test]
    fn rejects_unknown_references() {
        let json = r#"{
            "weapons": [
                { "name": "gun", "cooldown": 100, "barrels": [ { "position": [0,0,0], "projectile": "ghost", "force": 1 } ] }
            ]
        }"#;
        match ClassRegistry::from_json(json) {
            Err(ConfigError::UnknownClass { kind, name }) => {
                assert_eq!(kind, "projectile");
                assert_eq!(name, "ghost");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_mass = r#"{ "spacecraft": [ { "name": "void", "mass": 0, "bodies": [] } ] }"#;
        assert!(matches!(
            ClassRegistry::from_json(zero_mass),
            Err(ConfigError::InvalidValue { field: "mass", .. })
        ));

        let unpowered = r#"{ "propulsions": [ { "name": "dud", "thrust": 10, "angularThrust": 0 } ] }"#;
        assert!(matches!(
            ClassRegistry::from_json(unpowered),
            Err(ConfigError::InvalidValue { field: "angularThrust", .. })
        ));

        let no_barrels = r#"{ "weapons": [ { "name": "stub", "cooldown": 1, "barrels": [] } ] }"#;
        assert!(ClassRegistry::from_json(no_barrels).is_err());
    }

    #[test]
    fn rejects_missing_slots_and_duplicates() {
        let json = r#"{
            "projectiles": [ { "name": "p", "mass": 1, "duration": 1, "size": 0 } ],
            "weapons": [ { "name": "w", "cooldown": 1, "barrels": [ { "position": [0,0,0], "projectile": "p", "force": 1 } ] } ],
            "spacecraft": [
                { "name": "s", "mass": 1, "bodies": [], "loadouts": [ { "name": "l", "weapons": [ { "class": "w", "slot": 0 } ] } ] }
            ]
        }"#;
        assert!(matches!(
            ClassRegistry::from_json(json),
            Err(ConfigError::MissingSlot { slot: 0, slots: 0, .. })
        ));

        let dup = r#"{ "projectiles": [
            { "name": "p", "mass": 1, "duration": 1, "size": 0 },
            { "name": "p", "mass": 2, "duration": 1, "size": 0 }
        ] }"#;
        assert!(matches!(
            ClassRegistry::from_json(dup),
            Err(ConfigError::DuplicateClass { .. })
        ));
    }

    #[test]
    fn reports_bad_json() {
        assert!(matches!(
            ClassRegistry::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
