//! Where the simulation reports what should be drawn.
//!
//! The core never reads anything back from the renderer. It announces new
//! and removed entities and pushes transforms; a host mirrors them however it
//! likes.

use na::{Rotation3, Vector3};

use crate::{projectile::ProjectileId, propulsion::ThrusterChannel, spacecraft::SpacecraftId};

/// The simulated entity a visual belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualHandle {
    Spacecraft(SpacecraftId),
    Projectile(ProjectileId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualEvent {
    /// A new entity; `class` names its spacecraft or projectile class.
    Attach {
        handle: VisualHandle,
        class: String,
        scale: f64,
    },
    Transform {
        handle: VisualHandle,
        position: Vector3<f64>,
        orientation: Rotation3<f64>,
    },
    ThrusterBurn {
        spacecraft: SpacecraftId,
        channel: ThrusterChannel,
        burn: f64,
    },
    Detach {
        handle: VisualHandle,
    },
}

pub trait VisualSink {
    fn attach(&mut self, handle: VisualHandle, class: &str, scale: f64);

    fn set_transform(
        &mut self,
        handle: VisualHandle,
        position: &Vector3<f64>,
        orientation: &Rotation3<f64>,
    );

    /// Burn level of one thruster, for exhaust effects. Ignored by default.
    fn set_thruster_burn(&mut self, _spacecraft: SpacecraftId, _channel: ThrusterChannel, _burn: f64) {
    }

    fn detach(&mut self, handle: VisualHandle);
}

/// Discards everything. For headless runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl VisualSink for NullSink {
    fn attach(&mut self, _handle: VisualHandle, _class: &str, _scale: f64) {}

    fn set_transform(
        &mut self,
        _handle: VisualHandle,
        _position: &Vector3<f64>,
        _orientation: &Rotation3<f64>,
    ) {
    }

    fn detach(&mut self, _handle: VisualHandle) {}
}

/// Records every call, to be drained by a host.
impl VisualSink for Vec<VisualEvent> {
    fn attach(&mut self, handle: VisualHandle, class: &str, scale: f64) {
        self.push(VisualEvent::Attach {
            handle,
            class: class.to_string(),
            scale,
        });
    }

    fn set_transform(
        &mut self,
        handle: VisualHandle,
        position: &Vector3<f64>,
        orientation: &Rotation3<f64>,
    ) {
        self.push(VisualEvent::Transform {
            handle,
            position: *position,
            orientation: *orientation,
        });
    }

    fn set_thruster_burn(&mut self, spacecraft: SpacecraftId, channel: ThrusterChannel, burn: f64) {
        self.push(VisualEvent::ThrusterBurn {
            spacecraft,
            channel,
            burn,
        });
    }

    fn detach(&mut self, handle: VisualHandle) {
        self.push(VisualEvent::Detach { handle });
    }
}
