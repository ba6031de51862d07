//! Colliders: shapes attached to bodies.

use nalgebra::Isometry2;
use sim2d_collision::{Aabb, Proxy, Shape};
use sim2d_types::{BodyId, ColliderId, Material};

/// How to attach a shape to a body.
///
/// The shape is placed in the body frame: its origin is the body's center
/// of mass.
#[derive(Debug, Clone)]
pub struct ColliderDef {
    /// Geometry.
    pub shape: Shape,
    /// Mass per unit area, used when the body derives its mass.
    pub density: f64,
    /// Surface properties.
    pub material: Material,
    /// Group bits.
    pub group: u32,
    /// Bits of the groups this collider collides with.
    pub mask: u32,
    /// Sensors report contacts but never push back.
    pub sensor: bool,
}

impl ColliderDef {
    /// A solid collider with unit density and default material.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            material: Material::default(),
            group: 1,
            mask: u32::MAX,
            sensor: false,
        }
    }

    /// Set the density.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set the material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Make the collider a sensor.
    #[must_use]
    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// A shape attached to a body.
#[derive(Debug, Clone)]
pub struct Collider {
    id: ColliderId,
    body: BodyId,
    shape: Shape,
    density: f64,
    material: Material,
    group: u32,
    mask: u32,
    sensor: bool,
    aabb: Aabb,
}

impl Collider {
    pub(crate) fn new(id: ColliderId, body: BodyId, def: ColliderDef, pose: &Isometry2<f64>) -> Self {
        let aabb = def.shape.aabb(pose);
        Self {
            id,
            body,
            shape: def.shape,
            density: def.density,
            material: def.material,
            group: def.group,
            mask: def.mask,
            sensor: def.sensor,
            aabb,
        }
    }

    /// Collider id.
    #[must_use]
    pub fn id(&self) -> ColliderId {
        self.id
    }

    /// Owning body.
    #[must_use]
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// Geometry in the body frame.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Density.
    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Surface properties.
    #[must_use]
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Whether the collider is a sensor.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// World bounds as of the last refresh.
    #[must_use]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Recompute the world bounds for the body pose.
    pub(crate) fn refresh_aabb(&mut self, pose: &Isometry2<f64>) {
        self.aabb = self.shape.aabb(pose);
    }

    /// Broad-phase proxy of this collider.
    pub(crate) fn proxy(&self, active: bool) -> Proxy {
        let proxy = Proxy::new(self.id, self.body, self.aabb).with_filter(self.group, self.mask);
        if active { proxy } else { proxy.inactive() }
    }
}
