//! Cameras: projection parameters, frusta and picking rays
//!
//! Cameras look down their local -Z axis with +Y up.

use super::render_scene::{component, component_mut, RenderScene};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::spatial::{Frustum, Ray};

/// Smallest near plane distance accepted
const MIN_NEAR_PLANE: f32 = 0.000_01;

/// Camera component
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub(super) entity: Entity,
    pub(super) slot: String,
    pub(super) fov: f32,
    pub(super) aspect: f32,
    pub(super) near: f32,
    pub(super) far: f32,
    pub(super) ortho_size: f32,
    pub(super) screen_width: f32,
    pub(super) screen_height: f32,
    pub(super) is_ortho: bool,
}

impl Camera {
    fn new(entity: Entity) -> Self {
        let screen_width = 800.0;
        let screen_height = 600.0;
        Self {
            entity,
            slot: String::new(),
            fov: deg_to_rad(60.0),
            aspect: screen_width / screen_height,
            near: 0.1,
            far: 10_000.0,
            ortho_size: 10.0,
            screen_width,
            screen_height,
            is_ortho: false,
        }
    }

    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Slot name used to find the camera by role
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Vertical field of view in radians
    pub const fn fov(&self) -> f32 {
        self.fov
    }

    /// Width over height
    pub const fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near plane distance
    pub const fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance
    pub const fn far(&self) -> f32 {
        self.far
    }

    /// Half height of the orthographic view volume
    pub const fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    /// Whether the projection is orthographic
    pub const fn is_ortho(&self) -> bool {
        self.is_ortho
    }

    /// Viewport size in pixels
    pub fn screen_size(&self) -> Vec2 {
        Vec2::new(self.screen_width, self.screen_height)
    }

    /// Projection matrix (OpenGL clip conventions)
    pub fn projection(&self) -> Mat4 {
        if self.is_ortho {
            let half_height = self.ortho_size;
            let half_width = self.ortho_size * self.aspect;
            Mat4::new_orthographic(-half_width, half_width, -half_height, half_height, self.near, self.far)
        } else {
            Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
        }
    }

    /// LOD distance multiplier: `(fov / 60°)²`, 1 for orthographic cameras
    pub fn lod_multiplier(&self) -> f32 {
        if self.is_ortho {
            return 1.0;
        }
        let ratio = self.fov / deg_to_rad(60.0);
        ratio * ratio
    }
}

impl RenderScene {
    /// Add a camera; the first camera becomes the active one
    pub fn create_camera(&mut self, world: &mut World, entity: Entity) {
        self.cameras.insert(entity, Camera::new(entity));
        if self.active_camera.is_none() {
            self.active_camera = Some(entity);
        }
        log::debug!("Created camera on {entity}");
        world.on_component_created(entity, ComponentType::Camera);
    }

    /// Remove an entity's camera
    pub fn destroy_camera(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::Camera, entity);
    }

    pub(super) fn remove_camera(&mut self, entity: Entity) {
        self.cameras.remove(&entity);
        if self.active_camera == Some(entity) {
            self.active_camera = None;
        }
    }

    /// Camera component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no camera.
    pub fn camera(&self, entity: Entity) -> &Camera {
        component(&self.cameras, entity, ComponentType::Camera)
    }

    fn camera_mut(&mut self, entity: Entity) -> &mut Camera {
        component_mut(&mut self.cameras, entity, ComponentType::Camera)
    }

    /// Entities with a camera
    pub fn cameras(&self) -> impl Iterator<Item = Entity> + '_ {
        self.cameras.keys().copied()
    }

    /// Camera the scene renders from
    pub const fn active_camera(&self) -> Option<Entity> {
        self.active_camera
    }

    /// Select the camera the scene renders from
    pub fn set_active_camera(&mut self, camera: Option<Entity>) {
        if let Some(camera) = camera {
            assert!(self.cameras.contains_key(&camera), "entity {camera} has no camera component");
        }
        self.active_camera = camera;
    }

    /// First camera assigned to a slot
    pub fn camera_in_slot(&self, slot: &str) -> Option<Entity> {
        self.cameras
            .values()
            .find(|camera| camera.slot == slot)
            .map(|camera| camera.entity)
    }

    /// Slot name of a camera
    pub fn camera_slot(&self, entity: Entity) -> &str {
        &self.camera(entity).slot
    }

    /// Assign a camera to a slot
    pub fn set_camera_slot(&mut self, entity: Entity, slot: &str) {
        self.camera_mut(entity).slot = slot.to_string();
    }

    /// Vertical field of view in radians
    pub fn camera_fov(&self, entity: Entity) -> f32 {
        self.camera(entity).fov
    }

    /// Set the vertical field of view in radians
    pub fn set_camera_fov(&mut self, entity: Entity, fov: f32) {
        self.camera_mut(entity).fov = fov;
    }

    /// Near plane distance
    pub fn camera_near_plane(&self, entity: Entity) -> f32 {
        self.camera(entity).near
    }

    /// Set the near plane, clamped away from zero
    pub fn set_camera_near_plane(&mut self, entity: Entity, near: f32) {
        self.camera_mut(entity).near = near.max(MIN_NEAR_PLANE);
    }

    /// Far plane distance
    pub fn camera_far_plane(&self, entity: Entity) -> f32 {
        self.camera(entity).far
    }

    /// Set the far plane
    pub fn set_camera_far_plane(&mut self, entity: Entity, far: f32) {
        self.camera_mut(entity).far = far;
    }

    /// Whether the camera is orthographic
    pub fn is_camera_ortho(&self, entity: Entity) -> bool {
        self.camera(entity).is_ortho
    }

    /// Switch between orthographic and perspective projection
    pub fn set_camera_ortho(&mut self, entity: Entity, is_ortho: bool) {
        self.camera_mut(entity).is_ortho = is_ortho;
    }

    /// Half height of the orthographic view volume
    pub fn camera_ortho_size(&self, entity: Entity) -> f32 {
        self.camera(entity).ortho_size
    }

    /// Set the orthographic half height
    pub fn set_camera_ortho_size(&mut self, entity: Entity, size: f32) {
        self.camera_mut(entity).ortho_size = size;
    }

    /// Viewport size in pixels
    pub fn camera_screen_size(&self, entity: Entity) -> Vec2 {
        self.camera(entity).screen_size()
    }

    /// Resize the viewport; the aspect ratio follows
    pub fn set_camera_screen_size(&mut self, entity: Entity, width: f32, height: f32) {
        let camera = self.camera_mut(entity);
        camera.screen_width = width;
        camera.screen_height = height;
        camera.aspect = width / height.max(1.0);
    }

    /// LOD distance multiplier of a camera
    pub fn camera_lod_multiplier(&self, entity: Entity) -> f32 {
        self.camera(entity).lod_multiplier()
    }

    /// Projection matrix of a camera
    pub fn camera_projection(&self, entity: Entity) -> Mat4 {
        self.camera(entity).projection()
    }

    /// View frustum of a camera at its current transform
    pub fn camera_frustum(&self, world: &World, entity: Entity) -> Frustum {
        let camera = self.camera(entity);
        let transform = world.transform(entity);
        let direction = transform.rotation * Vec3::new(0.0, 0.0, -1.0);
        let up = transform.rotation * Vec3::new(0.0, 1.0, 0.0);
        if camera.is_ortho {
            Frustum::orthographic(
                transform.position,
                direction,
                up,
                camera.ortho_size * camera.aspect,
                camera.ortho_size,
                camera.near,
                camera.far,
            )
        } else {
            Frustum::perspective(
                transform.position,
                direction,
                up,
                camera.fov,
                camera.aspect,
                camera.near,
                camera.far,
            )
        }
    }

    /// World-space ray through a screen position (pixels, origin top-left)
    ///
    /// With a degenerate viewport the ray starts at the camera and points
    /// along its local +Z axis.
    pub fn camera_ray(&self, world: &World, entity: Entity, screen_pos: Vec2) -> Ray {
        let camera = self.camera(entity);
        let transform = world.transform(entity);
        let fallback = Ray::new(transform.position, transform.rotation * Vec3::new(0.0, 0.0, 1.0));
        if camera.screen_width <= 0.0 || camera.screen_height <= 0.0 {
            return fallback;
        }
        let Some(inverse_projection) = camera.projection().try_inverse() else {
            return fallback;
        };

        let nx = 2.0 * (screen_pos.x / camera.screen_width) - 1.0;
        let ny = 2.0 * ((camera.screen_height - screen_pos.y) / camera.screen_height) - 1.0;
        let unproject = |z: f32| {
            let p = inverse_projection * Vec4::new(nx, ny, z, 1.0);
            p.xyz() / p.w
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);

        let origin = if camera.is_ortho {
            transform.position + transform.rotation * Vec3::new(near.x, near.y, 0.0)
        } else {
            transform.position
        };
        let direction = (transform.rotation * (far - near)).normalize();
        Ray::new(origin, direction)
    }
}
