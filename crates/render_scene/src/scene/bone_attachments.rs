//! Bone attachments: entities whose transform follows a bone of another
//! entity's pose
//!
//! Two directions of update exist:
//! - forward: the parent or its pose moved, so the child's world transform is
//!   rebuilt as `parent ∘ bone ∘ relative` (the child keeps its own scale)
//! - backward: the child, its parent or its bone was edited, so the cached
//!   `relative` transform is recomputed from the current world transforms
//!
//! Any missing piece (dead parent, no model instance, no pose, bone out of
//! range) makes either update a silent no-op.

use super::model_instances::ModelInstanceFlags;
use super::render_scene::{component, component_mut, MoveContext, RenderScene};
use crate::assets::{lock_resources, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::constants::HALF_PI;
use crate::foundation::math::utils::{quat_from_euler, quat_to_euler};
use crate::foundation::math::{Quat, RigidTransform, Transform, Vec3};
use std::sync::Arc;

/// Bone attachment component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAttachment {
    pub(super) entity: Entity,
    pub(super) parent: Option<Entity>,
    pub(super) bone_index: i32,
    pub(super) relative_transform: RigidTransform,
}

impl BoneAttachment {
    /// Attached entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Entity whose pose drives this one
    pub const fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Bone in the parent's pose, -1 for none
    pub const fn bone_index(&self) -> i32 {
        self.bone_index
    }

    /// Transform relative to the parent bone
    pub const fn relative_transform(&self) -> &RigidTransform {
        &self.relative_transform
    }
}

impl RenderScene {
    /// Add an unparented bone attachment
    pub fn create_bone_attachment(&mut self, world: &mut World, entity: Entity) {
        self.bone_attachments.insert(
            entity,
            BoneAttachment {
                entity,
                parent: None,
                bone_index: -1,
                relative_transform: RigidTransform::default(),
            },
        );
        world.on_component_created(entity, ComponentType::BoneAttachment);
    }

    /// Remove an entity's bone attachment
    pub fn destroy_bone_attachment(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::BoneAttachment, entity);
    }

    pub(super) fn remove_bone_attachment(&mut self, entity: Entity) {
        let Some(attachment) = self.bone_attachments.remove(&entity) else {
            return;
        };
        if let Some(parent) = attachment.parent {
            self.refresh_attachment_parent_flag(parent);
        }
    }

    /// Keep the parent flag in step with the attachments referencing `parent`
    pub(super) fn refresh_attachment_parent_flag(&mut self, parent: Entity) {
        let referenced = self
            .bone_attachments
            .values()
            .any(|attachment| attachment.parent == Some(parent));
        if let Some(r) = self
            .model_instances
            .get_mut(parent.index())
            .filter(|r| r.entity == Some(parent))
        {
            r.flags
                .set(ModelInstanceFlags::IS_BONE_ATTACHMENT_PARENT, referenced);
        }
    }

    /// Bone attachment component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no bone attachment.
    pub fn bone_attachment(&self, entity: Entity) -> &BoneAttachment {
        component(&self.bone_attachments, entity, ComponentType::BoneAttachment)
    }

    /// Parent entity of an attachment
    pub fn bone_attachment_parent(&self, entity: Entity) -> Option<Entity> {
        self.bone_attachment(entity).parent
    }

    /// Re-parent an attachment, keeping the child where it is
    pub fn set_bone_attachment_parent(&mut self, world: &World, entity: Entity, parent: Option<Entity>) {
        let attachment = component_mut(&mut self.bone_attachments, entity, ComponentType::BoneAttachment);
        let old_parent = std::mem::replace(&mut attachment.parent, parent);
        if let Some(old_parent) = old_parent {
            self.refresh_attachment_parent_flag(old_parent);
        }
        if let Some(parent) = parent {
            self.refresh_attachment_parent_flag(parent);
        }
        self.update_relative_transform(world, entity);
    }

    /// Bone index of an attachment, -1 for none
    pub fn bone_attachment_bone(&self, entity: Entity) -> i32 {
        self.bone_attachment(entity).bone_index
    }

    /// Attach to another bone, keeping the child where it is
    pub fn set_bone_attachment_bone(&mut self, world: &World, entity: Entity, bone_index: i32) {
        component_mut(&mut self.bone_attachments, entity, ComponentType::BoneAttachment).bone_index = bone_index;
        self.update_relative_transform(world, entity);
    }

    /// Position relative to the parent bone
    pub fn bone_attachment_position(&self, entity: Entity) -> Vec3 {
        self.bone_attachment(entity).relative_transform.position
    }

    /// Move the child relative to its bone
    pub fn set_bone_attachment_position(&mut self, world: &mut World, entity: Entity, position: Vec3) {
        component_mut(&mut self.bone_attachments, entity, ComponentType::BoneAttachment)
            .relative_transform
            .position = position;
        self.resolve_bone_attachment(world, entity);
    }

    /// Rotation relative to the parent bone
    pub fn bone_attachment_rotation(&self, entity: Entity) -> Quat {
        self.bone_attachment(entity).relative_transform.rotation
    }

    /// Rotate the child relative to its bone
    pub fn set_bone_attachment_rotation(&mut self, world: &mut World, entity: Entity, rotation: Quat) {
        component_mut(&mut self.bone_attachments, entity, ComponentType::BoneAttachment)
            .relative_transform
            .rotation = rotation;
        self.resolve_bone_attachment(world, entity);
    }

    /// Relative rotation as Euler angles in radians
    pub fn bone_attachment_rotation_euler(&self, entity: Entity) -> Vec3 {
        quat_to_euler(&self.bone_attachment_rotation(entity))
    }

    /// Set the relative rotation from Euler angles; pitch is clamped to ±90°
    pub fn set_bone_attachment_rotation_euler(&mut self, world: &mut World, entity: Entity, euler: Vec3) {
        let clamped = Vec3::new(euler.x.clamp(-HALF_PI, HALF_PI), euler.y, euler.z);
        self.set_bone_attachment_rotation(world, entity, quat_from_euler(&clamped));
    }

    fn resolve_bone_attachment(&mut self, world: &mut World, entity: Entity) {
        let resources = Arc::clone(&self.resources);
        let res = lock_resources(&resources);
        self.update_bone_attachment(world, &res, entity);
    }

    /// World transform of the parent bone, if every link is available
    fn attachment_bone_transform(&self, world: &World, attachment: &BoneAttachment) -> Option<Transform> {
        let parent = attachment.parent.filter(|p| world.is_valid(*p))?;
        let pose = self.model_instance_slot(parent)?.pose.as_ref()?;
        let bone = pose.bone(usize::try_from(attachment.bone_index).ok()?)?;
        Some(world.transform(parent).combine_rigid(&bone))
    }

    pub(super) fn update_attachment_children(&mut self, world: &mut World, res: &ResourceManager, parent: Entity) {
        let children: Vec<Entity> = self
            .bone_attachments
            .values()
            .filter(|attachment| attachment.parent == Some(parent))
            .map(|attachment| attachment.entity)
            .collect();
        for child in children {
            self.update_bone_attachment(world, res, child);
        }
    }

    /// Forward update: place the child from its parent bone
    pub(super) fn update_bone_attachment(&mut self, world: &mut World, res: &ResourceManager, entity: Entity) {
        let Some(attachment) = self.bone_attachments.get(&entity).copied() else {
            return;
        };
        if !world.is_valid(entity) {
            return;
        }
        let Some(bone) = self.attachment_bone_transform(world, &attachment) else {
            return;
        };
        let mut result = bone.combine_rigid(&attachment.relative_transform);
        result.scale = world.transform(entity).scale;
        world.set_transform_without_notify(entity, result);
        self.entity_moved(world, res, entity, MoveContext::Attachment);
    }

    /// Backward update: cache the child's transform relative to its bone
    pub(super) fn update_relative_transform(&mut self, world: &World, entity: Entity) {
        let Some(attachment) = self.bone_attachments.get(&entity).copied() else {
            return;
        };
        if !world.is_valid(entity) {
            return;
        }
        let Some(bone) = self.attachment_bone_transform(world, &attachment) else {
            return;
        };
        let relative = bone.inverse().combine(&world.transform(entity)).rigid_part();
        if let Some(attachment) = self.bone_attachments.get_mut(&entity) {
            attachment.relative_transform = relative;
        }
    }
}
