//! World-space text
//!
//! A text mesh references a font resource and holds one glyph set of that font
//! at its own pixel size. The glyph set is taken when the font is ready and
//! re-taken whenever the size or font changes.

use super::render_scene::{component, component_mut, RenderScene};
use crate::assets::{lock_resources, Font, FontResource, Handle, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::{Quat, Vec3};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Text mesh options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextMeshFlags: u32 {
        /// Always face the camera
        const CAMERA_ORIENTED = 1 << 0;
    }
}

/// Convert `0xRRGGBBAA` to the packed `0xAABBGGRR` storage order
pub const fn rgba_to_abgr(rgba: u32) -> u32 {
    let [r, g, b, a] = rgba.to_be_bytes();
    u32::from_le_bytes([r, g, b, a])
}

/// Convert packed `0xAABBGGRR` storage back to `0xRRGGBBAA`
pub const fn abgr_to_rgba(abgr: u32) -> u32 {
    let [r, g, b, a] = abgr.to_le_bytes();
    u32::from_be_bytes([r, g, b, a])
}

/// Text mesh component
#[derive(Debug, Clone, PartialEq)]
pub struct TextMesh {
    pub(super) entity: Entity,
    pub(super) text: String,
    pub(super) font_resource: Option<Handle<FontResource>>,
    pub(super) font: Option<Font>,
    pub(super) font_size: u32,
    /// Packed ABGR
    pub(super) color: u32,
    pub(super) flags: TextMeshFlags,
}

impl TextMesh {
    /// Owning entity
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Displayed text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Font reference
    pub const fn font_resource(&self) -> Option<Handle<FontResource>> {
        self.font_resource
    }

    /// Glyph set in use, present while the font is ready
    pub const fn font(&self) -> Option<Font> {
        self.font
    }

    /// Pixel size
    pub const fn font_size(&self) -> u32 {
        self.font_size
    }

    /// Colour as packed ABGR
    pub const fn color_abgr(&self) -> u32 {
        self.color
    }

    /// Option bits
    pub const fn flags(&self) -> TextMeshFlags {
        self.flags
    }

    fn release_font(&mut self, res: &mut ResourceManager) {
        if let (Some(resource), Some(font)) = (self.font_resource, self.font.take()) {
            res.release_font(resource, font);
        }
    }

    fn acquire_font(&mut self, res: &mut ResourceManager) {
        self.release_font(res);
        self.font = self
            .font_resource
            .and_then(|resource| res.acquire_font(resource, self.font_size));
    }
}

/// Text mesh data handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct TextMeshInfo {
    /// Owning entity
    pub entity: Entity,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Displayed text
    pub text: String,
    /// Glyph set to draw with
    pub font: Font,
    /// Colour as packed ABGR
    pub color: u32,
    /// Always face the camera
    pub camera_oriented: bool,
}

impl RenderScene {
    /// Add a text mesh reading "Text" without a font
    pub fn create_text_mesh(&mut self, world: &mut World, entity: Entity) {
        self.text_meshes.insert(
            entity,
            TextMesh {
                entity,
                text: "Text".to_string(),
                font_resource: None,
                font: None,
                font_size: 13,
                color: 0xff00_0000,
                flags: TextMeshFlags::CAMERA_ORIENTED,
            },
        );
        world.on_component_created(entity, ComponentType::TextMesh);
    }

    /// Remove an entity's text mesh and release its font
    pub fn destroy_text_mesh(&mut self, world: &mut World, entity: Entity) {
        self.destroy_component(world, ComponentType::TextMesh, entity);
    }

    pub(super) fn remove_text_mesh(&mut self, res: &mut ResourceManager, entity: Entity) {
        if self.text_meshes.contains_key(&entity) {
            self.set_text_mesh_font(res, entity, None);
            self.text_meshes.remove(&entity);
        }
    }

    /// Text mesh component of an entity
    ///
    /// # Panics
    /// Panics if the entity has no text mesh.
    pub fn text_mesh(&self, entity: Entity) -> &TextMesh {
        component(&self.text_meshes, entity, ComponentType::TextMesh)
    }

    fn text_mesh_mut(&mut self, entity: Entity) -> &mut TextMesh {
        component_mut(&mut self.text_meshes, entity, ComponentType::TextMesh)
    }

    /// Displayed text
    pub fn text_mesh_text(&self, entity: Entity) -> &str {
        &self.text_mesh(entity).text
    }

    /// Change the displayed text
    pub fn set_text_mesh_text(&mut self, entity: Entity, text: &str) {
        self.text_mesh_mut(entity).text = text.to_string();
    }

    /// Colour as `0xRRGGBBAA`
    pub fn text_mesh_color_rgba(&self, entity: Entity) -> u32 {
        abgr_to_rgba(self.text_mesh(entity).color)
    }

    /// Set the colour from `0xRRGGBBAA`
    pub fn set_text_mesh_color_rgba(&mut self, entity: Entity, rgba: u32) {
        self.text_mesh_mut(entity).color = rgba_to_abgr(rgba);
    }

    /// Whether the text always faces the camera
    pub fn is_text_mesh_camera_oriented(&self, entity: Entity) -> bool {
        self.text_mesh(entity).flags.contains(TextMeshFlags::CAMERA_ORIENTED)
    }

    /// Make the text face the camera or keep the entity's rotation
    pub fn set_text_mesh_camera_oriented(&mut self, entity: Entity, oriented: bool) {
        self.text_mesh_mut(entity)
            .flags
            .set(TextMeshFlags::CAMERA_ORIENTED, oriented);
    }

    /// Pixel size
    pub fn text_mesh_font_size(&self, entity: Entity) -> u32 {
        self.text_mesh(entity).font_size
    }

    /// Change the pixel size, swapping the glyph set
    pub fn set_text_mesh_font_size(&mut self, entity: Entity, size: u32) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let mesh = self.text_mesh_mut(entity);
        mesh.font_size = size;
        if mesh.font.is_some() {
            mesh.acquire_font(&mut res);
        }
    }

    /// Path of the font, empty when none
    pub fn text_mesh_font_path(&self, entity: Entity) -> String {
        self.text_mesh(entity)
            .font_resource
            .map(|font| lock_resources(&self.resources).path(font).to_string())
            .unwrap_or_default()
    }

    /// Assign the font by path; an empty path clears it
    pub fn set_text_mesh_font_path(&mut self, entity: Entity, path: &str) {
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let font = (!path.is_empty()).then(|| res.load::<FontResource>(path));
        self.set_text_mesh_font(&mut res, entity, font);
    }

    /// Replace the font; takes ownership of one reference to `font`
    pub(super) fn set_text_mesh_font(&mut self, res: &mut ResourceManager, entity: Entity, font: Option<Handle<FontResource>>) {
        let mesh = self.text_mesh_mut(entity);
        mesh.release_font(res);
        let old = std::mem::replace(&mut mesh.font_resource, font);
        if let Some(font) = font {
            if res.is_ready(font) {
                mesh.acquire_font(res);
            }
            self.watch(res, font.id());
        }
        if let Some(old) = old {
            self.unwatch(res, old.id());
            res.unload(old);
        }
    }

    pub(super) fn font_state_changed(&mut self, res: &mut ResourceManager, font: Handle<FontResource>) {
        let ready = res.is_ready(font);
        for mesh in self
            .text_meshes
            .values_mut()
            .filter(|mesh| mesh.font_resource == Some(font))
        {
            if ready {
                if mesh.font.is_none() {
                    mesh.acquire_font(res);
                }
            } else {
                mesh.font = None;
            }
        }
    }

    /// Text meshes that can be drawn (their font is ready)
    pub fn text_meshes(&self, world: &World) -> Vec<TextMeshInfo> {
        self.text_meshes
            .values()
            .filter_map(|mesh| {
                let font = mesh.font?;
                let transform = world.transform(mesh.entity);
                Some(TextMeshInfo {
                    entity: mesh.entity,
                    position: transform.position,
                    rotation: transform.rotation,
                    text: mesh.text.clone(),
                    font,
                    color: mesh.color,
                    camera_oriented: mesh.flags.contains(TextMeshFlags::CAMERA_ORIENTED),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion() {
        assert_eq!(rgba_to_abgr(0x1122_3344), 0x4433_2211);
        assert_eq!(abgr_to_rgba(0x4433_2211), 0x1122_3344);
        assert_eq!(abgr_to_rgba(rgba_to_abgr(0xdead_beef)), 0xdead_beef);
    }
}
