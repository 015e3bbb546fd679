//! Whole-scene binary stream
//!
//! Sections are written in a fixed order, each prefixed by its element count:
//! cameras, model instances, lights, terrains, particle emitters, bone
//! attachments, environment probes, decals, text meshes. Resource references
//! are stored as paths and reloaded on read, so every auxiliary index is
//! rebuilt through the same paths creation uses.

use super::bone_attachments::BoneAttachment;
use super::lights::{GlobalLight, PointLight};
use super::model_instances::{ModelInstance, ModelInstanceFlags};
use super::probes::{EnvironmentProbe, ProbeFlags};
use super::render_scene::RenderScene;
use super::terrain::{GrassRotationMode, GrassType};
use super::text_meshes::TextMeshFlags;
use super::SceneError;
use crate::assets::{lock_resources, FontResource, Handle, Material, Model, ParticleEmitterResource, Resource, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::RigidTransform;
use crate::serialization::{BinaryReader, BinaryWriter, Result, SerializationError};
use std::io::{Read, Write};
use std::sync::Arc;

fn resource_path<T: Resource>(res: &ResourceManager, handle: Option<Handle<T>>) -> &str {
    handle.map_or("", |handle| res.path(handle))
}

fn load_path<T: Resource>(res: &mut ResourceManager, path: &str) -> Option<Handle<T>> {
    (!path.is_empty()).then(|| res.load::<T>(path))
}

fn corrupt(message: impl Into<String>) -> SerializationError {
    SerializationError::CorruptData(message.into())
}

fn read_live_entity<R: Read>(reader: &mut BinaryReader<R>, world: &World) -> Result<Entity> {
    let entity = reader.read_required_entity()?;
    if world.is_valid(entity) {
        Ok(entity)
    } else {
        Err(corrupt(format!("entity {entity} does not exist in the world")))
    }
}

impl RenderScene {
    /// Write every component to a binary stream
    pub fn serialize<W: Write>(&self, sink: W) -> std::result::Result<(), SceneError> {
        log::info!("Serializing render scene");
        let res = lock_resources(&self.resources);
        let mut writer = BinaryWriter::new(sink);
        self.write_cameras(&mut writer)?;
        self.write_model_instances(&res, &mut writer)?;
        self.write_lights(&mut writer)?;
        self.write_terrains(&res, &mut writer)?;
        self.write_particle_emitters(&res, &mut writer)?;
        self.write_bone_attachments(&mut writer)?;
        self.write_environment_probes(&mut writer)?;
        self.write_decals(&res, &mut writer)?;
        self.write_text_meshes(&res, &mut writer)?;
        Ok(())
    }

    /// Replace the scene's contents with a binary stream
    ///
    /// Entities must already exist in `world`. On failure the scene is left
    /// empty with every resource reference it took released.
    pub fn deserialize<R: Read>(&mut self, world: &mut World, source: R) -> std::result::Result<(), SceneError> {
        log::info!("Deserializing render scene");
        self.clear(world);
        let resources = Arc::clone(&self.resources);
        let result = {
            let mut res = lock_resources(&resources);
            self.read_sections(world, &mut res, &mut BinaryReader::new(source))
        };
        if let Err(error) = result {
            log::warn!("Render scene stream rejected: {error}");
            self.clear(world);
            return Err(error.into());
        }
        Ok(())
    }

    fn read_sections<R: Read>(&mut self, world: &mut World, res: &mut ResourceManager, reader: &mut BinaryReader<R>) -> Result<()> {
        self.read_cameras(world, reader)?;
        self.read_model_instances(world, res, reader)?;
        self.read_lights(world, reader)?;
        self.read_terrains(world, res, reader)?;
        self.read_particle_emitters(world, res, reader)?;
        self.read_bone_attachments(world, reader)?;
        self.read_environment_probes(world, res, reader)?;
        self.read_decals(world, res, reader)?;
        self.read_text_meshes(world, res, reader)
    }

    fn write_cameras<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.cameras.len())?;
        for camera in self.cameras.values() {
            writer.write_entity(Some(camera.entity))?;
            writer.write_str(&camera.slot)?;
            writer.write_f32(camera.far)?;
            writer.write_f32(camera.fov)?;
            writer.write_u8(u8::from(camera.is_ortho))?;
            writer.write_f32(camera.ortho_size)?;
            writer.write_f32(camera.near)?;
        }
        Ok(())
    }

    fn read_cameras<R: Read>(&mut self, world: &mut World, reader: &mut BinaryReader<R>) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            self.create_camera(world, entity);
            let slot = reader.read_string()?;
            let far = reader.read_f32()?;
            let fov = reader.read_f32()?;
            let is_ortho = reader.read_u8()? != 0;
            let ortho_size = reader.read_f32()?;
            let near = reader.read_f32()?;
            if let Some(camera) = self.cameras.get_mut(&entity) {
                camera.slot = slot;
                camera.far = far;
                camera.fov = fov;
                camera.is_ortho = is_ortho;
                camera.ortho_size = ortho_size;
                camera.near = near;
            }
        }
        Ok(())
    }

    fn write_model_instances<W: Write>(&self, res: &ResourceManager, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.model_instances.len())?;
        for instance in &self.model_instances {
            writer.write_entity(instance.entity)?;
            writer.write_u8((instance.flags & ModelInstanceFlags::PERSISTENT).bits())?;
            let Some(entity) = instance.entity else {
                continue;
            };
            writer.write_str(resource_path(res, instance.model))?;
            let materials = self.custom_material_paths(res, entity).unwrap_or_default();
            writer.write_count(materials.len())?;
            for path in &materials {
                writer.write_str(path)?;
            }
        }
        Ok(())
    }

    fn read_model_instances<R: Read>(
        &mut self,
        world: &mut World,
        res: &mut ResourceManager,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        let len = reader.read_count()?;
        for slot in 0..len {
            let entity = reader.read_entity()?;
            let flags = ModelInstanceFlags::from_bits_truncate(reader.read_u8()?) & ModelInstanceFlags::PERSISTENT;
            let Some(entity) = entity else {
                continue;
            };
            if entity.index() != slot {
                return Err(corrupt(format!("model instance {entity} stored in slot {slot}")));
            }
            if !world.is_valid(entity) {
                return Err(corrupt(format!("entity {entity} does not exist in the world")));
            }

            self.create_model_instance(world, entity);
            let instance = self.instance_mut(entity);
            instance.flags.remove(ModelInstanceFlags::PERSISTENT);
            instance.flags.insert(flags);

            let model = load_path::<Model>(res, &reader.read_string()?);
            let count = reader.read_count()?;
            let mut materials = Vec::with_capacity(count.min(256));
            for _ in 0..count {
                materials.push(reader.read_string()?);
            }
            if model.is_some() && count > 0 {
                let handles = materials.iter().map(|path| load_path::<Material>(res, path)).collect();
                self.restore_custom_materials(res, entity, handles);
            }
            self.set_model(world, res, entity, model);
        }
        if self.model_instances.len() < len {
            self.model_instances.resize_with(len, ModelInstance::default);
        }
        Ok(())
    }

    fn write_lights<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.point_lights.len())?;
        for light in &self.point_lights {
            writer.write_entity(Some(light.entity))?;
            writer.write_vec3(&light.diffuse_color)?;
            writer.write_f32(light.diffuse_intensity)?;
            writer.write_vec3(&light.specular_color)?;
            writer.write_f32(light.specular_intensity)?;
            writer.write_f32(light.fov)?;
            writer.write_f32(light.attenuation_param)?;
            writer.write_f32(light.range)?;
            writer.write_bool(light.cast_shadows)?;
        }

        writer.write_count(self.global_lights.len())?;
        for light in self.global_lights.values() {
            writer.write_entity(Some(light.entity))?;
            writer.write_vec3(&light.diffuse_color)?;
            writer.write_f32(light.diffuse_intensity)?;
            writer.write_f32(light.indirect_intensity)?;
            writer.write_vec3(&light.fog_color)?;
            writer.write_f32(light.fog_density)?;
            writer.write_f32(light.fog_bottom)?;
            writer.write_f32(light.fog_height)?;
            writer.write_vec4(&light.cascades)?;
        }
        writer.write_entity(self.active_global_light)
    }

    fn read_lights<R: Read>(&mut self, world: &mut World, reader: &mut BinaryReader<R>) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let light = PointLight {
                entity,
                diffuse_color: reader.read_vec3()?,
                diffuse_intensity: reader.read_f32()?,
                specular_color: reader.read_vec3()?,
                specular_intensity: reader.read_f32()?,
                fov: reader.read_f32()?,
                attenuation_param: reader.read_f32()?,
                range: reader.read_f32()?,
                cast_shadows: reader.read_bool()?,
            };
            self.create_point_light(world, entity);
            if let Some(&index) = self.point_light_map.get(&entity) {
                self.point_lights[index] = light;
            }
        }

        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let light = GlobalLight {
                entity,
                diffuse_color: reader.read_vec3()?,
                diffuse_intensity: reader.read_f32()?,
                indirect_intensity: reader.read_f32()?,
                fog_color: reader.read_vec3()?,
                fog_density: reader.read_f32()?,
                fog_bottom: reader.read_f32()?,
                fog_height: reader.read_f32()?,
                cascades: reader.read_vec4()?,
            };
            self.create_global_light(world, entity);
            self.global_lights.insert(entity, light);
        }

        let active = reader.read_entity()?;
        if let Some(active) = active {
            if !self.global_lights.contains_key(&active) {
                return Err(corrupt(format!("active global light {active} has no global light")));
            }
        }
        self.active_global_light = active;
        Ok(())
    }

    fn write_terrains<W: Write>(&self, res: &ResourceManager, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.terrains.len())?;
        for terrain in self.terrains.values() {
            writer.write_entity(Some(terrain.entity))?;
            writer.write_u64(terrain.layer_mask)?;
            writer.write_str(resource_path(res, terrain.material))?;
            writer.write_vec3(&terrain.scale)?;
            writer.write_count(terrain.grass.len())?;
            for grass in &terrain.grass {
                writer.write_str(resource_path(res, grass.model))?;
                writer.write_u32(grass.density)?;
                writer.write_f32(grass.distance)?;
                writer.write_u32(grass.rotation_mode as u32)?;
            }
        }
        Ok(())
    }

    fn read_terrains<R: Read>(&mut self, world: &mut World, res: &mut ResourceManager, reader: &mut BinaryReader<R>) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            self.create_terrain(world, entity);
            let layer_mask = reader.read_u64()?;
            let material = load_path::<Material>(res, &reader.read_string()?);
            let scale = reader.read_vec3()?;
            if let Some(terrain) = self.terrains.get_mut(&entity) {
                terrain.layer_mask = layer_mask;
                terrain.scale = scale;
            }
            self.set_terrain_material(res, entity, material);

            for _ in 0..reader.read_count()? {
                let model = load_path::<Model>(res, &reader.read_string()?);
                let density = reader.read_u32()?;
                let distance = reader.read_f32()?;
                let mode = reader.read_u32()?;
                let grass = GrassType {
                    model,
                    density,
                    distance,
                    rotation_mode: GrassRotationMode::from_u32(mode).unwrap_or_default(),
                };
                // Pushed before validation so the model reference is released by the
                // clear that follows a failed read.
                if let Some(terrain) = self.terrains.get_mut(&entity) {
                    terrain.grass.push(grass);
                }
                if GrassRotationMode::from_u32(mode).is_none() {
                    return Err(corrupt(format!("invalid grass rotation mode {mode}")));
                }
            }
        }
        Ok(())
    }

    fn write_particle_emitters<W: Write>(&self, res: &ResourceManager, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.particle_emitters.len())?;
        for emitter in self.particle_emitters.values() {
            writer.write_entity(Some(emitter.entity))?;
            writer.write_str(resource_path(res, emitter.resource))?;
        }
        Ok(())
    }

    fn read_particle_emitters<R: Read>(
        &mut self,
        world: &mut World,
        res: &mut ResourceManager,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            self.create_particle_emitter(world, entity);
            let resource = load_path::<ParticleEmitterResource>(res, &reader.read_string()?);
            self.set_particle_emitter_resource(res, entity, resource);
        }
        Ok(())
    }

    fn write_bone_attachments<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.bone_attachments.len())?;
        for attachment in self.bone_attachments.values() {
            writer.write_entity(Some(attachment.entity))?;
            writer.write_entity(attachment.parent)?;
            writer.write_i32(attachment.bone_index)?;
            writer.write_vec3(&attachment.relative_transform.position)?;
            writer.write_quat(&attachment.relative_transform.rotation)?;
        }
        Ok(())
    }

    fn read_bone_attachments<R: Read>(&mut self, world: &mut World, reader: &mut BinaryReader<R>) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let parent = reader.read_entity()?;
            let bone_index = reader.read_i32()?;
            let position = reader.read_vec3()?;
            let rotation = reader.read_quat()?;
            self.create_bone_attachment(world, entity);
            self.bone_attachments.insert(
                entity,
                BoneAttachment {
                    entity,
                    parent,
                    bone_index,
                    relative_transform: RigidTransform::new(position, rotation),
                },
            );
            if let Some(parent) = parent {
                self.refresh_attachment_parent_flag(parent);
            }
        }
        Ok(())
    }

    fn write_environment_probes<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.environment_probes.len())?;
        for probe in self.environment_probes.values() {
            writer.write_entity(Some(probe.entity))?;
            writer.write_f32(probe.radius)?;
            writer.write_u64(probe.guid)?;
            writer.write_u32(probe.flags.bits())?;
            writer.write_u32(probe.radiance_size)?;
            writer.write_u32(probe.irradiance_size)?;
            writer.write_u32(probe.reflection_size)?;
        }
        Ok(())
    }

    fn read_environment_probes<R: Read>(
        &mut self,
        world: &mut World,
        res: &mut ResourceManager,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let probe = EnvironmentProbe {
                entity,
                radius: reader.read_f32()?,
                guid: reader.read_u64()?,
                flags: ProbeFlags::from_bits_truncate(reader.read_u32()?),
                radiance_size: reader.read_u32()?,
                irradiance_size: reader.read_u32()?,
                reflection_size: reader.read_u32()?,
                reflection: None,
                irradiance: None,
                radiance: None,
            };
            self.environment_probes.insert(entity, probe);
            self.load_probe_textures(world, res, entity);
            world.on_component_created(entity, ComponentType::EnvironmentProbe);
        }
        Ok(())
    }

    fn write_decals<W: Write>(&self, res: &ResourceManager, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.decals.len())?;
        for decal in self.decals.values() {
            writer.write_entity(Some(decal.entity))?;
            writer.write_vec3(&decal.scale)?;
            writer.write_str(resource_path(res, decal.material))?;
        }
        Ok(())
    }

    fn read_decals<R: Read>(&mut self, world: &mut World, res: &mut ResourceManager, reader: &mut BinaryReader<R>) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let scale = reader.read_vec3()?;
            let material = load_path::<Material>(res, &reader.read_string()?);
            self.create_decal(world, entity);
            self.set_decal_material(res, entity, material);
            if let Some(decal) = self.decals.get_mut(&entity) {
                decal.scale = scale;
            }
            self.update_decal_info(world, entity);
        }
        Ok(())
    }

    fn write_text_meshes<W: Write>(&self, res: &ResourceManager, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_count(self.text_meshes.len())?;
        for mesh in self.text_meshes.values() {
            writer.write_entity(Some(mesh.entity))?;
            writer.write_str(&mesh.text)?;
            writer.write_u32(mesh.font_size)?;
            writer.write_u32(mesh.color)?;
            writer.write_str(resource_path(res, mesh.font_resource))?;
            writer.write_u32(mesh.flags.bits())?;
        }
        Ok(())
    }

    fn read_text_meshes<R: Read>(
        &mut self,
        world: &mut World,
        res: &mut ResourceManager,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        for _ in 0..reader.read_count()? {
            let entity = read_live_entity(reader, world)?;
            let text = reader.read_string()?;
            let font_size = reader.read_u32()?;
            let color = reader.read_u32()?;
            let font = load_path::<FontResource>(res, &reader.read_string()?);
            let flags = TextMeshFlags::from_bits_truncate(reader.read_u32()?);
            self.create_text_mesh(world, entity);
            if let Some(mesh) = self.text_meshes.get_mut(&entity) {
                mesh.text = text;
                mesh.font_size = font_size;
                mesh.color = color;
                mesh.flags = flags;
            }
            self.set_text_mesh_font(res, entity, font);
        }
        Ok(())
    }
}
