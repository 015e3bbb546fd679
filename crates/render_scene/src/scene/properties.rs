//! Per-component named-field records
//!
//! Used for undo/redo and property copy of a single component. A reader parses
//! every field before touching the scene, so a malformed record leaves the
//! existing component untouched.

use super::bone_attachments::BoneAttachment;
use super::lights::{GlobalLight, PointLight};
use super::model_instances::ModelInstanceFlags;
use super::probes::{EnvironmentProbe, ProbeFlags};
use super::render_scene::{RenderScene, SCENE_VERSION};
use super::terrain::{GrassRotationMode, GrassType};
use super::text_meshes::TextMeshFlags;
use super::SceneError;
use crate::assets::{lock_resources, FontResource, Handle, Material, Model, ParticleEmitterResource, Resource, ResourceManager};
use crate::ecs::{ComponentType, Entity, World};
use crate::foundation::math::RigidTransform;
use crate::serialization::{ComponentRecord, RecordReader, Result, SerializationError};
use std::sync::Arc;

fn path_of<T: Resource>(res: &ResourceManager, handle: Option<Handle<T>>) -> String {
    handle.map(|handle| res.path(handle).to_string()).unwrap_or_default()
}

fn load_path<T: Resource>(res: &mut ResourceManager, path: &str) -> Option<Handle<T>> {
    (!path.is_empty()).then(|| res.load::<T>(path))
}

fn count_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

impl RenderScene {
    /// Named-field record of one component
    ///
    /// # Panics
    /// Panics if the entity has no component of kind `ty`.
    pub fn serialize_component(&self, ty: ComponentType, entity: Entity) -> ComponentRecord {
        let res = lock_resources(&self.resources);
        let mut record = ComponentRecord::new(ty.name());
        match ty {
            ComponentType::Camera => {
                let camera = self.camera(entity);
                record.write_str("slot", &camera.slot);
                record.write_f32("far", camera.far);
                record.write_f32("fov", camera.fov);
                record.write_bool("is_ortho", camera.is_ortho);
                record.write_f32("ortho_size", camera.ortho_size);
                record.write_f32("near", camera.near);
            }
            ComponentType::ModelInstance => {
                let instance = self.instance(entity);
                record.write_str("source", &path_of(&res, instance.model));
                record.write_u32("flags", u32::from((instance.flags & ModelInstanceFlags::PERSISTENT).bits()));
                let materials = self.custom_material_paths(&res, entity).unwrap_or_default();
                record.write_i32("custom_materials", count_i32(materials.len()));
                for path in &materials {
                    record.write_str("material", path);
                }
            }
            ComponentType::GlobalLight => {
                let light = self.global_light(entity);
                record.write_vec4("cascades", &light.cascades);
                record.write_vec3("diffuse_color", &light.diffuse_color);
                record.write_f32("diffuse_intensity", light.diffuse_intensity);
                record.write_f32("indirect_intensity", light.indirect_intensity);
                record.write_f32("fog_bottom", light.fog_bottom);
                record.write_vec3("fog_color", &light.fog_color);
                record.write_f32("fog_density", light.fog_density);
                record.write_f32("fog_height", light.fog_height);
            }
            ComponentType::PointLight => {
                let light = self.point_light(entity);
                record.write_f32("attenuation", light.attenuation_param);
                record.write_bool("cast_shadow", light.cast_shadows);
                record.write_vec3("diffuse_color", &light.diffuse_color);
                record.write_f32("diffuse_intensity", light.diffuse_intensity);
                record.write_f32("fov", light.fov);
                record.write_f32("range", light.range);
                record.write_vec3("specular_color", &light.specular_color);
                record.write_f32("specular_intensity", light.specular_intensity);
            }
            ComponentType::Decal => {
                let decal = self.decal(entity);
                record.write_vec3("scale", &decal.scale);
                record.write_str("material", &path_of(&res, decal.material));
            }
            ComponentType::TextMesh => {
                let mesh = self.text_mesh(entity);
                record.write_str("font", &path_of(&res, mesh.font_resource));
                record.write_u32("color", mesh.color);
                record.write_u32("font_size", mesh.font_size);
                record.write_str("text", &mesh.text);
            }
            ComponentType::BoneAttachment => {
                let attachment = self.bone_attachment(entity);
                record.write_i32("bone_index", attachment.bone_index);
                record.write_entity("parent", attachment.parent);
                record.write_vec3("relative_position", &attachment.relative_transform.position);
                record.write_quat("relative_rotation", &attachment.relative_transform.rotation);
            }
            ComponentType::Terrain => {
                let terrain = self.terrain(entity);
                record.write_u64("layer_mask", terrain.layer_mask);
                record.write_vec3("scale", &terrain.scale);
                record.write_str("material", &path_of(&res, terrain.material));
                record.write_i32("grass_count", count_i32(terrain.grass.len()));
                for grass in &terrain.grass {
                    record.write_str("grass_model", &path_of(&res, grass.model));
                    record.write_u32("grass_density", grass.density);
                    record.write_f32("grass_distance", grass.distance);
                    record.write_u32("grass_rotation_mode", grass.rotation_mode as u32);
                }
            }
            ComponentType::EnvironmentProbe => {
                let probe = self.environment_probe(entity);
                record.write_u64("guid", probe.guid);
                record.write_u32("flags", probe.flags.bits());
                record.write_f32("radius", probe.radius);
                record.write_u32("radiance_size", probe.radiance_size);
                record.write_u32("irradiance_size", probe.irradiance_size);
                record.write_u32("reflection_size", probe.reflection_size);
            }
            ComponentType::ParticleEmitter => {
                let emitter = self.particle_emitter(entity);
                record.write_str("resource", &path_of(&res, emitter.resource));
            }
        }
        record
    }

    /// Replace an entity's component with the state held in `record`
    ///
    /// An existing component of the same kind is destroyed first. `version`
    /// is the scene version the record was written with.
    pub fn deserialize_component(
        &mut self,
        world: &mut World,
        ty: ComponentType,
        entity: Entity,
        record: &ComponentRecord,
        version: i32,
    ) -> std::result::Result<(), SceneError> {
        if version > SCENE_VERSION {
            return Err(SerializationError::UnsupportedVersion(version).into());
        }
        match ComponentType::from_name(&record.component) {
            None => return Err(SerializationError::UnknownComponent(record.component.clone()).into()),
            Some(kind) if kind != ty => {
                return Err(SerializationError::CorruptData(format!(
                    "record for {} applied to {}",
                    record.component,
                    ty.name()
                ))
                .into());
            }
            Some(_) => {}
        }

        let mut reader = record.reader();
        match ty {
            ComponentType::Camera => self.read_camera_record(world, entity, &mut reader)?,
            ComponentType::ModelInstance => self.read_model_instance_record(world, entity, &mut reader)?,
            ComponentType::GlobalLight => self.read_global_light_record(world, entity, &mut reader)?,
            ComponentType::PointLight => self.read_point_light_record(world, entity, &mut reader)?,
            ComponentType::Decal => self.read_decal_record(world, entity, &mut reader)?,
            ComponentType::TextMesh => self.read_text_mesh_record(world, entity, &mut reader)?,
            ComponentType::BoneAttachment => self.read_bone_attachment_record(world, entity, &mut reader)?,
            ComponentType::Terrain => self.read_terrain_record(world, entity, &mut reader)?,
            ComponentType::EnvironmentProbe => self.read_probe_record(world, entity, &mut reader)?,
            ComponentType::ParticleEmitter => self.read_particle_emitter_record(world, entity, &mut reader)?,
        }
        log::debug!("Restored {} on {entity} from record", ty.name());
        Ok(())
    }

    fn discard_component(&mut self, world: &mut World, ty: ComponentType, entity: Entity) {
        if self.has_component(entity, ty) {
            self.destroy_component(world, ty, entity);
        }
    }

    fn read_camera_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let slot = reader.read_string("slot")?;
        let far = reader.read_f32("far")?;
        let fov = reader.read_f32("fov")?;
        let is_ortho = reader.read_bool("is_ortho")?;
        let ortho_size = reader.read_f32("ortho_size")?;
        let near = reader.read_f32("near")?;

        self.discard_component(world, ComponentType::Camera, entity);
        self.create_camera(world, entity);
        if let Some(camera) = self.cameras.get_mut(&entity) {
            camera.slot = slot;
            camera.far = far;
            camera.fov = fov;
            camera.is_ortho = is_ortho;
            camera.ortho_size = ortho_size;
            camera.near = near;
        }
        Ok(())
    }

    fn read_model_instance_record(
        &mut self,
        world: &mut World,
        entity: Entity,
        reader: &mut RecordReader<'_>,
    ) -> Result<()> {
        let source = reader.read_string("source")?;
        let flags = u8::try_from(reader.read_u32("flags")?)
            .map(ModelInstanceFlags::from_bits_truncate)
            .map_err(|_| SerializationError::CorruptData("model instance flags out of range".to_string()))?
            & ModelInstanceFlags::PERSISTENT;
        let count = reader.read_count("custom_materials")?;
        let materials = (0..count)
            .map(|_| reader.read_string("material"))
            .collect::<Result<Vec<_>>>()?;

        self.discard_component(world, ComponentType::ModelInstance, entity);
        self.create_model_instance(world, entity);
        let instance = self.instance_mut(entity);
        instance.flags.remove(ModelInstanceFlags::PERSISTENT);
        instance.flags.insert(flags);

        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let model = load_path::<Model>(&mut res, &source);
        if model.is_some() && !materials.is_empty() {
            let handles = materials.iter().map(|path| load_path::<Material>(&mut res, path)).collect();
            self.restore_custom_materials(&mut res, entity, handles);
        }
        self.set_model(world, &mut res, entity, model);
        Ok(())
    }

    fn read_global_light_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let cascades = reader.read_vec4("cascades")?;
        let diffuse_color = reader.read_vec3("diffuse_color")?;
        let diffuse_intensity = reader.read_f32("diffuse_intensity")?;
        let indirect_intensity = reader.read_f32("indirect_intensity")?;
        let fog_bottom = reader.read_f32("fog_bottom")?;
        let fog_color = reader.read_vec3("fog_color")?;
        let fog_density = reader.read_f32("fog_density")?;
        let fog_height = reader.read_f32("fog_height")?;

        self.discard_component(world, ComponentType::GlobalLight, entity);
        self.create_global_light(world, entity);
        self.global_lights.insert(
            entity,
            GlobalLight {
                entity,
                diffuse_color,
                diffuse_intensity,
                indirect_intensity,
                fog_color,
                fog_density,
                fog_bottom,
                fog_height,
                cascades,
            },
        );
        Ok(())
    }

    fn read_point_light_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let attenuation_param = reader.read_f32("attenuation")?;
        let cast_shadows = reader.read_bool("cast_shadow")?;
        let diffuse_color = reader.read_vec3("diffuse_color")?;
        let diffuse_intensity = reader.read_f32("diffuse_intensity")?;
        let fov = reader.read_f32("fov")?;
        let range = reader.read_f32("range")?;
        let specular_color = reader.read_vec3("specular_color")?;
        let specular_intensity = reader.read_f32("specular_intensity")?;

        self.discard_component(world, ComponentType::PointLight, entity);
        self.create_point_light(world, entity);
        if let Some(&index) = self.point_light_map.get(&entity) {
            self.point_lights[index] = PointLight {
                entity,
                diffuse_color,
                diffuse_intensity,
                specular_color,
                specular_intensity,
                fov,
                attenuation_param,
                range,
                cast_shadows,
            };
        }
        Ok(())
    }

    fn read_decal_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let scale = reader.read_vec3("scale")?;
        let material = reader.read_string("material")?;

        self.discard_component(world, ComponentType::Decal, entity);
        self.create_decal(world, entity);
        if let Some(decal) = self.decals.get_mut(&entity) {
            decal.scale = scale;
        }
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let material = load_path::<Material>(&mut res, &material);
        self.set_decal_material(&mut res, entity, material);
        self.update_decal_info(world, entity);
        Ok(())
    }

    fn read_text_mesh_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let font = reader.read_string("font")?;
        let color = reader.read_u32("color")?;
        let font_size = reader.read_u32("font_size")?;
        let text = reader.read_string("text")?;

        let flags = self
            .text_meshes
            .get(&entity)
            .map_or(TextMeshFlags::CAMERA_ORIENTED, |mesh| mesh.flags);
        self.discard_component(world, ComponentType::TextMesh, entity);
        self.create_text_mesh(world, entity);
        if let Some(mesh) = self.text_meshes.get_mut(&entity) {
            mesh.text = text;
            mesh.color = color;
            mesh.font_size = font_size;
            mesh.flags = flags;
        }
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let font = load_path::<FontResource>(&mut res, &font);
        self.set_text_mesh_font(&mut res, entity, font);
        Ok(())
    }

    fn read_bone_attachment_record(
        &mut self,
        world: &mut World,
        entity: Entity,
        reader: &mut RecordReader<'_>,
    ) -> Result<()> {
        let bone_index = reader.read_i32("bone_index")?;
        let parent = reader.read_entity("parent")?;
        let position = reader.read_vec3("relative_position")?;
        let rotation = reader.read_quat("relative_rotation")?;

        self.discard_component(world, ComponentType::BoneAttachment, entity);
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
        Ok(())
    }

    fn read_terrain_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let layer_mask = reader.read_u64("layer_mask")?;
        let scale = reader.read_vec3("scale")?;
        let material = reader.read_string("material")?;
        let count = reader.read_count("grass_count")?;
        let mut grass = Vec::new();
        for _ in 0..count {
            let model = reader.read_string("grass_model")?;
            let density = reader.read_u32("grass_density")?;
            let distance = reader.read_f32("grass_distance")?;
            let mode = reader.read_u32("grass_rotation_mode")?;
            let rotation_mode = GrassRotationMode::from_u32(mode)
                .ok_or_else(|| SerializationError::CorruptData(format!("invalid grass rotation mode {mode}")))?;
            grass.push((model, density, distance, rotation_mode));
        }

        self.discard_component(world, ComponentType::Terrain, entity);
        self.create_terrain(world, entity);
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let grass: Vec<GrassType> = grass
            .into_iter()
            .map(|(model, density, distance, rotation_mode)| GrassType {
                model: load_path::<Model>(&mut res, &model),
                density,
                distance,
                rotation_mode,
            })
            .collect();
        if let Some(terrain) = self.terrains.get_mut(&entity) {
            terrain.layer_mask = layer_mask;
            terrain.scale = scale;
            terrain.grass = grass;
        }
        let material = load_path::<Material>(&mut res, &material);
        self.set_terrain_material(&mut res, entity, material);
        Ok(())
    }

    fn read_probe_record(&mut self, world: &mut World, entity: Entity, reader: &mut RecordReader<'_>) -> Result<()> {
        let guid = reader.read_u64("guid")?;
        let flags = ProbeFlags::from_bits_truncate(reader.read_u32("flags")?);
        let radius = reader.read_f32("radius")?;
        let radiance_size = reader.read_u32("radiance_size")?;
        let irradiance_size = reader.read_u32("irradiance_size")?;
        let reflection_size = reader.read_u32("reflection_size")?;

        self.discard_component(world, ComponentType::EnvironmentProbe, entity);
        self.environment_probes.insert(
            entity,
            EnvironmentProbe {
                entity,
                guid,
                flags,
                radius,
                radiance_size,
                irradiance_size,
                reflection_size,
                reflection: None,
                irradiance: None,
                radiance: None,
            },
        );
        {
            let resources = Arc::clone(&self.resources);
            let mut res = lock_resources(&resources);
            self.load_probe_textures(world, &mut res, entity);
        }
        world.on_component_created(entity, ComponentType::EnvironmentProbe);
        Ok(())
    }

    fn read_particle_emitter_record(
        &mut self,
        world: &mut World,
        entity: Entity,
        reader: &mut RecordReader<'_>,
    ) -> Result<()> {
        let path = reader.read_string("resource")?;

        self.discard_component(world, ComponentType::ParticleEmitter, entity);
        self.create_particle_emitter(world, entity);
        let resources = Arc::clone(&self.resources);
        let mut res = lock_resources(&resources);
        let resource = load_path::<ParticleEmitterResource>(&mut res, &path);
        self.set_particle_emitter_resource(&mut res, entity, resource);
        Ok(())
    }
}
