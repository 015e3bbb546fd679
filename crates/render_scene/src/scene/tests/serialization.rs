use super::*;
use crate::ecs::{ComponentType, Entity};
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::Vec3;
use crate::scene::{SceneError, SCENE_VERSION};
use crate::serialization::{ComponentRecord, SerializationError};
use approx::assert_relative_eq;

const MODEL_PATH: &str = "models/cube.fbx";

/// Entities of the populated scene, one per component kind
struct Populated {
    model: Handle<Model>,
    camera: Entity,
    instance: Entity,
    hidden: Entity,
    sun: Entity,
    lamp: Entity,
    terrain: Entity,
    attachment: Entity,
    probe: Entity,
    decal: Entity,
    label: Entity,
    emitter: Entity,
}

fn populate(f: &mut Fixture) -> Populated {
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let mut entity = || f.world.create_entity();
    let p = Populated {
        model,
        camera: entity(),
        instance: entity(),
        hidden: entity(),
        sun: entity(),
        lamp: entity(),
        terrain: entity(),
        attachment: entity(),
        probe: entity(),
        decal: entity(),
        label: entity(),
        emitter: entity(),
    };
    let (world, scene) = (&mut f.world, &mut f.scene);

    scene.create_camera(world, p.camera);
    scene.set_camera_slot(p.camera, "main");
    scene.set_camera_fov(p.camera, deg_to_rad(75.0));

    scene.create_model_instance(world, p.instance);
    scene.set_model_instance_path(world, p.instance, MODEL_PATH);
    scene.set_model_instance_material(p.instance, 0, "materials/red.mat");
    scene.create_model_instance(world, p.hidden);
    scene.enable_model_instance(world, p.hidden, false);
    scene.set_model_instance_path(world, p.hidden, MODEL_PATH);

    scene.create_global_light(world, p.sun);
    scene.set_global_light_intensity(p.sun, 3.5);
    scene.set_fog_density(p.sun, 0.25);
    scene.create_point_light(world, p.lamp);
    scene.set_point_light_range(p.lamp, 42.0);
    scene.set_point_light_cast_shadows(p.lamp, true);

    scene.create_terrain(world, p.terrain);
    scene.set_terrain_material_path(p.terrain, "materials/ground.mat");
    scene.set_terrain_scale(p.terrain, Vec3::new(2.0, 50.0, 2.0));
    scene.add_grass(p.terrain, None);
    scene.set_grass_path(p.terrain, 0, "models/grass.fbx");
    scene.set_grass_density(p.terrain, 0, 12);
    scene.set_grass_distance(p.terrain, 0, 30.0);

    scene.create_bone_attachment(world, p.attachment);
    scene.set_bone_attachment_parent(world, p.attachment, Some(p.instance));
    scene.set_bone_attachment_bone(world, p.attachment, 2);
    scene.set_bone_attachment_position(world, p.attachment, Vec3::new(0.0, 1.5, 0.0));

    scene.create_environment_probe(world, p.probe);
    scene.set_environment_probe_radius(p.probe, 7.0);

    scene.create_decal(world, p.decal);
    scene.set_decal_material_path(world, p.decal, "materials/splat.mat");
    scene.set_decal_scale(world, p.decal, Vec3::new(2.0, 1.0, 2.0));

    scene.create_text_mesh(world, p.label);
    scene.set_text_mesh_text(p.label, "hello");
    scene.set_text_mesh_font_path(p.label, "fonts/mono.ttf");
    scene.set_text_mesh_font_size(p.label, 24);
    scene.set_text_mesh_color_rgba(p.label, 0x11_22_33_ff);

    scene.create_particle_emitter(world, p.emitter);
    scene.set_particle_emitter_path(p.emitter, "particles/smoke.par");
    p
}

fn serialized(scene: &RenderScene) -> Vec<u8> {
    let mut bytes = Vec::new();
    scene.serialize(&mut bytes).expect("writing to memory succeeds");
    bytes
}

#[test]
fn test_binary_round_trip_restores_every_component() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let bytes = serialized(&f.scene);
    let guid = f.scene.environment_probe_guid(p.probe);

    let mut copy = f.sibling_scene();
    copy.deserialize(&mut f.world, bytes.as_slice())
        .expect("stream written by serialize is accepted");

    assert_eq!(copy.camera_slot(p.camera), "main");
    assert_relative_eq!(copy.camera_fov(p.camera), deg_to_rad(75.0), epsilon = 1e-6);
    assert_eq!(copy.active_camera(), Some(p.camera));

    assert_eq!(copy.model_instance_path(p.instance), MODEL_PATH);
    assert_eq!(copy.model_instance_material(p.instance, 0), "materials/red.mat");
    assert!(copy.culling().is_added(p.instance));
    assert!(!copy.is_model_instance_enabled(p.hidden));
    assert!(!copy.culling().is_added(p.hidden));
    assert_eq!(f.ref_count(p.model), 5);

    assert_eq!(copy.active_global_light(), Some(p.sun));
    assert_relative_eq!(copy.global_light(p.sun).diffuse_intensity(), 3.5);
    assert_relative_eq!(copy.global_light(p.sun).fog_density(), 0.25);
    assert_relative_eq!(copy.point_light(p.lamp).range(), 42.0);
    assert!(copy.point_light(p.lamp).cast_shadows());

    assert_eq!(copy.terrain_material_path(p.terrain), "materials/ground.mat");
    assert_eq!(copy.terrain_scale(p.terrain), Vec3::new(2.0, 50.0, 2.0));
    assert_eq!(copy.grass_count(p.terrain), 1);
    assert_eq!(copy.grass_path(p.terrain, 0), "models/grass.fbx");
    assert_eq!(copy.grass_density(p.terrain, 0), 12);
    assert_relative_eq!(copy.grass_distance(p.terrain, 0), 30.0);

    assert_eq!(copy.bone_attachment_parent(p.attachment), Some(p.instance));
    assert_eq!(copy.bone_attachment_bone(p.attachment), 2);
    assert_relative_eq!(copy.bone_attachment_position(p.attachment), Vec3::new(0.0, 1.5, 0.0));

    assert_eq!(copy.environment_probe_guid(p.probe), guid);
    assert_relative_eq!(copy.environment_probe_radius(p.probe), 7.0);

    assert_eq!(copy.decal_material_path(p.decal), "materials/splat.mat");
    assert_eq!(copy.decal_scale(p.decal), Vec3::new(2.0, 1.0, 2.0));

    assert_eq!(copy.text_mesh_text(p.label), "hello");
    assert_eq!(copy.text_mesh_font_path(p.label), "fonts/mono.ttf");
    assert_eq!(copy.text_mesh_font_size(p.label), 24);
    assert_eq!(copy.text_mesh_color_rgba(p.label), 0x11_22_33_ff);

    assert_eq!(copy.particle_emitter_path(p.emitter), "particles/smoke.par");

    assert_eq!(serialized(&copy), bytes);
}

#[test]
fn test_truncated_stream_leaves_scene_empty() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let bytes = serialized(&f.scene);
    let refs_before = f.ref_count(p.model);

    let mut copy = f.sibling_scene();
    let result = copy.deserialize(&mut f.world, &bytes[..bytes.len() / 2]);
    assert!(matches!(result, Err(SceneError::Serialization(_))));

    assert_eq!(copy.cameras().count(), 0);
    assert_eq!(copy.model_instance_entities().count(), 0);
    assert!(copy.point_lights().is_empty());
    assert!(copy.culling().is_empty());
    assert_eq!(f.ref_count(p.model), refs_before);
    assert!(!copy.is_watching(p.model.id()));
}

#[test]
fn test_entity_missing_from_world_is_rejected() {
    let mut f = Fixture::new();
    let camera = f.world.create_entity();
    f.scene.create_camera(&mut f.world, camera);
    let bytes = serialized(&f.scene);

    let mut other = Fixture::new();
    let result = other.scene.deserialize(&mut other.world, bytes.as_slice());
    assert!(matches!(
        result,
        Err(SceneError::Serialization(SerializationError::CorruptData(_)))
    ));
    assert_eq!(other.scene.cameras().count(), 0);
}

#[test]
fn test_deserialize_replaces_existing_contents() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let bytes = serialized(&f.scene);
    let extra = f.world.create_entity();
    f.scene.create_point_light(&mut f.world, extra);

    f.scene
        .deserialize(&mut f.world, bytes.as_slice())
        .expect("own stream is accepted");
    assert_eq!(f.scene.point_lights().len(), 1);
    assert!(!f.scene.has_component(extra, ComponentType::PointLight));
    assert_eq!(f.scene.model_instance_material(p.instance, 0), "materials/red.mat");
    assert_eq!(f.ref_count(p.model), 3);
}

#[test]
fn test_point_light_record_restores_fields() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = f.scene.serialize_component(ComponentType::PointLight, p.lamp);
    let text = record.to_ron().expect("records convert to text");

    f.scene.set_point_light_range(p.lamp, 1.0);
    f.scene.set_point_light_cast_shadows(p.lamp, false);
    let parsed = ComponentRecord::from_ron(&text).expect("text converts back");
    f.scene
        .deserialize_component(&mut f.world, ComponentType::PointLight, p.lamp, &parsed, SCENE_VERSION)
        .expect("record is accepted");

    assert_relative_eq!(f.scene.point_light(p.lamp).range(), 42.0);
    assert!(f.scene.point_light(p.lamp).cast_shadows());
    assert_eq!(f.scene.point_lights().len(), 1);
}

#[test]
fn test_model_instance_record_copies_to_other_entity() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = f.scene.serialize_component(ComponentType::ModelInstance, p.instance);
    let pasted = f.world.create_entity();

    f.scene
        .deserialize_component(&mut f.world, ComponentType::ModelInstance, pasted, &record, SCENE_VERSION)
        .expect("record is accepted");

    assert!(f.world.has_component(pasted, ComponentType::ModelInstance));
    assert_eq!(f.scene.model_instance_path(pasted), MODEL_PATH);
    assert_eq!(f.scene.model_instance_material(pasted, 0), "materials/red.mat");
    assert!(f.scene.culling().is_added(pasted));
    let red = lock_resources(&f.resources)
        .find::<Material>("materials/red.mat")
        .expect("override is loaded");
    assert_eq!(f.scene.material_users(red), &[p.instance, pasted]);
}

#[test]
fn test_terrain_record_round_trip() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = f.scene.serialize_component(ComponentType::Terrain, p.terrain);

    f.scene.remove_grass(p.terrain, 0);
    f.scene.set_terrain_material_path(p.terrain, "");
    f.scene
        .deserialize_component(&mut f.world, ComponentType::Terrain, p.terrain, &record, SCENE_VERSION)
        .expect("record is accepted");

    assert_eq!(f.scene.terrain_material_path(p.terrain), "materials/ground.mat");
    assert_eq!(f.scene.grass_path(p.terrain, 0), "models/grass.fbx");
    assert_eq!(f.scene.grass_density(p.terrain, 0), 12);
    assert_eq!(f.scene.terrain_scale(p.terrain), Vec3::new(2.0, 50.0, 2.0));
}

#[test]
fn test_unknown_component_record_is_rejected() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = ComponentRecord::new("sky_box");

    let result = f
        .scene
        .deserialize_component(&mut f.world, ComponentType::Camera, p.camera, &record, SCENE_VERSION);
    assert!(matches!(
        result,
        Err(SceneError::Serialization(SerializationError::UnknownComponent(ref name))) if name == "sky_box"
    ));
    assert_eq!(f.scene.camera_slot(p.camera), "main");
}

#[test]
fn test_record_for_other_kind_is_rejected() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = f.scene.serialize_component(ComponentType::Camera, p.camera);

    let result = f
        .scene
        .deserialize_component(&mut f.world, ComponentType::PointLight, p.lamp, &record, SCENE_VERSION);
    assert!(matches!(
        result,
        Err(SceneError::Serialization(SerializationError::CorruptData(_)))
    ));
    assert_relative_eq!(f.scene.point_light(p.lamp).range(), 42.0);
}

#[test]
fn test_newer_record_version_is_rejected() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let record = f.scene.serialize_component(ComponentType::Camera, p.camera);

    let result = f.scene.deserialize_component(
        &mut f.world,
        ComponentType::Camera,
        p.camera,
        &record,
        SCENE_VERSION + 1,
    );
    assert!(matches!(
        result,
        Err(SceneError::Serialization(SerializationError::UnsupportedVersion(v))) if v == SCENE_VERSION + 1
    ));
}

#[test]
fn test_incomplete_record_keeps_component() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let mut record = ComponentRecord::new("point_light");
    record.write_f32("attenuation", 2.0);

    let result = f
        .scene
        .deserialize_component(&mut f.world, ComponentType::PointLight, p.lamp, &record, SCENE_VERSION);
    assert!(result.is_err());
    assert!(f.scene.has_component(p.lamp, ComponentType::PointLight));
    assert_relative_eq!(f.scene.point_light(p.lamp).range(), 42.0);
}

#[test]
fn test_trailing_instance_holes_survive_round_trip() {
    let mut f = Fixture::new();
    let _model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let kept = f.world.create_entity();
    let dropped = f.world.create_entity();
    for entity in [kept, dropped] {
        f.scene.create_model_instance(&mut f.world, entity);
        f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    }
    f.scene.destroy_model_instance(&mut f.world, dropped);
    let bytes = serialized(&f.scene);

    let mut copy = f.sibling_scene();
    copy.deserialize(&mut f.world, bytes.as_slice())
        .expect("stream written by serialize is accepted");
    assert_eq!(copy.model_instance_entities().collect::<Vec<_>>(), vec![kept]);
    assert_eq!(serialized(&copy), bytes);
}

#[test]
fn test_cleared_material_slot_survives_round_trip() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    f.scene.set_model_instance_material(p.instance, 0, "");
    let bytes = serialized(&f.scene);

    let mut copy = f.sibling_scene();
    copy.deserialize(&mut f.world, bytes.as_slice())
        .expect("stream written by serialize is accepted");
    assert!(copy.model_instance(p.instance).has_custom_meshes());
    assert_eq!(copy.model_instance_material(p.instance, 0), "");
    assert_eq!(serialized(&copy), bytes);

    let record = f.scene.serialize_component(ComponentType::ModelInstance, p.instance);
    let pasted = f.world.create_entity();
    f.scene
        .deserialize_component(&mut f.world, ComponentType::ModelInstance, pasted, &record, SCENE_VERSION)
        .expect("record is accepted");
    assert_eq!(f.scene.model_instance_material_count(pasted), 1);
    assert_eq!(f.scene.model_instance_material(pasted, 0), "");
}

#[test]
fn test_oversized_grass_count_is_rejected() {
    let mut f = Fixture::new();
    let p = populate(&mut f);
    let mut record = ComponentRecord::new("terrain");
    record.write_u64("layer_mask", 1);
    record.write_vec3("scale", &Vec3::new(1.0, 1.0, 1.0));
    record.write_str("material", "");
    record.write_i32("grass_count", i32::MAX);

    let result = f
        .scene
        .deserialize_component(&mut f.world, ComponentType::Terrain, p.terrain, &record, SCENE_VERSION);
    assert!(matches!(
        result,
        Err(SceneError::Serialization(SerializationError::CorruptData(_)))
    ));
    assert_eq!(f.scene.grass_count(p.terrain), 1);
    assert_eq!(f.scene.terrain_material_path(p.terrain), "materials/ground.mat");
}
