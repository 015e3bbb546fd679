use super::*;
use crate::assets::{Bone, Pose};
use crate::ecs::ComponentType;
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::{Quat, RigidTransform, Vec3};
use crate::scene::MeshBinding;
use crate::spatial::Frustum;

const MODEL_PATH: &str = "models/cube.fbx";

fn forward_frustum() -> Frustum {
    Frustum::perspective(
        Vec3::zeros(),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, 1.0, 0.0),
        deg_to_rad(90.0),
        1.0,
        0.1,
        1000.0,
    )
}

#[test]
fn test_instance_without_model() {
    let mut f = Fixture::new();
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);

    assert!(f.world.has_component(entity, ComponentType::ModelInstance));
    assert!(f.scene.is_model_instance_enabled(entity));
    assert_eq!(f.scene.model_instance_path(entity), "");
    assert_eq!(f.scene.model_instance_material_count(entity), 0);
    assert!(!f.scene.culling().is_added(entity));
    assert!(f
        .scene
        .cast_ray(&f.world, Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), None)
        .is_none());
}

#[test]
fn test_instance_joins_culling_when_model_becomes_ready() {
    let mut f = Fixture::new();
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);

    assert_eq!(f.scene.model_instance_path(entity), MODEL_PATH);
    assert_eq!(f.scene.model_instance_material_count(entity), 0);
    assert!(!f.scene.culling().is_added(entity));

    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    f.process_events();

    assert!(f.scene.culling().is_added(entity));
    assert_eq!(f.scene.model_instance(entity).meshes(), &MeshBinding::Shared);
    assert_eq!(f.scene.model_instance_material_count(entity), 1);
    assert_eq!(f.scene.model_instance_material(entity, 0), "materials/cube.mat");
    assert_eq!(f.scene.model_dependents(model), vec![entity]);
}

#[test]
fn test_enabled_flag_controls_culling_membership() {
    let mut f = Fixture::new();
    let _model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let shown = f.world.create_entity();
    let hidden = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, shown);
    f.scene.create_model_instance(&mut f.world, hidden);
    f.scene.enable_model_instance(&f.world, hidden, false);
    f.scene.set_model_instance_path(&mut f.world, shown, MODEL_PATH);
    f.scene.set_model_instance_path(&mut f.world, hidden, MODEL_PATH);

    assert!(f.scene.culling().is_added(shown));
    assert!(!f.scene.culling().is_added(hidden));

    f.scene.enable_model_instance(&f.world, shown, false);
    f.scene.enable_model_instance(&f.world, hidden, true);
    assert!(!f.scene.culling().is_added(shown));
    assert!(f.scene.culling().is_added(hidden));
    assert!(!f.scene.is_model_instance_enabled(shown));
    assert_eq!(f.scene.culling().len(), 1);
}

#[test]
fn test_instances_sharing_a_model_are_listed_newest_first() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entities: Vec<_> = (0..3).map(|_| f.world.create_entity()).collect();
    for &entity in &entities {
        f.scene.create_model_instance(&mut f.world, entity);
        f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    }
    assert_eq!(f.scene.model_dependents(model), vec![entities[2], entities[1], entities[0]]);
    assert_eq!(f.ref_count(model), 4);

    f.scene.destroy_model_instance(&mut f.world, entities[1]);
    assert_eq!(f.scene.model_dependents(model), vec![entities[2], entities[0]]);
    assert_eq!(f.ref_count(model), 3);
}

#[test]
fn test_destroy_releases_model_and_custom_materials() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    f.scene.set_model_instance_material(entity, 0, "materials/red.mat");

    let red = lock_resources(&f.resources)
        .find::<Material>("materials/red.mat")
        .expect("override is loaded");
    assert!(f.scene.model_instance(entity).has_custom_meshes());
    assert_eq!(f.scene.model_instance_material(entity, 0), "materials/red.mat");
    assert_eq!(f.scene.material_users(red), &[entity]);
    assert_eq!(f.ref_count(red), 1);
    assert_eq!(f.ref_count(model), 2);
    assert!(f.scene.is_watching(model.id()));

    f.scene.destroy_model_instance(&mut f.world, entity);

    assert!(!f.world.has_component(entity, ComponentType::ModelInstance));
    assert_eq!(f.ref_count(red), 0);
    assert_eq!(f.ref_count(model), 1);
    assert!(f.scene.model_dependents(model).is_empty());
    assert!(!f.scene.is_watching(model.id()));
    assert!(!f.scene.culling().is_added(entity));
}

#[test]
fn test_clearing_an_override_keeps_custom_slots() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);

    f.scene.set_model_instance_material(entity, 0, "materials/red.mat");
    f.scene.set_model_instance_material(entity, 0, "");
    assert!(f.scene.model_instance(entity).has_custom_meshes());
    assert_eq!(f.scene.model_instance_material(entity, 0), "");
    assert!(lock_resources(&f.resources)
        .find::<Material>("materials/red.mat")
        .is_none());

    lock_resources(&f.resources)
        .begin_reload(model)
        .expect("ready model can reload");
    f.process_events();
    {
        let mut res = lock_resources(&f.resources);
        let data = cube_model(&mut res);
        res.finish_loading(model, data).expect("reloaded data accepted");
    }
    f.process_events();
    assert_eq!(f.scene.model_instance_material_count(entity), 1);
    assert_eq!(f.scene.model_instance_material(entity, 0), "");
}

#[test]
fn test_model_reload_detaches_and_reattaches_instances() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    assert!(f.scene.culling().is_added(entity));

    lock_resources(&f.resources)
        .begin_reload(model)
        .expect("ready model can reload");
    f.process_events();
    assert!(!f.scene.culling().is_added(entity));
    assert_eq!(f.scene.model_instance(entity).meshes(), &MeshBinding::None);
    assert_eq!(f.scene.model_instance_material_count(entity), 0);
    assert_eq!(f.scene.model_instance_path(entity), MODEL_PATH);

    {
        let mut res = lock_resources(&f.resources);
        let data = cube_model(&mut res);
        res.finish_loading(model, data).expect("reloaded data accepted");
    }
    f.process_events();
    assert!(f.scene.culling().is_added(entity));
    assert_eq!(f.scene.model_instance_material_count(entity), 1);
}

#[test]
fn test_failed_model_keeps_instance_out_of_culling() {
    let mut f = Fixture::new();
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, "models/missing.fbx");
    let model = lock_resources(&f.resources)
        .find::<Model>("models/missing.fbx")
        .expect("path is requested");

    lock_resources(&f.resources).fail_loading(model).expect("pending model can fail");
    f.process_events();
    assert!(!f.scene.culling().is_added(entity));
    assert_eq!(f.scene.model_instance_material_count(entity), 0);
}

#[test]
fn test_custom_material_layers_follow_material_state() {
    let mut f = Fixture::new();
    let _model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entity = f.world.create_entity();
    f.world.set_position(entity, Vec3::new(0.0, 0.0, -10.0));
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    assert_eq!(f.scene.culling().cull(&forward_frustum(), 1).concat(), vec![entity]);

    f.scene.set_model_instance_material(entity, 0, "materials/late.mat");
    assert!(f.scene.culling().cull(&forward_frustum(), 1).concat().is_empty());
    assert!(f.scene.culling().cull(&forward_frustum(), 0b100).concat().is_empty());

    let late = lock_resources(&f.resources)
        .find::<Material>("materials/late.mat")
        .expect("override is loaded");
    lock_resources(&f.resources)
        .finish_loading(late, Material::new(0b100))
        .expect("pending material accepts data");
    f.process_events();

    assert_eq!(f.scene.culling().cull(&forward_frustum(), 0b100).concat(), vec![entity]);
    let frustum = forward_frustum();
    let meshes = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 0b100);
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].material, late);
}

#[test]
fn test_destroyed_entity_loses_its_components() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, MODEL_PATH, cube_model);
    let entity = f.world.create_entity();
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, MODEL_PATH);
    f.scene.create_point_light(&mut f.world, entity);

    f.world.destroy_entity(entity);
    f.scene.sync_from_world(&mut f.world);

    assert!(!f.scene.has_component(entity, ComponentType::ModelInstance));
    assert!(!f.scene.has_component(entity, ComponentType::PointLight));
    assert!(f.scene.point_lights().is_empty());
    assert_eq!(f.ref_count(model), 1);
    assert!(f.scene.culling().is_empty());
}

/// Two-bone skeleton: a root and a head one unit above it
fn rigged_model(res: &mut ResourceManager) -> Model {
    Model::new(
        vec![cube_mesh(res, "body", "materials/body.mat", 1)],
        vec![
            Bone {
                name: "root".to_string(),
                transform: RigidTransform::default(),
                parent: None,
            },
            Bone {
                name: "head".to_string(),
                transform: RigidTransform::new(Vec3::new(0.0, 1.0, 0.0), Quat::identity()),
                parent: Some(0),
            },
        ],
    )
}

#[test]
fn test_shared_model_reload_rebuilds_every_pose() {
    let mut f = Fixture::new();
    let model = ready_model(&f.resources, "models/rig.fbx", rigged_model);
    let first = f.world.create_entity();
    let second = f.world.create_entity();
    for entity in [first, second] {
        f.scene.create_model_instance(&mut f.world, entity);
        f.scene.set_model_instance_path(&mut f.world, entity, "models/rig.fbx");
        assert_eq!(f.scene.model_instance_pose(entity).map(Pose::len), Some(2));
    }
    assert_eq!(f.scene.model_dependents(model), vec![second, first]);
    if let Some(pose) = f.scene.lock_pose(first) {
        pose.positions[1] = Vec3::new(0.0, 5.0, 0.0);
    }
    f.scene.unlock_pose(&mut f.world, first, true);

    lock_resources(&f.resources)
        .begin_reload(model)
        .expect("ready model can reload");
    f.process_events();
    for entity in [first, second] {
        assert!(f.scene.model_instance_pose(entity).is_none());
        assert!(!f.scene.culling().is_added(entity));
    }
    assert_eq!(f.scene.model_dependents(model), vec![second, first]);

    {
        let mut res = lock_resources(&f.resources);
        let data = rigged_model(&mut res);
        res.finish_loading(model, data).expect("reloaded data accepted");
    }
    f.process_events();
    for entity in [first, second] {
        let pose = f.scene.model_instance_pose(entity).expect("pose is rebuilt");
        assert_eq!(pose.len(), 2);
        assert_eq!(pose.positions[1], Vec3::new(0.0, 1.0, 0.0));
        assert!(f.scene.culling().is_added(entity));
    }
    assert_eq!(f.scene.model_dependents(model), vec![second, first]);
    assert_eq!(f.ref_count(model), 3);
}
