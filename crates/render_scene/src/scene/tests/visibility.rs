use super::*;
use crate::assets::Texture;
use crate::ecs::{ComponentType, Entity};
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::Vec3;
use crate::spatial::Frustum;
use approx::assert_relative_eq;

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

fn place_instance(f: &mut Fixture, path: &str, position: Vec3) -> Entity {
    let entity = f.world.create_entity();
    f.world.set_position(entity, position);
    f.scene.create_model_instance(&mut f.world, entity);
    f.scene.set_model_instance_path(&mut f.world, entity, path);
    entity
}

/// 16x16 terrain whose surface sits one unit above its origin
fn flat_terrain(f: &mut Fixture, position: Vec3) -> Entity {
    {
        let mut res = lock_resources(&f.resources);
        let heightmap = res.load::<Texture>("textures/flat.raw");
        res.finish_loading(heightmap, Texture::new(3, 3, 4, vec![255; 36]))
            .expect("fresh texture accepts data");
        let material = res.load::<Material>("materials/ground.mat");
        res.finish_loading(material, Material::new(1).with_textures(vec![heightmap]))
            .expect("fresh material accepts data");
    }
    let terrain = f.world.create_entity();
    f.world.set_position(terrain, position);
    f.scene.create_terrain(&mut f.world, terrain);
    f.scene.set_terrain_scale(terrain, Vec3::new(8.0, 1.0, 8.0));
    f.scene.set_terrain_material_path(terrain, "materials/ground.mat");
    terrain
}

#[test]
fn test_lod_follows_distance_and_multiplier() {
    let mut f = Fixture::new();
    ready_model(&f.resources, "models/lod.fbx", |res| {
        Model::new(
            vec![
                cube_mesh(res, "high", "materials/high.mat", 1),
                cube_mesh(res, "low", "materials/low.mat", 1),
            ],
            Vec::new(),
        )
        .with_lods(&[(0, 0, 20.0), (1, 1, 1000.0)])
    });
    let near = place_instance(&mut f, "models/lod.fbx", Vec3::new(0.0, 0.0, -10.0));
    let far = place_instance(&mut f, "models/lod.fbx", Vec3::new(0.0, 0.0, -30.0));
    let frustum = forward_frustum();

    let mut meshes = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 1);
    meshes.sort_by_key(|mesh| mesh.owner);
    let picked: Vec<_> = meshes.iter().map(|mesh| (mesh.owner, mesh.mesh_index)).collect();
    assert_eq!(picked, vec![(near, 0), (far, 1)]);
    assert_relative_eq!(meshes[0].depth, 100.0, epsilon = 1e-3);

    f.scene.set_global_lod_multiplier(5.0);
    let mut meshes = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 1);
    assert!(meshes.iter().all(|mesh| mesh.mesh_index == 1));
    assert_eq!(meshes.len(), 2);
    meshes.sort_by_key(|mesh| mesh.owner);
    assert_relative_eq!(meshes[0].depth, 500.0, epsilon = 1e-2);
}

#[test]
fn test_layer_mask_filters_meshes() {
    let mut f = Fixture::new();
    ready_model(&f.resources, "models/layered.fbx", |res| {
        Model::new(
            vec![
                cube_mesh(res, "opaque", "materials/opaque.mat", 0b01),
                cube_mesh(res, "glass", "materials/glass.mat", 0b10),
            ],
            Vec::new(),
        )
    });
    let entity = place_instance(&mut f, "models/layered.fbx", Vec3::new(0.0, 0.0, -10.0));
    let frustum = forward_frustum();

    let glass = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 0b10);
    assert_eq!(glass.len(), 1);
    assert_eq!((glass[0].owner, glass[0].mesh_index), (entity, 1));

    let both = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 0b11);
    assert_eq!(both.iter().map(|mesh| mesh.mesh_index).collect::<Vec<_>>(), vec![0, 1]);

    assert!(f
        .scene
        .model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 0b100)
        .is_empty());
}

#[test]
fn test_meshes_wait_for_their_material() {
    let mut f = Fixture::new();
    let pending = ready_model(&f.resources, "models/pending.fbx", |res| {
        let material = res.load::<Material>("materials/pending.mat");
        Model::new(
            vec![Mesh::new("body", material, 1, crate::assets::model::test_util::cube_geometry())],
            Vec::new(),
        )
    });
    place_instance(&mut f, "models/pending.fbx", Vec3::new(0.0, 0.0, -10.0));
    let frustum = forward_frustum();
    assert!(f
        .scene
        .model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 1)
        .is_empty());

    {
        let mut res = lock_resources(&f.resources);
        let material = res.get(pending).map(|model| model.mesh(0).material);
        let material = material.expect("model is ready");
        res.finish_loading(material, Material::new(1))
            .expect("pending material accepts data");
    }
    assert_eq!(
        f.scene
            .model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 1)
            .len(),
        1
    );
}

#[test]
fn test_results_keep_bucket_order() {
    let mut f = Fixture::with_config(SceneConfig {
        cull_bucket_capacity: 1,
        ..SceneConfig::default()
    });
    ready_model(&f.resources, "models/cube.fbx", cube_model);
    for i in 0..6 {
        let x = (i as f32 - 2.5) * 3.0;
        place_instance(&mut f, "models/cube.fbx", Vec3::new(x, 0.0, -20.0 - i as f32));
    }
    let frustum = forward_frustum();

    let buckets = f.scene.culling().cull(&frustum, 1);
    assert!(buckets.len() > 1);
    let meshes = f.scene.model_instance_infos(&f.world, &frustum, Vec3::zeros(), 1.0, 1);
    let owners: Vec<_> = meshes.iter().map(|mesh| mesh.owner).collect();
    assert_eq!(owners, buckets.concat());
}

#[test]
fn test_camera_visible_meshes_use_camera_frustum() {
    let mut f = Fixture::new();
    ready_model(&f.resources, "models/cube.fbx", cube_model);
    let ahead = place_instance(&mut f, "models/cube.fbx", Vec3::new(0.0, 0.0, -10.0));
    place_instance(&mut f, "models/cube.fbx", Vec3::new(0.0, 0.0, 10.0));
    let camera = f.world.create_entity();
    f.scene.create_camera(&mut f.world, camera);

    let meshes = f.scene.camera_visible_meshes(&f.world, camera, u64::MAX);
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].owner, ahead);
}

#[test]
fn test_moved_instance_is_culled_at_new_position() {
    let mut f = Fixture::new();
    ready_model(&f.resources, "models/cube.fbx", cube_model);
    let entity = place_instance(&mut f, "models/cube.fbx", Vec3::new(0.0, 0.0, -10.0));
    let frustum = forward_frustum();
    assert_eq!(f.scene.culling().cull(&frustum, 1).concat(), vec![entity]);

    f.world.set_position(entity, Vec3::new(0.0, 0.0, 10.0));
    f.scene.sync_from_world(&mut f.world);
    assert!(f.scene.culling().cull(&frustum, 1).concat().is_empty());
    assert_eq!(f.scene.culling().sphere(entity).map(|(center, _)| center), Some(Vec3::new(0.0, 0.0, 10.0)));
}

#[test]
fn test_ray_picks_closest_of_model_and_terrain() {
    let mut f = Fixture::new();
    ready_model(&f.resources, "models/cube.fbx", cube_model);
    let model = place_instance(&mut f, "models/cube.fbx", Vec3::new(0.0, 0.0, -10.0));
    let terrain = flat_terrain(&mut f, Vec3::new(-6.0, -1.0, -17.0));
    let origin = Vec3::new(0.2, 10.0, -10.1);
    let down = Vec3::new(0.0, -1.0, 0.0);

    let hit = f.scene.cast_ray(&f.world, origin, down, None).expect("cube is under the ray");
    assert_eq!(hit.entity, model);
    assert_eq!(hit.component, ComponentType::ModelInstance);
    assert_eq!(hit.mesh, Some(0));
    assert_relative_eq!(hit.t, 9.5, epsilon = 1e-4);
    assert_relative_eq!(hit.position(), Vec3::new(0.2, 0.5, -10.1), epsilon = 1e-4);

    let hit = f
        .scene
        .cast_ray(&f.world, origin, down, Some(model))
        .expect("terrain is under the ray");
    assert_eq!(hit.entity, terrain);
    assert_eq!(hit.component, ComponentType::Terrain);
    assert_eq!(hit.mesh, None);
    assert_relative_eq!(hit.t, 10.0, epsilon = 1e-3);

    f.world.set_position(terrain, Vec3::new(-6.0, 1.0, -17.0));
    let hit = f.scene.cast_ray(&f.world, origin, down, None).expect("terrain is above the cube");
    assert_eq!(hit.entity, terrain);
    assert_relative_eq!(hit.t, 8.0, epsilon = 1e-3);
}

#[test]
fn test_terrain_without_ready_material_is_not_hit() {
    let mut f = Fixture::new();
    let terrain = f.world.create_entity();
    f.scene.create_terrain(&mut f.world, terrain);
    f.scene.set_terrain_material_path(terrain, "materials/unloaded.mat");
    assert!(f
        .scene
        .cast_ray_terrain(&f.world, terrain, Vec3::new(0.5, 5.0, 0.5), Vec3::new(0.0, -1.0, 0.0))
        .is_none());
    assert_eq!(f.scene.terrain_resolution(terrain), (0, 0));
}

#[test]
fn test_grass_is_deterministic_and_bounded() {
    let mut f = Fixture::new();
    let grass_model = ready_model(&f.resources, "models/grass.fbx", cube_model);
    let terrain = flat_terrain(&mut f, Vec3::zeros());
    f.scene.add_grass(terrain, None);
    f.scene.set_grass_path(terrain, 0, "models/grass.fbx");
    f.scene.set_grass_density(terrain, 0, 50);
    f.scene.set_grass_distance(terrain, 0, 10.0);

    let frustum = Frustum::perspective(
        Vec3::new(8.0, 20.0, 8.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        deg_to_rad(90.0),
        1.0,
        0.1,
        100.0,
    );
    let patches = f.scene.grass_infos(&f.world, &frustum);
    assert!(!patches.is_empty());
    for patch in &patches {
        assert_eq!(patch.model, grass_model);
        assert!(patch.matrices.len() <= 50);
        for matrix in &patch.matrices {
            let position = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
            assert!(((position.x - 8.0).powi(2) + (position.z - 8.0).powi(2)).sqrt() <= 10.0 + 1e-3);
            assert_relative_eq!(position.y, 1.0, epsilon = 1e-4);
        }
    }
    assert_eq!(f.scene.grass_infos(&f.world, &frustum), patches);

    f.scene.enable_grass(false);
    assert!(f.scene.grass_infos(&f.world, &frustum).is_empty());
}

#[test]
fn test_heightmap_ready_after_material_fills_terrain() {
    let mut f = Fixture::new();
    let heightmap = {
        let mut res = lock_resources(&f.resources);
        let heightmap = res.load::<Texture>("textures/late.raw");
        let material = res.load::<Material>("materials/late_ground.mat");
        res.finish_loading(material, Material::new(1).with_textures(vec![heightmap]))
            .expect("fresh material accepts data");
        heightmap
    };
    let terrain = f.world.create_entity();
    f.scene.create_terrain(&mut f.world, terrain);
    f.scene.set_terrain_scale(terrain, Vec3::new(8.0, 1.0, 8.0));
    f.scene.set_terrain_material_path(terrain, "materials/late_ground.mat");
    assert_eq!(f.scene.terrain_resolution(terrain), (0, 0));
    assert!(f.scene.is_watching(heightmap.id()));

    lock_resources(&f.resources)
        .finish_loading(heightmap, Texture::new(3, 3, 4, vec![255; 36]))
        .expect("fresh texture accepts data");
    f.process_events();
    assert_eq!(f.scene.terrain_resolution(terrain), (3, 3));
    let t = f
        .scene
        .cast_ray_terrain(&f.world, terrain, Vec3::new(6.0, 10.0, 5.0), Vec3::new(0.0, -1.0, 0.0))
        .expect("terrain has heights now");
    assert_relative_eq!(t, 9.0, epsilon = 1e-3);

    f.scene.destroy_terrain(&mut f.world, terrain);
    assert!(!f.scene.is_watching(heightmap.id()));
}
