use super::*;
use crate::ecs::ComponentType;
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::{Vec2, Vec3};
use crate::spatial::Frustum;
use approx::assert_relative_eq;

#[test]
fn test_camera_lod_multiplier_scales_with_fov() {
    let mut f = Fixture::new();
    let camera = f.world.create_entity();
    f.scene.create_camera(&mut f.world, camera);

    assert_relative_eq!(f.scene.camera_lod_multiplier(camera), 1.0, epsilon = 1e-5);
    f.scene.set_camera_fov(camera, deg_to_rad(120.0));
    assert_relative_eq!(f.scene.camera_lod_multiplier(camera), 4.0, epsilon = 1e-4);
    f.scene.set_camera_ortho(camera, true);
    assert_relative_eq!(f.scene.camera_lod_multiplier(camera), 1.0, epsilon = 1e-5);
}

#[test]
fn test_first_camera_becomes_active() {
    let mut f = Fixture::new();
    let main = f.world.create_entity();
    let editor = f.world.create_entity();
    f.scene.create_camera(&mut f.world, main);
    f.scene.create_camera(&mut f.world, editor);
    f.scene.set_camera_slot(main, "main");
    f.scene.set_camera_slot(editor, "editor");

    assert_eq!(f.scene.active_camera(), Some(main));
    assert_eq!(f.scene.camera_in_slot("editor"), Some(editor));
    assert_eq!(f.scene.camera_in_slot("probe"), None);

    f.scene.set_active_camera(Some(editor));
    assert_eq!(f.scene.active_camera(), Some(editor));
    f.scene.destroy_camera(&mut f.world, editor);
    assert!(!f.world.has_component(editor, ComponentType::Camera));
    assert_eq!(f.scene.cameras().collect::<Vec<_>>(), vec![main]);
}

#[test]
fn test_camera_ray_through_viewport() {
    let mut f = Fixture::new();
    let camera = f.world.create_entity();
    f.world.set_position(camera, Vec3::new(0.0, 2.0, 0.0));
    f.scene.create_camera(&mut f.world, camera);
    f.scene.set_camera_screen_size(camera, 800.0, 600.0);

    let center = f.scene.camera_ray(&f.world, camera, Vec2::new(400.0, 300.0));
    assert_relative_eq!(center.origin, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
    assert_relative_eq!(center.direction, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-4);

    let corner = f.scene.camera_ray(&f.world, camera, Vec2::new(800.0, 0.0));
    assert!(corner.direction.x > 0.0);
    assert!(corner.direction.y > 0.0);
    assert!(corner.direction.z < 0.0);
}

#[test]
fn test_orthographic_ray_is_parallel_to_view() {
    let mut f = Fixture::new();
    let camera = f.world.create_entity();
    f.scene.create_camera(&mut f.world, camera);
    f.scene.set_camera_ortho(camera, true);
    f.scene.set_camera_screen_size(camera, 800.0, 800.0);
    f.scene.set_camera_ortho_size(camera, 10.0);

    let ray = f.scene.camera_ray(&f.world, camera, Vec2::new(800.0, 400.0));
    assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-4);
    assert_relative_eq!(ray.origin.x, 10.0, epsilon = 1e-3);
}

#[test]
fn test_point_light_removal_swaps_last_into_place() {
    let mut f = Fixture::new();
    let lights: Vec<_> = (0..3).map(|_| f.world.create_entity()).collect();
    for (i, &light) in lights.iter().enumerate() {
        f.scene.create_point_light(&mut f.world, light);
        f.scene.set_point_light_range(light, 10.0 + i as f32);
    }

    f.scene.destroy_point_light(&mut f.world, lights[0]);

    let order: Vec<_> = f.scene.point_lights().iter().map(|light| light.entity()).collect();
    assert_eq!(order, vec![lights[2], lights[1]]);
    assert_relative_eq!(f.scene.point_light(lights[2]).range(), 12.0);
    assert_relative_eq!(f.scene.point_light(lights[1]).range(), 11.0);
    assert!(!f.scene.has_component(lights[0], ComponentType::PointLight));

    f.scene.destroy_point_light(&mut f.world, lights[1]);
    assert_eq!(f.scene.point_lights().len(), 1);
    assert_relative_eq!(f.scene.point_light(lights[2]).range(), 12.0);
}

#[test]
fn test_point_light_queries() {
    let mut f = Fixture::new();
    let near = f.world.create_entity();
    let far = f.world.create_entity();
    let behind = f.world.create_entity();
    f.world.set_position(near, Vec3::new(0.0, 0.0, -5.0));
    f.world.set_position(far, Vec3::new(0.0, 0.0, -50.0));
    f.world.set_position(behind, Vec3::new(0.0, 0.0, 30.0));
    for light in [near, far, behind] {
        f.scene.create_point_light(&mut f.world, light);
        f.scene.set_point_light_range(light, 2.0);
    }

    let frustum = Frustum::perspective(
        Vec3::zeros(),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, 1.0, 0.0),
        deg_to_rad(90.0),
        1.0,
        0.1,
        100.0,
    );
    assert_eq!(f.scene.point_lights_in_frustum(&f.world, &frustum), vec![near, far]);
    assert_eq!(f.scene.closest_point_lights(&f.world, Vec3::zeros(), 2), vec![near, behind]);
}

#[test]
fn test_active_global_light() {
    let mut f = Fixture::new();
    let sun = f.world.create_entity();
    let moon = f.world.create_entity();
    f.scene.create_global_light(&mut f.world, sun);
    f.scene.create_global_light(&mut f.world, moon);
    assert_eq!(f.scene.active_global_light(), Some(sun));

    f.scene.set_active_global_light(Some(moon));
    f.scene.destroy_global_light(&mut f.world, moon);
    assert_eq!(f.scene.active_global_light(), None);

    f.scene.set_active_global_light(Some(sun));
    assert_eq!(f.scene.active_global_light(), Some(sun));
}

#[test]
#[should_panic(expected = "has no global light component")]
fn test_activating_entity_without_global_light_panics() {
    let mut f = Fixture::new();
    let entity = f.world.create_entity();
    f.scene.set_active_global_light(Some(entity));
}
