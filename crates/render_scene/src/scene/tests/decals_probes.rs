use super::*;
use crate::assets::Texture;
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
        100.0,
    )
}

#[test]
fn test_decals_need_ready_material_and_visibility() {
    let mut f = Fixture::new();
    let ready = ready_material(&mut lock_resources(&f.resources), "materials/splat.mat", 1);
    let visible = f.world.create_entity();
    let pending = f.world.create_entity();
    let behind = f.world.create_entity();
    f.world.set_position(visible, Vec3::new(0.0, 0.0, -10.0));
    f.world.set_position(pending, Vec3::new(0.0, 0.0, -10.0));
    f.world.set_position(behind, Vec3::new(0.0, 0.0, 20.0));
    for (entity, path) in [
        (visible, "materials/splat.mat"),
        (pending, "materials/unloaded.mat"),
        (behind, "materials/splat.mat"),
    ] {
        f.scene.create_decal(&mut f.world, entity);
        f.scene.set_decal_material_path(&f.world, entity, path);
    }
    f.scene.set_decal_scale(&f.world, visible, Vec3::new(2.0, 1.0, 2.0));

    let decals = f.scene.decals_in_frustum(&forward_frustum());
    assert_eq!(decals.len(), 1);
    assert_eq!(decals[0].material, Some(ready));
    assert_relative_eq!(decals[0].position, Vec3::new(0.0, 0.0, -10.0));
    assert_relative_eq!(decals[0].radius, 3.0, epsilon = 1e-5);

    f.world.set_position(visible, Vec3::new(0.0, 0.0, -30.0));
    f.scene.sync_from_world(&mut f.world);
    assert_relative_eq!(
        f.scene.decal_info(visible).position,
        Vec3::new(0.0, 0.0, -30.0)
    );
}

#[test]
fn test_decal_material_reference_is_released() {
    let mut f = Fixture::new();
    let decal = f.world.create_entity();
    f.scene.create_decal(&mut f.world, decal);
    f.scene.set_decal_material_path(&f.world, decal, "materials/splat.mat");
    let material = lock_resources(&f.resources)
        .find::<Material>("materials/splat.mat")
        .expect("decal material is requested");
    assert_eq!(f.ref_count(material), 1);

    f.scene.destroy_decal(&mut f.world, decal);
    assert_eq!(f.ref_count(material), 0);
}

#[test]
fn test_probe_textures_follow_guid() {
    let mut f = Fixture::new();
    let probe = f.world.create_entity();
    f.world.set_position(probe, Vec3::new(1.0, 2.0, 3.0));
    f.scene.create_environment_probe(&mut f.world, probe);

    let placeholder = lock_resources(&f.resources)
        .find::<Texture>(&SceneConfig::default().default_probe_texture)
        .expect("placeholder is loaded");
    assert_eq!(f.ref_count(placeholder), 3);

    f.scene.enable_environment_probe_reflection(probe, true);
    f.scene.reload_environment_probe(&f.world, probe);
    assert_eq!(f.ref_count(placeholder), 0);

    let guid = f.scene.environment_probe_guid(probe);
    let directory = f.scene.probe_directory(&f.world);
    assert_eq!(directory, "universes/test_world/probes");
    let res = lock_resources(&f.resources);
    let texture_path = |handle: Option<Handle<Texture>>| handle.map(|h| res.path(h).to_string());
    assert_eq!(
        texture_path(f.scene.environment_probe_texture(probe)),
        Some(format!("{directory}/{guid}.dds"))
    );
    assert_eq!(
        texture_path(f.scene.environment_probe_irradiance(probe)),
        Some(format!("{directory}/{guid}_irradiance.dds"))
    );
    assert_eq!(
        texture_path(f.scene.environment_probe_radiance(probe)),
        Some(format!("{directory}/{guid}_radiance.dds"))
    );
}

#[test]
fn test_disabled_probes_are_not_listed() {
    let mut f = Fixture::new();
    let lit = f.world.create_entity();
    let dark = f.world.create_entity();
    f.world.set_position(lit, Vec3::new(1.0, 2.0, 3.0));
    f.scene.create_environment_probe(&mut f.world, lit);
    f.scene.create_environment_probe(&mut f.world, dark);
    f.scene.set_environment_probe_radius(lit, 4.0);
    f.scene.enable_environment_probe(dark, false);

    let probes = f.scene.environment_probes(&f.world);
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].entity, lit);
    assert_eq!(probes[0].position, Vec3::new(1.0, 2.0, 3.0));
    assert_relative_eq!(probes[0].radius, 4.0);
}
