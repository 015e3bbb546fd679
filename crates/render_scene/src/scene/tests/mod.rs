//! Scenario tests driving the scene through the world and the resource manager

mod decals_probes;
mod lights_cameras;
mod model_lifecycle;
mod serialization;
mod visibility;

use super::RenderScene;
use crate::assets::model::test_util::cube_geometry;
use crate::assets::{
    lock_resources, Handle, Material, Mesh, Model, ResourceConfig, ResourceManager, ResourceState, SharedResources,
};
use crate::config::SceneConfig;
use crate::ecs::World;
use crate::foundation::logging;
use std::sync::Arc;

/// A world, a scene and the resource manager they share
struct Fixture {
    resources: SharedResources,
    world: World,
    scene: RenderScene,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    fn with_config(config: SceneConfig) -> Self {
        logging::init_for_tests();
        let resources = ResourceManager::shared(ResourceConfig::default());
        let scene = RenderScene::new(Arc::clone(&resources), config);
        Self {
            resources,
            world: World::with_name("test_world"),
            scene,
        }
    }

    /// Second scene over the same resources, for round trips
    fn sibling_scene(&self) -> RenderScene {
        RenderScene::new(Arc::clone(&self.resources), SceneConfig::default())
    }

    fn ref_count<T: crate::assets::Resource>(&self, handle: Handle<T>) -> u32 {
        lock_resources(&self.resources).ref_count(handle)
    }

    fn process_events(&mut self) {
        self.scene.process_resource_events(&mut self.world);
    }
}

/// Load a material and mark it ready; the caller owns the returned reference
fn ready_material(res: &mut ResourceManager, path: &str, layer_mask: u64) -> Handle<Material> {
    let material = res.load::<Material>(path);
    if res.state(material) == ResourceState::Empty {
        res.finish_loading(material, Material::new(layer_mask))
            .expect("fresh material accepts data");
    }
    material
}

/// Unit cube mesh drawn with a ready material
fn cube_mesh(res: &mut ResourceManager, name: &str, material_path: &str, layer_mask: u64) -> Mesh {
    let material = ready_material(res, material_path, layer_mask);
    Mesh::new(name, material, layer_mask, cube_geometry())
}

/// Single-cube model drawn into layer 1
fn cube_model(res: &mut ResourceManager) -> Model {
    Model::new(vec![cube_mesh(res, "cube", "materials/cube.mat", 1)], Vec::new())
}

/// Load `path` and finish it with the model `build` returns; the caller owns one reference
fn ready_model(
    resources: &SharedResources,
    path: &str,
    build: impl FnOnce(&mut ResourceManager) -> Model,
) -> Handle<Model> {
    let mut res = lock_resources(resources);
    let model = res.load::<Model>(path);
    let data = build(&mut res);
    res.finish_loading(model, data).expect("fresh model accepts data");
    model
}
