//! Entity registry consumed by the render scene
//!
//! The scene never owns entities. It reads their transforms, announces the
//! components it creates and destroys, and reacts to the move/destroy events
//! queued here.

mod component;
mod entity;
mod world;

pub use component::{ComponentSet, ComponentType};
pub use entity::{entity_from_i32, entity_to_i32, Entity};
pub use world::{World, WorldEvent};
