//! Scene data: geometry, materials, textures, transforms and the scene graph.
//!
//! - `bounds` measures nodes and computes auto-scale factors
//! - `instance` holds per-node transformation data
//! - `model` contains mesh and material definitions and their GPU resources
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` wraps GPU textures and builds gradient maps

pub mod bounds;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
