//! bouquet
//!
//! A small cross-platform 3D gift scene: a gradient-coloured rose, a
//! companion character and floating extruded text, drawn with wgpu in a
//! native window or on a WebGL canvas.
//!
//! High-level modules
//! - `camera`: orbit camera, its input controller and uniforms for view/projection
//! - `config`: the scene description and its TOML loading
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances, textures, bounds and the scene graph
//! - `flow`: the event loop and the flow abstraction it drives
//! - `gift`: the flow that builds and shows the configured scene
//! - `pipelines`: the lit model pipeline and its light uniform
//! - `resources`: loading OBJ/MTL, glTF, textures and typefaces
//! - `render`: render composition for batching draws
//! - `text`: typeface layout and bevelled text extrusion
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gift;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod text;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point: renders the built-in gift scene into `#canvas`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    flow::init_logger().map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
    let scene = config::SceneConfig::default();
    flow::run(scene.clone(), vec![gift::GiftFlow::constructor(scene)])
        .map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
