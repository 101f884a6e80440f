//! The gift scene: every model and text of a [`SceneConfig`], loaded
//! concurrently, recoloured, placed and drawn with the lit pipeline.

use std::collections::HashMap;

use futures::future::join_all;
use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::{MaterialOverride, ModelConfig, SceneConfig, TextConfig},
    context::{Context, InitContext},
    data_structures::{
        bounds::auto_scale,
        instance::Instance,
        model::{self, Model},
        scene_graph::{ModelNode, SceneNode},
        texture::{Texture, parse_hex_colour, srgb_to_linear},
    },
    error::AssetError,
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::Render,
    resources::{
        self, ModelFormat,
        texture::{MaterialSource, material_layout},
    },
    text::{TextMesh, typeface::Typeface},
};

pub struct GiftFlow {
    nodes: Vec<Box<dyn SceneNode>>,
}

impl GiftFlow {
    /// Loads everything the scene lists. Assets that fail to load are logged
    /// and left out; the rest of the scene still renders.
    pub async fn new(ctx: InitContext, scene: SceneConfig) -> Self {
        let InitContext { device, queue } = &ctx;

        let models = join_all(scene.models.iter().map(|config| async move {
            let result = load_placed_model(config, device, queue).await;
            (config, result)
        }));
        let typefaces = load_typefaces(&scene.texts);
        let (models, typefaces) = futures::join!(models, typefaces);

        let mut nodes = Vec::new();
        for (config, result) in models {
            match result {
                Ok(node) => nodes.push(node),
                Err(e) => log::error!("Model {} is left out: {e:#}", config.url),
            }
        }
        for config in &scene.texts {
            let Some(typeface) = typefaces.get(&config.font) else {
                log::error!(
                    "Text {:?} is left out: typeface {} is not available",
                    config.text,
                    config.font
                );
                continue;
            };
            match build_text_node(config, typeface, device, queue) {
                Ok(node) => nodes.push(node),
                Err(e) => log::error!("Text {:?} is left out: {e:#}", config.text),
            }
        }

        log::info!(
            "Gift scene ready with {} of {} nodes",
            nodes.len(),
            scene.models.len() + scene.texts.len()
        );
        Self { nodes }
    }

    pub fn constructor(scene: SceneConfig) -> FlowConstructor<()> {
        Box::new(move |ctx| {
            Box::pin(async move {
                Box::new(GiftFlow::new(ctx, scene).await) as Box<dyn GraphicsFlow<()>>
            })
        })
    }
}

async fn load_placed_model(
    config: &ModelConfig,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let format = ModelFormat::from_url(&config.url)?;
    let mut node = resources::load_model(config, device, queue).await?;

    match format {
        ModelFormat::Obj => apply_overrides(node.as_mut(), &config.overrides, device, queue)?,
        ModelFormat::Gltf if !config.overrides.is_empty() => log::warn!(
            "Material overrides are only applied to OBJ models; {} keeps its own materials.",
            config.url
        ),
        ModelFormat::Gltf => (),
    }

    place(
        node.as_mut(),
        Instance::from_euler_xyz(config.position, config.rotation),
        config.scale,
        config.target_size,
    );
    Ok(node)
}

/// Sets the placement transform and, without an explicit scale, fits the
/// node to `target_size`.
pub fn place(
    node: &mut dyn SceneNode,
    mut placement: Instance,
    scale: Option<[f32; 3]>,
    target_size: f32,
) {
    if let Some(scale) = scale {
        placement.scale = scale.into();
    }
    node.set_local_transform(0, placement);
    node.update_world_transform_all();
    if scale.is_none() {
        if let Some(factor) = auto_scale(node, target_size) {
            log::debug!("Auto-scaled to {target_size} with factor {factor}");
        }
    }
}

struct PreparedOverride<'a> {
    mesh_name: &'a str,
    color: [f32; 4],
    diffuse: Option<Texture>,
}

/// Override targets that name none of `mesh_names`. Names match exactly.
fn unmatched_overrides<'a>(
    overrides: &'a [MaterialOverride],
    mesh_names: &[String],
) -> Vec<&'a str> {
    overrides
        .iter()
        .map(|o| o.mesh_name.as_str())
        .filter(|target| !mesh_names.iter().any(|name| name == target))
        .collect()
}

/// Recolours every mesh named by an override. A gradient replaces the
/// diffuse map of the matching meshes.
pub fn apply_overrides(
    node: &mut dyn SceneNode,
    overrides: &[MaterialOverride],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<()> {
    let mut prepared = Vec::with_capacity(overrides.len());
    for o in overrides {
        let color = srgb_to_linear(parse_hex_colour(&o.color)?);
        let diffuse = match &o.gradient {
            Some(gradient) => Some(Texture::from_gradient(
                device,
                queue,
                gradient,
                &format!("{} gradient", o.mesh_name),
            )?),
            None => None,
        };
        prepared.push(PreparedOverride {
            mesh_name: &o.mesh_name,
            color,
            diffuse,
        });
    }

    let mut mesh_names = Vec::new();
    node.for_each_mesh_material_mut(&mut |mesh_name, material| {
        for o in prepared.iter().filter(|o| o.mesh_name == mesh_name) {
            material.set_color(queue, o.color);
            if let Some(diffuse) = &o.diffuse {
                material.set_diffuse(device, diffuse.clone());
            }
        }
        mesh_names.push(mesh_name.to_string());
    });

    for mesh_name in unmatched_overrides(overrides, &mesh_names) {
        log::warn!("Override for mesh {mesh_name} matched nothing.");
    }
    Ok(())
}

async fn load_typefaces(texts: &[TextConfig]) -> HashMap<String, Typeface> {
    let mut fonts: Vec<&str> = texts.iter().map(|t| t.font.as_str()).collect();
    fonts.sort_unstable();
    fonts.dedup();

    let loaded = join_all(fonts.into_iter().map(|font| async move {
        (font, resources::load_typeface(font).await)
    }))
    .await;

    loaded
        .into_iter()
        .filter_map(|(font, result)| match result {
            Ok(typeface) => Some((font.to_string(), typeface)),
            Err(e) => {
                log::error!("Typeface {font} could not be loaded: {e:#}");
                None
            }
        })
        .collect()
}

fn build_text_node(
    config: &TextConfig,
    typeface: &Typeface,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let data = TextMesh::build(typeface, config)?;
    if data.indices.is_empty() {
        return Err(AssetError::EmptyModel(config.text.clone()).into());
    }

    let mut source = MaterialSource::white(device, queue)?;
    source.name = format!("{} material", config.text);
    source.color = srgb_to_linear(parse_hex_colour(&config.color)?);
    let material = source.instantiate(device, &material_layout(device));

    let model = Model {
        meshes: vec![model::Mesh::from_data(device, &data)],
        materials: vec![material],
    };
    let mut node: Box<dyn SceneNode> = Box::new(ModelNode::from_model(1, device, model));
    place(
        node.as_mut(),
        Instance::from_euler_xyz(config.position, [0.0; 3]),
        Some([1.0; 3]),
        1.0,
    );
    Ok(node)
}

impl GraphicsFlow<()> for GiftFlow {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<()> {
        for node in &mut self.nodes {
            node.update_world_transform_all();
            node.write_to_buffers(&ctx.queue, &ctx.device);
        }
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), _: Duration) -> Out<()> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &DeviceEvent) -> Out<()> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut (), _: &WindowEvent) -> Out<()> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(
            self.nodes
                .iter()
                .map(|node| Render::from(node.as_ref()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::{ContainerNode, testing::BoxNode};
    use approx::assert_relative_eq;

    fn boxed_root() -> ContainerNode {
        let mut root = ContainerNode::new(1);
        root.add_child(Box::new(BoxNode::new([0.0, 0.0, 0.0], [2.0, 10.0, 4.0])));
        root
    }

    #[test]
    fn explicit_scale_is_kept_as_given() {
        let mut root = boxed_root();
        place(
            &mut root,
            Instance::from_euler_xyz([0.0, 5.0, 0.0], [0.1, 1.0, 0.5]),
            Some([1.0, 2.0, 3.0]),
            30.0,
        );
        let local = root.get_local_transform(0).unwrap();
        assert_eq!(local.scale, cgmath::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(local.position, cgmath::Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn missing_scale_fits_the_target_size() {
        let mut root = boxed_root();
        let placement = Instance::from_euler_xyz([40.0, -5.0, 0.0], [0.0; 3]);
        place(&mut root, placement, None, 30.0);
        let local = root.get_local_transform(0).unwrap();
        assert_relative_eq!(local.scale.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(root.world_bounds().size().y, 30.0, epsilon = 1e-4);
        assert_relative_eq!(root.world_bounds().min.x, 40.0, epsilon = 1e-4);
    }

    #[test]
    fn placement_rotation_survives_auto_scaling() {
        let mut root = boxed_root();
        let placement = Instance::from_euler_xyz([1.0, 2.0, 3.0], [0.3, 0.2, 0.1]);
        place(&mut root, placement.clone(), None, 5.0);
        let local = root.get_local_transform(0).unwrap();
        assert_eq!(local.rotation, placement.rotation);
        assert_eq!(local.position, placement.position);
    }

    fn recolour(name: &str) -> MaterialOverride {
        MaterialOverride {
            mesh_name: name.to_string(),
            color: "#ffffff".to_string(),
            gradient: None,
        }
    }

    #[test]
    fn overrides_match_mesh_names_exactly() {
        let overrides = [recolour("Circle"), recolour("circle"), recolour("Stem")];
        let meshes = vec!["Simple_GP_Layer_Mesh".to_string(), "Circle".to_string()];
        assert_eq!(unmatched_overrides(&overrides, &meshes), vec!["circle", "Stem"]);
    }

    #[test]
    fn overrides_on_an_empty_model_all_go_unmatched() {
        let overrides = [recolour("Circle")];
        assert_eq!(unmatched_overrides(&overrides, &[]), vec!["Circle"]);
    }
}
