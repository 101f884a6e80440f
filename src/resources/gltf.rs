//! glTF 2.0 (`.gltf` and `.glb`) loading into a scene graph.

use std::io::{BufReader, Cursor};

use crate::{
    data_structures::{
        instance::Instance,
        model::{self, MeshData},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    error::AssetError,
    resources::{
        load_binary,
        texture::{MaterialSource, load_texture, material_layout},
    },
};

/// Loads every node of the default scene under a single placement root.
pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.into()),
                None => {
                    log::warn!("{file_name} references a binary chunk it does not contain.");
                    buffer_data.push(Vec::new());
                }
            },
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(uri).await?);
            }
        }
    }

    let mut sources = Vec::new();
    for material in gltf.materials() {
        sources.push(load_material(file_name, &material, &buffer_data, device, queue).await?);
    }
    let fallback = MaterialSource::white(device, queue)?;

    let layout = material_layout(device);
    let loader = NodeLoader {
        buffers: &buffer_data,
        sources: &sources,
        fallback: &fallback,
        layout: &layout,
        device,
    };

    let mut root = ContainerNode::new(1);
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                root.add_child(loader.to_scene_node(node));
            }
        }
        None => log::warn!("{file_name} contains no scene."),
    }
    if root.children.is_empty() {
        return Err(AssetError::EmptyModel(file_name.to_string()).into());
    }

    log::info!(
        "Loaded {file_name}: {} materials, {} root nodes",
        sources.len(),
        root.children.len()
    );
    Ok(Box::new(root))
}

async fn load_material(
    file_name: &str,
    material: &gltf::Material<'_>,
    buffer_data: &[Vec<u8>],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<MaterialSource> {
    let pbr = material.pbr_metallic_roughness();
    let diffuse = match pbr.base_color_texture() {
        Some(info) => load_image(file_name, info.texture().source(), buffer_data, false, device, queue).await,
        None => None,
    };
    let diffuse = match diffuse {
        Some(texture) => texture,
        None => Texture::create_solid(device, queue, [255; 4], "base colour")?,
    };
    let normal = match material.normal_texture() {
        Some(normal) => load_image(file_name, normal.texture().source(), buffer_data, true, device, queue).await,
        None => None,
    };
    let normal = normal.unwrap_or_else(|| Texture::create_default_normal_map(1, 1, device, queue));

    Ok(MaterialSource {
        name: material.name().unwrap_or(file_name).to_string(),
        diffuse,
        normal,
        color: pbr.base_color_factor(),
    })
}

/// Decodes an embedded or referenced image. Failures fall back to `None`.
async fn load_image(
    file_name: &str,
    image: gltf::Image<'_>,
    buffer_data: &[Vec<u8>],
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Option<Texture> {
    let result = match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            match buffer_data
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(start..end))
            {
                Some(bytes) => Texture::from_bytes(
                    device,
                    queue,
                    bytes,
                    file_name,
                    mime_type.split('/').next_back(),
                    is_normal_map,
                ),
                None => Err(AssetError::EmptyModel(format!("{file_name} image view")).into()),
            }
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            load_texture(
                uri,
                is_normal_map,
                device,
                queue,
                mime_type.and_then(|mt| mt.split('/').next_back()),
            )
            .await
        }
    };
    match result {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("Image {} of {file_name} could not be loaded: {e}", image.index());
            None
        }
    }
}

struct NodeLoader<'a> {
    buffers: &'a [Vec<u8>],
    sources: &'a [MaterialSource],
    fallback: &'a MaterialSource,
    layout: &'a wgpu::BindGroupLayout,
    device: &'a wgpu::Device,
}

impl NodeLoader<'_> {
    fn to_scene_node(&self, node: gltf::Node<'_>) -> Box<dyn SceneNode> {
        let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
            Some(mesh) => {
                let mut meshes = Vec::new();
                let mut materials = Vec::new();
                for primitive in mesh.primitives() {
                    let name = mesh.name().unwrap_or("unknown_mesh");
                    let Some(mut data) = self.read_primitive(name, &primitive) else {
                        log::warn!(
                            "Primitive {} of mesh {name} has no usable geometry and is skipped.",
                            primitive.index()
                        );
                        continue;
                    };
                    let source = primitive
                        .material()
                        .index()
                        .and_then(|i| self.sources.get(i))
                        .unwrap_or(self.fallback);
                    data.material = materials.len();
                    materials.push(source.instantiate(self.device, self.layout));
                    meshes.push(model::Mesh::from_data(self.device, &data));
                }
                let model = model::Model { meshes, materials };
                Box::new(ModelNode::from_model(1, self.device, model))
            }
            None => Box::new(ContainerNode::new(1)),
        };

        let (translation, rotation, scale) = node.transform().decomposed();
        scene_node.set_local_transform(
            0,
            Instance {
                position: translation.into(),
                rotation: rotation.into(),
                scale: scale.into(),
            },
        );
        for child in node.children() {
            scene_node.add_child(self.to_scene_node(child));
        }
        scene_node
    }

    fn read_primitive(&self, name: &str, primitive: &gltf::Primitive<'_>) -> Option<MeshData> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return None;
        }
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(Vec::as_slice));

        let mut vertices: Vec<model::ModelVertex> = reader
            .read_positions()?
            .map(|position| model::ModelVertex {
                position,
                ..Default::default()
            })
            .collect();

        let has_normals = match reader.read_normals() {
            Some(normals) => {
                vertices
                    .iter_mut()
                    .zip(normals)
                    .for_each(|(v, normal)| v.normal = normal);
                true
            }
            None => false,
        };
        if let Some(tex_coords) = reader.read_tex_coords(0) {
            vertices
                .iter_mut()
                .zip(tex_coords.into_f32())
                .for_each(|(v, uv)| v.tex_coords = uv);
        }
        let tangents = reader.read_tangents();
        let has_tangents = tangents.is_some();
        if let Some(tangents) = tangents {
            vertices.iter_mut().zip(tangents).for_each(|(v, tangent)| {
                // glTF stores the bitangent sign in w
                let tangent: cgmath::Vector4<f32> = tangent.into();
                let normal: cgmath::Vector3<f32> = v.normal.into();
                v.tangent = tangent.truncate().into();
                v.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
            });
        }

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };
        if indices.is_empty() || indices.iter().any(|&i| i as usize >= vertices.len()) {
            return None;
        }

        let mut data = MeshData {
            name: name.to_string(),
            vertices,
            indices,
            material: 0,
        };
        if !has_normals {
            data.compute_normals();
        }
        if !has_tangents {
            data.compute_tangents();
        }
        Some(data)
    }
}
