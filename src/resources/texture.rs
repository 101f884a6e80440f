use crate::{
    data_structures::{model, texture},
    resources::load_binary,
};

/// Layout of bind group 0 in the model pipeline: diffuse map and sampler,
/// normal map and sampler, and the material colour uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Model material_bind_group_layout"),
    })
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}

/// Textures and tint of a material as read from a file, before any mesh
/// claims it.
///
/// Loaders keep one source per material definition and mint a separate GPU
/// [`model::Material`] for every mesh, so recolouring one mesh never touches
/// another.
#[derive(Clone, Debug)]
pub struct MaterialSource {
    pub name: String,
    pub diffuse: texture::Texture,
    pub normal: texture::Texture,
    pub color: [f32; 4],
}

impl MaterialSource {
    /// Plain white material used when a file defines none.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> anyhow::Result<Self> {
        Ok(Self {
            name: "default".to_string(),
            diffuse: texture::Texture::create_solid(device, queue, [255; 4], "default diffuse")?,
            normal: texture::Texture::create_default_normal_map(1, 1, device, queue),
            color: [1.0; 4],
        })
    }

    pub fn instantiate(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> model::Material {
        model::Material::new(
            device,
            &self.name,
            self.diffuse.clone(),
            self.normal.clone(),
            self.color,
            layout,
        )
    }
}
