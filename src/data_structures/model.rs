//! Meshes, materials and the models that group them.
//!
//! Geometry is first assembled on the CPU as [`MeshData`] (loaders, text
//! extrusion) and then uploaded into a [`Mesh`]. A mesh keeps its local
//! [`Aabb`] so scene nodes can be measured after upload.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::{bounds::Aabb, texture};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// CPU-side triangle mesh, indexed with `u32`.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: usize,
}

impl MeshData {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position.into()))
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /**
     * Fills tangents and bitangents from positions and texture coordinates.
     *
     * Formats such as OBJ don't carry tangents, but the normal-mapped shader
     * expects them. Each triangle contributes one tangent frame to its three
     * vertices and the sums are averaged. Triangles with degenerate UVs are
     * skipped instead of producing infinities.
     */
    pub fn compute_tangents(&mut self) {
        let vertices = &mut self.vertices;
        let mut triangles_included = vec![0u32; vertices.len()];
        vertices.iter_mut().for_each(|v| {
            v.tangent = [0.0; 3];
            v.bitangent = [0.0; 3];
        });

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
                continue;
            }
            let v0 = vertices[i0];
            let v1 = vertices[i1];
            let v2 = vertices[i2];

            let pos0: cgmath::Vector3<_> = v0.position.into();
            let pos1: cgmath::Vector3<_> = v1.position.into();
            let pos2: cgmath::Vector3<_> = v2.position.into();

            let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
            let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
            let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            // Solves
            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() <= f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // Flipped for right-handed normal maps in wgpu's texture space
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for i in [i0, i1, i2] {
                vertices[i].tangent = (tangent + cgmath::Vector3::from(vertices[i].tangent)).into();
                vertices[i].bitangent =
                    (bitangent + cgmath::Vector3::from(vertices[i].bitangent)).into();
                triangles_included[i] += 1;
            }
        }

        for (i, n) in triangles_included.into_iter().enumerate() {
            if n == 0 {
                continue;
            }
            let denom = 1.0 / n as f32;
            let v = &mut vertices[i];
            v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
        }
    }

    /// Replaces all normals with area-weighted face normals summed per vertex.
    pub fn compute_normals(&mut self) {
        use cgmath::InnerSpace;

        let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            let p0: cgmath::Vector3<f32> = self.vertices[i0].position.into();
            let p1: cgmath::Vector3<f32> = self.vertices[i1].position.into();
            let p2: cgmath::Vector3<f32> = self.vertices[i2].position.into();
            let face = (p1 - p0).cross(p2 - p0);
            sums[i0] += face;
            sums[i1] += face;
            sums[i2] += face;
        }
        for (v, n) in self.vertices.iter_mut().zip(sums) {
            if n.magnitude2() > 0.0 {
                v.normal = n.normalize().into();
            }
        }
    }
}

pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
    pub bounds: Aabb,
}

impl Mesh {
    pub fn from_data(device: &wgpu::Device, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
            material: data.material,
            bounds: data.bounds(),
        }
    }
}

/// Colour tint multiplied with the diffuse map in the fragment shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
}

pub struct Material {
    pub name: String,
    pub diffuse_texture: texture::Texture,
    pub normal_texture: texture::Texture,
    pub uniform: MaterialUniform,
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: texture::Texture,
        normal_texture: texture::Texture,
        color: [f32; 4],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let uniform = MaterialUniform { color };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material uniform")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(
            device,
            name,
            &diffuse_texture,
            &normal_texture,
            &buffer,
            layout,
        );

        Self {
            name: name.to_string(),
            diffuse_texture,
            normal_texture,
            uniform,
            buffer,
            layout: layout.clone(),
            bind_group,
        }
    }

    /// Overwrites the colour tint. Takes effect with the next submitted frame.
    pub fn set_color(&mut self, queue: &wgpu::Queue, color: [f32; 4]) {
        self.uniform.color = color;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }

    /// Swaps the diffuse map and rebuilds the bind group around it.
    pub fn set_diffuse(&mut self, device: &wgpu::Device, diffuse_texture: texture::Texture) {
        self.diffuse_texture = diffuse_texture;
        self.bind_group = mk_bind_group(
            device,
            &self.name,
            &self.diffuse_texture,
            &self.normal_texture,
            &self.buffer,
            &self.layout,
        );
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    name: &str,
    diffuse_texture: &texture::Texture,
    normal_texture: &texture::Texture,
    buffer: &wgpu::Buffer,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let fallback_diffuse;
    let diffuse_sampler = match &diffuse_texture.sampler {
        Some(sampler) => sampler,
        None => {
            fallback_diffuse = texture::create_default_sampler(device);
            &fallback_diffuse
        }
    };
    let fallback_normal;
    let normal_sampler = match &normal_texture.sampler {
        Some(sampler) => sampler,
        None => {
            fallback_normal = texture::create_default_sampler(device);
            &fallback_normal
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(diffuse_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&normal_texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(normal_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: buffer.as_entire_binding(),
            },
        ],
        label: Some(name),
    })
}

pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::empty(), |aabb, mesh| aabb.union(mesh.bounds))
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );

    fn draw_model_instanced(
        &mut self,
        model: &'a Model,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(
        &mut self,
        model: &'b Model,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            let Some(material) = model.materials.get(mesh.material) else {
                log::warn!(
                    "Mesh {} references material {} but the model only has {}.",
                    mesh.name,
                    mesh.material,
                    model.materials.len()
                );
                continue;
            };
            self.draw_mesh_instanced(
                mesh,
                material,
                instances.clone(),
                camera_bind_group,
                light_bind_group,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
        ModelVertex {
            position,
            tex_coords,
            ..Default::default()
        }
    }

    fn quad() -> MeshData {
        MeshData {
            name: "quad".to_string(),
            vertices: vec![
                vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
                vertex([2.0, 0.0, 0.0], [1.0, 0.0]),
                vertex([2.0, 1.0, 0.0], [1.0, 1.0]),
                vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            material: 0,
        }
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let bounds = quad().bounds();
        assert_eq!(bounds.min, cgmath::Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, cgmath::Vector3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn tangents_follow_u_direction() {
        let mut mesh = quad();
        mesh.compute_tangents();
        for v in &mesh.vertices {
            assert_relative_eq!(v.tangent[0], 2.0, epsilon = 1e-5);
            assert_relative_eq!(v.tangent[1], 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_uvs_leave_tangents_zeroed() {
        let mut mesh = quad();
        mesh.vertices.iter_mut().for_each(|v| v.tex_coords = [0.5, 0.5]);
        mesh.compute_tangents();
        assert!(mesh.vertices.iter().all(|v| v.tangent == [0.0; 3]));
    }

    #[test]
    fn normals_face_towards_ccw_side() {
        let mut mesh = quad();
        mesh.compute_normals();
        for v in &mesh.vertices {
            assert_relative_eq!(v.normal[2], 1.0, epsilon = 1e-6);
        }
    }
}
