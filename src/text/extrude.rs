//! Solid geometry from planar shapes.
//!
//! The front face lies at `z = 0` and the back face at `z = depth`. A bevel
//! adds rounded rings in front of the front face and behind the back face:
//! ring `s` of `n` sits `thickness * cos(t * PI / 2)` away from the face and
//! is pushed outwards by `size * sin(t * PI / 2) + offset`, with `t = s / n`.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Vector2};

use crate::{
    config::BevelConfig,
    data_structures::model::{MeshData, ModelVertex},
    error::TextError,
    text::shape::Shape,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bevel {
    pub thickness: f32,
    pub size: f32,
    pub offset: f32,
    pub segments: u32,
}

impl From<&BevelConfig> for Bevel {
    fn from(config: &BevelConfig) -> Self {
        Self {
            thickness: config.thickness,
            size: config.size,
            offset: config.offset,
            segments: config.segments,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrudeOptions {
    pub depth: f32,
    pub bevel: Option<Bevel>,
}

/// A ring of the extruded wall: its z and how far the contour is pushed out.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Layer {
    z: f32,
    push: f32,
}

fn layers(options: &ExtrudeOptions) -> Vec<Layer> {
    let depth = options.depth;
    match options.bevel {
        Some(bevel) if bevel.segments > 0 => {
            let ring = |s: u32| {
                let angle = s as f32 / bevel.segments as f32 * FRAC_PI_2;
                (
                    bevel.thickness * angle.cos(),
                    bevel.size * angle.sin() + bevel.offset,
                )
            };
            let full = bevel.size + bevel.offset;

            let mut layers = Vec::with_capacity(2 * bevel.segments as usize + 2);
            for s in 0..bevel.segments {
                let (dz, push) = ring(s);
                layers.push(Layer { z: -dz, push });
            }
            layers.push(Layer { z: 0.0, push: full });
            layers.push(Layer { z: depth, push: full });
            for s in (0..bevel.segments).rev() {
                let (dz, push) = ring(s);
                layers.push(Layer {
                    z: depth + dz,
                    push,
                });
            }
            layers
        }
        _ => vec![Layer { z: 0.0, push: 0.0 }, Layer { z: depth, push: 0.0 }],
    }
}

fn edge_normal(a: Vector2<f32>, b: Vector2<f32>) -> Vector2<f32> {
    let d = b - a;
    let len = d.magnitude();
    if len > 0.0 {
        Vector2::new(d.y, -d.x) / len
    } else {
        Vector2::new(0.0, 0.0)
    }
}

/// Outward miter vector per point, long enough to keep edges parallel.
fn bevel_vectors(ring: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let n1 = edge_normal(prev, cur);
            let n2 = edge_normal(cur, next);
            let sum = n1 + n2;
            if sum.magnitude2() < 1e-12 {
                return n1;
            }
            let miter = sum.normalize();
            // spikes at sharp corners are capped at twice the push
            let cos = miter.dot(n1);
            let len = if cos > 0.5 { 1.0 / cos } else { 2.0 };
            miter * len
        })
        .collect()
}

fn vertex(p: Vector2<f32>, z: f32, tex_coords: [f32; 2], normal: [f32; 3]) -> ModelVertex {
    ModelVertex {
        position: [p.x, p.y, z],
        tex_coords,
        normal,
        ..Default::default()
    }
}

/// Extrudes `shapes` into one indexed mesh with smooth walls and flat caps.
pub fn extrude(shapes: &[Shape], options: &ExtrudeOptions) -> Result<MeshData, TextError> {
    let layers = layers(options);
    let (Some(&first), Some(&last)) = (layers.first(), layers.last()) else {
        return Ok(MeshData::default());
    };

    let mut walls = MeshData::default();
    let mut caps = MeshData::default();

    for shape in shapes {
        let shape = shape.clone().normalized();
        if shape.outer.len() < 3 {
            continue;
        }
        let triangles = shape.triangulate()?;

        let mut cap_points: Vec<(Vector2<f32>, Vector2<f32>)> = Vec::new();
        for ring in shape.rings() {
            let n = ring.len();
            let vectors = bevel_vectors(ring);
            cap_points.extend(ring.iter().copied().zip(vectors.iter().copied()));

            let base = walls.vertices.len() as u32;
            for layer in &layers {
                for (p, v) in ring.iter().zip(&vectors) {
                    let q = *p + *v * layer.push;
                    walls.vertices.push(vertex(q, layer.z, [q.x, layer.z], [0.0; 3]));
                }
            }
            for l in 0..layers.len() as u32 - 1 {
                for i in 0..n as u32 {
                    let j = (i + 1) % n as u32;
                    let a0 = base + l * n as u32 + i;
                    let b0 = base + l * n as u32 + j;
                    let a1 = a0 + n as u32;
                    let b1 = b0 + n as u32;
                    walls.indices.extend_from_slice(&[a0, b0, b1, a0, b1, a1]);
                }
            }
        }

        let faces = [
            (first, [0.0, 0.0, -1.0], true),
            (last, [0.0, 0.0, 1.0], false),
        ];
        for (layer, normal, facing_front) in faces {
            let base = caps.vertices.len() as u32;
            for (p, v) in &cap_points {
                let q = *p + *v * layer.push;
                caps.vertices.push(vertex(q, layer.z, [q.x, q.y], normal));
            }
            for t in &triangles {
                let [a, b, c] = t.map(|i| base + i as u32);
                if facing_front {
                    caps.indices.extend_from_slice(&[a, c, b]);
                } else {
                    caps.indices.extend_from_slice(&[a, b, c]);
                }
            }
        }
    }

    walls.compute_normals();
    let offset = walls.vertices.len() as u32;
    walls.vertices.extend(caps.vertices);
    walls
        .indices
        .extend(caps.indices.into_iter().map(|i| i + offset));
    walls.compute_tangents();
    Ok(walls)
}
