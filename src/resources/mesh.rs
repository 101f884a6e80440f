use crate::{data_structures::model, error::AssetError};

/**
 * Converts the meshes of a parsed OBJ into CPU geometry.
 *
 * Obj files don't come with tangents and bitangents so they are computed
 * here for the normal-mapped shader. Texture coordinates are flipped to
 * wgpu's top-left origin. Missing normals are rebuilt from the faces.
 */
pub fn mesh_data_from_obj(m: &tobj::Model) -> Result<model::MeshData, AssetError> {
    let mesh = &m.mesh;
    if mesh.positions.len() % 3 != 0 || mesh.indices.is_empty() {
        return Err(AssetError::EmptyModel(m.name.clone()));
    }
    let vertex_count = mesh.positions.len() / 3;
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        log::warn!(
            "Mesh {} indexes vertex {} but only has {}.",
            m.name,
            bad,
            vertex_count
        );
        return Err(AssetError::EmptyModel(m.name.clone()));
    }

    let vertices = (0..vertex_count)
        .map(|i| model::ModelVertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            tex_coords: [
                mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
            // We'll calculate these later
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        })
        .collect::<Vec<_>>();

    let mut data = model::MeshData {
        name: m.name.clone(),
        vertices,
        indices: mesh.indices.clone(),
        material: mesh.material_id.unwrap_or(0),
    };
    if mesh.normals.is_empty() {
        data.compute_normals();
    }
    data.compute_tangents();
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn parse(obj: &str) -> Vec<tobj::Model> {
        let (models, _) = tobj::load_obj_buf(
            &mut BufReader::new(Cursor::new(obj)),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok(Default::default()),
        )
        .unwrap();
        models
    }

    const QUAD: &str = "o Circle
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn quads_are_triangulated_with_names_kept() {
        let models = parse(QUAD);
        let data = mesh_data_from_obj(&models[0]).unwrap();
        assert_eq!(data.name, "Circle");
        assert_eq!(data.triangle_count(), 2);
        assert_eq!(data.vertices.len(), 4);
    }

    #[test]
    fn texture_v_is_flipped() {
        let models = parse(QUAD);
        let data = mesh_data_from_obj(&models[0]).unwrap();
        assert_eq!(data.vertices[0].tex_coords, [0.0, 1.0]);
        assert_eq!(data.vertices[2].tex_coords, [1.0, 0.0]);
    }

    #[test]
    fn missing_normals_are_rebuilt() {
        let models = parse(QUAD);
        let data = mesh_data_from_obj(&models[0]).unwrap();
        assert!(data.vertices.iter().all(|v| (v.normal[2] - 1.0).abs() < 1e-5));
    }

    #[test]
    fn empty_meshes_are_rejected() {
        let model = tobj::Model::new(tobj::Mesh::default(), "nothing".to_string());
        assert!(matches!(
            mesh_data_from_obj(&model),
            Err(AssetError::EmptyModel(_))
        ));
    }
}
