use std::io::{BufReader, Cursor};

use crate::{
    config::ModelConfig,
    data_structures::{
        model,
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    error::AssetError,
    resources::texture::{MaterialSource, load_texture, material_layout},
    text::typeface::Typeface,
};

/**
 * This module contains all logic for loading mesh/textures/fonts from external files.
 *
 * Native builds read from `./assets`, WASM builds fetch relative to the page origin.
 */
pub mod gltf;
pub mod mesh;
pub mod texture;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("no origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Resolves an asset against `./assets`, falling back to the copy the build
/// script placed in `OUT_DIR`.
#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    let local = std::path::Path::new("./").join("assets").join(file_name);
    if local.exists() {
        return local;
    }
    let bundled = std::path::Path::new(env!("OUT_DIR"))
        .join("assets")
        .join(file_name);
    if bundled.exists() {
        log::debug!("Using bundled asset {}", bundled.display());
        return bundled;
    }
    local
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = tokio::fs::read_to_string(asset_path(file_name)).await?;

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}

/// Model file formats the loader understands, picked by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
}

impl ModelFormat {
    pub fn from_url(url: &str) -> Result<Self, AssetError> {
        let extension = std::path::Path::new(url)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("obj") => Ok(ModelFormat::Obj),
            Some("gltf") | Some("glb") => Ok(ModelFormat::Gltf),
            _ => Err(AssetError::UnsupportedFormat(url.to_string())),
        }
    }
}

/// Loads a model of either format and wraps it in a placement root with one
/// instance, ready to be positioned and scaled.
pub async fn load_model(
    config: &ModelConfig,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    match ModelFormat::from_url(&config.url)? {
        ModelFormat::Obj => {
            let model =
                load_model_obj(&config.url, config.mtl_url.as_deref(), device, queue).await?;
            let mut root = ContainerNode::new(1);
            root.add_child(Box::new(ModelNode::from_model(1, device, model)));
            Ok(Box::new(root))
        }
        ModelFormat::Gltf => gltf::load_model_gltf(&config.url, device, queue).await,
    }
}

/// Loads a Wavefront OBJ.
///
/// `mtl_url` replaces whatever `mtllib` the OBJ names, and also applies to
/// OBJ files that name none. A missing or broken
/// material library is not fatal: meshes then fall back to plain white.
/// Every mesh gets its own [`model::Material`], even when several share a
/// material definition.
pub async fn load_model_obj(
    file_name: &str,
    mtl_url: Option<&str>,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<model::Model> {
    let mut obj_text: String = load_string(file_name).await?;
    if let Some(mtl_url) = mtl_url {
        obj_text = with_material_library(&obj_text, mtl_url);
    }
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |path| async move {
            match load_string(&path).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("Material library {path} could not be loaded: {e}");
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .await?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{file_name} is rendered without materials: {e}");
        Vec::new()
    });

    let mut sources = Vec::new();
    for m in obj_materials {
        sources.push(material_source_from_mtl(&m, device, queue).await?);
    }
    let fallback = MaterialSource::white(device, queue)?;

    let layout = material_layout(device);
    let mut meshes = Vec::new();
    let mut materials = Vec::new();
    for (idx, m) in models.iter().enumerate() {
        let mut data = match mesh::mesh_data_from_obj(m) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Mesh at index {idx} in file {file_name} is skipped: {e}");
                continue;
            }
        };
        let source = sources.get(data.material).unwrap_or(&fallback);
        data.material = materials.len();
        materials.push(source.instantiate(device, &layout));
        meshes.push(model::Mesh::from_data(device, &data));
    }
    if meshes.is_empty() {
        return Err(AssetError::EmptyModel(file_name.to_string()).into());
    }

    log::info!(
        "Loaded {file_name}: {} meshes, {} material definitions",
        meshes.len(),
        sources.len()
    );
    Ok(model::Model { meshes, materials })
}

/// Points the OBJ at `mtl_url` as its only material library, whether or not
/// it declared one. `usemtl` names then resolve against that file.
fn with_material_library(obj_text: &str, mtl_url: &str) -> String {
    let mut out = format!("mtllib {mtl_url}\n");
    for line in obj_text.lines() {
        if line.split_whitespace().next() == Some("mtllib") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

async fn material_source_from_mtl(
    m: &tobj::Material,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<MaterialSource> {
    // We rather use a white texture or a default normal map than switch pipelines
    let diffuse = match &m.diffuse_texture {
        Some(path) => load_texture(path, false, device, queue, None).await?,
        None => Texture::create_solid(device, queue, [255; 4], &m.name)?,
    };
    let normal = match &m.normal_texture {
        Some(path) => load_texture(path, true, device, queue, None).await?,
        None => Texture::create_default_normal_map(1, 1, device, queue),
    };
    let [r, g, b] = m.diffuse.unwrap_or([1.0; 3]);
    Ok(MaterialSource {
        name: m.name.clone(),
        diffuse,
        normal,
        color: [r, g, b, m.dissolve.unwrap_or(1.0)],
    })
}

/// Loads a typeface JSON (the `*.typeface.json` format produced by
/// facetype.js) from the assets.
pub async fn load_typeface(file_name: &str) -> anyhow::Result<Typeface> {
    let json = load_string(file_name).await?;
    let typeface = Typeface::from_json(&json)?;
    log::debug!(
        "Loaded typeface {} with {} glyphs",
        typeface.family_name.as_deref().unwrap_or(file_name),
        typeface.glyphs.len()
    );
    Ok(typeface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_follow_extension() {
        assert_eq!(ModelFormat::from_url("ROSE.obj").unwrap(), ModelFormat::Obj);
        assert_eq!(ModelFormat::from_url("character.glb").unwrap(), ModelFormat::Gltf);
        assert_eq!(ModelFormat::from_url("dir/scene.GLTF").unwrap(), ModelFormat::Gltf);
    }

    const GREEN_MTL: &str = "newmtl Green\nKd 0.2 0.8 0.2\n";

    fn material_ids(obj: &str) -> (Vec<Option<usize>>, Vec<String>) {
        let (models, materials) = tobj::load_obj_buf(
            &mut BufReader::new(Cursor::new(obj)),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |path| {
                assert_eq!(path.to_str(), Some("ROSE.mtl"));
                tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(GREEN_MTL)))
            },
        )
        .unwrap();
        (
            models.iter().map(|m| m.mesh.material_id).collect(),
            materials.unwrap().into_iter().map(|m| m.name).collect(),
        )
    }

    #[test]
    fn explicit_material_library_applies_without_mtllib() {
        let obj = "o Circle\nusemtl Green\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let (ids, names) = material_ids(&with_material_library(obj, "ROSE.mtl"));
        assert_eq!(ids, vec![Some(0)]);
        assert_eq!(names, vec!["Green".to_string()]);
    }

    #[test]
    fn explicit_material_library_replaces_declared_one() {
        let obj = "mtllib other.mtl\no Circle\nusemtl Green\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let rewritten = with_material_library(obj, "ROSE.mtl");
        assert!(!rewritten.contains("other.mtl"));
        let (ids, _) = material_ids(&rewritten);
        assert_eq!(ids, vec![Some(0)]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn missing_assets_resolve_to_the_working_directory() {
        let path = asset_path("no-such-asset.obj");
        assert_eq!(path, std::path::Path::new("./assets/no-such-asset.obj"));
    }

    #[test]
    fn unknown_formats_are_rejected() {
        assert!(matches!(
            ModelFormat::from_url("rose.fbx"),
            Err(AssetError::UnsupportedFormat(_))
        ));
        assert!(ModelFormat::from_url("rose").is_err());
    }
}
