//! Scene description.
//!
//! A [`SceneConfig`] lists everything the gift page shows: camera, lights,
//! models and text. The built-in default is the page itself. A TOML file can
//! replace any part of it, and fields it leaves out keep their defaults.

use serde::{Deserialize, Serialize};

use crate::{
    data_structures::texture::{GradientDirection, LinearGradient},
    error::ConfigError,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub clear_colour: [f64; 4],
    pub camera: CameraConfig,
    pub lights: LightConfig,
    pub models: Vec<ModelConfig>,
    pub texts: Vec<TextConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 150.0],
            target: [0.0, 0.0, 0.0],
            fov_y_degrees: 50.0,
            z_near: 0.1,
            z_far: 2000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient_intensity: f32,
    pub directional: DirectionalLightConfig,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.5,
            directional: DirectionalLightConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            position: [10.0, 10.0, 5.0],
            intensity: 1.0,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// A model placement.
///
/// With `scale` set the node uses it as is. Without it the node is uniformly
/// scaled so that its largest world-space dimension equals `target_size`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub url: String,
    #[serde(default)]
    pub mtl_url: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles in radians, applied in `XYZ` order.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default = "default_target_size")]
    pub target_size: f32,
    #[serde(default)]
    pub overrides: Vec<MaterialOverride>,
}

fn default_target_size() -> f32 {
    1.0
}

impl ModelConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            mtl_url: None,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: None,
            target_size: default_target_size(),
            overrides: Vec::new(),
        }
    }
}

/// Recolours every mesh called `mesh_name`, optionally replacing its diffuse
/// map with a gradient. Only applied to OBJ models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialOverride {
    pub mesh_name: String,
    #[serde(default = "default_white")]
    pub color: String,
    #[serde(default)]
    pub gradient: Option<LinearGradient>,
}

fn default_white() -> String {
    "#ffffff".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BevelConfig {
    #[serde(default = "default_bevel_thickness")]
    pub thickness: f32,
    #[serde(default = "default_bevel_size")]
    pub size: f32,
    #[serde(default)]
    pub offset: f32,
    #[serde(default = "default_bevel_segments")]
    pub segments: u32,
}

fn default_bevel_thickness() -> f32 {
    0.1
}

fn default_bevel_size() -> f32 {
    0.01
}

fn default_bevel_segments() -> u32 {
    4
}

impl Default for BevelConfig {
    fn default() -> Self {
        Self {
            thickness: default_bevel_thickness(),
            size: default_bevel_size(),
            offset: 0.0,
            segments: default_bevel_segments(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    pub text: String,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_text_size")]
    pub size: f32,
    /// Extrusion depth.
    #[serde(default = "default_text_height")]
    pub height: f32,
    #[serde(default = "default_curve_segments")]
    pub curve_segments: u32,
    #[serde(default)]
    pub bevel: Option<BevelConfig>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_white")]
    pub color: String,
}

fn default_font() -> String {
    "helvetiker_regular.typeface.json".to_string()
}

fn default_text_size() -> f32 {
    1.0
}

fn default_text_height() -> f32 {
    0.2
}

fn default_curve_segments() -> u32 {
    8
}

impl TextConfig {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            font: default_font(),
            size: default_text_size(),
            height: default_text_height(),
            curve_segments: default_curve_segments(),
            bevel: None,
            position: [0.0; 3],
            color: default_white(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        let mut rose = ModelConfig::new("ROSE.obj");
        rose.mtl_url = Some("ROSE.mtl".to_string());
        rose.position = [0.0, 5.0, 0.0];
        rose.rotation = [0.1, 1.0, 0.5];
        rose.scale = Some([1.0, 1.0, 1.0]);
        rose.overrides = vec![
            MaterialOverride {
                mesh_name: "Simple_GP_Layer_Mesh".to_string(),
                color: default_white(),
                gradient: Some(LinearGradient::new(
                    GradientDirection::Y,
                    &[(0.0, "#7b00ffff"), (0.5, "#4900ffff"), (1.0, "#e91717ff")],
                )),
            },
            MaterialOverride {
                mesh_name: "Circle".to_string(),
                color: default_white(),
                gradient: Some(LinearGradient::new(
                    GradientDirection::Y,
                    &[(0.0, "#6bae4cff"), (0.55, "#496400ff"), (1.0, "#2bff00ff")],
                )),
            },
        ];

        let mut character = ModelConfig::new("character.glb");
        character.position = [40.0, -5.0, 0.0];
        character.target_size = 30.0;

        let mut dedication = TextConfig::new("Para ti, mi princesa <3");
        dedication.size = 5.0;
        dedication.bevel = Some(BevelConfig {
            thickness: 0.1,
            size: 0.3,
            offset: 0.0,
            segments: 10,
        });
        dedication.position = [-35.0, 40.0, 0.0];

        let mut warning = TextConfig::new("(Si no te gustan, te odioare)");
        warning.size = 5.0;
        warning.height = 2.0;
        warning.bevel = Some(BevelConfig {
            thickness: 0.3,
            size: 0.3,
            offset: 0.0,
            segments: 10,
        });
        warning.position = [-43.0, -20.0, 0.0];

        Self {
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            camera: CameraConfig::default(),
            lights: LightConfig::default(),
            models: vec![rose, character],
            texts: vec![dedication, warning],
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !path.ends_with(".toml") {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded scene {} with {} models and {} texts",
            path,
            config.models.len(),
            config.texts.len()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_matches_gift_page() {
        let config = SceneConfig::default();
        assert_eq!(config.camera.position, [0.0, 0.0, 150.0]);
        assert_eq!(config.camera.fov_y_degrees, 50.0);
        assert_eq!(config.lights.ambient_intensity, 0.5);
        assert_eq!(config.lights.directional.position, [10.0, 10.0, 5.0]);

        let rose = &config.models[0];
        assert_eq!(rose.mtl_url.as_deref(), Some("ROSE.mtl"));
        assert_eq!(rose.scale, Some([1.0, 1.0, 1.0]));
        assert_eq!(rose.overrides.len(), 2);

        assert_eq!(config.texts.len(), 2);
        assert_eq!(config.texts[0].height, 0.2);
        assert_eq!(config.texts[1].height, 2.0);
        assert_eq!(config.texts[1].bevel.as_ref().map(|b| b.segments), Some(10));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
            [camera]
            fov_y_degrees = 60.0

            [[models]]
            url = "tulip.glb"
            target_size = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.fov_y_degrees, 60.0);
        assert_eq!(config.camera.position, [0.0, 0.0, 150.0]);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].scale, None);
        assert_eq!(config.models[0].target_size, 12.0);
        // texts were not mentioned, so the default texts stay
        assert_eq!(config.texts.len(), 2);
    }

    #[test]
    fn text_defaults_follow_text3d() {
        let config = SceneConfig::from_toml_str(
            r#"
            models = []
            [[texts]]
            text = "hola"
            [texts.bevel]
            "#,
        )
        .unwrap();
        let text = &config.texts[0];
        assert_eq!(text.size, 1.0);
        assert_eq!(text.curve_segments, 8);
        assert_eq!(text.color, "#ffffff");
        assert_eq!(text.bevel, Some(BevelConfig::default()));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(matches!(
            SceneConfig::load_from_file("scene.yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            SceneConfig::from_toml_str("camera = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
