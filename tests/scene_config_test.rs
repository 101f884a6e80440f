use bouquet::{
    config::SceneConfig,
    data_structures::texture::GradientDirection,
    error::ConfigError,
    resources::ModelFormat,
};

const TULIPS: &str = r##"
clear_colour = [0.1, 0.0, 0.1, 1.0]

[lights]
ambient_intensity = 0.3

[lights.directional]
position = [0.0, 20.0, 0.0]

[[models]]
url = "TULIP.obj"
mtl_url = "TULIP.mtl"
position = [0.0, 2.0, 0.0]
scale = [2.0, 2.0, 2.0]

[[models.overrides]]
mesh_name = "Petals"
color = "#ffcc00"

[[models.overrides]]
mesh_name = "Stem"

[models.overrides.gradient]
width = 4
height = 64
direction = "x"
stops = [
    { offset = 0.0, color = "#003300" },
    { offset = 1.0, color = "#33ff33" },
]

[[models]]
url = "bee.GLB"

[[texts]]
text = "for you"
size = 3.0
"##;

#[test]
fn full_scene_reads_from_toml() {
    let scene = SceneConfig::from_toml_str(TULIPS).unwrap();
    assert_eq!(scene.clear_colour, [0.1, 0.0, 0.1, 1.0]);
    assert_eq!(scene.lights.ambient_intensity, 0.3);
    assert_eq!(scene.lights.directional.position, [0.0, 20.0, 0.0]);
    // unset light fields keep their defaults
    assert_eq!(scene.lights.directional.color, [1.0, 1.0, 1.0]);

    let tulip = &scene.models[0];
    assert_eq!(tulip.mtl_url.as_deref(), Some("TULIP.mtl"));
    assert_eq!(tulip.scale, Some([2.0, 2.0, 2.0]));
    assert_eq!(tulip.overrides.len(), 2);
    assert_eq!(tulip.overrides[0].color, "#ffcc00");
    assert!(tulip.overrides[0].gradient.is_none());
    assert_eq!(tulip.overrides[1].color, "#ffffff");

    let gradient = tulip.overrides[1].gradient.as_ref().unwrap();
    assert_eq!((gradient.width, gradient.height), (4, 64));
    assert_eq!(gradient.direction, GradientDirection::X);
    assert_eq!(gradient.stops.len(), 2);
    assert_eq!(gradient.sample(0.0).unwrap(), [0x00, 0x33, 0x00, 0xff]);
    assert_eq!(gradient.sample(1.0).unwrap(), [0x33, 0xff, 0x33, 0xff]);

    let bee = &scene.models[1];
    assert_eq!(bee.target_size, 1.0);
    assert!(bee.overrides.is_empty());

    assert_eq!(scene.texts.len(), 1);
    assert_eq!(scene.texts[0].size, 3.0);
}

#[test]
fn model_formats_follow_the_urls() {
    let scene = SceneConfig::from_toml_str(TULIPS).unwrap();
    let formats: Vec<ModelFormat> = scene
        .models
        .iter()
        .map(|m| ModelFormat::from_url(&m.url).unwrap())
        .collect();
    assert_eq!(formats, vec![ModelFormat::Obj, ModelFormat::Gltf]);
}

#[test]
fn default_scene_survives_a_toml_round_trip() {
    let scene = SceneConfig::default();
    let written = toml::to_string(&scene).unwrap();
    assert_eq!(SceneConfig::from_toml_str(&written).unwrap(), scene);
}

#[test]
fn scene_loads_from_a_file() {
    let path = std::env::temp_dir().join(format!("bouquet-scene-{}.toml", std::process::id()));
    std::fs::write(&path, TULIPS).unwrap();
    let scene = SceneConfig::load_from_file(path.to_str().unwrap());
    std::fs::remove_file(&path).unwrap();

    assert_eq!(scene.unwrap().models.len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = SceneConfig::load_from_file("/nonexistent/bouquet/scene.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
