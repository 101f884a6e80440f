use bouquet::{config::SceneConfig, flow, gift::GiftFlow};
use clap::Parser;

/// Shows the gift scene in a window.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Scene description in TOML. Without it the built-in gift scene is shown.
    scene: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    flow::init_logger()?;
    let scene = match &args.scene {
        Some(path) => SceneConfig::load_from_file(path)?,
        None => SceneConfig::default(),
    };
    flow::run(scene.clone(), vec![GiftFlow::constructor(scene)])
}
