use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Files the built-in gift scene loads.
const SCENE_ASSETS: [&str; 4] = [
    "ROSE.obj",
    "ROSE.mtl",
    "character.glb",
    "helvetiker_regular.typeface.json",
];

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    // The native loaders fall back to this copy when ./assets is not next to
    // the working directory.
    let out_dir = env::var("OUT_DIR")?;
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!("cargo:warning=no assets/ directory; the gift scene will only show its clear colour");
        return Ok(());
    }

    for name in SCENE_ASSETS {
        if !assets_src.join(name).exists() {
            println!("cargo:warning=assets/{name} is missing; the default scene leaves it out");
        }
    }

    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], out_dir, &copy_options)?;

    Ok(())
}
