use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Rerun if the manifest or any model in /assets/ changes.
    println!("cargo:rerun-if-changed=assets/");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");

    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    if assets_src.exists() {
        copy_items(&[assets_src.as_path()], &out_dir, &copy_options)?;
    }

    // Native builds resolve `/models/...` paths against this directory.
    println!(
        "cargo:rustc-env=HELIPAD_ASSET_DIR={}",
        out_dir.join("assets").display()
    );

    Ok(())
}
