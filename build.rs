use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // outside of a git checkout vergen falls back to placeholder values instead of failing
    EmitBuilder::builder()
        .all_git()
        .git_describe(true, false, Some("ThisPatternShouldNotMatchAnythingEver"))
        .emit()?;

    // emit handles the git configuration and build.rs, but we also track the toml, src, and bundled data
    let rerun_if_changed = "cargo:rerun-if-changed=Cargo.toml
cargo:rerun-if-changed=src
cargo:rerun-if-changed=data";
    println!("{rerun_if_changed}");

    Ok(())
}
