// build.rs
use cargo_metadata::MetadataCommand;
use std::collections::HashSet;
use std::env;

fn main() {
    if env::var("CARGO_FEATURE_INTERACTIVE_TESTS").is_ok() {
        println!("cargo:warning=🟢 Tests interactifs activés (fenêtre GLFW requise)");
    }

    // Récupère la metadata du projet
    let metadata = match MetadataCommand::new().exec() {
        Ok(metadata) => metadata,
        Err(e) => {
            println!("cargo:warning=⚠️ cargo metadata failed: {e}");
            return;
        }
    };

    // Crates dont la version est affichée au démarrage
    let tracked = HashSet::from(["glfw", "gl", "glam"]);

    for package in &metadata.packages {
        if tracked.contains(package.name.as_str()) {
            println!(
                "cargo:rustc-env={}={}",
                package.name.to_uppercase(),
                package.version
            );
        }
    }
}
