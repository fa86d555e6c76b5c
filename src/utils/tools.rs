use log::info;

/// Versions figées au build par `build.rs` (cargo metadata).
const TRACKED_CRATES: [(&str, Option<&str>); 3] = [
    ("GL  ", option_env!("GL")),
    ("GLFW", option_env!("GLFW")),
    ("GLAM", option_env!("GLAM")),
];

/// Affiche les informations Rust et les dépendances principales de la compilation.
pub fn show_rust_core_dependencies() {
    info!(
        "Rust compiler version: {}",
        rustc_version_runtime::version()
    );
    info!("  Platform    : {}", std::env::consts::OS);
    info!("  Arch        : {}", std::env::consts::ARCH);

    info!("Rust core dependencies");
    for (name, version) in TRACKED_CRATES {
        info!("  {name} version: {}", version.unwrap_or("Unknown"));
    }
}
