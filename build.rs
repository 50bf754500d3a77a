use std::fs;

const BACKEND_KINDS: &[&str] = &["builtin", "bridge"];

fn main() {
    let config_path = "src/default_config.toml";
    println!("cargo:rerun-if-changed={}", config_path);

    let content = fs::read_to_string(config_path).expect("Failed to read default_config.toml");

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    // The compiled default must select a backend the crate knows about
    let kind = table
        .get("backend")
        .and_then(|backend| backend.get("kind"))
        .and_then(|kind| kind.as_str())
        .unwrap_or("builtin");
    if !BACKEND_KINDS.contains(&kind) {
        panic!("default_config.toml: unknown backend kind {:?}", kind);
    }
}
