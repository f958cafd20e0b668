fn main() {
    println!("cargo:rerun-if-env-changed=RELAUNCH_BUILD_VERSION");
    if let Ok(value) = std::env::var("RELAUNCH_BUILD_VERSION") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            println!("cargo:rustc-env=RELAUNCH_BUILD_VERSION={trimmed}");
        }
    }
}
