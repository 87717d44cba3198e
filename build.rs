use std::env;

fn main() {
    // Version string shown by the CLI and sent in the User-Agent header
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    let version = match env::var("TRIPCOST_BUILD_SUFFIX") {
        Ok(suffix) if !suffix.is_empty() => format!("{version}-{suffix}"),
        _ => version,
    };
    println!("cargo:rustc-env=TRIPCOST_VERSION={version}");

    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=TRIPCOST_BUILD_SUFFIX");
}
