fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    // Leave the variable unset when the compiler cannot be queried; the
    // user agent then reports `unknown`.
    if let Ok(version) = rustc_version::version() {
        println!("cargo:rustc-env=BOTCONNECTOR_RUSTC_VERSION={version}");
    }
    Ok(())
}
