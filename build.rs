use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=EPUBINFO_LIB_DIR");

    // Only the system engine needs a native library on the link line.
    if env::var_os("CARGO_FEATURE_SYSTEM_ENGINE").is_none() {
        return;
    }

    match env::var("EPUBINFO_LIB_DIR") {
        Ok(dir) => println!("cargo:rustc-link-search=native={}", dir),
        Err(_) => println!(
            "cargo:warning=system-engine enabled without EPUBINFO_LIB_DIR; relying on the default linker search path"
        ),
    }
}
