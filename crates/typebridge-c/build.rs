// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error generating C bindings: {e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let crate_dir = env::var("CARGO_MANIFEST_DIR")?;
    let out_path = PathBuf::from(&crate_dir).join("typebridge.h");

    let config = cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))?;

    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_config(config)
        .generate()?
        .write_to_file(&out_path);

    for source in [
        "src/lib.rs",
        "src/error.rs",
        "src/records.rs",
        "src/registry_ffi.rs",
        "src/invoke_ffi.rs",
        "src/value_ffi.rs",
        "src/logging.rs",
        "cbindgen.toml",
    ] {
        println!("cargo:rerun-if-changed={source}");
    }

    Ok(())
}
