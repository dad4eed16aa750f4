fn main() {
    // Device settings are baked in by `toml_cfg` at compile time.
    println!("cargo:rerun-if-changed=cfg.toml");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
