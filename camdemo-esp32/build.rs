use std::path::Path;

#[toml_cfg::toml_config]
pub struct Config {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    wifi_password: &'static str,
}

fn main() {
    // Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
    embuild::espidf::sysenv::output();

    if !Path::new("cfg.toml").exists() {
        panic!(
            "cfg.toml not found!\n\
            Please copy cfg.toml.example to cfg.toml and set your WiFi credentials:\n\
            cp cfg.toml.example cfg.toml"
        );
    }

    let config = CONFIG;

    // Validate credentials are not placeholders
    if config.wifi_ssid == "YourNetworkName" || config.wifi_ssid.is_empty() {
        panic!(
            "Please set a valid WiFi SSID in cfg.toml\n\
            Current value: '{}'\n\
            Edit cfg.toml and set your actual network name",
            config.wifi_ssid
        );
    }

    if config.wifi_password == "YourPassword" {
        panic!(
            "Please set a valid WiFi password in cfg.toml\n\
            Edit cfg.toml and set your actual WiFi password"
        );
    }

    println!("cargo:rerun-if-changed=cfg.toml");
}
