use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "livepage.config.json";
pub const DEFAULT_SUFFIX: &str = "-editable";
pub const DEFAULT_SCRIPT_SRC: &str = "livepage_wasm.js";
pub const DEFAULT_WASM_SRC: &str = "livepage_wasm_bg.wasm";

/// Livepage configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Inserted before the extension of the default output path
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Overlay glue script loaded by the injected script tag
    #[serde(default = "default_script_src")]
    pub script_src: String,

    /// Overlay wasm module the boot script instantiates
    #[serde(default = "default_wasm_src")]
    pub wasm_src: String,

    /// `wasm-pack --target no-modules` output to embed in the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_dir: Option<String>,

    /// Directory holding replacement overlay templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_script_src() -> String {
    DEFAULT_SCRIPT_SRC.to_string()
}

fn default_wasm_src() -> String {
    DEFAULT_WASM_SRC.to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Absolute template directory, if one is configured
    pub fn get_template_dir(&self, cwd: &str) -> Option<PathBuf> {
        self.template_dir
            .as_ref()
            .map(|dir| PathBuf::from(cwd).join(dir))
    }

    /// Absolute bundle directory, if one is configured
    pub fn get_bundle_dir(&self, cwd: &str) -> Option<PathBuf> {
        self.bundle_dir
            .as_ref()
            .map(|dir| PathBuf::from(cwd).join(dir))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            script_src: default_script_src(),
            wasm_src: default_wasm_src(),
            bundle_dir: None,
            template_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "suffix": "-live",
            "scriptSrc": "https://cdn.example.com/overlay.js",
            "wasmSrc": "https://cdn.example.com/overlay_bg.wasm",
            "bundleDir": "pkg",
            "templateDir": "overlay"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.suffix, "-live");
        assert_eq!(config.script_src, "https://cdn.example.com/overlay.js");
        assert_eq!(config.wasm_src, "https://cdn.example.com/overlay_bg.wasm");
        assert_eq!(config.get_bundle_dir("/site"), Some(PathBuf::from("/site/pkg")));
        assert_eq!(config.template_dir.as_deref(), Some("overlay"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "suffix": "-x" }"#).unwrap();
        assert_eq!(config.suffix, "-x");
        assert_eq!(config.script_src, DEFAULT_SCRIPT_SRC);
        assert_eq!(config.wasm_src, DEFAULT_WASM_SRC);
        assert!(config.bundle_dir.is_none());
        assert!(config.template_dir.is_none());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.suffix, DEFAULT_SUFFIX);
        assert_eq!(config.get_template_dir("/tmp"), None);
    }
}
