use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_PATH: &str = "models/model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serialized model artifact, read once at startup.
    pub model_path: PathBuf,
    /// Load the model before accepting traffic. When false the first
    /// `/predict` call loads it.
    pub preload_model: bool,
    /// Number of recent request latencies kept for `/metrics`.
    pub latency_window: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            preload_model: true,
            latency_window: 1024,
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, then the YAML file named by `SERVER_CONFIG` (if set), then
    /// `HOST`, `PORT`, `MODEL_PATH` and `PRELOAD_MODEL`.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("SERVER_CONFIG") {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup("PRELOAD_MODEL") {
            config.preload_model = parse_flag(&flag)
                .with_context(|| format!("PRELOAD_MODEL must be true or false, got {:?}", flag))?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::resolve(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9001"),
            ("MODEL_PATH", "/srv/model.json"),
            ("PRELOAD_MODEL", "false"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9001");
        assert_eq!(config.model_path, PathBuf::from("/srv/model.json"));
        assert!(!config.preload_model);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = ServerConfig::resolve(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_yaml_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 7000\nmodel_path: /data/iris.json\nlatency_window: 16").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = ServerConfig::resolve(lookup_from(&[
            ("SERVER_CONFIG", path.as_str()),
            ("PORT", "7001"),
        ]))
        .unwrap();

        assert_eq!(config.port, 7001);
        assert_eq!(config.model_path, PathBuf::from("/data/iris.json"));
        assert_eq!(config.latency_window, 16);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_unknown_yaml_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers: 4").unwrap();
        assert!(ServerConfig::load(file.path()).is_err());
    }
}
