//! # EMUSwitch Configuration Module
//!
//! This module provides configuration management for EMUSwitch, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use emuconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let host = config.get_host_address();
//! let devices = config.get_devices()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use emuutils::guess_local_ip;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("emuswitch.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load EMUSwitch configuration"));
}

const ENV_CONFIG_DIR: &str = "EMUSWITCH_CONFIG";
const ENV_PREFIX: &str = "EMUSWITCH_CONFIG__";

// Default values for configuration
const DEFAULT_LOG_MIN_LEVEL: &str = "info";

/// Description d'un switch émulé dans la section `devices` du YAML.
///
/// Seul `friendly_name` est obligatoire ; la validation est faite par
/// `emudevice` à la construction du device, pas au chargement du fichier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Nom affiché dans l'app WeMo et Alexa
    pub friendly_name: Option<String>,

    /// UUID stable du device (généré si absent)
    pub uuid: Option<String>,

    /// Port TCP du listener de contrôle (0 = port éphémère)
    pub port: Option<u16>,

    /// État binaire initial (0 = off, 1 = on)
    pub initial_state: Option<u8>,
}

/// Configuration manager for EMUSwitch
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use emuconfig::get_config;
///
/// let config = get_config();
/// let host = config.get_host_address();
/// println!("Announced host: {}", host);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

// Implémentation manuelle de Clone
impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().unwrap().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".emuswitch").exists() {
            return ".emuswitch".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".emuswitch");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".emuswitch".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        // Create if doesn't exist
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        // Verify it's a directory
        if !path.is_dir() {
            return Err(anyhow!("Le chemin spécifié n'est pas un répertoire"));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `EMUSWITCH_CONFIG` environment variable
    /// 3. `.emuswitch` in the current directory
    /// 4. `.emuswitch` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for
    /// read/write permissions.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or validated
    pub fn config_dir(directory: &str) -> String {
        let dir_path = Self::find_config_dir(directory);
        let path = Path::new(&dir_path);

        Self::validate_config_dir(path)
            .expect("Impossible de valider le répertoire de configuration");

        dir_path
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory containing the config.yaml file, or empty to use defaults
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the loaded `Config` or an error
    pub fn load_config(directory: &str) -> Result<Self> {
        // Obtenir le répertoire de configuration
        let config_dir = Self::config_dir(directory);
        info!(config_dir=%config_dir, "Using config directory");

        // Construire le chemin du fichier config.yaml
        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        // Charger la configuration par défaut
        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        // Essayer de charger le fichier de configuration
        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        // Merger avec la config par défaut
        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        // Appliquer les overrides depuis les variables d'environnement
        Self::apply_env_overrides(&mut config_value);

        // Créer la configuration
        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        // Sauvegarder la configuration
        config.save()?;
        Ok(config)
    }

    /// Retourne le répertoire de configuration utilisé.
    pub fn get_config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "address"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key.clone());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "address"]`)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the YAML value or an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        let new_key = Value::String(s.to_lowercase());
                        let new_val = Self::lower_keys_value(v);
                        new_map.insert(new_key, new_val);
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Gets the IP address announced to WeMo clients
    ///
    /// Returns the configured address, or attempts to guess the local IP
    /// address if not configured.
    pub fn get_host_address(&self) -> String {
        match self.get_value(&["host", "address"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => guess_local_ip(),
        }
    }

    /// Définit l'adresse IP annoncée aux clients WeMo
    pub fn set_host_address(&self, address: String) -> Result<()> {
        self.set_value(&["host", "address"], Value::String(address))
    }

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    /// Gets the list of emulated devices from the `devices` section
    ///
    /// # Returns
    ///
    /// The configured devices, or an empty vector if the section is absent.
    /// An error is returned only for a malformed section.
    pub fn get_devices(&self) -> Result<Vec<DeviceConfig>> {
        match self.get_value(&["devices"]) {
            Ok(value @ Value::Sequence(_)) => {
                serde_yaml::from_value(value).map_err(|e| anyhow!("Invalid devices section: {}", e))
            }
            Ok(Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(_) => Err(anyhow!("Devices section must be a sequence")),
        }
    }
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access.
///
/// # Examples
///
/// ```no_run
/// use emuconfig::get_config;
///
/// let config = get_config();
/// let devices = config.get_devices();
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// This function recursively merges two YAML value trees:
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
///
/// # Arguments
///
/// * `default` - The default configuration to merge into (modified in place)
/// * `external` - The external configuration to merge from
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from_str(yaml: &str) -> Config {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Config {
            config_dir: String::new(),
            path: String::new(),
            data: Mutex::new(Config::lower_keys_value(value)),
        }
    }

    #[test]
    fn test_default_config_is_valid_yaml() {
        let value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(matches!(value, Value::Mapping(_)));
    }

    #[test]
    fn test_get_value_nested_path() {
        let config = config_from_str("host:\n  logger:\n    min_level: debug\n");

        let level = config.get_value(&["host", "logger", "min_level"]).unwrap();
        assert_eq!(level, Value::String("debug".to_string()));

        // Chemin inexistant
        assert!(config.get_value(&["host", "missing"]).is_err());
    }

    #[test]
    fn test_get_value_is_case_insensitive() {
        let config = config_from_str("host:\n  address: 192.168.1.10\n");

        let addr = config.get_value(&["HOST", "Address"]).unwrap();
        assert_eq!(addr, Value::String("192.168.1.10".to_string()));
    }

    #[test]
    fn test_merge_yaml_overrides_scalars_and_keeps_defaults() {
        let mut default: Value =
            serde_yaml::from_str("host:\n  address: \"\"\n  logger:\n    min_level: info\n")
                .unwrap();
        let external: Value = serde_yaml::from_str("host:\n  address: 10.0.0.5\n").unwrap();

        merge_yaml(&mut default, &external);

        assert_eq!(
            Config::get_value_internal(&default, &["host", "address"]).unwrap(),
            Value::String("10.0.0.5".to_string())
        );
        // Les clés non redéfinies restent intactes
        assert_eq!(
            Config::get_value_internal(&default, &["host", "logger", "min_level"]).unwrap(),
            Value::String("info".to_string())
        );
    }

    #[test]
    fn test_convert_env_value_types() {
        assert_eq!(Config::convert_env_value("8080"), Value::Number(8080.into()));
        assert_eq!(Config::convert_env_value("true"), Value::Bool(true));
        assert_eq!(
            Config::convert_env_value("hello world"),
            Value::String("hello world".to_string())
        );
    }

    #[test]
    fn test_get_devices_parses_entries() {
        let config = config_from_str(
            "devices:\n  - friendly_name: Lampe salon\n    port: 9100\n  - friendly_name: Cafetière\n    initial_state: 1\n",
        );

        let devices = config.get_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].friendly_name.as_deref(), Some("Lampe salon"));
        assert_eq!(devices[0].port, Some(9100));
        assert_eq!(devices[0].uuid, None);
        assert_eq!(devices[1].initial_state, Some(1));
    }

    #[test]
    fn test_get_devices_missing_section_is_empty() {
        let config = config_from_str("host:\n  address: \"\"\n");
        assert!(config.get_devices().unwrap().is_empty());
    }

    #[test]
    fn test_get_log_min_level_default() {
        let config = config_from_str("host: {}\n");
        assert_eq!(config.get_log_min_level(), DEFAULT_LOG_MIN_LEVEL);
    }
}
