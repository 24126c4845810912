//! The settings store: one JSON file that is both the engine's config and
//! the application's persisted settings.
//!
//! [`SettingsStore::save`] compiles the snapshot and writes the resulting
//! document; the embedded private section (`_raybar`) is what
//! [`SettingsStore::load`] reads back. Saving reports whether the on-disk
//! document actually changed, which is the signal the engine supervisor
//! uses to decide on a restart — compilation is deterministic, so an
//! unchanged snapshot saves to identical bytes.
//!
//! Loading is deliberately lenient: a missing or unreadable file yields
//! defaults, a missing or mistyped leaf falls back to its default, and a
//! collection record that does not deserialize is dropped wholesale (with a
//! warning) rather than failing the load.

use std::fs;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use raybar_core::{compile, ProxyMode, Settings, SETTINGS_KEY};

use crate::error::{Result, StoreError};

/// File name of the combined config document.
const CONFIG_FILE: &str = "config.json";

/// Reads and writes the settings file.
pub struct SettingsStore {
    dir: PathBuf,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store at the default location
    /// (`~/.config/raybar/config.json`), creating the directory if needed.
    pub fn new() -> Result<Self> {
        let dir = Self::default_config_dir()?;
        Ok(Self::with_dir(dir))
    }

    /// Creates a store rooted at a specific directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(CONFIG_FILE);
        Self { dir, path }
    }

    /// The default config directory.
    pub fn default_config_dir() -> Result<PathBuf> {
        let user_dirs = UserDirs::new()
            .ok_or_else(|| StoreError::Config("Could not determine home directory".into()))?;
        Ok(user_dirs.home_dir().join(".config").join("raybar"))
    }

    /// Path of the config file, for the collaborator that starts the
    /// engine with `run -c <path>`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings from disk, falling back to defaults leaf by leaf.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }

        let text = fs::read_to_string(&self.path)?;
        let document: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Settings file is not valid JSON, using defaults");
                return Ok(Settings::default());
            }
        };

        let Some(section) = document.get(SETTINGS_KEY) else {
            warn!(path = %self.path.display(), "Settings file has no {SETTINGS_KEY} section, using defaults");
            return Ok(Settings::default());
        };

        Ok(settings_from_section(section))
    }

    /// Compiles and writes the settings, returning whether the on-disk
    /// document changed.
    ///
    /// Mutate-compile-persist happens inside this one synchronous call, so
    /// a caller that serializes its calls never persists a half-mutated
    /// snapshot.
    pub fn save(&self, settings: &Settings) -> Result<bool> {
        let document = compile(settings).to_json_pretty();

        let previous = fs::read_to_string(&self.path).ok();
        if previous.as_deref() == Some(document.as_str()) {
            return Ok(false);
        }

        fs::create_dir_all(&self.dir)?;
        fs::write(&self.path, &document)?;
        info!(path = %self.path.display(), "Wrote engine config");
        Ok(true)
    }
}

/// Rebuilds settings from the private document section, defaulting every
/// missing or mistyped leaf.
fn settings_from_section(section: &Value) -> Settings {
    let mut settings = Settings::default();

    if let Some(port) = read_port(section, "socksPort") {
        settings.socks_port = port;
    }
    if let Some(port) = read_port(section, "httpPort") {
        settings.http_port = port;
    }
    if let Some(flag) = read_bool(section, "autoConnect") {
        settings.auto_connect = flag;
    }
    if let Some(flag) = read_bool(section, "allowLAN") {
        settings.allow_lan = flag;
    }
    if let Some(flag) = read_bool(section, "systemProxyEnabled") {
        settings.system_proxy_enabled = flag;
    }
    if let Some(flag) = read_bool(section, "dnsServerEnabled") {
        settings.dns_server_enabled = flag;
    }
    if let Some(mode) = section.get("proxyMode").and_then(Value::as_str) {
        match mode {
            "Global" => settings.proxy_mode = ProxyMode::Global,
            "Rule" => settings.proxy_mode = ProxyMode::Rule,
            "Direct" => settings.proxy_mode = ProxyMode::Direct,
            other => warn!(mode = other, "Unknown proxy mode, keeping default"),
        }
    }
    if let Some(id) = section.get("selectedConfigId").and_then(Value::as_str) {
        match Uuid::parse_str(id) {
            Ok(id) => settings.selected_profile = Some(id),
            Err(_) => warn!(id, "Unparseable selected profile id, ignoring"),
        }
    }

    settings.profiles = read_records(section, "configs");
    settings.rules = read_records(section, "rules");
    settings.dns_servers = read_records(section, "dnsServers");
    settings.dns_policies = read_records(section, "dnsPolicies");

    settings
}

fn read_port(section: &Value, key: &str) -> Option<u16> {
    section
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|port| u16::try_from(port).ok())
}

fn read_bool(section: &Value, key: &str) -> Option<bool> {
    section.get(key).and_then(Value::as_bool)
}

/// Deserializes a record array element by element, dropping (and warning
/// about) any element that does not parse.
fn read_records<T: DeserializeOwned>(section: &Value, key: &str) -> Vec<T> {
    let Some(items) = section.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(key, %err, "Dropping unparseable settings record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use raybar_core::{DnsPolicy, DnsServer, Profile, Rule, RuleAction, RuleKind, Transport};
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_settings() -> Settings {
        let mut settings = Settings::default();
        settings.proxy_mode = ProxyMode::Rule;
        settings.dns_server_enabled = true;
        let profile = Profile::new(
            "node",
            Transport::Trojan {
                password: "secret".to_string(),
            },
            "host.example",
            443,
        );
        settings.select_profile(Some(profile.id));
        settings.add_profile(profile);
        settings.add_rule(Rule::new(RuleKind::Domain, "ads.example", RuleAction::Block));
        settings.add_dns_server(DnsServer::new("8.8.8.8"));
        settings.add_dns_policy(DnsPolicy::new("example.com", "1.1.1.1"));
        settings
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        let settings = sample_settings();

        assert!(store.save(&settings).unwrap());
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn saving_unchanged_settings_reports_no_change() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        let settings = sample_settings();

        assert!(store.save(&settings).unwrap());
        assert!(!store.save(&settings).unwrap());

        let mut mutated = settings.clone();
        mutated.allow_lan = true;
        assert!(store.save(&mutated).unwrap());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn malformed_record_is_dropped_wholesale() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        let document = json!({
            "_raybar": {
                "socksPort": 1111,
                "configs": [
                    {
                        "id": "not-a-uuid",
                        "name": "broken",
                        "type": "Trojan",
                        "address": "h",
                        "port": 1,
                        "createdAt": "2024-01-01T00:00:00Z",
                    },
                    {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "name": "good",
                        "type": "Trojan",
                        "address": "h",
                        "port": 1,
                        "password": "pw",
                        "createdAt": "2024-01-01T00:00:00Z",
                    },
                ],
            }
        });
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.path(), document.to_string()).unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.socks_port, 1111);
        assert_eq!(settings.profiles.len(), 1);
        assert_eq!(settings.profiles[0].name, "good");
    }

    #[test]
    fn missing_created_at_defaults_instead_of_dropping() {
        // createdAt is bookkeeping, not a mandatory field: records without
        // it (or with an unreadable one) keep their data.
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        let document = json!({
            "_raybar": {
                "configs": [
                    {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "name": "no-stamp",
                        "type": "Trojan",
                        "address": "host.example",
                        "port": 443,
                        "password": "pw",
                    },
                ],
                "rules": [
                    {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "type": "Domain",
                        "pattern": "ads.example",
                        "action": "Block",
                        "createdAt": "not a date",
                    },
                ],
                "dnsServers": [
                    {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "address": "8.8.8.8",
                        "createdAt": 12345,
                    },
                ],
                "dnsPolicies": [
                    {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "domain": "example.com",
                        "dnsServer": "1.1.1.1",
                    },
                ],
            }
        });
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.path(), document.to_string()).unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.profiles.len(), 1);
        assert_eq!(settings.profiles[0].name, "no-stamp");
        assert_eq!(settings.rules.len(), 1);
        assert_eq!(settings.dns_servers.len(), 1);
        assert_eq!(settings.dns_policies.len(), 1);
    }

    #[test]
    fn mistyped_leaves_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        let document = json!({
            "_raybar": {
                "socksPort": "not a number",
                "httpPort": 700000,
                "allowLAN": "yes",
                "proxyMode": "Tunnel",
                "selectedConfigId": "nope",
                "rules": "not an array",
            }
        });
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.path(), document.to_string()).unwrap();

        let settings = store.load().unwrap();
        assert_eq!(settings.socks_port, raybar_core::DEFAULT_SOCKS_PORT);
        assert_eq!(settings.http_port, raybar_core::DEFAULT_HTTP_PORT);
        assert!(!settings.allow_lan);
        assert_eq!(settings.proxy_mode, ProxyMode::Global);
        assert!(settings.selected_profile.is_none());
        assert!(settings.rules.is_empty());
    }

    #[test]
    fn written_document_carries_engine_sections() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::with_dir(dir.path());
        store.save(&sample_settings()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let document: Value = serde_json::from_str(&text).unwrap();
        assert!(document.get("inbounds").is_some());
        assert!(document.get("outbounds").is_some());
        assert!(document.get("routing").is_some());
        assert!(document.get("dns").is_some());
        assert_eq!(document["log"]["loglevel"], "warning");
    }
}
