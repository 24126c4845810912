//! Outbound server profiles.
//!
//! A [`Profile`] describes one upstream proxy server: where it is
//! (host/port), which protocol it speaks, and the credentials that protocol
//! needs. Credentials are carried inside the [`Transport`] enum so a profile
//! can never hold fields its protocol does not use (a trojan profile has no
//! cipher method, a shadowsocks profile has no user id).
//!
//! Profiles are created by the subscription-link parser or by a form, and
//! are only ever mutated by whole-record replacement through
//! [`crate::settings::Settings`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol family of an outbound server, without credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    #[serde(rename = "VLESS")]
    Vless,
    #[serde(rename = "VMess")]
    Vmess,
    #[serde(rename = "Trojan")]
    Trojan,
    #[serde(rename = "Shadowsocks")]
    Shadowsocks,
    #[serde(rename = "SOCKS")]
    Socks,
    #[serde(rename = "HTTP")]
    Http,
}

impl TransportKind {
    /// Display name, as persisted in settings records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Vless => "VLESS",
            TransportKind::Vmess => "VMess",
            TransportKind::Trojan => "Trojan",
            TransportKind::Shadowsocks => "Shadowsocks",
            TransportKind::Socks => "SOCKS",
            TransportKind::Http => "HTTP",
        }
    }

    /// Protocol identifier used in the engine config (`outbounds[].protocol`).
    pub fn protocol(&self) -> &'static str {
        match self {
            TransportKind::Vless => "vless",
            TransportKind::Vmess => "vmess",
            TransportKind::Trojan => "trojan",
            TransportKind::Shadowsocks => "shadowsocks",
            TransportKind::Socks => "socks",
            TransportKind::Http => "http",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocol family together with the credentials that family requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// VLESS with a user id.
    Vless { uuid: String },
    /// VMess with a user id.
    Vmess { uuid: String },
    /// Trojan with a shared password.
    Trojan { password: String },
    /// Shadowsocks with a cipher method and password. A `None` method
    /// compiles to the engine default (`aes-256-gcm`).
    Shadowsocks {
        method: Option<String>,
        password: String,
    },
    /// Plain SOCKS upstream with optional user/password authentication.
    Socks {
        username: Option<String>,
        password: Option<String>,
    },
    /// Plain HTTP upstream with optional user/password authentication.
    Http {
        username: Option<String>,
        password: Option<String>,
    },
}

impl Transport {
    /// The protocol family of this transport.
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Vless { .. } => TransportKind::Vless,
            Transport::Vmess { .. } => TransportKind::Vmess,
            Transport::Trojan { .. } => TransportKind::Trojan,
            Transport::Shadowsocks { .. } => TransportKind::Shadowsocks,
            Transport::Socks { .. } => TransportKind::Socks,
            Transport::Http { .. } => TransportKind::Http,
        }
    }
}

/// An outbound proxy server definition.
///
/// Serializes to the flat record shape used in the persisted settings
/// section (`type`/`address`/optional credential leaves), converting through
/// [`ProfileRecord`] in both directions so deserialization rejects records
/// that do not fit any transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ProfileRecord", from = "ProfileRecord")]
pub struct Profile {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name shown in menus.
    pub name: String,
    /// Protocol and credentials.
    pub transport: Transport,
    /// Server hostname or IP literal.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Last measured latency in milliseconds, if any.
    pub ping: Option<u32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a profile with a fresh id and creation timestamp.
    pub fn new(
        name: impl Into<String>,
        transport: Transport,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            transport,
            host: host.into(),
            port,
            ping: None,
            created_at: Utc::now(),
        }
    }

    /// The protocol family of this profile.
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

/// Flat on-disk form of a [`Profile`].
///
/// Credential leaves are all optional here; the conversion back into
/// `Profile` keeps only the ones the record's `type` actually uses and
/// treats a missing credential as empty, matching how the settings loader
/// has always been lenient about credential leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransportKind,
    pub address: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping: Option<u32>,
    #[serde(default = "Utc::now", deserialize_with = "crate::timestamp::lenient")]
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileRecord {
    fn from(profile: Profile) -> Self {
        let kind = profile.transport.kind();
        let (uuid, password, method, username) = match profile.transport {
            Transport::Vless { uuid } | Transport::Vmess { uuid } => (Some(uuid), None, None, None),
            Transport::Trojan { password } => (None, Some(password), None, None),
            Transport::Shadowsocks { method, password } => (None, Some(password), method, None),
            Transport::Socks { username, password } | Transport::Http { username, password } => {
                (None, password, None, username)
            }
        };
        Self {
            id: profile.id,
            name: profile.name,
            kind,
            address: profile.host,
            port: profile.port,
            uuid,
            password,
            method,
            username,
            ping: profile.ping,
            created_at: profile.created_at,
        }
    }
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let transport = match record.kind {
            TransportKind::Vless => Transport::Vless {
                uuid: record.uuid.unwrap_or_default(),
            },
            TransportKind::Vmess => Transport::Vmess {
                uuid: record.uuid.unwrap_or_default(),
            },
            TransportKind::Trojan => Transport::Trojan {
                password: record.password.unwrap_or_default(),
            },
            TransportKind::Shadowsocks => Transport::Shadowsocks {
                method: record.method,
                password: record.password.unwrap_or_default(),
            },
            TransportKind::Socks => Transport::Socks {
                username: record.username,
                password: record.password,
            },
            TransportKind::Http => Transport::Http {
                username: record.username,
                password: record.password,
            },
        };
        Self {
            id: record.id,
            name: record.name,
            transport,
            host: record.address,
            port: record.port,
            ping: record.ping,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_round_trip_preserves_transport() {
        let profile = Profile::new(
            "node",
            Transport::Shadowsocks {
                method: Some("aes-256-gcm".to_string()),
                password: "pw".to_string(),
            },
            "1.2.3.4",
            8388,
        );

        let text = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&text).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn serialized_record_is_flat() {
        let profile = Profile::new(
            "server",
            Transport::Vless {
                uuid: "1a2b3c".to_string(),
            },
            "example.com",
            443,
        );

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["type"], json!("VLESS"));
        assert_eq!(value["address"], json!("example.com"));
        assert_eq!(value["port"], json!(443));
        assert_eq!(value["uuid"], json!("1a2b3c"));
        assert!(value.get("password").is_none());
        assert!(value.get("method").is_none());
        assert!(value["createdAt"].is_string());
        assert_eq!(value["id"], json!(profile.id.to_string()));
    }

    #[test]
    fn loading_keeps_only_credentials_the_kind_uses() {
        // A trojan record carrying a stray cipher method: the method must
        // not survive into the typed profile.
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "name": "t",
            "type": "Trojan",
            "address": "host.example",
            "port": 443,
            "password": "secret",
            "method": "aes-128-gcm",
            "createdAt": "2024-01-01T00:00:00Z",
        });

        let profile: Profile = serde_json::from_value(record).unwrap();
        assert_eq!(
            profile.transport,
            Transport::Trojan {
                password: "secret".to_string()
            }
        );
    }

    #[test]
    fn missing_created_at_gets_a_fresh_timestamp() {
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "name": "t",
            "type": "Trojan",
            "address": "host.example",
            "port": 443,
            "password": "secret",
        });

        let profile: Profile = serde_json::from_value(record).unwrap();
        assert!((Utc::now() - profile.created_at).num_seconds().abs() < 60);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "name": "x",
            "type": "Wireguard",
            "address": "host",
            "port": 1,
            "createdAt": "2024-01-01T00:00:00Z",
        });
        assert!(serde_json::from_value::<Profile>(record).is_err());
    }

    #[test]
    fn kind_strings_match_protocol_names() {
        assert_eq!(TransportKind::Vless.protocol(), "vless");
        assert_eq!(TransportKind::Shadowsocks.as_str(), "Shadowsocks");
        assert_eq!(TransportKind::Socks.protocol(), "socks");
        assert_eq!(TransportKind::Http.as_str(), "HTTP");
    }
}
