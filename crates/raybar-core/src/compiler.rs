//! Engine configuration compiler.
//!
//! [`compile`] turns a [`Settings`] snapshot into the declarative JSON
//! document the proxy engine is started with (`xray run -c <path>`). It is a
//! total function: optional pieces are omitted rather than rejected, so any
//! valid snapshot compiles.
//!
//! The document must serialize byte-identically for identical input — the
//! store compares serializations to decide whether the engine needs a
//! restart. `serde_json`'s map type keeps keys sorted and arrays are built
//! in a fixed order, so no extra canonicalization step is needed.

use serde_json::{json, Map, Value};

use crate::profile::{Profile, Transport};
use crate::settings::{ProxyMode, Settings};

/// Top-level key of the private settings section embedded in the document.
/// The engine ignores it; the store reads it back on load.
pub const SETTINGS_KEY: &str = "_raybar";

/// A compiled engine configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument(Value);

impl ConfigDocument {
    /// The document as a JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the document, yielding the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Renders the document as pretty-printed JSON with sorted keys.
    ///
    /// Identical snapshots render identically; this string is what gets
    /// written to the engine config file.
    pub fn to_json_pretty(&self) -> String {
        // A Value with string keys always serializes.
        serde_json::to_string_pretty(&self.0).expect("config document serializes")
    }
}

/// Compiles a settings snapshot into an engine configuration document.
pub fn compile(settings: &Settings) -> ConfigDocument {
    let mut root = Map::new();

    root.insert("log".to_string(), json!({ "loglevel": "warning" }));
    root.insert("inbounds".to_string(), build_inbounds(settings));
    root.insert("outbounds".to_string(), build_outbounds(settings));

    if settings.proxy_mode == ProxyMode::Rule && !settings.rules.is_empty() {
        root.insert("routing".to_string(), build_routing(settings));
    }

    if settings.dns_server_enabled
        && (!settings.dns_servers.is_empty() || !settings.dns_policies.is_empty())
    {
        root.insert("dns".to_string(), build_dns(settings));
    }

    // Full settings embedded verbatim so the document round-trips.
    root.insert(
        SETTINGS_KEY.to_string(),
        serde_json::to_value(settings).expect("settings serialize"),
    );

    ConfigDocument(Value::Object(root))
}

/// The two fixed listeners: SOCKS (with UDP and sniffing) and HTTP.
fn build_inbounds(settings: &Settings) -> Value {
    let listen = if settings.allow_lan {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    };

    json!([
        {
            "tag": "socks-inbound",
            "port": settings.socks_port,
            "listen": listen,
            "protocol": "socks",
            "settings": {
                "auth": "noauth",
                "udp": true,
                "ip": listen,
            },
            "sniffing": {
                "enabled": true,
                "destOverride": ["http", "tls"],
            },
        },
        {
            "tag": "http-inbound",
            "port": settings.http_port,
            "listen": listen,
            "protocol": "http",
            "settings": {},
        },
    ])
}

/// Proxy outbound (when a selected profile exists), then direct and blocked.
fn build_outbounds(settings: &Settings) -> Value {
    let mut outbounds = Vec::new();

    if let Some(profile) = settings.selected() {
        outbounds.push(build_proxy_outbound(profile));
    }

    outbounds.push(json!({
        "tag": "direct",
        "protocol": "freedom",
        "settings": {},
    }));
    outbounds.push(json!({
        "tag": "blocked",
        "protocol": "blackhole",
        "settings": {},
    }));

    Value::Array(outbounds)
}

fn build_proxy_outbound(profile: &Profile) -> Value {
    let settings = match &profile.transport {
        Transport::Vless { uuid } => json!({
            "vnext": [{
                "address": profile.host,
                "port": profile.port,
                "users": [{
                    "id": uuid,
                    "encryption": "none",
                }],
            }],
        }),
        Transport::Vmess { uuid } => json!({
            "vnext": [{
                "address": profile.host,
                "port": profile.port,
                "users": [{
                    "id": uuid,
                    "alterId": 0,
                    "security": "auto",
                }],
            }],
        }),
        Transport::Trojan { password } => json!({
            "servers": [{
                "address": profile.host,
                "port": profile.port,
                "password": password,
            }],
        }),
        Transport::Shadowsocks { method, password } => json!({
            "servers": [{
                "address": profile.host,
                "port": profile.port,
                "method": method.as_deref().unwrap_or("aes-256-gcm"),
                "password": password,
            }],
        }),
        Transport::Socks { username, password } | Transport::Http { username, password } => {
            let mut server = Map::new();
            server.insert("address".to_string(), json!(profile.host));
            server.insert("port".to_string(), json!(profile.port));
            // Credentials only when both halves are present.
            if let (Some(user), Some(pass)) = (username.as_deref(), password.as_deref()) {
                if !user.is_empty() && !pass.is_empty() {
                    server.insert("users".to_string(), json!([{ "user": user, "pass": pass }]));
                }
            }
            json!({ "servers": [server] })
        }
    };

    json!({
        "tag": "proxy",
        "protocol": profile.kind().protocol(),
        "settings": settings,
    })
}

/// One routing entry per rule, in collection order (first match wins).
fn build_routing(settings: &Settings) -> Value {
    let rules: Vec<Value> = settings
        .rules
        .iter()
        .map(|rule| {
            let list_key = if rule.kind.matches_domains() {
                "domain"
            } else {
                "ip"
            };
            let mut entry = Map::new();
            entry.insert("type".to_string(), json!("field"));
            entry.insert(list_key.to_string(), json!([rule.pattern]));
            entry.insert(
                "outboundTag".to_string(),
                json!(rule.action.outbound_tag()),
            );
            Value::Object(entry)
        })
        .collect();

    json!({
        "domainStrategy": "IPIfNonMatch",
        "rules": rules,
    })
}

/// DNS server list plus per-domain host overrides. Later policies for the
/// same domain overwrite earlier ones (map semantics, last write wins).
fn build_dns(settings: &Settings) -> Value {
    let mut dns = Map::new();

    if !settings.dns_servers.is_empty() {
        let servers: Vec<&str> = settings
            .dns_servers
            .iter()
            .map(|s| s.address.as_str())
            .collect();
        dns.insert("servers".to_string(), json!(servers));
    }

    if !settings.dns_policies.is_empty() {
        let mut hosts = Map::new();
        for policy in &settings.dns_policies {
            hosts.insert(policy.domain.clone(), json!(policy.server));
        }
        dns.insert("hosts".to_string(), Value::Object(hosts));
    }

    Value::Object(dns)
}
