//! Subscription-link parser.
//!
//! Decodes a single proxy share link into a [`Profile`]. Four schemes are
//! recognized, checked in this order: `vless://`, `vmess://`, `trojan://`,
//! `ss://`. Anything else is [`ParseError::UnsupportedScheme`].
//!
//! All parsing is pure: no I/O, deterministic apart from the fresh id and
//! creation timestamp stamped on the produced profile.
//!
//! Known looseness, kept for compatibility with links already in the wild:
//! a degenerate `ss://` link parses to a profile with an empty host instead
//! of failing. Callers must check for a non-empty host before accepting a
//! parsed profile.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

use crate::profile::{Profile, Transport};

/// Why a link could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The link does not start with a recognized scheme.
    #[error("unsupported link scheme")]
    UnsupportedScheme,
    /// The link matched a scheme but its payload is unusable.
    #[error("malformed link: {0}")]
    Malformed(String),
}

/// Result type for link parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Parses one share link into a profile.
///
/// Surrounding whitespace and newlines are ignored. Scheme matching is
/// case-sensitive.
pub fn parse(uri: &str) -> Result<Profile> {
    let trimmed = uri.trim();
    if let Some(rest) = trimmed.strip_prefix("vless://") {
        parse_vless(rest)
    } else if let Some(rest) = trimmed.strip_prefix("vmess://") {
        parse_vmess(rest)
    } else if let Some(rest) = trimmed.strip_prefix("trojan://") {
        parse_trojan(rest)
    } else if let Some(rest) = trimmed.strip_prefix("ss://") {
        parse_shadowsocks(rest)
    } else {
        Err(ParseError::UnsupportedScheme)
    }
}

// vless://uuid@host:port?params#name
fn parse_vless(rest: &str) -> Result<Profile> {
    let parts = split_authority(rest)?;
    let name = parts.display_name();
    Ok(Profile::new(
        name,
        Transport::Vless {
            uuid: parts.userinfo,
        },
        parts.host,
        parts.port,
    ))
}

// trojan://password@host:port?params#name
fn parse_trojan(rest: &str) -> Result<Profile> {
    let parts = split_authority(rest)?;
    let name = parts.display_name();
    Ok(Profile::new(
        name,
        Transport::Trojan {
            password: parts.userinfo,
        },
        parts.host,
        parts.port,
    ))
}

// vmess://base64(json with ps/add/port/id)
fn parse_vmess(rest: &str) -> Result<Profile> {
    let bytes = STANDARD
        .decode(rest)
        .map_err(|_| ParseError::Malformed("vmess payload is not base64".to_string()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|_| ParseError::Malformed("vmess payload is not JSON".to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::Malformed("vmess payload is not a JSON object".to_string()))?;

    let host = obj
        .get("add")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = obj
        .get("ps")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| host.clone());
    // "port" may be an integer or a numeric string; anything else falls
    // back to 443.
    let port = match obj.get("port") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(Value::String(s)) => s.parse::<u16>().ok(),
        _ => None,
    }
    .unwrap_or(443);
    let uuid = obj
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Profile::new(name, Transport::Vmess { uuid }, host, port))
}

// ss://base64(method:password)@host:port#name
// or legacy: ss://base64(method:password@host:port)#name
fn parse_shadowsocks(rest: &str) -> Result<Profile> {
    let (working, fragment) = strip_fragment(rest);

    let mut host = String::new();
    let mut port = 443;
    let mut method = None;
    let mut password = String::new();

    if let Some(at) = working.rfind('@') {
        if let Some((m, p)) = decode_credentials(&working[..at]) {
            method = Some(m);
            password = p;
        }
        (host, port) = split_host_port(&working[at + 1..]);
    } else if let Some(decoded) = decode_base64_utf8(working) {
        let parts: Vec<&str> = decoded.split('@').collect();
        if parts.len() == 2 {
            if let Some((m, p)) = parts[0].split_once(':') {
                method = Some(m.to_string());
                password = p.to_string();
            }
            (host, port) = split_host_port(parts[1]);
        }
    }

    let name = match fragment {
        Some(name) if !name.is_empty() => name,
        _ => host.clone(),
    };

    // A link that yielded no host still parses; callers reject empty hosts.
    Ok(Profile::new(
        name,
        Transport::Shadowsocks { method, password },
        host,
        port,
    ))
}

/// The pieces of a `scheme://userinfo@host:port?query#fragment` link.
struct Authority {
    userinfo: String,
    host: String,
    port: u16,
    fragment: Option<String>,
}

impl Authority {
    /// Percent-decoded fragment, falling back to the host.
    fn display_name(&self) -> String {
        match &self.fragment {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.host.clone(),
        }
    }
}

/// Splits the part after the scheme into userinfo/host/port/fragment.
///
/// The query string is ignored. A missing port defaults to 443; a
/// non-numeric port or an empty host is malformed.
fn split_authority(rest: &str) -> Result<Authority> {
    let (rest, fragment) = strip_fragment(rest);
    let rest = rest.split_once('?').map(|(head, _)| head).unwrap_or(rest);

    let (userinfo, host_port) = match rest.split_once('@') {
        Some((user, tail)) => (user.to_string(), tail),
        None => (String::new(), rest),
    };

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| ParseError::Malformed(format!("invalid port: {port}")))?;
            (host, port)
        }
        None => (host_port, 443),
    };
    if host.is_empty() {
        return Err(ParseError::Malformed("empty host".to_string()));
    }

    Ok(Authority {
        userinfo,
        host: host.to_string(),
        port,
        fragment,
    })
}

/// Splits off a trailing `#fragment`, percent-decoding it. An undecodable
/// fragment is treated as absent.
fn strip_fragment(rest: &str) -> (&str, Option<String>) {
    match rest.rfind('#') {
        Some(idx) => {
            let fragment = urlencoding::decode(&rest[idx + 1..])
                .ok()
                .map(|name| name.into_owned());
            (&rest[..idx], fragment)
        }
        None => (rest, None),
    }
}

/// Decodes `base64(method:password)`, splitting at the first colon.
fn decode_credentials(encoded: &str) -> Option<(String, String)> {
    let decoded = decode_base64_utf8(encoded)?;
    let (method, password) = decoded.split_once(':')?;
    Some((method.to_string(), password.to_string()))
}

/// Base64 decode to UTF-8, accepting padded and unpadded input.
fn decode_base64_utf8(encoded: &str) -> Option<String> {
    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Splits `host:port` at the last colon, so a stray colon in the host does
/// not eat the port. No colon or an unparseable port leaves 443.
fn split_host_port(host_port: &str) -> (String, u16) {
    match host_port.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(443)),
        None => (host_port.to_string(), 443),
    }
}
