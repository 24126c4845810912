//! Routing rules.
//!
//! Rule order in the settings collection is evaluation order: the compiler
//! emits rules in the order they are stored and the engine stops at the
//! first match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a rule's pattern matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Domain name or domain pattern.
    Domain,
    /// IP literal or CIDR block.
    #[serde(rename = "IP")]
    Ip,
    /// GeoIP category (e.g. `geoip:cn`).
    #[serde(rename = "GeoIP")]
    GeoIp,
    /// GeoSite category (e.g. `geosite:category-ads`).
    GeoSite,
}

impl RuleKind {
    /// Display name, as persisted in settings records.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Domain => "Domain",
            RuleKind::Ip => "IP",
            RuleKind::GeoIp => "GeoIP",
            RuleKind::GeoSite => "GeoSite",
        }
    }

    /// Whether the compiled routing entry carries the pattern in a `domain`
    /// list (as opposed to an `ip` list).
    pub fn matches_domains(&self) -> bool {
        matches!(self, RuleKind::Domain | RuleKind::GeoSite)
    }
}

/// Where matching traffic is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleAction {
    /// Route through the selected proxy outbound.
    Proxy,
    /// Bypass the proxy.
    Direct,
    /// Drop the traffic.
    Block,
}

impl RuleAction {
    /// Display name, as persisted in settings records.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Proxy => "Proxy",
            RuleAction::Direct => "Direct",
            RuleAction::Block => "Block",
        }
    }

    /// The outbound tag the compiled routing entry points at.
    pub fn outbound_tag(&self) -> &'static str {
        match self {
            RuleAction::Proxy => "proxy",
            RuleAction::Direct => "direct",
            RuleAction::Block => "blocked",
        }
    }
}

/// A single routing directive.
///
/// The pattern is opaque to this crate: it is carried verbatim into the
/// compiled routing table, whatever shape the match kind expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique identifier.
    pub id: Uuid,
    /// What the pattern matches against.
    #[serde(rename = "type")]
    pub kind: RuleKind,
    /// Match pattern, passed through verbatim.
    pub pattern: String,
    /// Where matching traffic goes.
    pub action: RuleAction,
    /// Creation timestamp.
    #[serde(default = "Utc::now", deserialize_with = "crate::timestamp::lenient")]
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Creates a rule with a fresh id and creation timestamp.
    pub fn new(kind: RuleKind, pattern: impl Into<String>, action: RuleAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            pattern: pattern.into(),
            action,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_names_are_stable() {
        let rule = Rule::new(RuleKind::GeoIp, "geoip:cn", RuleAction::Direct);
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["type"], json!("GeoIP"));
        assert_eq!(value["action"], json!("Direct"));
        assert_eq!(value["pattern"], json!("geoip:cn"));
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn kinds_split_into_domain_and_ip_lists() {
        assert!(RuleKind::Domain.matches_domains());
        assert!(RuleKind::GeoSite.matches_domains());
        assert!(!RuleKind::Ip.matches_domains());
        assert!(!RuleKind::GeoIp.matches_domains());
    }

    #[test]
    fn actions_map_to_outbound_tags() {
        assert_eq!(RuleAction::Proxy.outbound_tag(), "proxy");
        assert_eq!(RuleAction::Direct.outbound_tag(), "direct");
        assert_eq!(RuleAction::Block.outbound_tag(), "blocked");
    }
}
