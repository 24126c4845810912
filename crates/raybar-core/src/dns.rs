//! DNS servers and per-domain DNS policies.
//!
//! Both are plain value records. A policy names a DNS server by address and
//! is not cross-checked against the server list; the compiler passes both
//! through as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A DNS server address: a plain IP (`8.8.8.8`) or a DoH URL
/// (`https://dns.example/dns-query`). Not validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsServer {
    /// Unique identifier.
    pub id: Uuid,
    /// Server address.
    pub address: String,
    /// Creation timestamp.
    #[serde(default = "Utc::now", deserialize_with = "crate::timestamp::lenient")]
    pub created_at: DateTime<Utc>,
}

impl DnsServer {
    /// Creates a DNS server record with a fresh id and creation timestamp.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            created_at: Utc::now(),
        }
    }
}

/// Routes lookups for one domain pattern to a specific DNS server.
///
/// Later policies for the same domain override earlier ones when compiled
/// into the `dns.hosts` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsPolicy {
    /// Unique identifier.
    pub id: Uuid,
    /// Domain pattern the policy applies to.
    pub domain: String,
    /// Address of the DNS server answering for that domain.
    #[serde(rename = "dnsServer")]
    pub server: String,
    /// Creation timestamp.
    #[serde(default = "Utc::now", deserialize_with = "crate::timestamp::lenient")]
    pub created_at: DateTime<Utc>,
}

impl DnsPolicy {
    /// Creates a DNS policy with a fresh id and creation timestamp.
    pub fn new(domain: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            server: server.into(),
            created_at: Utc::now(),
        }
    }
}
