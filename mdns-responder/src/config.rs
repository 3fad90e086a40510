//! Tunables for the responder that are not protocol constants: TTLs,
//! channel sizing, and the initial-announce jitter window.
//!
//! None of this is required reading to use the responder:
//! [`ResponderConfig::default`] matches the values this lineage has
//! always shipped. It exists for embedders who want to override one
//! of them without patching constants into their own binary.

use serde::Deserialize;

/// TTL used for records that aren't tied to a particular hostname
/// (PTR, SRV, TXT): 4500 seconds, the value RFC 6762 section 10
/// recommends for "long-lived" records.
pub const DEFAULT_TTL: u32 = 4500;

/// TTL used for the host A/AAAA record and its companion NSEC: 120
/// seconds, since a host's address is more likely to change than a
/// service's existence.
pub const HOSTNAME_TTL: u32 = 120;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// TTL in seconds for PTR, SRV, and TXT records.
    pub default_ttl: u32,

    /// TTL in seconds for the host A/AAAA record and its NSEC.
    pub hostname_ttl: u32,

    /// Capacity of the command channel between `Responder` handles
    /// and the engine task. Sized generously so a caller's send never
    /// blocks in practice (see the concurrency model notes on the
    /// wakeup channel).
    pub command_channel_capacity: usize,

    /// Lower bound, in milliseconds, of the random delay applied
    /// before a service's first announcement (RFC 6762 section 8.3).
    pub announce_jitter_min_ms: u64,

    /// Upper bound, in milliseconds, of the random delay applied
    /// before a service's first announcement.
    pub announce_jitter_max_ms: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        ResponderConfig {
            default_ttl: DEFAULT_TTL,
            hostname_ttl: HOSTNAME_TTL,
            command_channel_capacity: 64,
            announce_jitter_min_ms: 0,
            announce_jitter_max_ms: 250,
        }
    }
}

impl ResponderConfig {
    /// Load configuration from an optional file, falling back to
    /// [`ResponderConfig::default`] for anything the file doesn't
    /// set. `filename` is passed straight to `config::File::with_name`,
    /// so it may omit its extension.
    pub fn new(filename: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(filename) = filename {
            builder = builder.add_source(config::File::with_name(filename));
        }
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_ttls() {
        let config = ResponderConfig::default();
        assert_eq!(config.default_ttl, 4500);
        assert_eq!(config.hostname_ttl, 120);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ResponderConfig::new(None).unwrap();
        assert_eq!(config.command_channel_capacity, 64);
    }
}
