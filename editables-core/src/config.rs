//! Registry configuration.
//!
//! ```rust
//! use editables_core::{EditablesConfig, ScalarEquality};
//!
//! let config = EditablesConfig::from_json(r#"{ "scalar_equality": "strict" }"#).unwrap();
//! assert_eq!(config.scalar_equality, ScalarEquality::Strict);
//! assert_eq!(config.flag_delay_ms, 100);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// How scalar baselines are compared with current values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarEquality {
    /// Coercive comparison: `0` equals `"0"`, `16` equals `"0x10"`,
    /// `null` equals `undefined`, `true` equals `1`, and arrays compare with
    /// primitives through their comma-joined string form.
    #[default]
    Loose,
    /// Exact type and value match.
    Strict,
}

fn default_flag_delay_ms() -> u64 {
    100
}

/// Settings shared by every cell and scope of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditablesConfig {
    /// Comparison policy for non-array baselines.
    #[serde(default)]
    pub scalar_equality: ScalarEquality,

    /// Default coalescing window of scope change flags, in milliseconds.
    #[serde(default = "default_flag_delay_ms")]
    pub flag_delay_ms: u64,
}

impl EditablesConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Default coalescing window of scope change flags.
    pub fn flag_delay(&self) -> Duration {
        Duration::from_millis(self.flag_delay_ms)
    }
}

impl Default for EditablesConfig {
    fn default() -> Self {
        Self {
            scalar_equality: ScalarEquality::default(),
            flag_delay_ms: default_flag_delay_ms(),
        }
    }
}
