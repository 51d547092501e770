//! Codec configuration and the process-wide properties switch.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::strategy::Strategy;

/// Environment variable read by [`Config::from_env`].
pub const STRATEGY_ENV: &str = "FLATLAY_STRATEGY";

static SERIALIZE_PROPERTIES: AtomicBool = AtomicBool::new(false);

/// Makes properties eligible members (in addition to fields) for every codec
/// built from now on.
///
/// Codecs that are already built keep their layout, so the switch should be set
/// before any type is first encoded or decoded. Flipping it afterwards gives
/// types built before and after the change incompatible views of the same shape.
pub fn set_serialize_properties(enabled: bool) {
    SERIALIZE_PROPERTIES.store(enabled, Ordering::Release);
}

pub fn serialize_properties() -> bool {
    SERIALIZE_PROPERTIES.load(Ordering::Acquire)
}

/// Settings of a [`CodecRegistry`](crate::registry::CodecRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub strategy: Strategy,
    /// Whether properties are eligible members. `None` defers to the
    /// process-wide switch, read when each codec is built.
    pub serialize_properties: Option<bool>,
}

impl Config {
    pub fn with_strategy(mut self, strategy: Strategy) -> Config {
        self.strategy = strategy;
        self
    }

    pub fn with_serialize_properties(mut self, enabled: bool) -> Config {
        self.serialize_properties = Some(enabled);
        self
    }

    /// Default configuration with the strategy taken from `FLATLAY_STRATEGY`
    /// when it is set and valid.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        if let Ok(value) = std::env::var(STRATEGY_ENV) {
            match value.parse() {
                Ok(strategy) => config.strategy = strategy,
                Err(e) => log::warn!("ignoring {STRATEGY_ENV}: {e}"),
            }
        }
        config
    }

    /// Resolves the properties setting for a codec built now.
    pub(crate) fn include_properties(&self) -> bool {
        self.serialize_properties.unwrap_or_else(serialize_properties)
    }
}
