//! Demo configuration structures and loaders.
use std::env;
use std::time::Duration;

use bingo_core::{GridSize, SessionConfig};
use bingo_runtime::{MemoryStoreConfig, RuntimeConfig};

/// Configuration required to run the scripted session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub grid: GridSize,
    /// Players joining besides the host.
    pub players: usize,
    pub runtime: RuntimeConfig,
    pub store: MemoryStoreConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            grid: SessionConfig::default().default_grid,
            players: 2,
            runtime: RuntimeConfig::default(),
            store: MemoryStoreConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ARCADIA_GRID_SIZE` - Square grid dimension (default: 5)
    /// - `ARCADIA_PLAYERS` - Players besides the host (default: 2)
    /// - `ARCADIA_EVENT_BUFFER` - Event bus capacity per topic (default: 100)
    /// - `ARCADIA_RECONNECT_INITIAL_MS` - First resubscribe backoff (default: 100)
    /// - `ARCADIA_RECONNECT_MAX_MS` - Backoff cap (default: 5000)
    /// - `ARCADIA_DUPLICATE_DELIVERY` - Deliver every feed event twice (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dim) = read_env::<u8>(&lookup, "ARCADIA_GRID_SIZE") {
            let grid = GridSize::square(dim);
            if grid.is_valid() {
                config.grid = grid;
            }
        }

        if let Some(players) = read_env::<usize>(&lookup, "ARCADIA_PLAYERS") {
            config.players = players.clamp(1, SessionConfig::MAX_PARTICIPANTS - 2);
        }

        if let Some(capacity) = read_env::<usize>(&lookup, "ARCADIA_EVENT_BUFFER") {
            config.runtime.event_buffer_size = capacity.max(1);
        }

        if let Some(millis) = read_env::<u64>(&lookup, "ARCADIA_RECONNECT_INITIAL_MS") {
            config.runtime.reconnect.initial_delay = Duration::from_millis(millis.max(1));
        }

        if let Some(millis) = read_env::<u64>(&lookup, "ARCADIA_RECONNECT_MAX_MS") {
            config.runtime.reconnect.max_delay = Duration::from_millis(millis.max(1));
        }
        let reconnect = &mut config.runtime.reconnect;
        reconnect.max_delay = reconnect.max_delay.max(reconnect.initial_delay);

        if let Some(enable) = read_env::<bool>(&lookup, "ARCADIA_DUPLICATE_DELIVERY") {
            config.store.duplicate_delivery = enable;
        } else if lookup("ARCADIA_DUPLICATE_DELIVERY").is_some() {
            // Also accept just setting the variable without value as "true"
            config.store.duplicate_delivery = true;
        }

        config
    }
}

fn read_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    lookup(key)?.trim().parse().ok()
}
