/// Session-wide constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Grid size used when a host does not pick one.
    pub default_grid: crate::state::GridSize,
}

impl SessionConfig {
    // ===== compile-time limits =====
    /// Largest allowed row or column count.
    pub const MAX_GRID_DIM: u8 = 16;
    /// Length of the human-shareable session code.
    pub const CODE_LEN: usize = 6;
    /// Alphabet used for session codes.
    pub const CODE_ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Maximum participants (host, players and spectators) in one session.
    pub const MAX_PARTICIPANTS: usize = 64;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_GRID_DIM: u8 = 5;

    pub fn new() -> Self {
        Self {
            default_grid: crate::state::GridSize::square(Self::DEFAULT_GRID_DIM),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
