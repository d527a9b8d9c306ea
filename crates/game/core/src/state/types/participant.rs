use std::collections::BTreeSet;
use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use super::ParticipantId;

/// What a participant may do in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Role {
    /// Started the session; the only role allowed to drive the lifecycle.
    Host,
    Player,
    /// Observes the grid but cannot mark.
    Spectator,
}

impl Role {
    pub const fn can_mark(self) -> bool {
        !matches!(self, Role::Spectator)
    }

    pub const fn is_host(self) -> bool {
        matches!(self, Role::Host)
    }
}

/// Display color of a participant. Unique within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fixed palette handed out in join order before derived colors are used.
    pub const PALETTE: [Color; 12] = [
        Color::rgb(0xE6, 0x39, 0x46),
        Color::rgb(0x1D, 0x35, 0x57),
        Color::rgb(0x2A, 0x9D, 0x8F),
        Color::rgb(0xF4, 0xA2, 0x61),
        Color::rgb(0x8E, 0x44, 0xAD),
        Color::rgb(0x27, 0xAE, 0x60),
        Color::rgb(0xF1, 0xC4, 0x0F),
        Color::rgb(0x34, 0x98, 0xDB),
        Color::rgb(0xD3, 0x54, 0x00),
        Color::rgb(0x16, 0xA0, 0x85),
        Color::rgb(0xC0, 0x39, 0x2B),
        Color::rgb(0x7F, 0x8C, 0x8D),
    ];

    /// Picks the first color not already in use.
    ///
    /// Palette entries come first; after that colors are derived by stepping
    /// the hue by the golden angle and probing until a free one is found, so
    /// the result is deterministic for a given set of used colors.
    pub fn assign<I>(used: I) -> Color
    where
        I: IntoIterator<Item = Color>,
    {
        let used: BTreeSet<Color> = used.into_iter().collect();

        if let Some(color) = Self::PALETTE.iter().find(|c| !used.contains(c)) {
            return *color;
        }

        (0u32..)
            .map(|step| {
                let hue = (step * 137 + 11) % 360;
                let saturation = 55 + (step / 360 * 7) % 40;
                Color::from_hsv(hue, saturation, 85)
            })
            .find(|c| !used.contains(c))
            .unwrap_or(Color::rgb(0, 0, 0))
    }

    /// Integer HSV conversion. `hue` in degrees, `saturation` and `value` in percent.
    fn from_hsv(hue: u32, saturation: u32, value: u32) -> Color {
        let v = value.min(100) * 255 / 100;
        let s = saturation.min(100);
        let sector = (hue % 360) / 60;
        let frac = (hue % 60) * 255 / 60;
        let p = v * (100 - s) / 100;
        let q = v * (100 - s * frac / 255) / 100;
        let t = v * (100 - s * (255 - frac) / 255) / 100;
        let (r, g, b) = match sector {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Color::rgb(r as u8, g as u8, b as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A connection to a session, as seen by every client.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: Role,
    pub color: Color,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>, role: Role, color: Color) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            color,
        }
    }
}
