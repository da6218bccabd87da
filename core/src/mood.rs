//! The closed set of emotional states a desktop can be themed with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CozyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Focused,
    Relaxed,
    Energetic,
    Creative,
    Calm,
}

/// Ambience genre the music player starts with for a mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicGenre {
    Ambient,
    Electronic,
    Nature,
    Jazz,
    Lofi,
}

struct MoodInfo {
    mood: Mood,
    id: &'static str,
    emoji: &'static str,
    color: &'static str,
    genre: MusicGenre,
}

static MOODS: [MoodInfo; 6] = [
    MoodInfo { mood: Mood::Happy, id: "happy", emoji: "😊", color: "#FFD700", genre: MusicGenre::Jazz },
    MoodInfo { mood: Mood::Focused, id: "focused", emoji: "🎯", color: "#4A90E2", genre: MusicGenre::Ambient },
    MoodInfo { mood: Mood::Relaxed, id: "relaxed", emoji: "😌", color: "#7ED321", genre: MusicGenre::Lofi },
    MoodInfo { mood: Mood::Energetic, id: "energetic", emoji: "⚡", color: "#FF6B35", genre: MusicGenre::Electronic },
    MoodInfo { mood: Mood::Creative, id: "creative", emoji: "🎨", color: "#9013FE", genre: MusicGenre::Jazz },
    MoodInfo { mood: Mood::Calm, id: "calm", emoji: "🧘", color: "#50E3C2", genre: MusicGenre::Nature },
];

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Focused,
        Mood::Relaxed,
        Mood::Energetic,
        Mood::Creative,
        Mood::Calm,
    ];

    fn info(&self) -> &'static MoodInfo {
        // MOODS is declared in the same order as the enum.
        &MOODS[*self as usize]
    }

    pub fn id(&self) -> &'static str {
        self.info().id
    }

    pub fn emoji(&self) -> &'static str {
        self.info().emoji
    }

    /// Hex theme colour, e.g. `#FFD700`.
    pub fn color(&self) -> &'static str {
        self.info().color
    }

    pub fn default_music(&self) -> MusicGenre {
        self.info().genre
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.id())
    }
}

impl FromStr for Mood {
    type Err = CozyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        MOODS
            .iter()
            .find(|info| info.id == key)
            .map(|info| info.mood)
            .ok_or_else(|| CozyError::invalid(format!("unknown mood: {s}")))
    }
}
