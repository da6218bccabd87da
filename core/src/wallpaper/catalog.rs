//! Static mood → wallpaper table.
//!
//! The built-in table mirrors the media shipped with the app: one free image
//! per mood followed by premium items. A host may replace it with a JSON
//! document of the same shape via [`Catalog::from_json`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entitlements::PremiumGate;
use crate::errors::CozyError;
use crate::mood::Mood;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperItem {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub url: String,
    #[serde(default)]
    pub is_premium_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

struct WallpaperSeed {
    mood: Mood,
    id: &'static str,
    name: &'static str,
    media_type: MediaType,
    url: &'static str,
    premium: bool,
    description: Option<&'static str>,
}

const VIDEO_BASE: &str = "https://zegbjygxmtsybxnqayoj.supabase.co/storage/v1/object/public/wallpapers";

macro_rules! image {
    ($mood:expr, $id:literal, $name:literal, $url:literal, $premium:literal) => {
        WallpaperSeed {
            mood: $mood,
            id: $id,
            name: $name,
            media_type: MediaType::Image,
            url: $url,
            premium: $premium,
            description: None,
        }
    };
}

macro_rules! video {
    ($mood:expr, $id:literal, $name:literal, $desc:literal) => {
        WallpaperSeed {
            mood: $mood,
            id: $id,
            name: $name,
            media_type: MediaType::Video,
            url: "",
            premium: true,
            description: Some($desc),
        }
    };
}

const WALLPAPER_SEEDS: &[WallpaperSeed] = &[
    image!(Mood::Happy, "happy-1", "Sunny Plain", "https://images.unsplash.com/photo-1500382017468-9049fed747ef?ixlib=rb-4.0.3&auto=format&fit=crop&w=2070&q=80", false),
    image!(Mood::Happy, "happy-2", "Radiant Sunrise", "https://images.unsplash.com/photo-1693552067222-0e2ef8ed06b0?w=1600&auto=format&fit=crop&q=80", true),
    video!(Mood::Happy, "happy-video-1", "Blooming Flowers", "Time-lapse of flowers growing in a sunny field"),
    video!(Mood::Happy, "happy-video-2", "Dancing Sunflowers", "Sunflowers swaying in the breeze"),
    image!(Mood::Focused, "focused-1", "Ocean Depths", "https://images.pexels.com/photos/15591206/pexels-photo-15591206.jpeg", false),
    video!(Mood::Focused, "focused-video-1", "Flowing River", "A river running through a forest"),
    video!(Mood::Focused, "focused-video-2", "Ocean Fishing", "A fishing boat on a serene ocean"),
    video!(Mood::Focused, "focused-video-3", "Rain on Window", "Raindrops sliding down a window over blurred city lights"),
    image!(Mood::Relaxed, "relaxed-1", "Forest Breeze", "https://images.unsplash.com/photo-1448375240586-882707db888b?ixlib=rb-4.0.3&auto=format&fit=crop&w=2070&q=80", false),
    video!(Mood::Relaxed, "relaxed-video-1", "Swaying Trees", "Trees swaying gently on a rainy, cloudy day"),
    video!(Mood::Relaxed, "relaxed-video-2", "Drifting Clouds", "Clouds drifting across a calm sky"),
    video!(Mood::Relaxed, "relaxed-video-3", "Beach Waves", "Soft waves breaking on a quiet beach at sunset"),
    image!(Mood::Energetic, "energetic-1", "Lava Burst", "https://cdn.pixabay.com/photo/2022/08/19/09/05/volcano-7396466_1280.jpg", false),
    video!(Mood::Energetic, "energetic-video-1", "Electric Storm", "A lightning storm over a city at night"),
    video!(Mood::Energetic, "energetic-video-2", "Pulsing Energy", "Vibrant energy in electric colours"),
    video!(Mood::Energetic, "energetic-video-3", "City Traffic", "Slow traffic through a city at dusk"),
    image!(Mood::Creative, "creative-1", "Highland Meadow", "https://cdn.pixabay.com/photo/2019/03/11/22/47/kamchatka-4049692_1280.jpg", false),
    video!(Mood::Creative, "creative-video-1", "Northern Lights", "Aurora dancing across the night sky"),
    video!(Mood::Creative, "creative-video-2", "Colour Burst", "Vivid colours bursting and mixing into patterns"),
    video!(Mood::Creative, "creative-video-3", "Ink in Water", "Orange ink unfurling in water"),
    image!(Mood::Calm, "calm-1", "Peaceful Waters", "https://images.unsplash.com/photo-1439066615861-d1af74d74000?ixlib=rb-4.0.3&auto=format&fit=crop&w=2070&q=80", false),
    video!(Mood::Calm, "calm-video-1", "Mist and Mountain", "Serene mist with a mountain under a blue sky"),
    video!(Mood::Calm, "calm-video-2", "Zen Garden", "A quiet zen garden with falling cherry petals"),
    video!(Mood::Calm, "calm-video-3", "Meditation Space", "A meditation room lit by candles and incense"),
];

/// Immutable per-mood wallpaper lists. Order within a mood is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: HashMap<Mood, Vec<WallpaperItem>>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let mut entries: HashMap<Mood, Vec<WallpaperItem>> = HashMap::new();
        for seed in WALLPAPER_SEEDS {
            let url = match seed.media_type {
                MediaType::Video => format!("{VIDEO_BASE}/{}.mp4", seed.id),
                MediaType::Image => seed.url.to_string(),
            };
            entries.entry(seed.mood).or_default().push(WallpaperItem {
                id: seed.id.to_string(),
                name: seed.name.to_string(),
                media_type: seed.media_type,
                url,
                is_premium_only: seed.premium,
                description: seed.description.map(str::to_string),
            });
        }
        Self { entries }
    }

    /// Build a catalog from `{ "<mood>": [item, ...], ... }`.
    pub fn from_json(raw: &str) -> Result<Self, CozyError> {
        let entries: HashMap<Mood, Vec<WallpaperItem>> = serde_json::from_str(raw)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: HashMap<Mood, Vec<WallpaperItem>>) -> Result<Self, CozyError> {
        for mood in Mood::ALL {
            let items = entries
                .get(&mood)
                .ok_or_else(|| CozyError::InvalidCatalog(format!("no wallpapers for {}", mood.id())))?;
            let mut seen = HashSet::new();
            for item in items {
                if !seen.insert(item.id.as_str()) {
                    return Err(CozyError::InvalidCatalog(format!(
                        "duplicate id {} in {}",
                        item.id,
                        mood.id()
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Every item for `mood`, premium or not.
    pub fn all(&self, mood: Mood) -> &[WallpaperItem] {
        self.entries.get(&mood).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The subsequence of `mood`'s list visible under the caller's tier.
    pub fn available<G>(&self, mood: Mood, gate: &G) -> Vec<&WallpaperItem>
    where
        G: PremiumGate + ?Sized,
    {
        let premium = gate.is_premium();
        self.all(mood)
            .iter()
            .filter(|item| premium || !item.is_premium_only)
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_mood_with_a_free_image_first() {
        let catalog = Catalog::builtin();
        for mood in Mood::ALL {
            let items = catalog.all(mood);
            assert_eq!(items.len(), 4, "{mood}");
            assert!(!items[0].is_premium_only);
            assert_eq!(items[0].media_type, MediaType::Image);
            assert!(items[1..].iter().all(|item| item.is_premium_only));
        }
        // the built-in table must pass the same validation as external config
        assert!(Catalog::from_entries(catalog.entries.clone()).is_ok());
    }

    #[test]
    fn free_tier_sees_only_free_items() {
        let catalog = Catalog::builtin();
        let free = catalog.available(Mood::Focused, &|| false);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, "focused-1");
    }

    #[test]
    fn premium_tier_sees_everything_in_order() {
        let catalog = Catalog::builtin();
        let ids: Vec<&str> = catalog
            .available(Mood::Calm, &|| true)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, ["calm-1", "calm-video-1", "calm-video-2", "calm-video-3"]);
    }

    #[test]
    fn video_urls_point_at_storage_bucket() {
        let catalog = Catalog::builtin();
        let item = &catalog.all(Mood::Relaxed)[2];
        assert_eq!(
            item.url,
            "https://zegbjygxmtsybxnqayoj.supabase.co/storage/v1/object/public/wallpapers/relaxed-video-2.mp4"
        );
    }

    #[test]
    fn json_catalog_requires_every_mood() {
        let raw = r#"{ "happy": [{ "id": "h", "name": "H", "mediaType": "image", "url": "u" }] }"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CozyError::InvalidCatalog(_)));
    }

    #[test]
    fn json_catalog_rejects_duplicate_ids() {
        let item = r#"{ "id": "x", "name": "X", "mediaType": "video", "url": "u", "isPremiumOnly": true }"#;
        let moods = Mood::ALL
            .iter()
            .map(|mood| format!("\"{}\": [{item}, {item}]", mood.id()))
            .collect::<Vec<_>>()
            .join(",");
        let err = Catalog::from_json(&format!("{{{moods}}}")).unwrap_err();
        assert!(err.to_string().contains("duplicate id x"));
    }

    #[test]
    fn json_catalog_loads_valid_document() {
        let moods = Mood::ALL
            .iter()
            .map(|mood| {
                format!(
                    "\"{id}\": [{{ \"id\": \"{id}-a\", \"name\": \"A\", \"mediaType\": \"image\", \"url\": \"https://a\" }}]",
                    id = mood.id()
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        let catalog = Catalog::from_json(&format!("{{{moods}}}")).unwrap();
        assert_eq!(catalog.all(Mood::Energetic)[0].id, "energetic-a");
        assert!(!catalog.all(Mood::Energetic)[0].is_premium_only);
    }
}
