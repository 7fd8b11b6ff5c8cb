use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the character whose story set backs every unmapped character.
pub const DEFAULT_CHARACTER: &str = "Eren Yeager";

/// Fixed character roster, in display order.
pub const CHARACTERS: [&str; 5] = [
    "Eren Yeager",
    "Mikasa Ackerman",
    "Armin Arlert",
    "Levi Ackerman",
    "Historia Reiss",
];

/// The media payload of a story point. Exactly one variant is active;
/// fields that do not apply to a kind do not exist on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    /// Playable track plus the companion still shown on the stage.
    Music {
        media_path: String,
        image_path: String,
        info: String,
    },
    Image { media_path: String, info: String },
    Video { media_path: String, info: String },
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Music { .. } => ContentKind::Music,
            ContentItem::Image { .. } => ContentKind::Image,
            ContentItem::Video { .. } => ContentKind::Video,
        }
    }

    /// The primary media reference (track, picture or clip).
    pub fn media_path(&self) -> &str {
        match self {
            ContentItem::Music { media_path, .. }
            | ContentItem::Image { media_path, .. }
            | ContentItem::Video { media_path, .. } => media_path,
        }
    }

    pub fn info(&self) -> &str {
        match self {
            ContentItem::Music { info, .. }
            | ContentItem::Image { info, .. }
            | ContentItem::Video { info, .. } => info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Music,
    Image,
    Video,
}

impl ContentKind {
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Music => "MUSIC",
            ContentKind::Image => "IMAGE",
            ContentKind::Video => "VIDEO",
        }
    }
}

/// One narrative beat: title, subtitle and a single content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPoint {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub content: ContentItem,
}

/// Immutable per-character story sets with a designated default set for
/// characters that do not carry their own.
#[derive(Debug, Clone)]
pub struct Catalog {
    sets: HashMap<String, Vec<StoryPoint>>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let mut sets = HashMap::new();
        sets.insert(DEFAULT_CHARACTER.to_string(), eren_story_points());
        sets.insert("Mikasa Ackerman".to_string(), mikasa_story_points());
        Self { sets }
    }

    /// Loads character story sets from a YAML file and layers them over the
    /// built-in catalog. Characters absent from the file keep their
    /// built-in (or fallback) sets.
    pub fn load_overrides(&mut self, path: &Path) -> Result<()> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file at {}", path.display()))?;
        let sets: HashMap<String, Vec<StoryPoint>> = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse catalog file at {}", path.display()))?;
        for (character, points) in sets {
            if points.is_empty() {
                continue;
            }
            self.sets.insert(character, points);
        }
        Ok(())
    }

    /// Ordered story points for a character. Unknown names never fail; they
    /// resolve to the default character's set.
    pub fn story_points(&self, character: &str) -> &[StoryPoint] {
        self.sets
            .get(character)
            .or_else(|| self.sets.get(DEFAULT_CHARACTER))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn story_point(&self, character: &str, index: usize) -> Option<&StoryPoint> {
        self.story_points(character).get(index)
    }

    pub fn len(&self, character: &str) -> usize {
        self.story_points(character).len()
    }

    pub fn is_valid_index(&self, character: &str, index: usize) -> bool {
        index < self.len(character)
    }
}

fn eren_story_points() -> Vec<StoryPoint> {
    vec![
        StoryPoint {
            id: "child-of-darkness".into(),
            title: "Child of Darkness".into(),
            subtitle: "The weight of inherited sins".into(),
            content: ContentItem::Music {
                media_path: "Akuma-no-Ko/a/a1.mp3".into(),
                image_path: "Akuma-no-Ko/d/d1.jpg".into(),
                info: "This haunting melody captures the essence of a soul burdened by \
                       inherited darkness. The composition weaves together themes of destiny, \
                       choice, and the weight of family legacy."
                    .into(),
            },
        },
        StoryPoint {
            id: "cycle-of-hatred".into(),
            title: "The Cycle of Hatred".into(),
            subtitle: "Enemy and victim intertwined".into(),
            content: ContentItem::Image {
                media_path: "Akuma-no-Ko/p/p1.png".into(),
                info: "A powerful visual representation of the endless cycle of violence and \
                       revenge. The artwork depicts how victims can become perpetrators, and \
                       how hatred perpetuates itself across generations."
                    .into(),
            },
        },
        StoryPoint {
            id: "fragile-humanity".into(),
            title: "Fragile Humanity".into(),
            subtitle: "Love and hate in the same heart".into(),
            content: ContentItem::Video {
                media_path: "Akuma-no-Ko/v/v1.mp4".into(),
                info: "This video explores the delicate balance between love and hate within \
                       the human heart. It shows how even the strongest emotions can coexist, \
                       creating internal conflict and external consequences."
                    .into(),
            },
        },
        StoryPoint {
            id: "weight-of-choice".into(),
            title: "The Weight of Choice".into(),
            subtitle: "Freedom at any cost".into(),
            content: ContentItem::Music {
                media_path: "Akuma-no-Ko/a/a2.mp3".into(),
                image_path: "Akuma-no-Ko/d/d1.jpg".into(),
                info: "A musical journey through the burden of making difficult choices. The \
                       melody reflects the internal struggle of deciding between personal \
                       desires and greater good, with each note representing a moment of \
                       decision."
                    .into(),
            },
        },
        StoryPoint {
            id: "monster-within".into(),
            title: "The Monster Within".into(),
            subtitle: "Becoming what you feared".into(),
            content: ContentItem::Image {
                media_path: "Akuma-no-Ko/p/p2.png".into(),
                info: "This striking image reveals the transformation that occurs when one \
                       becomes the very thing they once feared. It's a visual metaphor for how \
                       fighting monsters can turn you into one yourself."
                    .into(),
            },
        },
        StoryPoint {
            id: "glimmer-of-hope".into(),
            title: "A Glimmer of Hope".into(),
            subtitle: "Beyond the hatred".into(),
            content: ContentItem::Video {
                media_path: "Akuma-no-Ko/v/v2.mp4".into(),
                info: "The final piece shows that even in the darkest moments, there is always \
                       a glimmer of hope. This video represents the possibility of breaking \
                       free from cycles of violence and finding peace."
                    .into(),
            },
        },
    ]
}

fn mikasa_story_points() -> Vec<StoryPoint> {
    vec![
        StoryPoint {
            id: "a-place-of-innocence".into(),
            title: "A Place of Innocence".into(),
            subtitle: "Where bonds were first formed".into(),
            content: ContentItem::Music {
                media_path: "Under-the-tree/a/a1.mp3".into(),
                image_path: "Under-the-tree/d/d1.jpg".into(),
                info: "The tree symbolizes childhood, friendship, and the fleeting peace that \
                       existed before the world's cruelty tore it apart."
                    .into(),
            },
        },
        StoryPoint {
            id: "waiting-for-someone".into(),
            title: "Waiting for Someone".into(),
            subtitle: "Longing in silence".into(),
            content: ContentItem::Image {
                media_path: "Under-the-tree/p/p1.jpg".into(),
                info: "Under the tree, one waits endlessly for the person they love and \
                       cherish, hoping their promise will not be broken by time or fate."
                    .into(),
            },
        },
        StoryPoint {
            id: "love-amid-despair".into(),
            title: "Love Amid Despair".into(),
            subtitle: "Holding onto warmth".into(),
            content: ContentItem::Video {
                media_path: "Under-the-tree/v/v1.mp4".into(),
                info: "Even in a world full of violence and destruction, the memory of \
                       companionship offers strength to endure the unbearable."
                    .into(),
            },
        },
        StoryPoint {
            id: "the-eternal-witness".into(),
            title: "The Eternal Witness".into(),
            subtitle: "The tree remembers".into(),
            content: ContentItem::Video {
                media_path: "Under-the-tree/v/v2.mp4".into(),
                info: "Standing tall through generations, the tree holds the stories of joy, \
                       grief, and sacrifice, becoming a symbol of memory and eternity."
                    .into(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unknown_character_falls_back_to_default() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.story_points("Levi Ackerman"),
            catalog.story_points(DEFAULT_CHARACTER)
        );
        assert_eq!(
            catalog.story_points("nobody"),
            catalog.story_points(DEFAULT_CHARACTER)
        );
    }

    #[test]
    fn mapped_characters_keep_their_own_sets() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(DEFAULT_CHARACTER), 6);
        assert_eq!(catalog.len("Mikasa Ackerman"), 4);
        assert_ne!(
            catalog.story_points("Mikasa Ackerman"),
            catalog.story_points(DEFAULT_CHARACTER)
        );
    }

    #[test]
    fn index_validation_tracks_set_length() {
        let catalog = Catalog::builtin();
        assert!(catalog.is_valid_index("Mikasa Ackerman", 3));
        assert!(!catalog.is_valid_index("Mikasa Ackerman", 4));
        assert!(catalog.story_point("Mikasa Ackerman", 9).is_none());
    }

    #[test]
    fn content_kind_matches_variant() {
        let catalog = Catalog::builtin();
        let kinds: Vec<ContentKind> = catalog
            .story_points(DEFAULT_CHARACTER)
            .iter()
            .map(|point| point.content.kind())
            .collect();
        assert_eq!(
            kinds,
            [
                ContentKind::Music,
                ContentKind::Image,
                ContentKind::Video,
                ContentKind::Music,
                ContentKind::Image,
                ContentKind::Video,
            ]
        );
    }

    #[test]
    fn overrides_replace_only_listed_characters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Armin Arlert:\n  - id: alone\n    title: Alone\n    subtitle: At sea\n    content:\n      type: image\n      media_path: armin/p1.png\n      info: A quiet shore."
        )
        .unwrap();

        let mut catalog = Catalog::builtin();
        catalog.load_overrides(file.path()).unwrap();
        assert_eq!(catalog.len("Armin Arlert"), 1);
        assert_eq!(
            catalog.story_point("Armin Arlert", 0).unwrap().title,
            "Alone"
        );
        assert_eq!(catalog.len("Mikasa Ackerman"), 4);
    }
}
