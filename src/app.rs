use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog::{Catalog, CHARACTERS};
use crate::config;
use crate::player::{MpvPlayer, NullPlayer, Player};
use crate::state::Viewer;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let mut catalog = Catalog::builtin();
    if let Some(path) = cfg.catalog.file.as_ref() {
        catalog
            .load_overrides(path)
            .with_context(|| format!("load catalog overrides from {}", path.display()))?;
    }

    let mut status_message = String::new();
    let player: Arc<dyn Player> = if MpvPlayer::available(&cfg.player.mpv_path) {
        Arc::new(MpvPlayer::new(
            cfg.player.mpv_path.clone(),
            cfg.player.extra_args.clone(),
        ))
    } else {
        status_message = format!("{} not found, playback disabled", cfg.player.mpv_path);
        Arc::new(NullPlayer::new())
    };

    let mut viewer = Viewer::with_delays(catalog, cfg.transition.fade_out, cfg.transition.fade_settle);
    if !cfg.ui.default_character.is_empty() {
        match character_index(&cfg.ui.default_character) {
            Some(index) => {
                viewer.select_character(index);
            }
            None => {
                status_message = format!("unknown character {:?} in config", cfg.ui.default_character);
            }
        }
    }

    let mut model = ui::Model::new(ui::Options {
        viewer,
        player,
        media_root: cfg.media.root.clone(),
        status_message,
    });
    model.run()
}

fn character_index(name: &str) -> Option<usize> {
    CHARACTERS.iter().position(|candidate| *candidate == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_index_matches_roster_order() {
        assert_eq!(character_index("Eren Yeager"), Some(0));
        assert_eq!(character_index("Historia Reiss"), Some(4));
        assert_eq!(character_index("nobody"), None);
    }
}
