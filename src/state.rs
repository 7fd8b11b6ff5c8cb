use std::time::{Duration, Instant};

use crate::catalog::{Catalog, ContentKind, StoryPoint, CHARACTERS};

/// Fade-out phase of a story-point change.
pub const DEFAULT_FADE_OUT: Duration = Duration::from_millis(300);
/// Settle phase after the swap, before inputs are accepted again.
pub const DEFAULT_FADE_SETTLE: Duration = Duration::from_millis(50);

/// At most one overlay is ever active; the enum makes the exclusion
/// structural rather than enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    InfoModal,
    Fullscreen,
    FocusedMode,
}

/// Playback fields mirrored from the platform player. `is_playing` and the
/// time fields are written only by [`Viewer::handle_player_event`];
/// `is_video_playing` is the one optimistic exception.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Playback {
    pub is_playing: bool,
    pub is_video_playing: bool,
    pub current_time: f64,
    pub total_duration: f64,
    pub progress_percent: f64,
}

/// Everything the render surface reads. Mutated only by [`Viewer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub selected_character: usize,
    pub selected_story_point: usize,
    pub playback: Playback,
    pub overlay: Overlay,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected_character: 0,
            selected_story_point: 0,
            playback: Playback::default(),
            overlay: Overlay::None,
        }
    }
}

/// Commands for the platform player. The state machine never touches the
/// player directly; the UI loop forwards these.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerRequest {
    Load { path: String, kind: ContentKind },
    Play,
    Pause,
    SeekTo(f64),
    Stop,
    SetNativeFullscreen(bool),
}

/// Playback-lifecycle notifications from the platform player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    MetadataLoaded { duration: f64 },
    TimeUpdate { position: f64 },
    Started,
    Paused,
    Completed,
    FullscreenChanged(bool),
}

/// The two-phase story-point changeover. The pending swap is keyed to the
/// character that started it; a character switch resets to `Idle`, so a
/// stale swap can never land on another character's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Idle,
    FadingOut {
        character: usize,
        target: usize,
        swap_at: Instant,
    },
    FadingIn {
        done_at: Instant,
    },
}

/// Owner of all mutable view state. Every operation takes the current
/// instant from the caller, so tests drive it with a virtual clock.
pub struct Viewer {
    catalog: Catalog,
    view: ViewState,
    transition: Transition,
    native_fullscreen: bool,
    fade_out: Duration,
    fade_settle: Duration,
}

impl Viewer {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_delays(catalog, DEFAULT_FADE_OUT, DEFAULT_FADE_SETTLE)
    }

    pub fn with_delays(catalog: Catalog, fade_out: Duration, fade_settle: Duration) -> Self {
        Self {
            catalog,
            view: ViewState::default(),
            transition: Transition::Idle,
            native_fullscreen: false,
            fade_out,
            fade_settle,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn character_name(&self) -> &'static str {
        CHARACTERS[self.view.selected_character]
    }

    pub fn story_points(&self) -> &[StoryPoint] {
        self.catalog.story_points(self.character_name())
    }

    pub fn current_story_point(&self) -> &StoryPoint {
        &self.story_points()[self.view.selected_story_point]
    }

    pub fn current_kind(&self) -> ContentKind {
        self.current_story_point().content.kind()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition != Transition::Idle
    }

    /// True while the escape key should be consumed. Escape is only
    /// listened for while one of these overlays is open.
    pub fn escape_active(&self) -> bool {
        matches!(self.view.overlay, Overlay::Fullscreen | Overlay::FocusedMode)
    }

    /// Requests needed to bring the player in line with the startup state.
    pub fn startup_requests(&self) -> Vec<PlayerRequest> {
        self.load_request().into_iter().collect()
    }

    fn load_request(&self) -> Option<PlayerRequest> {
        let content = &self.current_story_point().content;
        match content.kind() {
            // Audio preloads paused so metadata (duration) arrives up front.
            ContentKind::Music => Some(PlayerRequest::Load {
                path: content.media_path().to_string(),
                kind: ContentKind::Music,
            }),
            ContentKind::Image | ContentKind::Video => None,
        }
    }

    /// Begins the two-phase changeover to another story point. Rejected
    /// silently while a transition runs, for the current index, or for an
    /// out-of-range index.
    pub fn select_story_point(&mut self, index: usize, now: Instant) -> Vec<PlayerRequest> {
        if self.is_transitioning()
            || index == self.view.selected_story_point
            || !self.catalog.is_valid_index(self.character_name(), index)
        {
            return Vec::new();
        }
        self.transition = Transition::FadingOut {
            character: self.view.selected_character,
            target: index,
            swap_at: now + self.fade_out,
        };
        Vec::new()
    }

    /// Switches character and restarts its narrative from the beginning.
    /// Deliberately not gated by the fade flag, unlike story-point
    /// navigation (see `character_switch_ignores_fade_gate`).
    pub fn select_character(&mut self, index: usize) -> Vec<PlayerRequest> {
        if index >= CHARACTERS.len() {
            return Vec::new();
        }
        self.transition = Transition::Idle;
        self.view.selected_character = index;
        self.view.selected_story_point = 0;
        self.view.playback = Playback::default();

        let mut requests = vec![PlayerRequest::Stop];
        requests.extend(self.load_request());
        requests
    }

    /// Drives pending transition deadlines. Call with the current instant
    /// on every loop iteration.
    pub fn tick(&mut self, now: Instant) -> Vec<PlayerRequest> {
        let mut requests = Vec::new();
        if let Transition::FadingOut {
            character,
            target,
            swap_at,
        } = self.transition
        {
            if now >= swap_at {
                if character == self.view.selected_character {
                    self.view.selected_story_point = target;
                    self.view.playback = Playback::default();
                    requests.push(PlayerRequest::Stop);
                    requests.extend(self.load_request());
                    self.transition = Transition::FadingIn {
                        done_at: swap_at + self.fade_settle,
                    };
                } else {
                    self.transition = Transition::Idle;
                }
            }
        }
        if let Transition::FadingIn { done_at } = self.transition {
            if now >= done_at {
                self.transition = Transition::Idle;
            }
        }
        requests
    }

    /// Requests play or pause for audio content. Never asserts
    /// `is_playing`; only the player's own notifications move it.
    pub fn toggle_playback(&mut self) -> Vec<PlayerRequest> {
        if self.current_kind() != ContentKind::Music {
            return Vec::new();
        }
        if self.view.playback.is_playing {
            vec![PlayerRequest::Pause]
        } else {
            vec![PlayerRequest::Play]
        }
    }

    /// Jumps audio playback to `percent` of the known duration. Optimistic:
    /// the time fields update immediately, the player follows.
    pub fn seek(&mut self, percent: f64) -> Vec<PlayerRequest> {
        if self.current_kind() != ContentKind::Music {
            return Vec::new();
        }
        let total = self.view.playback.total_duration;
        if !(total > 0.0) {
            return Vec::new();
        }
        let percent = percent.clamp(0.0, 100.0);
        let target = percent / 100.0 * total;
        self.view.playback.current_time = target;
        self.view.playback.progress_percent = percent;
        vec![PlayerRequest::SeekTo(target)]
    }

    /// Play/pause for video content. Unlike audio, the flag flips
    /// optimistically instead of waiting for a player notification.
    pub fn toggle_video_playback(&mut self) -> Vec<PlayerRequest> {
        if self.current_kind() != ContentKind::Video {
            return Vec::new();
        }
        if self.view.playback.is_video_playing {
            self.view.playback.is_video_playing = false;
            vec![PlayerRequest::Pause]
        } else {
            self.view.playback.is_video_playing = true;
            vec![PlayerRequest::Play]
        }
    }

    pub fn open_info(&mut self) {
        self.view.overlay = Overlay::InfoModal;
    }

    pub fn close_info(&mut self) {
        if self.view.overlay == Overlay::InfoModal {
            self.view.overlay = Overlay::None;
        }
    }

    /// Dismissal gesture on an overlay. Closes only on a true backdrop hit;
    /// gestures on a descendant of the overlay leave it open.
    pub fn dismiss_overlay_backdrop(&mut self, backdrop_hit: bool) {
        if !backdrop_hit {
            return;
        }
        if self.view.overlay != Overlay::None {
            self.view.overlay = Overlay::None;
        }
    }

    /// Double-activate on the main stage. Image toggles the in-app
    /// fullscreen overlay, audio toggles focused mode, video delegates to
    /// platform fullscreen (owned externally, never mirrored here).
    pub fn activate_stage(&mut self) -> Vec<PlayerRequest> {
        if self.is_transitioning() {
            return Vec::new();
        }
        match self.current_kind() {
            ContentKind::Image => {
                self.view.overlay = if self.view.overlay == Overlay::Fullscreen {
                    Overlay::None
                } else {
                    Overlay::Fullscreen
                };
                Vec::new()
            }
            ContentKind::Music => {
                self.view.overlay = if self.view.overlay == Overlay::FocusedMode {
                    Overlay::None
                } else {
                    Overlay::FocusedMode
                };
                Vec::new()
            }
            ContentKind::Video => {
                vec![PlayerRequest::SetNativeFullscreen(!self.native_fullscreen)]
            }
        }
    }

    /// Escape clears fullscreen or focused mode; anything else ignores it.
    pub fn handle_escape(&mut self) {
        if self.escape_active() {
            self.view.overlay = Overlay::None;
        }
    }

    /// The audio event bridge: the only writer of `is_playing` and the
    /// time fields during normal playback.
    pub fn handle_player_event(&mut self, event: PlayerEvent) {
        let playback = &mut self.view.playback;
        match event {
            PlayerEvent::MetadataLoaded { duration } => {
                playback.total_duration = duration;
                if duration > 0.0 {
                    playback.progress_percent = playback.current_time / duration * 100.0;
                }
            }
            PlayerEvent::TimeUpdate { position } => {
                playback.current_time = position;
                if playback.total_duration > 0.0 {
                    playback.progress_percent = position / playback.total_duration * 100.0;
                }
            }
            PlayerEvent::Started => playback.is_playing = true,
            PlayerEvent::Paused => playback.is_playing = false,
            PlayerEvent::Completed => {
                playback.is_playing = false;
                playback.current_time = 0.0;
                playback.progress_percent = 0.0;
            }
            PlayerEvent::FullscreenChanged(active) => {
                self.native_fullscreen = active;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn viewer() -> Viewer {
        Viewer::new(Catalog::builtin())
    }

    fn t0() -> Instant {
        Instant::now()
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Runs both transition phases starting from `start`.
    fn finish_transition(viewer: &mut Viewer, start: Instant) {
        viewer.tick(start + ms(300));
        viewer.tick(start + ms(350));
    }

    #[test]
    fn starts_at_deterministic_defaults() {
        let viewer = viewer();
        let view = viewer.view();
        assert_eq!(view.selected_character, 0);
        assert_eq!(view.selected_story_point, 0);
        assert_eq!(view.overlay, Overlay::None);
        assert!(!view.playback.is_playing);
        assert!(!viewer.is_transitioning());
    }

    #[test]
    fn two_phase_transition_follows_the_virtual_clock() {
        let mut viewer = viewer();
        let start = t0();

        viewer.select_story_point(2, start);
        assert!(viewer.is_transitioning());
        assert_eq!(viewer.view().selected_story_point, 0);

        // Just before the swap deadline nothing moves.
        viewer.tick(start + ms(299));
        assert_eq!(viewer.view().selected_story_point, 0);

        let requests = viewer.tick(start + ms(300));
        assert_eq!(viewer.view().selected_story_point, 2);
        assert_eq!(viewer.view().playback, Playback::default());
        assert!(requests.contains(&PlayerRequest::Stop));
        assert!(viewer.is_transitioning());

        viewer.tick(start + ms(350));
        assert!(!viewer.is_transitioning());
    }

    #[test]
    fn navigation_is_rejected_while_transitioning() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(2, start);
        viewer.select_story_point(3, start + ms(100));
        finish_transition(&mut viewer, start);
        assert_eq!(viewer.view().selected_story_point, 2);
    }

    #[test]
    fn selecting_the_current_point_is_a_no_op() {
        let mut viewer = viewer();
        viewer.select_story_point(0, t0());
        assert!(!viewer.is_transitioning());
    }

    #[test]
    fn out_of_range_point_is_a_no_op() {
        let mut viewer = viewer();
        viewer.select_character(1); // Mikasa has 4 points
        viewer.select_story_point(4, t0());
        assert!(!viewer.is_transitioning());
    }

    #[test]
    fn character_switch_always_resets_story_point() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(2, start);
        finish_transition(&mut viewer, start);
        assert_eq!(viewer.view().selected_story_point, 2);

        viewer.select_character(3);
        assert_eq!(viewer.view().selected_character, 3);
        assert_eq!(viewer.view().selected_story_point, 0);
    }

    // Point navigation is fade-gated while character switching is not.
    #[test]
    fn character_switch_ignores_fade_gate() {
        let mut viewer = viewer();
        viewer.select_story_point(2, t0());
        assert!(viewer.is_transitioning());
        viewer.select_character(1);
        assert_eq!(viewer.view().selected_character, 1);
        assert_eq!(viewer.view().selected_story_point, 0);
    }

    #[test]
    fn character_switch_cancels_pending_swap() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(5, start);
        viewer.select_character(1);
        finish_transition(&mut viewer, start);
        // The stale swap to index 5 must not land on Mikasa's 4-point set.
        assert_eq!(viewer.view().selected_story_point, 0);
        assert!(!viewer.is_transitioning());
    }

    #[test]
    fn toggle_playback_requests_but_never_asserts() {
        let mut viewer = viewer();
        let requests = viewer.toggle_playback();
        assert_eq!(requests, vec![PlayerRequest::Play]);
        assert!(!viewer.view().playback.is_playing);

        viewer.handle_player_event(PlayerEvent::Started);
        assert!(viewer.view().playback.is_playing);

        let requests = viewer.toggle_playback();
        assert_eq!(requests, vec![PlayerRequest::Pause]);
        assert!(viewer.view().playback.is_playing);

        viewer.handle_player_event(PlayerEvent::Paused);
        assert!(!viewer.view().playback.is_playing);
    }

    #[test]
    fn completion_resets_position_and_progress() {
        let mut viewer = viewer();
        viewer.handle_player_event(PlayerEvent::MetadataLoaded { duration: 200.0 });
        viewer.handle_player_event(PlayerEvent::Started);
        viewer.handle_player_event(PlayerEvent::TimeUpdate { position: 150.0 });
        viewer.handle_player_event(PlayerEvent::Completed);
        let playback = viewer.view().playback;
        assert!(!playback.is_playing);
        assert_eq!(playback.current_time, 0.0);
        assert_eq!(playback.progress_percent, 0.0);
        assert_eq!(playback.total_duration, 200.0);
    }

    #[test]
    fn seek_is_exact_and_idempotent() {
        let mut viewer = viewer();
        viewer.handle_player_event(PlayerEvent::MetadataLoaded { duration: 240.0 });

        let requests = viewer.seek(25.0);
        assert_eq!(requests, vec![PlayerRequest::SeekTo(60.0)]);
        assert!((viewer.view().playback.current_time - 60.0).abs() < f64::EPSILON);
        assert!((viewer.view().playback.progress_percent - 25.0).abs() < f64::EPSILON);

        let repeat = viewer.seek(25.0);
        assert_eq!(repeat, vec![PlayerRequest::SeekTo(60.0)]);
        assert!((viewer.view().playback.current_time - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seek_requires_known_duration() {
        let mut viewer = viewer();
        assert!(viewer.seek(50.0).is_empty());
        assert_eq!(viewer.view().playback.current_time, 0.0);
    }

    #[test]
    fn seek_clamps_to_bounds() {
        let mut viewer = viewer();
        viewer.handle_player_event(PlayerEvent::MetadataLoaded { duration: 100.0 });
        assert_eq!(viewer.seek(150.0), vec![PlayerRequest::SeekTo(100.0)]);
        assert_eq!(viewer.seek(-10.0), vec![PlayerRequest::SeekTo(0.0)]);
    }

    #[test]
    fn video_toggle_is_its_own_inverse() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(2, start); // video content
        finish_transition(&mut viewer, start);
        assert_eq!(viewer.current_kind(), ContentKind::Video);

        assert!(!viewer.view().playback.is_video_playing);
        viewer.toggle_video_playback();
        assert!(viewer.view().playback.is_video_playing);
        viewer.toggle_video_playback();
        assert!(!viewer.view().playback.is_video_playing);
    }

    #[test]
    fn audio_controls_reject_video_content() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(2, start);
        finish_transition(&mut viewer, start);
        viewer.handle_player_event(PlayerEvent::MetadataLoaded { duration: 90.0 });
        assert!(viewer.toggle_playback().is_empty());
        assert!(viewer.seek(50.0).is_empty());
    }

    #[test]
    fn info_modal_closes_only_on_backdrop_hit() {
        let mut viewer = viewer();
        viewer.open_info();
        assert_eq!(viewer.view().overlay, Overlay::InfoModal);

        viewer.dismiss_overlay_backdrop(false);
        assert_eq!(viewer.view().overlay, Overlay::InfoModal);

        viewer.dismiss_overlay_backdrop(true);
        assert_eq!(viewer.view().overlay, Overlay::None);
    }

    #[test]
    fn stage_activation_depends_on_content_kind() {
        let mut viewer = viewer();

        // Audio content toggles focused mode.
        assert_eq!(viewer.current_kind(), ContentKind::Music);
        viewer.activate_stage();
        assert_eq!(viewer.view().overlay, Overlay::FocusedMode);
        viewer.activate_stage();
        assert_eq!(viewer.view().overlay, Overlay::None);

        // Image content toggles the in-app fullscreen overlay.
        let start = t0();
        viewer.select_story_point(1, start);
        finish_transition(&mut viewer, start);
        viewer.activate_stage();
        assert_eq!(viewer.view().overlay, Overlay::Fullscreen);

        // Video content delegates to native fullscreen; no overlay change.
        viewer.activate_stage(); // close the fullscreen overlay first
        let start = t0();
        viewer.select_story_point(2, start);
        finish_transition(&mut viewer, start);
        let requests = viewer.activate_stage();
        assert_eq!(requests, vec![PlayerRequest::SetNativeFullscreen(true)]);
        assert_eq!(viewer.view().overlay, Overlay::None);

        viewer.handle_player_event(PlayerEvent::FullscreenChanged(true));
        let requests = viewer.activate_stage();
        assert_eq!(requests, vec![PlayerRequest::SetNativeFullscreen(false)]);
    }

    #[test]
    fn stage_activation_is_ignored_while_transitioning() {
        let mut viewer = viewer();
        viewer.select_story_point(1, t0());
        assert!(viewer.activate_stage().is_empty());
        assert_eq!(viewer.view().overlay, Overlay::None);
    }

    #[test]
    fn escape_clears_only_fullscreen_and_focused_mode() {
        let mut viewer = viewer();
        assert!(!viewer.escape_active());
        viewer.handle_escape();
        assert_eq!(viewer.view().overlay, Overlay::None);

        viewer.open_info();
        assert!(!viewer.escape_active());
        viewer.handle_escape();
        assert_eq!(viewer.view().overlay, Overlay::InfoModal);
        viewer.close_info();

        viewer.activate_stage(); // focused mode on audio
        assert!(viewer.escape_active());
        viewer.handle_escape();
        assert_eq!(viewer.view().overlay, Overlay::None);
    }

    #[test]
    fn progress_tracks_time_updates() {
        let mut viewer = viewer();
        viewer.handle_player_event(PlayerEvent::MetadataLoaded { duration: 200.0 });
        viewer.handle_player_event(PlayerEvent::TimeUpdate { position: 50.0 });
        assert!((viewer.view().playback.progress_percent - 25.0).abs() < 1e-9);
        assert_eq!(viewer.view().playback.current_time, 50.0);
    }

    #[test]
    fn swap_emits_stop_and_preloads_audio() {
        let mut viewer = viewer();
        let start = t0();
        viewer.select_story_point(3, start); // music content
        let requests = viewer.tick(start + ms(300));
        assert_eq!(requests[0], PlayerRequest::Stop);
        assert!(matches!(
            &requests[1],
            PlayerRequest::Load {
                kind: ContentKind::Music,
                ..
            }
        ));
    }

    #[test]
    fn startup_preloads_audio_for_the_first_point() {
        let viewer = viewer();
        let requests = viewer.startup_requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(
            &requests[0],
            PlayerRequest::Load {
                kind: ContentKind::Music,
                ..
            }
        ));
    }
}
