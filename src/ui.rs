use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::catalog::{ContentItem, ContentKind, CHARACTERS};
use crate::display::{format_time, DotTier};
use crate::player::{self, Player};
use crate::state::{Overlay, PlayerEvent, PlayerRequest, Viewer};
use crate::theme::{theme_for_character, DockTheme, Theme};

const TICK_RATE: Duration = Duration::from_millis(120);
const TRANSITION_POLL: Duration = Duration::from_millis(15);
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const SEEK_STEP_PERCENT: f64 = 5.0;

pub struct Options {
    pub viewer: Viewer,
    pub player: Arc<dyn Player>,
    pub media_root: PathBuf,
    pub status_message: String,
}

/// Clickable regions recorded during the last draw. Rebuilt every frame;
/// empty until the first frame has been rendered.
#[derive(Default)]
struct HitRegions {
    character_dots: Vec<Rect>,
    story_dots: Vec<Rect>,
    stage: Option<Rect>,
    info_button: Option<Rect>,
    play_button: Option<Rect>,
    progress_bar: Option<Rect>,
    /// Panel of the open overlay; clicks outside it are backdrop hits.
    overlay_panel: Option<Rect>,
    modal_close: Option<Rect>,
    focused_play: Option<Rect>,
    focused_progress: Option<Rect>,
}

pub struct Model {
    viewer: Viewer,
    player: Arc<dyn Player>,
    player_events: Receiver<PlayerEvent>,
    media_root: PathBuf,
    status_message: String,
    needs_redraw: bool,
    loaded_media: Option<PathBuf>,
    regions: HitRegions,
    last_stage_click: Option<Instant>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let player_events = options.player.events();
        Self {
            viewer: options.viewer,
            player: options.player,
            player_events,
            media_root: options.media_root,
            status_message: options.status_message,
            needs_redraw: true,
            loaded_media: None,
            regions: HitRegions::default(),
            last_stage_click: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let startup = self.viewer.startup_requests();
        self.apply_requests(startup);

        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(crossterm::event::EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal
            .backend_mut()
            .execute(crossterm::event::DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.drain_player_events() {
                self.mark_dirty();
            }

            let requests = self.viewer.tick(Instant::now());
            if !requests.is_empty() {
                self.apply_requests(requests);
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let tick_rate = if self.viewer.is_transitioning() {
                TRANSITION_POLL
            } else {
                TICK_RATE
            };
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(1));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.viewer.is_transitioning() {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn drain_player_events(&mut self) -> bool {
        let mut seen = false;
        while let Ok(event) = self.player_events.try_recv() {
            self.viewer.handle_player_event(event);
            seen = true;
        }
        seen
    }

    /// Forwards state-machine requests to the playback backend. A failed
    /// native-fullscreen request is logged and otherwise swallowed; other
    /// failures surface on the status line.
    fn apply_requests(&mut self, requests: Vec<PlayerRequest>) {
        for request in requests {
            let result = match request {
                PlayerRequest::Load { ref path, kind } => {
                    let full = self.media_root.join(path);
                    let result = self.player.load(&full, kind);
                    if result.is_ok() {
                        self.loaded_media = Some(full);
                    }
                    result
                }
                PlayerRequest::Play => self.ensure_loaded().and_then(|_| self.player.play()),
                PlayerRequest::Pause => self.player.pause(),
                PlayerRequest::SeekTo(seconds) => self.player.seek(seconds),
                PlayerRequest::Stop => self.player.stop(),
                PlayerRequest::SetNativeFullscreen(active) => {
                    if let Err(err) = self.player.set_native_fullscreen(active) {
                        player::debug_log(format!("native fullscreen request failed: {err}"));
                    }
                    Ok(())
                }
            };
            if let Err(err) = result {
                self.status_message = format!("Playback error: {}", err);
            }
        }
        self.mark_dirty();
    }

    /// Video content is not preloaded; the first play request loads it.
    fn ensure_loaded(&mut self) -> Result<()> {
        let content = &self.viewer.current_story_point().content;
        let full = self.media_root.join(content.media_path());
        if self.loaded_media.as_ref() == Some(&full) {
            return Ok(());
        }
        self.player.load(&full, content.kind())?;
        self.loaded_media = Some(full);
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.viewer.view().overlay {
            Overlay::InfoModal => return self.handle_modal_key(code),
            Overlay::Fullscreen => return self.handle_fullscreen_key(code),
            Overlay::FocusedMode => return self.handle_focused_key(code),
            Overlay::None => {}
        }

        let now = Instant::now();
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char(ch @ '1'..='9') => {
                let index = ch as usize - '1' as usize;
                let requests = self.viewer.select_story_point(index, now);
                self.apply_requests(requests);
            }
            KeyCode::Char('h') => self.shift_story_point(-1, now),
            KeyCode::Char('l') => self.shift_story_point(1, now),
            KeyCode::Char('H') => self.shift_character(-1),
            KeyCode::Char('L') => self.shift_character(1),
            KeyCode::Char(' ') => {
                let requests = self.viewer.toggle_playback();
                self.apply_requests(requests);
            }
            KeyCode::Char('v') => {
                let requests = self.viewer.toggle_video_playback();
                self.apply_requests(requests);
            }
            KeyCode::Left => self.seek_relative(-SEEK_STEP_PERCENT),
            KeyCode::Right => self.seek_relative(SEEK_STEP_PERCENT),
            KeyCode::Char('i') => {
                self.viewer.open_info();
                self.mark_dirty();
            }
            KeyCode::Char('f') | KeyCode::Enter => {
                let requests = self.viewer.activate_stage();
                self.apply_requests(requests);
            }
            // The escape listener is conceptually unregistered here: with no
            // fullscreen or focused overlay open the key must do nothing.
            KeyCode::Esc => {}
            _ => {}
        }
        Ok(false)
    }

    fn handle_modal_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('i') | KeyCode::Enter => {
                self.viewer.close_info();
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_fullscreen_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                self.viewer.handle_escape();
                self.mark_dirty();
            }
            KeyCode::Char('f') | KeyCode::Enter => {
                let requests = self.viewer.activate_stage();
                self.apply_requests(requests);
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_focused_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                self.viewer.handle_escape();
                self.mark_dirty();
            }
            KeyCode::Char('f') | KeyCode::Enter => {
                let requests = self.viewer.activate_stage();
                self.apply_requests(requests);
            }
            KeyCode::Char(' ') => {
                let requests = self.viewer.toggle_playback();
                self.apply_requests(requests);
            }
            KeyCode::Left => self.seek_relative(-SEEK_STEP_PERCENT),
            KeyCode::Right => self.seek_relative(SEEK_STEP_PERCENT),
            _ => {}
        }
        Ok(false)
    }

    fn shift_story_point(&mut self, delta: i64, now: Instant) {
        let current = self.viewer.view().selected_story_point as i64;
        let target = current + delta;
        if target < 0 {
            return;
        }
        let requests = self.viewer.select_story_point(target as usize, now);
        self.apply_requests(requests);
    }

    fn shift_character(&mut self, delta: i64) {
        let current = self.viewer.view().selected_character as i64;
        let target = current + delta;
        if target < 0 || target >= CHARACTERS.len() as i64 {
            return;
        }
        let requests = self.viewer.select_character(target as usize);
        self.apply_requests(requests);
    }

    fn seek_relative(&mut self, delta_percent: f64) {
        let playback = self.viewer.view().playback;
        if !(playback.total_duration > 0.0) {
            return;
        }
        let target = (playback.progress_percent + delta_percent).clamp(0.0, 100.0);
        let requests = self.viewer.seek(target);
        self.apply_requests(requests);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(());
        }
        let col = mouse.column;
        let row = mouse.row;

        if self.viewer.view().overlay != Overlay::None {
            self.handle_overlay_click(col, row);
            return Ok(());
        }

        if let Some(index) = hit_dot(&self.regions.character_dots, col, row) {
            let requests = self.viewer.select_character(index);
            self.apply_requests(requests);
            return Ok(());
        }
        if let Some(index) = hit_dot(&self.regions.story_dots, col, row) {
            let requests = self.viewer.select_story_point(index, Instant::now());
            self.apply_requests(requests);
            return Ok(());
        }
        if self.regions.info_button.is_some_and(|r| contains(r, col, row)) {
            self.viewer.open_info();
            self.mark_dirty();
            return Ok(());
        }
        if self.regions.play_button.is_some_and(|r| contains(r, col, row)) {
            let requests = self.viewer.toggle_playback();
            self.apply_requests(requests);
            return Ok(());
        }
        if let Some(bar) = self.regions.progress_bar {
            if contains(bar, col, row) {
                let percent = bar_percent(bar, col);
                let requests = self.viewer.seek(percent);
                self.apply_requests(requests);
                return Ok(());
            }
        }
        if self.regions.stage.is_some_and(|r| contains(r, col, row)) {
            self.handle_stage_click();
        }
        Ok(())
    }

    /// A primary activate on the stage plays/pauses video; two in quick
    /// succession form the double-activate gesture.
    fn handle_stage_click(&mut self) {
        let now = Instant::now();
        let double = self
            .last_stage_click
            .is_some_and(|last| now.duration_since(last) <= DOUBLE_CLICK_WINDOW);
        self.last_stage_click = if double { None } else { Some(now) };

        if self.viewer.current_kind() == ContentKind::Video {
            let requests = self.viewer.toggle_video_playback();
            self.apply_requests(requests);
        }
        if double {
            let requests = self.viewer.activate_stage();
            self.apply_requests(requests);
        }
    }

    fn handle_overlay_click(&mut self, col: u16, row: u16) {
        if self.regions.modal_close.is_some_and(|r| contains(r, col, row)) {
            self.viewer.close_info();
            self.mark_dirty();
            return;
        }
        if self.regions.focused_play.is_some_and(|r| contains(r, col, row)) {
            let requests = self.viewer.toggle_playback();
            self.apply_requests(requests);
            return;
        }
        if let Some(bar) = self.regions.focused_progress {
            if contains(bar, col, row) {
                let percent = bar_percent(bar, col);
                let requests = self.viewer.seek(percent);
                self.apply_requests(requests);
                return;
            }
        }
        // Anything inside the panel is a descendant, not the backdrop.
        let backdrop_hit = !self
            .regions
            .overlay_panel
            .is_some_and(|panel| contains(panel, col, row));
        self.viewer.dismiss_overlay_backdrop(backdrop_hit);
        self.mark_dirty();
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        self.regions = HitRegions::default();
        let theme = theme_for_character(self.viewer.character_name());

        let full = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(theme.stage.background)),
            full,
        );

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(5),
                Constraint::Length(4),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_header(frame, layout[0], &theme);
        self.draw_stage(frame, layout[1], &theme);
        self.draw_nav(frame, layout[2], &theme);
        self.draw_dock(frame, layout[3], &theme);
        self.draw_footer(frame, layout[4], &theme);

        match self.viewer.view().overlay {
            Overlay::InfoModal => self.draw_info_modal(frame, full, &theme),
            Overlay::Fullscreen => self.draw_fullscreen(frame, full, &theme),
            Overlay::FocusedMode => self.draw_focused_mode(frame, full, &theme),
            Overlay::None => {}
        }
    }

    fn draw_header(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let block = Block::default().style(Style::default().bg(theme.header.background));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let name = self.viewer.character_name();
        let row = inner.y + inner.height / 2;
        let name_span = Span::styled(
            name,
            Style::default()
                .fg(theme.header.title)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(
            Paragraph::new(Line::from(name_span)),
            Rect::new(inner.x + 1, row, inner.width.saturating_sub(1), 1),
        );

        // Character dots follow the name, one cell per dot.
        let dots_x = inner.x + 1 + name.width() as u16 + 2;
        let current = self.viewer.view().selected_character;
        let mut spans = Vec::new();
        for (index, _) in CHARACTERS.iter().enumerate() {
            let tier = DotTier::for_index(index, current);
            let style = match tier {
                DotTier::Active => Style::default()
                    .fg(theme.header.title)
                    .add_modifier(Modifier::BOLD),
                DotTier::Adjacent => Style::default().fg(theme.header.subtitle),
                DotTier::Distant => Style::default()
                    .fg(theme.header.subtitle)
                    .add_modifier(Modifier::DIM),
            };
            spans.push(Span::styled(tier.glyph(), style));
            spans.push(Span::raw(" "));
            self.regions
                .character_dots
                .push(Rect::new(dots_x + index as u16 * 2, row, 1, 1));
        }
        let dots_width = (CHARACTERS.len() * 2) as u16;
        if dots_x + dots_width <= inner.right() {
            frame.render_widget(
                Paragraph::new(Line::from(spans)),
                Rect::new(dots_x, row, dots_width, 1),
            );
        } else {
            self.regions.character_dots.clear();
        }

        let title = Paragraph::new(Span::styled(
            self.viewer.current_story_point().title.clone(),
            Style::default().fg(theme.header.subtitle),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(title, Rect::new(inner.x, row, inner.width, 1));
    }

    fn draw_stage(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.stage.border))
            .style(Style::default().bg(theme.stage.background))
            .padding(Padding::uniform(1));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.regions.stage = Some(inner);

        let point = self.viewer.current_story_point().clone();
        let kind = point.content.kind();

        // Kind indicator badge with the info affordance, top right.
        let badge = format!(" {} [i] ", kind.label());
        let badge_width = badge.width() as u16;
        if inner.width > badge_width {
            let badge_area = Rect::new(inner.right() - badge_width, inner.y, badge_width, 1);
            frame.render_widget(
                Paragraph::new(Span::styled(
                    badge,
                    Style::default()
                        .fg(theme.stage.indicator_text)
                        .bg(theme.stage.indicator),
                )),
                badge_area,
            );
            self.regions.info_button = Some(badge_area);
        }

        // While the fade runs the stage is blank, matching the fade-out.
        if self.viewer.is_transitioning() {
            return;
        }

        let mut lines = stage_lines(point.title.as_str(), &point.content);
        if kind == ContentKind::Video && !self.viewer.view().playback.is_video_playing {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "▶ paused",
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
        let content_height = lines.len() as u16;
        let top = inner.y + inner.height.saturating_sub(content_height) / 2;
        let paragraph = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.nav.title));
        frame.render_widget(
            paragraph,
            Rect::new(inner.x, top, inner.width, content_height.min(inner.height)),
        );
    }

    fn draw_nav(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let block = Block::default().style(Style::default().bg(theme.nav.background));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 3 {
            return;
        }

        let count = self.viewer.story_points().len();
        let current = self.viewer.view().selected_story_point;
        let dots_row = inner.y + 1;
        let total_width = ((count * 2).saturating_sub(1)) as u16;
        let left = inner.x + inner.width.saturating_sub(total_width) / 2;

        let mut spans = Vec::new();
        for index in 0..count {
            let tier = DotTier::for_index(index, current);
            let style = match tier {
                DotTier::Active => Style::default()
                    .fg(theme.nav.dots.active)
                    .add_modifier(Modifier::BOLD),
                DotTier::Adjacent => Style::default().fg(theme.nav.dots.adjacent),
                DotTier::Distant => Style::default()
                    .fg(theme.nav.dots.inactive)
                    .add_modifier(Modifier::DIM),
            };
            spans.push(Span::styled(tier.glyph(), style));
            if index + 1 != count {
                spans.push(Span::raw(" "));
            }
            self.regions
                .story_dots
                .push(Rect::new(left + index as u16 * 2, dots_row, 1, 1));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            Rect::new(inner.x, dots_row, inner.width, 1),
        );

        let point = self.viewer.current_story_point().clone();
        frame.render_widget(
            Paragraph::new(Span::styled(
                point.title.clone(),
                Style::default()
                    .fg(theme.nav.title)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            Rect::new(inner.x, dots_row + 1, inner.width, 1),
        );
        if inner.height >= 4 {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    point.subtitle.clone(),
                    Style::default().fg(theme.nav.subtitle),
                ))
                .alignment(Alignment::Center),
                Rect::new(inner.x, dots_row + 2, inner.width, 1),
            );
        }
    }

    fn draw_dock(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let is_audio = self.viewer.current_kind() == ContentKind::Music;
        let (play, progress) = self.render_dock_controls(
            frame,
            area,
            &theme.dock,
            is_audio,
            "AudioDock",
        );
        self.regions.play_button = play.filter(|_| is_audio);
        self.regions.progress_bar = progress.filter(|_| is_audio);
    }

    /// Shared dock renderer for the bottom strip and focused mode. Returns
    /// the play-button and progress-bar regions.
    fn render_dock_controls(
        &mut self,
        frame: &mut Frame<'_>,
        area: Rect,
        dock: &DockTheme,
        enabled: bool,
        title: &str,
    ) -> (Option<Rect>, Option<Rect>) {
        let block = Block::default().style(Style::default().bg(dock.background));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 2 || inner.width < 20 {
            return (None, None);
        }

        let dim = if enabled {
            Modifier::empty()
        } else {
            Modifier::DIM
        };
        let playback = self.viewer.view().playback;
        let row = inner.y + inner.height / 2 - 1;

        let title_span = Span::styled(
            title.to_string(),
            Style::default()
                .fg(dock.title)
                .add_modifier(Modifier::BOLD | dim),
        );
        frame.render_widget(
            Paragraph::new(Line::from(title_span)),
            Rect::new(inner.x + 1, row, title.width() as u16 + 1, 1),
        );

        let glyph = if playback.is_playing { "⏸" } else { "▶" };
        let button_x = inner.x + 1 + title.width() as u16 + 2;
        let button_area = Rect::new(button_x, row, 3, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("[{glyph}]"),
                Style::default().fg(dock.play_button).add_modifier(dim),
            )),
            button_area,
        );

        let bar_x = button_x + 4;
        let bar_width = inner.right().saturating_sub(bar_x + 1);
        if bar_width < 4 {
            return (Some(button_area), None);
        }
        let bar_area = Rect::new(bar_x, row, bar_width, 1);
        frame.render_widget(
            Paragraph::new(progress_line(
                bar_width,
                playback.progress_percent,
                dock,
                dim,
            )),
            bar_area,
        );

        let times = format!(
            "{} / {}",
            format_time(playback.current_time),
            format_time(playback.total_duration)
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                times,
                Style::default().fg(dock.time_text).add_modifier(dim),
            ))
            .alignment(Alignment::Right),
            Rect::new(bar_x, row + 1, bar_width, 1),
        );

        (Some(button_area), Some(bar_area))
    }

    fn draw_footer(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let hints = "h/l: story  H/L: character  space: play  ←/→: seek  i: info  f: focus/fullscreen  q: quit";
        let text = if self.status_message.is_empty() {
            hints.to_string()
        } else {
            format!("{}  —  {}", self.status_message, hints)
        };
        let footer = Paragraph::new(text)
            .style(
                Style::default()
                    .fg(theme.header.subtitle)
                    .bg(theme.header.background)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, area);
    }

    fn draw_info_modal(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let popup = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup);
        self.regions.overlay_panel = Some(popup);

        let point = self.viewer.current_story_point().clone();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.modal.close_button))
            .style(Style::default().bg(theme.modal.background))
            .padding(Padding::uniform(1));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let close_area = Rect::new(popup.right().saturating_sub(4), popup.y, 3, 1);
        frame.render_widget(
            Paragraph::new(Span::styled(
                "[×]",
                Style::default().fg(theme.modal.close_button),
            )),
            close_area,
        );
        self.regions.modal_close = Some(close_area);

        let mut lines = vec![
            Line::styled(
                point.title.clone(),
                Style::default()
                    .fg(theme.modal.title)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::styled(point.subtitle.clone(), Style::default().fg(theme.modal.subtitle)),
            Line::raw(""),
            Line::styled(
                point.content.kind().label(),
                Style::default()
                    .fg(theme.stage.indicator)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
        ];
        for wrapped in point.content.info().lines() {
            lines.push(Line::styled(
                wrapped.to_string(),
                Style::default().fg(theme.modal.content),
            ));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
            inner,
        );
    }

    fn draw_fullscreen(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(ratatui::style::Color::Black)),
            area,
        );

        let panel = centered_rect(90, 85, area);
        self.regions.overlay_panel = Some(panel);
        let point = self.viewer.current_story_point();
        let lines = stage_lines(point.title.as_str(), &point.content);
        let content_height = lines.len() as u16;
        let top = panel.y + panel.height.saturating_sub(content_height) / 2;
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme.nav.title)),
            Rect::new(panel.x, top, panel.width, content_height.min(panel.height)),
        );

        let hint = Paragraph::new("Double-activate to exit fullscreen • Press ESC to exit")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM));
        frame.render_widget(
            hint,
            Rect::new(area.x, area.bottom().saturating_sub(2), area.width, 1),
        );
    }

    fn draw_focused_mode(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        let popup = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup);
        self.regions.overlay_panel = Some(popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.focused_dock.title))
            .style(Style::default().bg(theme.focused_dock.background));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let dock_theme = theme.focused_dock;
        let controls_area = Rect::new(
            inner.x,
            inner.y,
            inner.width,
            inner.height.saturating_sub(1),
        );
        let (play, progress) =
            self.render_dock_controls(frame, controls_area, &dock_theme, true, "AudioDock");
        self.regions.focused_play = play;
        self.regions.focused_progress = progress;

        let hint = Paragraph::new("Double-activate to exit focus mode • Press ESC to exit")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM));
        frame.render_widget(
            hint,
            Rect::new(inner.x, inner.bottom().saturating_sub(1), inner.width, 1),
        );
    }
}

/// Placeholder lines for a content item on the stage; the terminal shows
/// styled stand-ins while real playback runs in mpv.
fn stage_lines(title: &str, content: &ContentItem) -> Vec<Line<'static>> {
    match content {
        ContentItem::Music { image_path, .. } => vec![
            Line::styled(format!("♪  {title}"), Style::default().add_modifier(Modifier::BOLD)),
            Line::raw(""),
            Line::raw(format!("cover: {image_path}")),
        ],
        ContentItem::Image { media_path, .. } => vec![
            Line::styled(format!("◻  {title}"), Style::default().add_modifier(Modifier::BOLD)),
            Line::raw(""),
            Line::raw(media_path.clone()),
        ],
        ContentItem::Video { media_path, .. } => vec![
            Line::styled(format!("▶  {title}"), Style::default().add_modifier(Modifier::BOLD)),
            Line::raw(""),
            Line::raw(media_path.clone()),
        ],
    }
}

fn progress_line(width: u16, percent: f64, dock: &DockTheme, dim: Modifier) -> Line<'static> {
    let width = width as usize;
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    Line::from(vec![
        Span::styled(
            "━".repeat(filled),
            Style::default().fg(dock.progress_fill).add_modifier(dim),
        ),
        Span::styled(
            "─".repeat(width - filled),
            Style::default().fg(dock.progress_track).add_modifier(dim),
        ),
    ])
}

/// Maps a click column inside the bar to a 0..100 position.
fn bar_percent(bar: Rect, col: u16) -> f64 {
    if bar.width <= 1 {
        return 0.0;
    }
    let offset = col.saturating_sub(bar.x) as f64;
    (offset / (bar.width - 1) as f64 * 100.0).clamp(0.0, 100.0)
}

fn contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

fn hit_dot(dots: &[Rect], col: u16, row: u16) -> Option<usize> {
    dots.iter()
        .position(|rect| contains(*rect, col, row))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_percent_spans_full_range() {
        let bar = Rect::new(10, 5, 21, 1);
        assert_eq!(bar_percent(bar, 10), 0.0);
        assert_eq!(bar_percent(bar, 30), 100.0);
        assert!((bar_percent(bar, 20) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bar_percent_clamps_outside_clicks() {
        let bar = Rect::new(10, 5, 21, 1);
        assert_eq!(bar_percent(bar, 5), 0.0);
        assert_eq!(bar_percent(bar, 60), 100.0);
    }

    #[test]
    fn contains_respects_rect_edges() {
        let rect = Rect::new(2, 3, 4, 2);
        assert!(contains(rect, 2, 3));
        assert!(contains(rect, 5, 4));
        assert!(!contains(rect, 6, 4));
        assert!(!contains(rect, 2, 5));
    }

    #[test]
    fn hit_dot_finds_the_right_index() {
        let dots = vec![
            Rect::new(4, 1, 1, 1),
            Rect::new(6, 1, 1, 1),
            Rect::new(8, 1, 1, 1),
        ];
        assert_eq!(hit_dot(&dots, 6, 1), Some(1));
        assert_eq!(hit_dot(&dots, 5, 1), None);
        assert_eq!(hit_dot(&dots, 8, 2), None);
    }

    #[test]
    fn progress_line_fills_by_percent() {
        let dock = crate::theme::theme_for_character("Eren Yeager").dock;
        let line = progress_line(10, 50.0, &dock, Modifier::empty());
        assert_eq!(line.spans[0].content.as_ref(), "━━━━━");
        assert_eq!(line.spans[1].content.as_ref(), "─────");

        let empty = progress_line(10, 0.0, &dock, Modifier::empty());
        assert_eq!(empty.spans[0].content.as_ref(), "");
        assert_eq!(empty.spans[1].content.as_ref(), "──────────");
    }

    #[test]
    fn centered_rect_is_inside_the_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 60, area);
        assert!(popup.x >= 20 && popup.right() <= 80);
        assert!(popup.y >= 8 && popup.bottom() <= 32);
    }
}
