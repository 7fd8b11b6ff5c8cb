use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{json, Value};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::catalog::ContentKind;
use crate::state::PlayerEvent;

const SOCKET_CONNECT_RETRIES: usize = 50;
const SOCKET_RETRY_DELAY: Duration = Duration::from_millis(100);

fn player_debug_enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var("STORYTUI_DEBUG_PLAYER")
            .map(|val| {
                let trimmed = val.trim();
                !(trimmed.is_empty()
                    || trimmed.eq_ignore_ascii_case("0")
                    || trimmed.eq_ignore_ascii_case("false")
                    || trimmed.eq_ignore_ascii_case("no")
                    || trimmed.eq_ignore_ascii_case("off"))
            })
            .unwrap_or(false)
    })
}

fn player_debug_writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var("STORYTUI_DEBUG_PLAYER_LOG")
                .ok()
                .and_then(|path| {
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .map(Mutex::new)
                        .ok()
                })
        })
        .as_ref()
}

pub fn debug_log(message: impl AsRef<str>) {
    if !player_debug_enabled() {
        return;
    }
    if let Some(writer) = player_debug_writer() {
        let mut file = writer.lock();
        let _ = writeln!(file, "{}", message.as_ref());
        return;
    }
    eprintln!("{}", message.as_ref());
}

#[derive(Debug, thiserror::Error)]
#[error("no media loaded")]
pub struct NotLoaded;

/// Seam between the state machine and the platform playback surface. The
/// UI loop forwards `state::PlayerRequest`s here and drains [`events`]
/// back into the state machine.
///
/// [`events`]: Player::events
pub trait Player: Send + Sync {
    fn load(&self, path: &Path, kind: ContentKind) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn seek(&self, seconds: f64) -> Result<()>;
    /// Pause and rewind to zero, keeping the media loaded.
    fn stop(&self) -> Result<()>;
    fn set_native_fullscreen(&self, active: bool) -> Result<()>;
    fn events(&self) -> Receiver<PlayerEvent>;
}

/// Playback backend that drives one mpv process at a time over its JSON
/// IPC socket. Audio runs headless; video gets a native window so mpv also
/// owns native fullscreen.
pub struct MpvPlayer {
    mpv_path: String,
    extra_args: Vec<String>,
    session: Mutex<Option<Session>>,
    event_tx: Sender<PlayerEvent>,
    event_rx: Receiver<PlayerEvent>,
}

struct Session {
    child: Child,
    ipc_path: String,
    stop_flag: Arc<AtomicBool>,
    reader: Option<thread::JoinHandle<()>>,
}

impl Session {
    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        cleanup_ipc_path(&self.ipc_path);
    }
}

impl MpvPlayer {
    pub fn new(mpv_path: impl Into<String>, extra_args: Vec<String>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            mpv_path: mpv_path.into(),
            extra_args,
            session: Mutex::new(None),
            event_tx,
            event_rx,
        }
    }

    /// True when the configured mpv binary can be spawned at all.
    pub fn available(mpv_path: &str) -> bool {
        Command::new(mpv_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn send(&self, command: Value) -> Result<()> {
        let guard = self.session.lock();
        let session = guard.as_ref().ok_or(NotLoaded)?;
        let payload = json!({ "command": command });
        let serialized = serde_json::to_string(&payload).context("serialize mpv command")?;
        send_ipc_command(&session.ipc_path, &serialized)
    }
}

impl Player for MpvPlayer {
    fn load(&self, path: &Path, kind: ContentKind) -> Result<()> {
        let mut guard = self.session.lock();
        if let Some(mut old) = guard.take() {
            old.shutdown();
        }

        let ipc_path = unique_ipc_path()
            .ok_or_else(|| anyhow!("mpv IPC is not supported on this platform"))?;
        if let Err(err) = fs::remove_file(&ipc_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug_log(format!("failed to remove stale ipc path {ipc_path}: {err}"));
            }
        }

        let mut args = vec![
            path.display().to_string(),
            "--pause".to_string(),
            "--keep-open=yes".to_string(),
            "--really-quiet".to_string(),
            "--no-config".to_string(),
            "--terminal=no".to_string(),
            "--input-terminal=no".to_string(),
            "--osc=no".to_string(),
            format!("--input-ipc-server={ipc_path}"),
        ];
        match kind {
            ContentKind::Music => args.push("--no-video".to_string()),
            ContentKind::Video => args.push("--force-window=yes".to_string()),
            ContentKind::Image => return Err(anyhow!("images are rendered, not played")),
        }
        args.extend(self.extra_args.iter().cloned());

        debug_log(format!("spawning mpv ipc={ipc_path} args={args:?}"));

        let child = Command::new(&self.mpv_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launch mpv to play {}", path.display()))?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let reader = spawn_event_reader(ipc_path.clone(), self.event_tx.clone(), stop_flag.clone());

        *guard = Some(Session {
            child,
            ipc_path,
            stop_flag,
            reader: Some(reader),
        });
        Ok(())
    }

    fn play(&self) -> Result<()> {
        self.send(json!(["set_property", "pause", false]))
    }

    fn pause(&self) -> Result<()> {
        self.send(json!(["set_property", "pause", true]))
    }

    fn seek(&self, seconds: f64) -> Result<()> {
        self.send(json!(["seek", seconds, "absolute"]))
    }

    fn stop(&self) -> Result<()> {
        // Ignore NotLoaded: stopping with nothing loaded is a no-op.
        if self.session.lock().is_none() {
            return Ok(());
        }
        self.send(json!(["set_property", "pause", true]))?;
        self.send(json!(["seek", 0.0, "absolute"]))
    }

    fn set_native_fullscreen(&self, active: bool) -> Result<()> {
        self.send(json!(["set_property", "fullscreen", active]))
    }

    fn events(&self) -> Receiver<PlayerEvent> {
        self.event_rx.clone()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.lock().take() {
            session.shutdown();
        }
    }
}

/// Backend used when mpv is unavailable: accepts every request, emits
/// nothing. The viewer stays usable for images and navigation.
pub struct NullPlayer {
    event_rx: Receiver<PlayerEvent>,
    _event_tx: Sender<PlayerEvent>,
}

impl NullPlayer {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            event_rx,
            _event_tx: event_tx,
        }
    }
}

impl Default for NullPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for NullPlayer {
    fn load(&self, _path: &Path, _kind: ContentKind) -> Result<()> {
        Ok(())
    }

    fn play(&self) -> Result<()> {
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        Ok(())
    }

    fn seek(&self, _seconds: f64) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn set_native_fullscreen(&self, _active: bool) -> Result<()> {
        Ok(())
    }

    fn events(&self) -> Receiver<PlayerEvent> {
        self.event_rx.clone()
    }
}

fn spawn_event_reader(
    ipc_path: String,
    tx: Sender<PlayerEvent>,
    stop_flag: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(err) = read_events(&ipc_path, &tx, &stop_flag) {
            debug_log(format!("mpv event reader stopped: {err}"));
        }
    })
}

#[cfg(unix)]
fn read_events(ipc_path: &str, tx: &Sender<PlayerEvent>, stop_flag: &AtomicBool) -> Result<()> {
    let mut stream = connect_with_retry(ipc_path, stop_flag)?;

    // One observe id per property; ids only have to be distinct.
    for (id, property) in [(1, "duration"), (2, "time-pos"), (3, "pause"), (4, "fullscreen")] {
        let request = json!({ "command": ["observe_property", id, property] });
        let serialized = serde_json::to_string(&request).context("serialize observe request")?;
        stream.write_all(serialized.as_bytes())?;
        stream.write_all(b"\n")?;
    }
    stream.flush().ok();

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                debug_log(format!("unparsable mpv event {line:?}: {err}"));
                continue;
            }
        };
        if let Some(event) = translate_event(&value) {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn connect_with_retry(ipc_path: &str, stop_flag: &AtomicBool) -> Result<UnixStream> {
    for _ in 0..SOCKET_CONNECT_RETRIES {
        if stop_flag.load(Ordering::SeqCst) {
            return Err(anyhow!("player shut down before the IPC socket appeared"));
        }
        match UnixStream::connect(ipc_path) {
            Ok(stream) => return Ok(stream),
            Err(_) => thread::sleep(SOCKET_RETRY_DELAY),
        }
    }
    Err(anyhow!("mpv IPC socket {ipc_path} never appeared"))
}

#[cfg(not(unix))]
fn read_events(_ipc_path: &str, _tx: &Sender<PlayerEvent>, _stop_flag: &AtomicBool) -> Result<()> {
    Err(anyhow!(
        "mpv event subscription is not supported on this platform"
    ))
}

/// Maps an mpv IPC message to a playback-lifecycle notification. Messages
/// that carry nothing of interest map to `None`.
fn translate_event(value: &Value) -> Option<PlayerEvent> {
    match value.get("event").and_then(Value::as_str)? {
        "property-change" => {
            let name = value.get("name").and_then(Value::as_str)?;
            let data = value.get("data")?;
            match name {
                "duration" => data.as_f64().map(|duration| PlayerEvent::MetadataLoaded {
                    duration,
                }),
                "time-pos" => data
                    .as_f64()
                    .map(|position| PlayerEvent::TimeUpdate { position }),
                "pause" => data.as_bool().map(|paused| {
                    if paused {
                        PlayerEvent::Paused
                    } else {
                        PlayerEvent::Started
                    }
                }),
                "fullscreen" => data.as_bool().map(PlayerEvent::FullscreenChanged),
                _ => None,
            }
        }
        "end-file" => {
            let reason = value.get("reason").and_then(Value::as_str).unwrap_or("");
            (reason == "eof").then_some(PlayerEvent::Completed)
        }
        _ => None,
    }
}

#[cfg(unix)]
fn send_ipc_command(path: &str, serialized: &str) -> Result<()> {
    // A command can arrive while mpv is still creating the socket.
    let mut stream = None;
    for _ in 0..10 {
        match UnixStream::connect(path) {
            Ok(connected) => {
                stream = Some(connected);
                break;
            }
            Err(_) => thread::sleep(Duration::from_millis(50)),
        }
    }
    let mut stream = stream
        .map(Ok)
        .unwrap_or_else(|| UnixStream::connect(path))
        .with_context(|| format!("connect to mpv IPC socket {path}"))?;
    stream
        .write_all(serialized.as_bytes())
        .context("write mpv IPC command")?;
    stream
        .write_all(b"\n")
        .context("write mpv IPC command terminator")?;
    Ok(())
}

#[cfg(not(unix))]
fn send_ipc_command(_path: &str, _serialized: &str) -> Result<()> {
    Err(anyhow!("mpv IPC is not supported on this platform"))
}

#[cfg(unix)]
fn unique_ipc_path() -> Option<String> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let mut path = std::env::temp_dir();
    path.push(format!("story-tui-mpv-{}-{suffix}.sock", std::process::id()));
    Some(path.to_string_lossy().to_string())
}

#[cfg(not(unix))]
fn unique_ipc_path() -> Option<String> {
    None
}

#[cfg(unix)]
fn cleanup_ipc_path(path: &str) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            debug_log(format!("failed to remove mpv ipc path {path}: {err}"));
        }
    }
}

#[cfg(not(unix))]
fn cleanup_ipc_path(_path: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(raw: &str) -> Option<PlayerEvent> {
        translate_event(&serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn duration_property_becomes_metadata() {
        assert_eq!(
            event(r#"{"event":"property-change","id":1,"name":"duration","data":212.5}"#),
            Some(PlayerEvent::MetadataLoaded { duration: 212.5 })
        );
    }

    #[test]
    fn pause_property_maps_to_start_and_stop() {
        assert_eq!(
            event(r#"{"event":"property-change","id":3,"name":"pause","data":false}"#),
            Some(PlayerEvent::Started)
        );
        assert_eq!(
            event(r#"{"event":"property-change","id":3,"name":"pause","data":true}"#),
            Some(PlayerEvent::Paused)
        );
    }

    #[test]
    fn end_of_file_completes_playback() {
        assert_eq!(
            event(r#"{"event":"end-file","reason":"eof"}"#),
            Some(PlayerEvent::Completed)
        );
        // A load replacing the file also ends it; that must not complete.
        assert_eq!(event(r#"{"event":"end-file","reason":"stop"}"#), None);
    }

    #[test]
    fn unrelated_messages_are_ignored() {
        assert_eq!(event(r#"{"event":"idle"}"#), None);
        assert_eq!(
            event(r#"{"event":"property-change","id":9,"name":"volume","data":55.0}"#),
            None
        );
        assert_eq!(event(r#"{"request_id":0,"error":"success"}"#), None);
    }

    #[test]
    fn fullscreen_property_is_forwarded() {
        assert_eq!(
            event(r#"{"event":"property-change","id":4,"name":"fullscreen","data":true}"#),
            Some(PlayerEvent::FullscreenChanged(true))
        );
    }

    #[test]
    fn null_player_accepts_requests_and_stays_silent() {
        let player = NullPlayer::new();
        player.play().unwrap();
        player.pause().unwrap();
        player.seek(10.0).unwrap();
        player.stop().unwrap();
        assert!(player.events().try_recv().is_err());
    }
}
