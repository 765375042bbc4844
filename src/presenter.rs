//! Active-notification set plus the platform side-effect seam.
//!
//! The presenter owns a bounded FIFO of currently shown reminders. Triggering
//! mutates that set first; the OS notification and sound are best-effort side
//! effects dispatched afterwards, and their failures never roll the set back.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::bail;
use notify_rust::{Notification, Timeout};
use tracing::{debug, warn};

use crate::config::{Config, NOTIFICATION_TIMEOUT_MS};
use crate::model::Reminder;

/// Host capabilities for surfacing a notification outside the app.
///
/// Absence of platform support degrades to in-app-only presentation; nothing
/// here is allowed to fail the caller.
pub trait Platform: Send {
    /// `Some(granted)` when the permission state is known, `None` when it is
    /// undetermined (treated as not granted).
    fn has_permission(&self) -> Option<bool>;
    fn request_permission(&mut self) -> bool;
    /// Dispatch an OS notification. Must return without blocking on the
    /// notification backend; `Err` means the dispatch itself failed, delivery
    /// failures are logged by the implementation.
    fn notify(&self, reminder: &Reminder) -> anyhow::Result<()>;
    fn play_sound(&mut self) -> anyhow::Result<()>;
}

/// Desktop implementation: `notify-rust` for the OS notification, a spawned
/// system audio player for the sound.
pub struct DesktopPlatform {
    sound_enabled: bool,
    sound_file: Option<PathBuf>,
    /// Resolved `(player, file)` pair; re-probed after a playback failure.
    audio: Option<(&'static str, PathBuf)>,
    audio_ready: bool,
}

/// Players and stock sounds probed in order when no sound file is configured.
const SOUND_CANDIDATES: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("paplay", "/usr/share/sounds/freedesktop/stereo/bell.oga"),
    ("aplay", "/usr/share/sounds/alsa/Front_Center.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

impl DesktopPlatform {
    pub fn new(config: &Config) -> Self {
        Self {
            sound_enabled: config.sound_enabled,
            sound_file: config.sound_file.clone(),
            audio: None,
            audio_ready: false,
        }
    }

    fn probe_audio(&mut self) {
        self.audio = None;
        if let Some(file) = &self.sound_file {
            if file.exists() {
                self.audio = Some((SOUND_CANDIDATES[0].0, file.clone()));
            }
        } else {
            for (player, file) in SOUND_CANDIDATES {
                let path = PathBuf::from(file);
                if path.exists() {
                    self.audio = Some((player, path));
                    break;
                }
            }
        }
        self.audio_ready = self.audio.is_some();
    }
}

impl Platform for DesktopPlatform {
    fn has_permission(&self) -> Option<bool> {
        // Desktop notification daemons have no runtime grant; per-attempt
        // failures are reported by `notify` instead.
        Some(true)
    }

    fn request_permission(&mut self) -> bool {
        true
    }

    fn notify(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let id = reminder.id.clone();
        let title = reminder.title.clone();
        // `show()` is a synchronous D-Bus round-trip; a hung daemon must not
        // stall the logic task, so it runs on a detached thread.
        std::thread::spawn(move || {
            let shown = Notification::new()
                .summary("Reminder")
                .body(&title)
                .appname("chime")
                .icon("alarm-clock")
                .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
                .show();
            if let Err(e) = shown {
                warn!(reminder = %id, error = %e, "desktop notification failed");
            }
        });
        Ok(())
    }

    fn play_sound(&mut self) -> anyhow::Result<()> {
        if !self.sound_enabled {
            return Ok(());
        }
        // Lazily (re-)initialize after startup or a previous failure.
        if !self.audio_ready {
            self.probe_audio();
        }
        let Some((player, file)) = &self.audio else {
            bail!("no playable notification sound found");
        };
        match Command::new(player)
            .arg(file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => Ok(()),
            Err(e) => {
                self.audio_ready = false;
                Err(e.into())
            }
        }
    }
}

/// Capped, deduplicated set of visible notifications with explicit
/// dismiss semantics. Completion is handled a level up in the service, since
/// it also mutates the store.
pub struct Presenter {
    active: VecDeque<Reminder>,
    cap: usize,
    platform: Box<dyn Platform>,
}

impl Presenter {
    pub fn new(cap: usize, platform: Box<dyn Platform>) -> Self {
        Self {
            active: VecDeque::new(),
            cap,
            platform,
        }
    }

    /// Surface `reminder`. No-op when it is completed or already active.
    /// The in-app set updates synchronously; OS notification and sound are
    /// attempted afterwards and any failure is logged and swallowed.
    pub fn trigger(&mut self, reminder: &Reminder) {
        if reminder.completed {
            return;
        }
        if self.active.iter().any(|r| r.id == reminder.id) {
            return;
        }

        self.active.push_back(reminder.clone());
        while self.active.len() > self.cap {
            if let Some(evicted) = self.active.pop_front() {
                debug!(reminder = %evicted.id, "evicting oldest active notification");
            }
        }

        if self.platform.has_permission() == Some(true)
            && let Err(e) = self.platform.notify(reminder)
        {
            warn!(reminder = %reminder.id, error = %e, "platform notification failed");
        }
        if let Err(e) = self.platform.play_sound() {
            warn!(reminder = %reminder.id, error = %e, "notification sound failed");
        }
    }

    /// Remove from the visible set without touching the reminder record.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|r| r.id != id);
        self.active.len() != before
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|r| r.id == id)
    }

    /// Snapshot of the visible set, oldest first.
    pub fn active(&self) -> Vec<Reminder> {
        self.active.iter().cloned().collect()
    }

    pub fn has_permission(&self) -> Option<bool> {
        self.platform.has_permission()
    }

    pub fn request_permission(&mut self) -> bool {
        self.platform.request_permission()
    }
}

#[cfg(test)]
pub mod stub {
    use std::sync::{Arc, Mutex};

    use super::Platform;
    use crate::model::Reminder;

    #[derive(Default)]
    pub struct StubState {
        pub notified: Vec<String>,
        pub sounds_played: u32,
        pub permission: Option<bool>,
        pub fail_sound: bool,
    }

    /// Recording platform for tests; shares its state with the test body.
    pub struct StubPlatform {
        pub state: Arc<Mutex<StubState>>,
    }

    impl StubPlatform {
        pub fn new() -> (Self, Arc<Mutex<StubState>>) {
            let state = Arc::new(Mutex::new(StubState {
                permission: Some(true),
                ..StubState::default()
            }));
            (
                Self {
                    state: state.clone(),
                },
                state,
            )
        }
    }

    impl Platform for StubPlatform {
        fn has_permission(&self) -> Option<bool> {
            self.state.lock().unwrap().permission
        }

        fn request_permission(&mut self) -> bool {
            let mut state = self.state.lock().unwrap();
            state.permission = Some(true);
            true
        }

        fn notify(&self, reminder: &Reminder) -> anyhow::Result<()> {
            self.state.lock().unwrap().notified.push(reminder.id.clone());
            Ok(())
        }

        fn play_sound(&mut self) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_sound {
                anyhow::bail!("stub sound failure");
            }
            state.sounds_played += 1;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubPlatform;
    use super::*;

    fn presenter(cap: usize) -> (Presenter, std::sync::Arc<std::sync::Mutex<stub::StubState>>) {
        let (platform, state) = StubPlatform::new();
        (Presenter::new(cap, Box::new(platform)), state)
    }

    fn reminder(title: &str) -> Reminder {
        Reminder::one_off(title, "2030-06-01T09:00:00")
    }

    #[test]
    fn trigger_adds_and_fires_side_effects() {
        let (mut presenter, state) = presenter(10);
        let r = reminder("Call dentist");
        presenter.trigger(&r);

        assert!(presenter.is_active(&r.id));
        let state = state.lock().unwrap();
        assert_eq!(state.notified, vec![r.id.clone()]);
        assert_eq!(state.sounds_played, 1);
    }

    #[test]
    fn duplicate_trigger_is_a_noop() {
        let (mut presenter, state) = presenter(10);
        let r = reminder("Call dentist");
        presenter.trigger(&r);
        presenter.trigger(&r);

        assert_eq!(presenter.active().len(), 1);
        assert_eq!(state.lock().unwrap().sounds_played, 1);
    }

    #[test]
    fn completed_reminder_is_skipped() {
        let (mut presenter, state) = presenter(10);
        let mut r = reminder("Call dentist");
        r.completed = true;
        presenter.trigger(&r);

        assert!(presenter.active().is_empty());
        assert_eq!(state.lock().unwrap().sounds_played, 0);
    }

    #[test]
    fn eviction_drops_the_oldest_first() {
        let (mut presenter, _) = presenter(10);
        let reminders: Vec<Reminder> = (0..11).map(|i| reminder(&format!("r{i}"))).collect();
        for r in &reminders {
            presenter.trigger(r);
        }

        let active = presenter.active();
        assert_eq!(active.len(), 10);
        // The first-triggered reminder is gone, the newest survives.
        assert!(!presenter.is_active(&reminders[0].id));
        assert_eq!(active.last().unwrap().id, reminders[10].id);
        assert_eq!(active.first().unwrap().id, reminders[1].id);
    }

    #[test]
    fn dismiss_removes_without_completing() {
        let (mut presenter, _) = presenter(10);
        let r = reminder("Call dentist");
        presenter.trigger(&r);

        assert!(presenter.dismiss(&r.id));
        assert!(!presenter.is_active(&r.id));
        assert!(!presenter.dismiss(&r.id));
    }

    #[test]
    fn no_platform_notification_without_permission() {
        let (mut presenter, state) = presenter(10);
        state.lock().unwrap().permission = None;
        let r = reminder("Call dentist");
        presenter.trigger(&r);

        // In-app toast and sound still happen; only the OS notification is
        // gated on permission.
        assert!(presenter.is_active(&r.id));
        let state = state.lock().unwrap();
        assert!(state.notified.is_empty());
        assert_eq!(state.sounds_played, 1);
    }

    #[test]
    fn desktop_notify_returns_without_waiting_on_a_daemon() {
        let platform = DesktopPlatform::new(&Config::default());
        let r = reminder("Call dentist");
        // Delivery runs on a detached thread; a missing or hung notification
        // daemon never surfaces here and never holds up the caller.
        assert!(platform.notify(&r).is_ok());
    }

    #[test]
    fn sound_failure_never_blocks_the_set() {
        let (mut presenter, state) = presenter(10);
        state.lock().unwrap().fail_sound = true;
        let r = reminder("Call dentist");
        presenter.trigger(&r);

        assert!(presenter.is_active(&r.id));
        assert_eq!(state.lock().unwrap().sounds_played, 0);
    }
}
