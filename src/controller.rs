//! Per-note behaviour: edits, the countdown timer and focus sessions.
//!
//! A [`NoteController`] owns one [`NoteRecord`] plus transient timer state
//! that is never written to disk. The controller does not own a clock: the
//! host calls [`NoteController::tick`] once per wall-clock second (the
//! manager does this for every note), which keeps every mutation on the
//! caller's thread.

use crate::model::{Foreground, NoteId, NoteRecord, MIN_HEIGHT, MIN_WIDTH};
use crate::richtext;
use std::fmt;
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);
const ADJUST_STEP_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Idle,
    Active,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteProperty {
    Content,
    Color,
    Geometry,
    Pinned,
    Duration,
    RemainingTime,
    TimerRunning,
    Focus,
}

impl NoteProperty {
    /// Whether the property is part of the stored record.
    pub fn is_persisted(self) -> bool {
        !matches!(self, NoteProperty::TimerRunning | NoteProperty::Focus)
    }
}

pub struct NoteChange<'a> {
    pub property: NoteProperty,
    pub record: &'a NoteRecord,
}

pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&NoteChange<'_>) + Send>;

pub struct NoteController {
    record: NoteRecord,
    timer_running: bool,
    focus: FocusState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl fmt::Debug for NoteController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteController")
            .field("record", &self.record)
            .field("timer_running", &self.timer_running)
            .field("focus", &self.focus)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl NoteController {
    pub fn new(record: NoteRecord) -> Self {
        NoteController {
            record,
            timer_running: false,
            focus: FocusState::Idle,
            subscribers: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn id(&self) -> NoteId {
        self.record.id
    }

    pub fn record(&self) -> &NoteRecord {
        &self.record
    }

    pub fn content(&self) -> &str {
        &self.record.content
    }

    pub fn color(&self) -> &str {
        &self.record.color
    }

    pub fn is_pinned(&self) -> bool {
        self.record.is_pinned
    }

    pub fn duration(&self) -> Duration {
        self.record.duration
    }

    pub fn remaining_time(&self) -> Duration {
        self.record.remaining_time
    }

    pub fn duration_minutes(&self) -> u64 {
        self.record.duration.as_secs() / 60
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus
    }

    /// True for both running and paused focus sessions.
    pub fn is_focus_active(&self) -> bool {
        self.focus != FocusState::Idle
    }

    pub fn is_focus_paused(&self) -> bool {
        self.focus == FocusState::Paused
    }

    // ---- subscriptions ----

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&NoteChange<'_>) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, property: NoteProperty) {
        let change = NoteChange {
            property,
            record: &self.record,
        };
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&change);
        }
    }

    // ---- edits ----

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content == self.record.content {
            return;
        }
        self.record.content = content;
        self.record.touch();
        self.notify(NoteProperty::Content);
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        if color == self.record.color {
            return;
        }
        self.record.color = color;
        self.record.touch();
        self.notify(NoteProperty::Color);
    }

    /// Moves/resizes the note. Non-finite coordinates keep the current value
    /// for that axis; sizes are raised to the minimum.
    pub fn set_geometry(&mut self, left: f64, top: f64, width: f64, height: f64) {
        let r = &self.record;
        let left = if left.is_finite() { left } else { r.left };
        let top = if top.is_finite() { top } else { r.top };
        let width = if width.is_finite() { width.max(MIN_WIDTH) } else { r.width };
        let height = if height.is_finite() { height.max(MIN_HEIGHT) } else { r.height };
        if (r.left, r.top, r.width, r.height) == (left, top, width, height) {
            return;
        }
        self.record.left = left;
        self.record.top = top;
        self.record.width = width;
        self.record.height = height;
        self.record.touch();
        self.notify(NoteProperty::Geometry);
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        if pinned == self.record.is_pinned {
            return;
        }
        self.record.is_pinned = pinned;
        self.record.touch();
        self.notify(NoteProperty::Pinned);
    }

    pub fn toggle_pin(&mut self) {
        self.set_pinned(!self.record.is_pinned);
    }

    // ---- timer ----

    /// Sets the timer length; a changed length also refills the countdown.
    pub fn set_duration_minutes(&mut self, minutes: i64) {
        let minutes = minutes.max(0) as u64;
        let duration = Duration::from_secs(minutes.saturating_mul(60));
        if duration == self.record.duration {
            return;
        }
        self.record.duration = duration;
        self.record.remaining_time = duration;
        self.record.touch();
        self.notify(NoteProperty::Duration);
        self.notify(NoteProperty::RemainingTime);

        if duration.is_zero() && (self.timer_running || self.is_focus_active()) {
            self.timer_running = false;
            self.focus = FocusState::Idle;
            self.notify(NoteProperty::TimerRunning);
            self.notify(NoteProperty::Focus);
        }
    }

    pub fn adjust_duration_minutes(&mut self, delta: i64) {
        let current = self.duration_minutes() as i64;
        self.set_duration_minutes(current.saturating_add(delta));
    }

    pub fn start_timer(&mut self) {
        if self.timer_running || self.record.duration.is_zero() {
            return;
        }
        if self.record.remaining_time.is_zero() {
            self.refill();
        }
        self.timer_running = true;
        self.notify(NoteProperty::TimerRunning);
        if self.focus == FocusState::Paused {
            self.set_focus(FocusState::Active);
        }
    }

    pub fn pause_timer(&mut self) {
        if !self.timer_running {
            return;
        }
        self.timer_running = false;
        self.notify(NoteProperty::TimerRunning);
        if self.focus == FocusState::Active {
            self.set_focus(FocusState::Paused);
        }
    }

    pub fn reset_timer(&mut self) {
        if self.timer_running {
            self.timer_running = false;
            self.notify(NoteProperty::TimerRunning);
        }
        self.refill();
        self.set_focus(FocusState::Idle);
    }

    /// Advances a running timer by one second. Returns true when this tick
    /// finished the countdown.
    pub fn tick(&mut self) -> bool {
        if !self.timer_running {
            return false;
        }
        self.record.remaining_time = self.record.remaining_time.saturating_sub(TICK);
        self.notify(NoteProperty::RemainingTime);
        if !self.record.remaining_time.is_zero() {
            return false;
        }

        self.timer_running = false;
        self.notify(NoteProperty::TimerRunning);
        if self.record.is_pinned {
            self.record.is_pinned = false;
            self.notify(NoteProperty::Pinned);
        }
        self.set_focus(FocusState::Idle);
        tracing::debug!(note = %self.record.id, "timer finished");
        true
    }

    fn refill(&mut self) {
        if self.record.remaining_time != self.record.duration {
            self.record.remaining_time = self.record.duration;
            self.record.touch();
            self.notify(NoteProperty::RemainingTime);
        }
    }

    fn set_focus(&mut self, focus: FocusState) {
        if self.focus != focus {
            self.focus = focus;
            self.notify(NoteProperty::Focus);
        }
    }

    // ---- focus session ----

    /// Starts a session from Idle, or pauses an active one.
    pub fn focus_primary(&mut self) -> bool {
        match self.focus {
            FocusState::Idle => {
                if self.record.duration.is_zero() {
                    return false;
                }
                self.refill();
                if !self.timer_running {
                    self.timer_running = true;
                    self.notify(NoteProperty::TimerRunning);
                }
                self.set_focus(FocusState::Active);
                true
            }
            FocusState::Active => {
                self.pause_timer();
                true
            }
            FocusState::Paused => false,
        }
    }

    pub fn focus_resume(&mut self) -> bool {
        if self.focus != FocusState::Paused {
            return false;
        }
        self.start_timer();
        true
    }

    pub fn focus_reset(&mut self) -> bool {
        if self.focus == FocusState::Idle {
            return false;
        }
        self.reset_timer();
        true
    }

    // ---- derived ----

    pub fn preview_text(&self) -> String {
        richtext::preview(&self.record.content)
    }

    pub fn foreground(&self) -> Foreground {
        Foreground::for_color(&self.record.color)
    }

    pub fn remaining_display(&self) -> String {
        let secs = self.record.remaining_time.as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            format!("{}:{:02}:{:02}", h, m, s)
        } else {
            format!("{:02}:{:02}", m, s)
        }
    }

    /// Elapsed fraction of the countdown, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let total = self.record.duration.as_secs_f64();
        if total == 0.0 {
            return 0.0;
        }
        (1.0 - self.record.remaining_time.as_secs_f64() / total).clamp(0.0, 1.0)
    }

    pub fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty() || self.preview_text().to_lowercase().contains(needle_lower)
    }

    // ---- commands ----

    /// Runs `command` if it is currently enabled; returns whether it ran.
    pub fn execute(&mut self, command: NoteCommand) -> bool {
        if !command.can_execute(self) {
            return false;
        }
        match command {
            NoteCommand::TogglePin => self.toggle_pin(),
            NoteCommand::StartTimer => self.start_timer(),
            NoteCommand::PauseTimer => self.pause_timer(),
            NoteCommand::ResetTimer => self.reset_timer(),
            NoteCommand::AddFiveMinutes => self.adjust_duration_minutes(ADJUST_STEP_MINUTES),
            NoteCommand::SubtractFiveMinutes => {
                self.adjust_duration_minutes(-ADJUST_STEP_MINUTES)
            }
            NoteCommand::FocusPrimary => {
                self.focus_primary();
            }
            NoteCommand::FocusResume => {
                self.focus_resume();
            }
            NoteCommand::FocusReset => {
                self.focus_reset();
            }
        }
        true
    }
}

/// Actions a note's toolbar can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCommand {
    TogglePin,
    StartTimer,
    PauseTimer,
    ResetTimer,
    AddFiveMinutes,
    SubtractFiveMinutes,
    FocusPrimary,
    FocusResume,
    FocusReset,
}

impl NoteCommand {
    pub fn can_execute(self, note: &NoteController) -> bool {
        match self {
            NoteCommand::TogglePin | NoteCommand::ResetTimer | NoteCommand::AddFiveMinutes => true,
            NoteCommand::StartTimer => !note.timer_running && !note.record.duration.is_zero(),
            NoteCommand::PauseTimer => note.timer_running,
            NoteCommand::SubtractFiveMinutes => !note.record.duration.is_zero(),
            NoteCommand::FocusPrimary => match note.focus {
                FocusState::Idle => !note.record.duration.is_zero(),
                FocusState::Active => true,
                FocusState::Paused => false,
            },
            NoteCommand::FocusResume => note.focus == FocusState::Paused,
            NoteCommand::FocusReset => note.focus == FocusState::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn note() -> NoteController {
        NoteController::new(NoteRecord::new(0.0, 0.0))
    }

    fn ticks(c: &mut NoteController, n: usize) {
        for _ in 0..n {
            c.tick();
        }
    }

    #[test]
    fn changing_duration_refills_remaining() {
        let mut c = note();
        for minutes in [0, 1, 10, 90] {
            c.set_duration_minutes(minutes);
            assert_eq!(c.duration(), Duration::from_secs(minutes as u64 * 60));
            assert_eq!(c.remaining_time(), c.duration());
        }
    }

    #[test]
    fn same_duration_keeps_remaining() {
        let mut c = note();
        c.set_duration_minutes(10);
        c.start_timer();
        ticks(&mut c, 5);
        c.set_duration_minutes(10);
        assert_eq!(c.remaining_time(), Duration::from_secs(595));
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let mut c = note();
        c.set_duration_minutes(-3);
        assert!(c.duration().is_zero());
        c.set_duration_minutes(5);
        c.adjust_duration_minutes(-20);
        assert!(c.duration().is_zero());
        c.adjust_duration_minutes(5);
        assert_eq!(c.duration_minutes(), 5);
    }

    #[test]
    fn start_is_a_no_op_without_duration() {
        let mut c = note();
        c.set_duration_minutes(0);
        c.start_timer();
        assert!(!c.is_timer_running());
    }

    #[test]
    fn each_tick_takes_one_second() {
        let mut c = note();
        c.set_duration_minutes(1);
        c.start_timer();
        for expected in (55..60).rev() {
            assert!(!c.tick());
            assert_eq!(c.remaining_time(), Duration::from_secs(expected));
        }
    }

    #[test]
    fn paused_timer_ignores_ticks() {
        let mut c = note();
        c.set_duration_minutes(1);
        c.start_timer();
        c.tick();
        c.pause_timer();
        ticks(&mut c, 10);
        assert_eq!(c.remaining_time(), Duration::from_secs(59));
    }

    #[test]
    fn reset_stops_and_refills() {
        let mut c = note();
        c.set_duration_minutes(2);
        c.start_timer();
        ticks(&mut c, 30);
        c.reset_timer();
        assert!(!c.is_timer_running());
        assert_eq!(c.remaining_time(), Duration::from_secs(120));
    }

    #[test]
    fn ten_minute_countdown_runs_out_and_unpins() {
        let mut c = note();
        c.set_pinned(true);
        c.set_duration_minutes(10);
        assert_eq!(c.remaining_display(), "10:00");
        c.start_timer();
        ticks(&mut c, 601);
        assert!(!c.is_timer_running());
        assert!(c.remaining_time().is_zero());
        assert!(!c.is_pinned());
        assert_eq!(c.focus_state(), FocusState::Idle);
    }

    #[test]
    fn finishing_ends_a_focus_session() {
        let mut c = note();
        c.set_pinned(true);
        c.set_duration_minutes(1);
        assert!(c.focus_primary());
        assert_eq!(c.focus_state(), FocusState::Active);
        ticks(&mut c, 59);
        assert!(c.tick());
        assert_eq!(c.focus_state(), FocusState::Idle);
        assert!(!c.is_pinned());
    }

    #[test]
    fn finished_timer_restarts_from_full_duration() {
        let mut c = note();
        c.set_duration_minutes(1);
        c.start_timer();
        ticks(&mut c, 60);
        c.start_timer();
        assert!(c.is_timer_running());
        assert_eq!(c.remaining_time(), Duration::from_secs(60));
    }

    #[test]
    fn focus_primary_without_duration_stays_idle() {
        let mut c = note();
        c.set_duration_minutes(0);
        assert!(!c.focus_primary());
        assert!(!c.focus_primary());
        assert_eq!(c.focus_state(), FocusState::Idle);
        assert!(!c.is_timer_running());
    }

    #[test]
    fn focus_start_refills_countdown() {
        let mut c = note();
        c.set_duration_minutes(5);
        c.start_timer();
        ticks(&mut c, 20);
        c.pause_timer();
        assert!(c.focus_primary());
        assert_eq!(c.focus_state(), FocusState::Active);
        assert_eq!(c.remaining_time(), c.duration());
        assert!(c.is_timer_running());
    }

    #[test]
    fn pause_and_resume_keep_remaining() {
        let mut c = note();
        c.set_duration_minutes(5);
        c.focus_primary();
        ticks(&mut c, 10);
        assert!(c.focus_primary());
        assert_eq!(c.focus_state(), FocusState::Paused);
        assert!(c.is_focus_active() && c.is_focus_paused());
        assert_eq!(c.remaining_time(), Duration::from_secs(290));
        ticks(&mut c, 10);
        assert_eq!(c.remaining_time(), Duration::from_secs(290));

        assert!(!c.focus_primary(), "primary is disabled while paused");
        assert!(c.focus_resume());
        assert_eq!(c.focus_state(), FocusState::Active);
        c.tick();
        assert_eq!(c.remaining_time(), Duration::from_secs(289));
    }

    #[test]
    fn focus_reset_returns_to_idle_with_full_time() {
        let mut c = note();
        c.set_duration_minutes(5);
        c.focus_primary();
        ticks(&mut c, 10);
        assert!(c.focus_reset());
        assert_eq!(c.focus_state(), FocusState::Idle);
        assert!(!c.is_timer_running());
        assert_eq!(c.remaining_time(), c.duration());

        c.focus_primary();
        c.focus_primary();
        assert!(c.focus_reset(), "reset also leaves a paused session");
        assert_eq!(c.focus_state(), FocusState::Idle);
        assert!(!c.focus_reset());
    }

    #[test]
    fn zeroing_duration_mid_session_stops_everything() {
        let mut c = note();
        c.set_pinned(true);
        c.set_duration_minutes(5);
        c.focus_primary();
        c.set_duration_minutes(0);
        assert!(!c.is_timer_running());
        assert_eq!(c.focus_state(), FocusState::Idle);
        assert!(c.is_pinned());
    }

    #[test]
    fn command_enablement_tracks_state() {
        let mut c = note();
        c.set_duration_minutes(0);
        assert!(!NoteCommand::FocusPrimary.can_execute(&c));
        assert!(!NoteCommand::StartTimer.can_execute(&c));
        assert!(!NoteCommand::SubtractFiveMinutes.can_execute(&c));
        assert!(c.execute(NoteCommand::AddFiveMinutes));
        assert_eq!(c.duration_minutes(), 5);

        assert!(NoteCommand::FocusPrimary.can_execute(&c));
        assert!(!NoteCommand::FocusResume.can_execute(&c));
        assert!(!NoteCommand::FocusReset.can_execute(&c));

        assert!(c.execute(NoteCommand::FocusPrimary));
        assert!(NoteCommand::FocusReset.can_execute(&c));
        assert!(NoteCommand::PauseTimer.can_execute(&c));
        assert!(!NoteCommand::StartTimer.can_execute(&c));

        assert!(c.execute(NoteCommand::FocusPrimary));
        assert!(!NoteCommand::FocusPrimary.can_execute(&c));
        assert!(NoteCommand::FocusResume.can_execute(&c));
        assert!(!NoteCommand::FocusReset.can_execute(&c));
        assert!(!c.execute(NoteCommand::FocusReset));

        assert!(c.execute(NoteCommand::FocusResume));
        assert_eq!(c.focus_state(), FocusState::Active);
    }

    #[test]
    fn plain_pause_during_focus_pauses_the_session() {
        let mut c = note();
        c.set_duration_minutes(5);
        c.focus_primary();
        c.execute(NoteCommand::PauseTimer);
        assert_eq!(c.focus_state(), FocusState::Paused);
        c.execute(NoteCommand::StartTimer);
        assert_eq!(c.focus_state(), FocusState::Active);
    }

    #[test]
    fn edits_notify_and_touch() {
        let mut c = note();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        c.subscribe(move |change| sink.lock().unwrap().push(change.property));
        let before = c.record().last_modified;
        std::thread::sleep(std::time::Duration::from_millis(2));
        c.set_content("hello");
        c.set_content("hello");
        c.set_color("#FF000000");
        c.set_geometry(5.0, 6.0, 10.0, 10.0);
        assert!(c.record().last_modified > before);
        assert_eq!(c.record().width, MIN_WIDTH);
        assert_eq!(c.record().height, MIN_HEIGHT);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                NoteProperty::Content,
                NoteProperty::Color,
                NoteProperty::Geometry
            ]
        );
    }

    #[test]
    fn non_finite_geometry_keeps_current_values() {
        let mut c = note();
        c.set_geometry(40.0, 50.0, 300.0, 200.0);
        c.set_geometry(f64::NAN, 10.0, f64::INFINITY, 180.0);
        let r = c.record();
        assert_eq!((r.left, r.top, r.width, r.height), (40.0, 10.0, 300.0, 180.0));
        c.set_geometry(f64::NEG_INFINITY, f64::NAN, f64::NAN, f64::NAN);
        let r = c.record();
        assert_eq!((r.left, r.top, r.width, r.height), (40.0, 10.0, 300.0, 180.0));
    }

    #[test]
    fn ticks_do_not_touch_last_modified() {
        let mut c = note();
        c.set_duration_minutes(1);
        c.start_timer();
        let stamp = c.record().last_modified;
        ticks(&mut c, 3);
        assert_eq!(c.record().last_modified, stamp);
    }

    #[test]
    fn unsubscribed_callbacks_stop_firing() {
        let mut c = note();
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let id = c.subscribe(move |_| *sink.lock().unwrap() += 1);
        c.toggle_pin();
        assert!(c.unsubscribe(id));
        assert!(!c.unsubscribe(id));
        c.toggle_pin();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn derived_display_properties() {
        let mut c = note();
        c.set_content(r"{\rtf1\ansi Plan   the\par launch}");
        assert_eq!(c.preview_text(), "Plan the launch");
        assert!(c.matches("launch"));
        assert!(c.matches(""));
        assert!(!c.matches("zebra"));

        c.set_color("#FF101010");
        assert_eq!(c.foreground(), Foreground::LightOnDark);
        c.set_color("garbage");
        assert_eq!(c.foreground(), Foreground::DarkOnLight);

        c.set_duration_minutes(90);
        assert_eq!(c.remaining_display(), "1:30:00");
        assert_eq!(c.progress(), 0.0);
        c.start_timer();
        ticks(&mut c, 2700);
        assert!((c.progress() - 0.5).abs() < 1e-9);
    }
}
