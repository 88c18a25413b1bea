use chrono::{DateTime, Duration, Utc};

use vigil_storage::{IdentityMode, Session, Settings};

use crate::sampler::Sample;

/// An in-flight span that has not been closed yet
#[derive(Debug, Clone)]
pub struct OpenSession {
    pub app_name: String,
    pub window_title: String,
    pub start_time: DateTime<Utc>,
    /// Most recent instant user input was confirmed while this span was open
    pub last_activity: DateTime<Utc>,
}

impl OpenSession {
    fn begin(sample: &Sample) -> Self {
        log::debug!(
            "Session started: {} [{}]",
            sample.app_name,
            sample.window_title
        );
        Self {
            app_name: sample.app_name.clone(),
            window_title: sample.window_title.clone(),
            start_time: sample.observed_at,
            last_activity: sample.observed_at,
        }
    }

    fn matches(&self, sample: &Sample, mode: IdentityMode) -> bool {
        match mode {
            IdentityMode::Window => {
                self.app_name == sample.app_name && self.window_title == sample.window_title
            }
            IdentityMode::App => self.app_name == sample.app_name,
        }
    }

    /// Pull `last_activity` forward to the input instant the sample implies
    /// (`observed_at - idle_seconds`). Never moves backwards, so input
    /// recency jitter cannot shrink a span.
    fn note_activity(&mut self, sample: &Sample) {
        #[allow(clippy::cast_possible_truncation)]
        let since_input = Duration::milliseconds((sample.idle_seconds * 1000.0) as i64);
        let inferred = sample.observed_at - since_input;
        if inferred > self.last_activity {
            self.last_activity = inferred;
        }
    }

    /// Turn the span into a persistable record ending at `end_time`.
    ///
    /// Spans shorter than one whole second are single-tick noise and are
    /// dropped rather than recorded.
    fn close_at(&self, end_time: DateTime<Utc>) -> Option<Session> {
        let end = end_time.max(self.start_time);
        let session = Session::new(
            self.app_name.clone(),
            self.window_title.clone(),
            self.start_time,
            end,
        );
        if session.is_zero_duration() {
            log::debug!(
                "Discarding zero-duration session: {} [{}]",
                session.app_name,
                session.window_title
            );
            None
        } else {
            log::debug!(
                "Session closed: {} [{}] {}s",
                session.app_name,
                session.window_title,
                session.duration_seconds
            );
            Some(session)
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    NoSession,
    SessionOpen(OpenSession),
    Idle,
    Paused,
}

/// The session state machine.
///
/// Consumes one sample per tick and decides when sessions open and close.
/// Time and pause/threshold configuration arrive as inputs, never read from
/// the environment, so tests drive the machine with synthetic sequences.
pub struct Tracker {
    state: State,
}

impl Tracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::NoSession,
        }
    }

    /// Apply one tick. Returns the sessions this tick closed, in the order
    /// they must be persisted.
    pub fn tick(&mut self, sample: &Sample, settings: &Settings) -> Vec<Session> {
        let mut closed = Vec::new();

        // Pause wins over everything else: any open span closes at the pause
        // boundary, and nothing mutates until resume
        if settings.paused {
            if let State::SessionOpen(open) = &self.state {
                closed.extend(open.close_at(sample.observed_at));
            }
            if !matches!(self.state, State::Paused) {
                log::info!("Tracking paused");
            }
            self.state = State::Paused;
            return closed;
        }
        if matches!(self.state, State::Paused) {
            // A fresh session starts after resume; the pre-pause span is gone
            log::info!("Tracking resumed");
            self.state = State::NoSession;
        }

        // Idle beats an identity change seen in the same tick: the span ends
        // at the last confirmed activity, not at the new window's arrival
        if sample.idle_seconds >= f64::from(settings.idle_threshold_seconds) {
            if let State::SessionOpen(open) = &self.state {
                closed.extend(open.close_at(open.last_activity));
            }
            self.state = State::Idle;
            return closed;
        }

        // Activity after idle: fall through so this same sample opens the
        // next session instead of waiting a tick
        if matches!(self.state, State::Idle) {
            self.state = State::NoSession;
        }

        match &mut self.state {
            State::SessionOpen(open) if open.matches(sample, settings.identity_mode) => {
                open.note_activity(sample);
            }
            State::SessionOpen(open) => {
                closed.extend(open.close_at(sample.observed_at));
                self.state = State::SessionOpen(OpenSession::begin(sample));
            }
            _ => {
                self.state = State::SessionOpen(OpenSession::begin(sample));
            }
        }

        closed
    }

    /// Close any open span for shutdown. The span ends at `now`, the actual
    /// shutdown instant, since the user was active up to it.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let result = if let State::SessionOpen(open) = &self.state {
            open.close_at(now)
        } else {
            None
        };
        self.state = State::NoSession;
        result
    }

    /// The in-flight span, if one is open
    #[must_use]
    pub fn open_session(&self) -> Option<&OpenSession> {
        match &self.state {
            State::SessionOpen(open) => Some(open),
            _ => None,
        }
    }

    /// Short name of the current phase, for status reporting
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match &self.state {
            State::NoSession => "no-session",
            State::SessionOpen(_) => "tracking",
            State::Idle => "idle",
            State::Paused => "paused",
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
