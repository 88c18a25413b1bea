use std::collections::VecDeque;
use std::sync::Arc;

use vigil_storage::{Database, Session, StoreError};

/// Destination for closed sessions. `Database` is the real sink; tests
/// substitute scripted fakes.
pub trait SessionSink {
    /// # Errors
    ///
    /// Returns `StoreError` when the record cannot be persisted.
    fn append(&self, session: &Session) -> Result<(), StoreError>;
}

impl SessionSink for Database {
    fn append(&self, session: &Session) -> Result<(), StoreError> {
        self.append_session(session)
    }
}

impl<S: SessionSink> SessionSink for Arc<S> {
    fn append(&self, session: &Session) -> Result<(), StoreError> {
        self.as_ref().append(session)
    }
}

impl<S: SessionSink> SessionSink for &S {
    fn append(&self, session: &Session) -> Result<(), StoreError> {
        (**self).append(session)
    }
}

/// Buffers closed sessions and writes them through in order.
///
/// A transient store failure is retried once immediately. If the retry also
/// fails the record stays queued, along with everything behind it, and the
/// next flush picks the queue up from the front. Records the store rejects
/// outright are logged and dropped so one bad row cannot wedge the queue.
pub struct SessionWriter<S: SessionSink> {
    sink: S,
    pending: VecDeque<Session>,
}

impl<S: SessionSink> SessionWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            pending: VecDeque::new(),
        }
    }

    /// Queue a session and attempt to drain. Returns whether the queue is
    /// empty afterwards.
    pub fn submit(&mut self, session: Session) -> bool {
        self.pending.push_back(session);
        self.flush()
    }

    /// Drain the queue front to back. Stops at the first record the store
    /// is unavailable for, keeping write order intact.
    pub fn flush(&mut self) -> bool {
        while let Some(session) = self.pending.front() {
            match self.try_append(session) {
                Ok(()) => {
                    self.pending.pop_front();
                }
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "Session store unavailable, holding {} session(s): {e}",
                        self.pending.len()
                    );
                    return false;
                }
                Err(e) => {
                    log::warn!("Discarding session rejected by store: {e}");
                    self.pending.pop_front();
                }
            }
        }
        true
    }

    fn try_append(&self, session: &Session) -> Result<(), StoreError> {
        match self.sink.append(session) {
            Err(e) if e.is_retryable() => {
                log::debug!("Retrying session write: {e}");
                self.sink.append(session)
            }
            result => result,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::cell::RefCell;

    struct FlakySink {
        script: RefCell<VecDeque<Result<(), StoreError>>>,
        appended: RefCell<Vec<Session>>,
    }

    impl FlakySink {
        fn new(script: Vec<Result<(), StoreError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                appended: RefCell::new(Vec::new()),
            }
        }

        fn appended_apps(&self) -> Vec<String> {
            self.appended
                .borrow()
                .iter()
                .map(|s| s.app_name.clone())
                .collect()
        }
    }

    impl SessionSink for FlakySink {
        fn append(&self, session: &Session) -> Result<(), StoreError> {
            match self.script.borrow_mut().pop_front() {
                Some(Err(e)) => Err(e),
                // Script exhausted means the store has recovered
                _ => {
                    self.appended.borrow_mut().push(session.clone());
                    Ok(())
                }
            }
        }
    }

    fn session(app: &str, offset_secs: i64) -> Session {
        let start =
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap() + Duration::seconds(offset_secs);
        Session::new(
            app.to_string(),
            "Title".to_string(),
            start,
            start + Duration::seconds(30),
        )
    }

    fn unavailable() -> Result<(), StoreError> {
        Err(StoreError::Unavailable("locked".to_string()))
    }

    #[test]
    fn test_transient_failure_is_masked_by_the_retry() {
        let sink = FlakySink::new(vec![unavailable()]);
        let mut writer = SessionWriter::new(&sink);

        assert!(writer.submit(session("AppX", 0)));
        assert_eq!(writer.pending_count(), 0);
        assert_eq!(sink.appended_apps(), vec!["AppX"]);
    }

    #[test]
    fn test_double_failure_holds_until_a_later_flush() {
        let sink = FlakySink::new(vec![unavailable(), unavailable()]);
        let mut writer = SessionWriter::new(&sink);

        assert!(!writer.submit(session("AppX", 0)));
        assert_eq!(writer.pending_count(), 1);
        assert!(sink.appended_apps().is_empty());

        assert!(writer.flush());
        assert_eq!(writer.pending_count(), 0);
        assert_eq!(sink.appended_apps(), vec!["AppX"]);
    }

    #[test]
    fn test_outage_preserves_write_order() {
        let sink = FlakySink::new(vec![
            unavailable(),
            unavailable(),
            unavailable(),
            unavailable(),
        ]);
        let mut writer = SessionWriter::new(&sink);

        assert!(!writer.submit(session("AppX", 0)));
        assert!(!writer.submit(session("AppY", 60)));
        assert_eq!(writer.pending_count(), 2);

        assert!(writer.flush());
        assert_eq!(sink.appended_apps(), vec!["AppX", "AppY"]);
    }

    #[test]
    fn test_rejected_record_is_dropped_not_retried() {
        let sink = FlakySink::new(vec![Err(StoreError::ConstraintViolation(
            "duplicate id".to_string(),
        ))]);
        let mut writer = SessionWriter::new(&sink);

        assert!(writer.submit(session("AppX", 0)));
        assert!(writer.submit(session("AppY", 60)));

        // The rejected record is gone; later writes are unaffected
        assert_eq!(sink.appended_apps(), vec!["AppY"]);
    }

    #[test]
    fn test_flush_on_an_empty_queue_is_a_no_op() {
        let sink = FlakySink::new(vec![]);
        let mut writer = SessionWriter::new(&sink);

        assert!(writer.flush());
        assert!(sink.appended_apps().is_empty());
    }
}
