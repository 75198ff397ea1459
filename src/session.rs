// src/session.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::SESSION_GRACE_MINUTES;

/// Navigation action posted alongside an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavAction {
    Next,
    Previous,
    Submit,
}

/// Where a navigation step lands: another question, or the submit flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Question(usize),
    Submit,
}

/// One student's in-progress run through a fixed question sequence,
/// bounded by a duration.
///
/// The question id list is a snapshot taken at start: later edits or
/// soft-deletes in the catalog do not affect an attempt already underway.
/// Wall-clock time since `started_at` is the only expiry signal; there is
/// no pause state and no background timer.
#[derive(Debug, Clone)]
pub struct ExamSession {
    pub user_id: i64,
    pub question_ids: Vec<i64>,
    pub current_index: usize,
    pub answers: HashMap<i64, i32>,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl ExamSession {
    pub fn new(
        user_id: i64,
        question_ids: Vec<i64>,
        started_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            user_id,
            question_ids,
            current_index: 0,
            answers: HashMap::new(),
            started_at,
            duration_minutes,
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    /// True once elapsed time has passed the duration. Expiry is checked,
    /// not enforced: nothing happens to an expired session until the next
    /// request looks at it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_seconds(now) > self.duration_minutes * 60
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.duration_minutes * 60 - self.elapsed_seconds(now)).max(0)
    }

    /// Remaining time in whole minutes, rounded up for display.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        let secs = self.remaining_seconds(now);
        secs / 60 + i64::from(secs % 60 != 0)
    }

    /// Upserts the selected option for a question. Overwrites silently and
    /// accepts any value; out-of-range selections are scored incorrect at
    /// submission rather than rejected here.
    pub fn record_answer(&mut self, question_id: i64, answer: i32) {
        self.answers.insert(question_id, answer);
    }

    /// Moves the current-question pointer relative to `question_id` and
    /// returns the landing target. `next`/`previous` clamp at the sequence
    /// bounds instead of wrapping or failing; `submit` leaves the pointer
    /// untouched. A question id not in the snapshot falls back to the
    /// current pointer position.
    pub fn navigate(&mut self, question_id: i64, action: NavAction) -> NavTarget {
        let index = self
            .question_ids
            .iter()
            .position(|&id| id == question_id)
            .unwrap_or(self.current_index);

        match action {
            NavAction::Next => {
                self.current_index = (index + 1).min(self.question_ids.len().saturating_sub(1));
                NavTarget::Question(self.current_index)
            }
            NavAction::Previous => {
                self.current_index = index.saturating_sub(1);
                NavTarget::Question(self.current_index)
            }
            NavAction::Submit => NavTarget::Submit,
        }
    }

    /// True once the session has outlived its duration plus the grace
    /// period and the store may drop it.
    fn is_reapable(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_seconds(now) > (self.duration_minutes + SESSION_GRACE_MINUTES) * 60
    }
}

/// Keyed store of in-progress exam sessions, one per user.
///
/// Passed around inside `AppState` rather than living in a global. Stale
/// entries are reaped opportunistically when the store is written; reads
/// never mutate, preserving the lazy-expiry contract. Concurrent writes for
/// the same user are last-write-wins with no version check.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<i64, ExamSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the user's session, expired or not.
    pub async fn get(&self, user_id: i64) -> Option<ExamSession> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Installs a new session for its owner, reaping stale entries first.
    /// An existing session for the same user is replaced.
    pub async fn insert(&self, session: ExamSession, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_reapable(now));
        sessions.insert(session.user_id, session);
    }

    /// Runs a mutation against the user's session in place.
    /// Returns `None` when the user has no session.
    pub async fn update<T>(
        &self,
        user_id: i64,
        mutate: impl FnOnce(&mut ExamSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&user_id).map(mutate)
    }

    /// Removes and returns the user's session.
    pub async fn remove(&self, user_id: i64) -> Option<ExamSession> {
        self.sessions.write().await.remove(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_at(start: DateTime<Utc>, ids: Vec<i64>) -> ExamSession {
        ExamSession::new(7, ids, start, 60)
    }

    #[test]
    fn new_session_starts_at_first_question_with_no_answers() {
        let now = Utc::now();
        let session = session_at(now, vec![10, 20, 30]);

        assert_eq!(session.question_ids.len(), 3);
        assert_eq!(session.current_index, 0);
        assert!(session.answers.is_empty());
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let now = Utc::now();
        let mut session = session_at(now, vec![10, 20, 30]);

        // Backing up from the first question stays at the first question.
        assert_eq!(
            session.navigate(10, NavAction::Previous),
            NavTarget::Question(0)
        );

        assert_eq!(session.navigate(10, NavAction::Next), NavTarget::Question(1));
        assert_eq!(session.navigate(20, NavAction::Next), NavTarget::Question(2));

        // Advancing past the last question stays on the last question.
        assert_eq!(session.navigate(30, NavAction::Next), NavTarget::Question(2));
        assert_eq!(session.current_index, 2);
    }

    #[test]
    fn arbitrary_navigation_sequences_stay_in_bounds() {
        let now = Utc::now();
        let mut session = session_at(now, vec![1, 2, 3, 4]);
        let actions = [
            NavAction::Previous,
            NavAction::Next,
            NavAction::Next,
            NavAction::Next,
            NavAction::Next,
            NavAction::Next,
            NavAction::Previous,
            NavAction::Previous,
            NavAction::Previous,
            NavAction::Previous,
            NavAction::Next,
        ];

        for action in actions {
            let current_id = session.question_ids[session.current_index];
            session.navigate(current_id, action);
            assert!(session.current_index < session.question_ids.len());
        }
    }

    #[test]
    fn navigate_with_unknown_question_falls_back_to_pointer() {
        let now = Utc::now();
        let mut session = session_at(now, vec![10, 20, 30]);
        session.current_index = 1;

        assert_eq!(
            session.navigate(999, NavAction::Next),
            NavTarget::Question(2)
        );
    }

    #[test]
    fn submit_leaves_pointer_untouched() {
        let now = Utc::now();
        let mut session = session_at(now, vec![10, 20, 30]);
        session.current_index = 1;

        assert_eq!(session.navigate(20, NavAction::Submit), NavTarget::Submit);
        assert_eq!(session.current_index, 1);
    }

    #[test]
    fn answers_overwrite_silently() {
        let now = Utc::now();
        let mut session = session_at(now, vec![10, 20]);

        session.record_answer(10, 2);
        session.record_answer(10, 3);
        // Out-of-range values are stored as given.
        session.record_answer(20, 9);

        assert_eq!(session.answers.get(&10), Some(&3));
        assert_eq!(session.answers.get(&20), Some(&9));
    }

    #[test]
    fn expiry_is_strictly_after_the_duration() {
        let start = Utc::now();
        let session = session_at(start, vec![10]);

        assert!(!session.is_expired(start + Duration::minutes(59)));
        assert!(!session.is_expired(start + Duration::minutes(60)));
        assert!(session.is_expired(start + Duration::minutes(60) + Duration::seconds(1)));
    }

    #[test]
    fn remaining_minutes_round_up() {
        let start = Utc::now();
        let session = session_at(start, vec![10]);

        assert_eq!(session.remaining_minutes(start), 60);
        assert_eq!(
            session.remaining_minutes(start + Duration::seconds(30)),
            60
        );
        assert_eq!(session.remaining_minutes(start + Duration::minutes(59)), 1);
        assert_eq!(session.remaining_minutes(start + Duration::minutes(61)), 0);
    }

    #[tokio::test]
    async fn store_returns_the_same_session_until_replaced() {
        let store = SessionStore::new();
        let now = Utc::now();
        let mut session = session_at(now, vec![10, 20]);
        session.record_answer(10, 1);
        store.insert(session, now).await;

        let first = store.get(7).await.expect("session should exist");
        let second = store.get(7).await.expect("session should exist");
        assert_eq!(first.question_ids, second.question_ids);
        assert_eq!(first.answers, second.answers);
        assert_eq!(first.started_at, second.started_at);
    }

    #[tokio::test]
    async fn store_update_mutates_in_place() {
        let store = SessionStore::new();
        let now = Utc::now();
        store.insert(session_at(now, vec![10, 20]), now).await;

        let target = store
            .update(7, |s| {
                s.record_answer(10, 2);
                s.navigate(10, NavAction::Next)
            })
            .await;

        assert_eq!(target, Some(NavTarget::Question(1)));
        let session = store.get(7).await.unwrap();
        assert_eq!(session.answers.get(&10), Some(&2));
        assert_eq!(session.current_index, 1);
    }

    #[tokio::test]
    async fn store_update_on_missing_session_is_none() {
        let store = SessionStore::new();
        let touched = store.update(42, |_| ()).await;
        assert!(touched.is_none());
    }

    #[tokio::test]
    async fn insert_reaps_sessions_past_duration_plus_grace() {
        let store = SessionStore::new();
        let now = Utc::now();

        let stale_start = now - Duration::minutes(66);
        let mut stale = session_at(stale_start, vec![10]);
        stale.user_id = 1;
        store.insert(stale, stale_start).await;

        // Expired but still within the grace window: must survive the reap.
        let expired_start = now - Duration::minutes(62);
        let mut expired = session_at(expired_start, vec![10]);
        expired.user_id = 2;
        store.insert(expired, expired_start).await;

        let mut fresh = session_at(now, vec![10]);
        fresh.user_id = 3;
        store.insert(fresh, now).await;

        assert!(store.get(1).await.is_none());
        assert!(store.get(2).await.is_some());
        assert!(store.get(3).await.is_some());
    }
}
