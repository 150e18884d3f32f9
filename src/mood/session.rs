//! Per-identity presentation state.
//!
//! Each signed-in identity gets one [`MoodSession`]: its daily mood store, the
//! theme synchronizer that store writes to, and a breathing timer. Sessions are
//! created on first use and torn down on sign-out, or by the idle sweep once no
//! request or socket has touched them for the configured idle period.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use super::clock::Clock;
use super::store::DailyMoodStore;
use super::theme::ThemeSynchronizer;
use crate::coping::breathing::{BreathingStatus, BreathingTimer};
use crate::coping::scheduler::Scheduler;
use crate::db::MoodRepository;
use crate::models::theme::ThemeTag;

/// Messages pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    Theme {
        theme: ThemeTag,
    },
    Breathing {
        user_id: Uuid,
        #[serde(flatten)]
        status: BreathingStatus,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Last use of a session and how many sockets hold it open.
#[derive(Debug)]
pub struct SessionActivity {
    last_seen: Mutex<Instant>,
    connections: AtomicUsize,
}

impl SessionActivity {
    fn new() -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        Instant::now().saturating_duration_since(last_seen)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Held by an open socket; the session is never idle while one exists.
#[derive(Debug)]
pub struct ConnectionGuard {
    activity: Arc<SessionActivity>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.activity.connections.fetch_sub(1, Ordering::SeqCst);
        self.activity.touch();
    }
}

pub struct MoodSession {
    pub user_id: Uuid,
    pub mood: DailyMoodStore,
    pub theme: ThemeSynchronizer,
    pub breathing: BreathingTimer,
    activity: Arc<SessionActivity>,
}

impl MoodSession {
    pub fn activity(&self) -> &SessionActivity {
        &self.activity
    }

    /// Register an open socket. Holds only the activity record, not the session.
    pub fn connect(&self) -> ConnectionGuard {
        self.activity.connections.fetch_add(1, Ordering::SeqCst);
        self.activity.touch();
        ConnectionGuard {
            activity: self.activity.clone(),
        }
    }

    fn is_idle(&self, max_idle: Duration) -> bool {
        self.activity.connections() == 0 && self.activity.idle_for() >= max_idle
    }

    async fn teardown(&self) {
        self.breathing.stop();
        self.mood.sign_out().await;
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<MoodSession>>>>,
    repo: Arc<dyn MoodRepository>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<String>,
}

impl SessionRegistry {
    pub fn new(
        repo: Arc<dyn MoodRepository>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<String>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            repo,
            scheduler,
            clock,
            events,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn events(&self) -> &broadcast::Sender<String> {
        &self.events
    }

    pub async fn get(&self, user_id: Uuid) -> Option<Arc<MoodSession>> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Session for a signed-in identity, created on first use. Counts as
    /// activity for the idle sweep.
    pub async fn session(&self, user_id: Uuid) -> Arc<MoodSession> {
        if let Some(existing) = self.get(user_id).await {
            existing.activity.touch();
            return existing;
        }

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&user_id) {
            existing.activity.touch();
            return existing.clone();
        }

        let theme = ThemeSynchronizer::new();
        let mood = DailyMoodStore::new(self.repo.clone(), theme.clone(), self.clock.clone());
        mood.sign_in(user_id).await;

        let events = self.events.clone();
        let breathing = BreathingTimer::new(self.scheduler.clone()).with_observer(Arc::new(
            move |status: BreathingStatus| {
                // No subscribers is fine.
                let _ = events.send(ServerEvent::Breathing { user_id, status }.to_json());
            },
        ));

        let session = Arc::new(MoodSession {
            user_id,
            mood,
            theme,
            breathing,
            activity: Arc::new(SessionActivity::new()),
        });
        sessions.insert(user_id, session.clone());
        tracing::debug!(user_id = %user_id, active_sessions = sessions.len(), "Session created");
        session
    }

    /// Identity signed out: reset its theme, forget its mood, stop its timer.
    /// Returns whether a session existed.
    pub async fn sign_out(&self, user_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&user_id);
        match removed {
            Some(session) => {
                session.teardown().await;
                tracing::info!(user_id = %user_id, "Session signed out");
                true
            }
            None => false,
        }
    }

    /// Tear down every session with no open socket that has been unused for
    /// at least `max_idle`. Returns how many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<Arc<MoodSession>> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, session)| session.is_idle(max_idle))
                .map(|(id, _)| *id)
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &evicted {
            session.teardown().await;
            tracing::info!(user_id = %session.user_id, "Idle session evicted");
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Start the background task that evicts abandoned sessions.
pub fn spawn_session_sweeper(registry: SessionRegistry, idle_secs: u64) {
    let max_idle = Duration::from_secs(idle_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs((idle_secs / 4).max(1)));
        loop {
            interval.tick().await;
            let evicted = registry.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = registry.len().await;
                tracing::debug!(evicted = evicted, remaining = remaining, "Session sweep");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coping::scheduler::ManualScheduler;
    use crate::db::MemoryStore;
    use crate::mood::clock::FixedClock;
    use chrono::NaiveDate;

    fn registry() -> (ManualScheduler, SessionRegistry, broadcast::Receiver<String>) {
        let scheduler = ManualScheduler::new();
        let (tx, rx) = broadcast::channel(64);
        let registry = SessionRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(scheduler.clone()),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())),
            tx,
        );
        (scheduler, registry, rx)
    }

    #[tokio::test]
    async fn test_session_is_reused_per_identity() {
        let (_, registry, _) = registry();
        let user = Uuid::new_v4();
        let a = registry.session(user).await;
        let b = registry.session(user).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.mood.identity().await, Some(user));

        registry.session(Uuid::new_v4()).await;
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_identities_have_independent_themes() {
        let (_, registry, _) = registry();
        let a = registry.session(Uuid::new_v4()).await;
        let b = registry.session(Uuid::new_v4()).await;

        a.mood.save(5).await.unwrap();
        assert_eq!(a.theme.current(), ThemeTag::Great);
        assert_eq!(b.theme.current(), ThemeTag::Default);
    }

    #[tokio::test]
    async fn test_sign_out_tears_down_session() {
        let (scheduler, registry, _) = registry();
        let user = Uuid::new_v4();
        let session = registry.session(user).await;
        session.mood.save(2).await.unwrap();
        session.breathing.start();
        assert_eq!(scheduler.active_count(), 1);

        assert!(registry.sign_out(user).await);
        assert_eq!(session.theme.current(), ThemeTag::Default);
        assert_eq!(session.mood.today_mood().await, None);
        assert!(!session.breathing.is_running());
        assert_eq!(scheduler.active_count(), 0);
        assert!(registry.get(user).await.is_none());
        assert!(!registry.sign_out(user).await);
    }

    #[tokio::test]
    async fn test_breathing_ticks_are_broadcast_with_user_id() {
        let (scheduler, registry, mut rx) = registry();
        let user = Uuid::new_v4();
        let session = registry.session(user).await;

        session.breathing.start();
        scheduler.advance(Duration::from_secs(1));

        let started: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(started["type"], "breathing");
        assert_eq!(started["user_id"], user.to_string());
        assert_eq!(started["active"], true);
        assert_eq!(started["seconds_remaining"], 4);

        let ticked: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(ticked["phase"], "inhale");
        assert_eq!(ticked["seconds_remaining"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted_and_releases_timer() {
        let (scheduler, registry, _) = registry();
        let user = Uuid::new_v4();
        let session = registry.session(user).await;
        session.mood.save(1).await.unwrap();
        session.breathing.start();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 0);

        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 1);

        assert!(registry.is_empty().await);
        assert!(!session.breathing.is_running());
        assert_eq!(session.theme.current(), ThemeTag::Default);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_connection_keeps_session_alive() {
        let (_, registry, _) = registry();
        let user = Uuid::new_v4();
        let connection = registry.session(user).await.connect();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 0);

        // Disconnecting counts as activity; the idle period restarts.
        drop(connection);
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 0);

        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_reset_idle_clock() {
        let (_, registry, _) = registry();
        let user = Uuid::new_v4();
        let session = registry.session(user).await;

        tokio::time::advance(Duration::from_secs(200)).await;
        registry.session(user).await;
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(session.activity().connections(), 0);
        assert_eq!(session.activity().idle_for(), Duration::from_secs(200));
        assert_eq!(registry.evict_idle(Duration::from_secs(300)).await, 0);
    }
}
