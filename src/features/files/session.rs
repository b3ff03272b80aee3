use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cache::RecordCache;
use super::models::{ChangeEvent, ChangeKind, FileRecord};
use super::policy::UploadPolicy;
use super::services::{LifecycleError, LifecycleManager};
use crate::modules::realtime::{ConnectionState, EventHandler, Subscription};
use crate::modules::storage::RemoteStore;

/// Push events that arrived while a listing was in flight
#[derive(Default)]
struct PendingEvents {
    loads: usize,
    events: Vec<ChangeEvent>,
}

/// Lifetime scope of one signed-in user
///
/// Owns the user's record cache from sign-in until sign-out or idle
/// eviction. Once closed, late results are dropped instead of being written
/// to the cache.
pub struct FileSession {
    owner_id: String,
    cache: RwLock<RecordCache>,
    live: AtomicBool,
    pending: Mutex<PendingEvents>,
    last_access: Mutex<Instant>,
    subscription: Mutex<Option<Subscription>>,
}

impl FileSession {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            cache: RwLock::new(RecordCache::new()),
            live: AtomicBool::new(true),
            pending: Mutex::new(PendingEvents::default()),
            last_access: Mutex::new(Instant::now()),
            subscription: Mutex::new(None),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Mutate the cache if the session is still open
    ///
    /// Returns `None` when the session was closed and the change dropped.
    pub fn apply<R>(&self, change: impl FnOnce(&mut RecordCache) -> R) -> Option<R> {
        if !self.is_live() {
            debug!(
                "Session for {} is closed, dropping late result",
                self.owner_id
            );
            return None;
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        Some(change(&mut cache))
    }

    pub fn read<R>(&self, view: impl FnOnce(&RecordCache) -> R) -> R {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        view(&cache)
    }

    /// Apply a push notification to the cache
    ///
    /// Notifications about other owners' rows are ignored. While a listing
    /// is in flight the event is held back and replayed on top of the
    /// listing once it lands.
    pub fn reconcile(&self, event: ChangeEvent) {
        if event.record.owner_id != self.owner_id {
            return;
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.loads > 0 {
            debug!(
                "Holding {:?} event for file {} until the listing lands",
                event.kind, event.record.id
            );
            pending.events.push(event);
            return;
        }

        let (kind, id) = (event.kind, event.record.id);
        self.apply(|cache| apply_event(cache, event));
        debug!("Reconciled {:?} event for file {}", kind, id);
    }

    /// Start holding back push events until the returned guard finishes
    ///
    /// Dropping the guard without a listing (failed or cancelled load)
    /// replays the held events onto the current cache.
    pub fn begin_load(&self) -> LoadGuard<'_> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .loads += 1;
        LoadGuard {
            session: self,
            finished: false,
        }
    }

    fn end_load(&self, records: Option<Vec<FileRecord>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.loads = pending.loads.saturating_sub(1);

        let held = pending.events.len();
        let replayed = records.is_some() || pending.loads == 0;
        match records {
            Some(records) => {
                self.apply(|cache| {
                    cache.replace_all(records);
                    for event in &pending.events {
                        apply_event(cache, event.clone());
                    }
                });
            }
            None if pending.loads == 0 => {
                self.apply(|cache| {
                    for event in &pending.events {
                        apply_event(cache, event.clone());
                    }
                });
            }
            // Another listing is still in flight and will replay them
            None => {}
        }

        if pending.loads == 0 {
            pending.events.clear();
        }
        if replayed && held > 0 {
            debug!("Replayed {} held events for {}", held, self.owner_id);
        }
    }

    /// Mark the session as used now
    pub fn touch(&self) {
        *self.last_access.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_access
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }

    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(subscription);
    }

    fn attach(&self, subscription: Subscription) {
        *self.subscription.lock().unwrap_or_else(|e| e.into_inner()) = Some(subscription);
    }
}

fn apply_event(cache: &mut RecordCache, event: ChangeEvent) {
    match event.kind {
        ChangeKind::Created | ChangeKind::Updated => cache.upsert(event.record),
        ChangeKind::Deleted => {
            cache.remove(&event.record.id);
        }
    }
}

/// In-flight listing for a session; see `FileSession::begin_load`
pub struct LoadGuard<'a> {
    session: &'a FileSession,
    finished: bool,
}

impl LoadGuard<'_> {
    /// Replace the cache with `records`, then replay held events on top
    pub fn finish(mut self, records: Vec<FileRecord>) {
        self.finished = true;
        self.session.end_load(Some(records));
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.session.end_load(None);
        }
    }
}

/// Open sessions keyed by owner id
pub struct SessionRegistry {
    store: Arc<dyn RemoteStore>,
    policy: Arc<UploadPolicy>,
    sessions: RwLock<HashMap<String, Arc<FileSession>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn RemoteStore>, policy: UploadPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn get(&self, owner_id: &str) -> Option<Arc<FileSession>> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(owner_id)
            .cloned()?;
        session.touch();
        Some(session)
    }

    /// Return the owner's session, opening and loading it on first use
    ///
    /// The subscription is attached before the initial listing; events
    /// arriving meanwhile are held and replayed over the listing. A failed
    /// listing registers nothing.
    pub async fn open(&self, owner_id: &str) -> Result<Arc<FileSession>, LifecycleError> {
        if let Some(session) = self.get(owner_id) {
            return Ok(session);
        }

        let session = Arc::new(FileSession::new(owner_id));
        let handler = self.reconcile_handler(Arc::downgrade(&session));
        session.attach(self.store.subscribe(owner_id, handler));

        if let Err(e) = self.manager_for(session.clone()).load().await {
            session.close();
            return Err(e);
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.entry(owner_id.to_string()) {
            Entry::Occupied(existing) => {
                // Another request opened it first
                session.close();
                existing.get().touch();
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                info!("Opened file session for {}", owner_id);
                Ok(session)
            }
        }
    }

    /// Lifecycle manager bound to the owner's session
    pub async fn manager(&self, owner_id: &str) -> Result<LifecycleManager, LifecycleError> {
        let session = self.open(owner_id).await?;
        Ok(self.manager_for(session))
    }

    /// Sign-out: stop delivery and discard the cache
    pub fn close(&self, owner_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(owner_id);

        match removed {
            Some(session) => {
                session.close();
                info!("Closed file session for {}", owner_id);
                true
            }
            None => false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Close every session unused for at least `ttl`, returning how many
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<Arc<FileSession>> = {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.idle_for() >= ttl)
                .map(|(owner_id, _)| owner_id.clone())
                .collect();
            expired
                .iter()
                .filter_map(|owner_id| sessions.remove(owner_id))
                .collect()
        };

        for session in &evicted {
            session.close();
            debug!("Evicted idle file session for {}", session.owner_id());
        }
        if !evicted.is_empty() {
            info!("Evicted {} idle file sessions", evicted.len());
        }
        evicted.len()
    }

    /// Periodically close sessions idle for longer than `ttl`
    pub fn spawn_idle_sweeper(self: Arc<Self>, ttl: Duration) -> JoinHandle<()> {
        let period = (ttl / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                self.evict_idle(ttl);
            }
        })
    }

    /// Reload every open session from the store
    pub async fn reload_all(&self) {
        let sessions: Vec<Arc<FileSession>> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        let reloads = sessions.into_iter().map(|session| async move {
            let owner_id = session.owner_id().to_string();
            if let Err(e) = self.manager_for(session).load().await {
                warn!("Failed to reload files for {}: {}", owner_id, e);
            }
        });
        join_all(reloads).await;
    }

    /// Reload all sessions whenever the push feed comes back, closing any
    /// gap in delivered events
    pub fn spawn_reconnect_watcher(self: Arc<Self>) -> JoinHandle<()> {
        let mut state = self.store.connection_state();
        let mut previous = *state.borrow_and_update();

        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let current = *state.borrow_and_update();
                if previous == ConnectionState::Disconnected
                    && current == ConnectionState::Connected
                {
                    info!(
                        "Realtime feed reconnected, reloading {} sessions",
                        self.open_count()
                    );
                    self.reload_all().await;
                }
                previous = current;
            }
        })
    }

    /// Push handler feeding events through the session's lifecycle manager
    /// without keeping the session alive
    fn reconcile_handler(&self, session: Weak<FileSession>) -> EventHandler {
        let store = self.store.clone();
        let policy = self.policy.clone();
        Arc::new(move |event| {
            if let Some(session) = session.upgrade() {
                LifecycleManager::new(store.clone(), policy.clone(), session).reconcile(event);
            }
        })
    }

    fn manager_for(&self, session: Arc<FileSession>) -> LifecycleManager {
        LifecycleManager::new(self.store.clone(), self.policy.clone(), session)
    }
}
