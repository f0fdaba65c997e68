//! In-memory list of one role's listings, reconciled with the backend.
//!
//! State sits behind a mutex that is never held across an `.await`, so
//! operations take `&self` and may run concurrently. Every list mutation is by
//! listing id, which keeps results correct whatever order requests finish in.

use crate::api::{ListingApi, SubmissionPayload};
use crate::error::ClientError;
use crate::listing::notify::{Notice, Notifier, TracingNotifier};
use crate::models::{DeleteConfirmation, Listing, Role};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Top-level fetch state
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Errored(ClientError),
}

/// Which listings a fetch reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Public browsing
    All,
    /// The authenticated owner's listings
    Mine,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PendingOp {
    Create,
    Update(String),
    Delete(String),
}

impl PendingOp {
    fn describe(&self) -> String {
        match self {
            PendingOp::Create => "creating a post".to_string(),
            PendingOp::Update(id) => format!("updating post {id}"),
            PendingOp::Delete(id) => format!("deleting post {id}"),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    load: LoadState,
    listings: Vec<Listing>,
    pending: HashSet<PendingOp>,
    /// Bumped by every fetch; only the latest one may touch the list
    fetch_generation: u64,
    alive: bool,
}

/// Clears a busy gate when the operation ends, however it ends
struct PendingGuard {
    state: Arc<Mutex<StoreState>>,
    op: PendingOp,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.state).pending.remove(&self.op);
    }
}

fn lock(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Listings of one role. Cloning shares the same state.
#[derive(Clone)]
pub struct ListingStore {
    role: Role,
    api: Arc<dyn ListingApi>,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<StoreState>>,
}

impl ListingStore {
    pub fn new(role: Role, api: Arc<dyn ListingApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            role,
            api,
            notifier,
            state: Arc::new(Mutex::new(StoreState {
                load: LoadState::Idle,
                listings: Vec::new(),
                pending: HashSet::new(),
                fetch_generation: 0,
                alive: true,
            })),
        }
    }

    /// Store that reports outcomes to the log
    pub fn with_tracing(role: Role, api: Arc<dyn ListingApi>) -> Self {
        Self::new(role, api, Arc::new(TracingNotifier))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).load == LoadState::Loading
    }

    /// Snapshot of the held list
    pub fn listings(&self) -> Vec<Listing> {
        lock(&self.state).listings.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Listing> {
        lock(&self.state)
            .listings
            .iter()
            .find(|l| l.has_id(id))
            .cloned()
    }

    /// Whether any create/update/delete is pending
    pub fn is_busy(&self) -> bool {
        !lock(&self.state).pending.is_empty()
    }

    /// Listings whose schema fields or status contain `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<Listing> {
        let needle = query.trim().to_lowercase();
        let schema = self.role.schema();
        let state = lock(&self.state);
        if needle.is_empty() {
            return state.listings.clone();
        }
        state
            .listings
            .iter()
            .filter(|listing| listing.matches(schema, &needle))
            .cloned()
            .collect()
    }

    /// Detach from the UI. Completions that arrive afterwards change nothing.
    pub fn teardown(&self) {
        lock(&self.state).alive = false;
        debug!("{} store torn down", self.role);
    }

    pub fn is_alive(&self) -> bool {
        lock(&self.state).alive
    }

    pub async fn fetch_all(&self) -> Result<(), ClientError> {
        self.fetch(Scope::All).await
    }

    pub async fn fetch_mine(&self) -> Result<(), ClientError> {
        self.fetch(Scope::Mine).await
    }

    /// Replace the list with a fresh read. On failure the previous list is
    /// kept and the state becomes `Errored`.
    ///
    /// With overlapping fetches only the most recently started one is
    /// applied; the state stays `Loading` until it completes, and earlier
    /// completions are returned to their callers but otherwise discarded.
    pub async fn fetch(&self, scope: Scope) -> Result<(), ClientError> {
        let generation = {
            let mut state = lock(&self.state);
            if !state.alive {
                return Ok(());
            }
            state.fetch_generation += 1;
            state.load = LoadState::Loading;
            state.fetch_generation
        };

        debug!("Fetching {:?} {} posts from {}", scope, self.role, self.api.backend_name());
        let result = match scope {
            Scope::All => self.api.fetch_all(self.role).await,
            Scope::Mine => self.api.fetch_mine(self.role).await,
        };

        let mut state = lock(&self.state);
        if !state.alive {
            debug!("Dropping {} fetch result for torn-down store", self.role);
            return result.map(|_| ());
        }
        if generation != state.fetch_generation {
            debug!(
                "Discarding stale {} fetch #{} (latest is #{})",
                self.role, generation, state.fetch_generation
            );
            return result.map(|_| ());
        }

        match result {
            Ok(listings) => {
                info!("Loaded {} {} posts", listings.len(), self.role);
                state.listings = listings;
                state.load = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                state.load = LoadState::Errored(err.clone());
                drop(state);
                self.notifier.notify(Notice::error(&err));
                Err(err)
            }
        }
    }

    fn begin(&self, op: PendingOp) -> Result<PendingGuard, ClientError> {
        let mut state = lock(&self.state);
        if !state.pending.insert(op.clone()) {
            return Err(ClientError::Busy(op.describe()));
        }
        Ok(PendingGuard {
            state: Arc::clone(&self.state),
            op,
        })
    }

    /// Create a listing and put the backend's copy at the top of the list
    pub async fn create(&self, payload: &SubmissionPayload) -> Result<Listing, ClientError> {
        let _guard = self.begin(PendingOp::Create)?;

        let result = self.api.create(self.role, payload).await;

        let mut state = lock(&self.state);
        if !state.alive {
            debug!("Dropping {} create result for torn-down store", self.role);
            return result;
        }

        match result {
            Ok(listing) => {
                state.listings.insert(0, listing.clone());
                drop(state);
                info!("Created {} post {:?}", self.role, listing.id);
                self.notifier
                    .notify(Notice::success(format!("{} created!", self.role.schema().noun)));
                Ok(listing)
            }
            Err(err) => {
                drop(state);
                self.notifier.notify(Notice::error(&err));
                Err(err)
            }
        }
    }

    /// Update listing `id` and replace its entry with the backend's copy
    pub async fn update(
        &self,
        id: &str,
        payload: &SubmissionPayload,
    ) -> Result<Listing, ClientError> {
        let _guard = self.begin(PendingOp::Update(id.to_string()))?;

        let result = self.api.update(self.role, id, payload).await;

        let mut state = lock(&self.state);
        if !state.alive {
            debug!("Dropping {} update result for torn-down store", self.role);
            return result;
        }

        match result {
            Ok(listing) => {
                match state.listings.iter_mut().find(|l| l.has_id(id)) {
                    Some(entry) => *entry = listing.clone(),
                    None => warn!("Updated {} post {} is no longer in the list", self.role, id),
                }
                drop(state);
                self.notifier
                    .notify(Notice::success(format!("{} updated!", self.role.schema().noun)));
                Ok(listing)
            }
            Err(err) => {
                drop(state);
                self.notifier.notify(Notice::error(&err));
                Err(err)
            }
        }
    }

    /// First step of a delete: the caller must confirm or decline
    pub fn request_delete(&self, id: &str) -> DeleteRequest<'_> {
        let headline = self
            .get(id)
            .map(|listing| listing.headline(self.role.schema()))
            .unwrap_or_else(|| "this post".to_string());

        DeleteRequest {
            store: self,
            id: id.to_string(),
            prompt: format!("Are you sure you want to delete the post \"{headline}\"?"),
        }
    }

    async fn delete(&self, id: &str) -> Result<DeleteConfirmation, ClientError> {
        let _guard = self.begin(PendingOp::Delete(id.to_string()))?;

        let result = self.api.delete(self.role, id).await;

        let mut state = lock(&self.state);
        if !state.alive {
            debug!("Dropping {} delete result for torn-down store", self.role);
            return result;
        }

        match result {
            Ok(confirmation) => {
                state.listings.retain(|l| !l.has_id(&confirmation.id));
                drop(state);
                let message = confirmation
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} deleted!", self.role.schema().noun));
                self.notifier.notify(Notice::success(message));
                Ok(confirmation)
            }
            Err(err) => {
                drop(state);
                self.notifier.notify(Notice::error(&err));
                Err(err)
            }
        }
    }
}

/// Pending delete awaiting the user's yes/no
#[must_use = "a delete request does nothing until confirmed or declined"]
pub struct DeleteRequest<'a> {
    store: &'a ListingStore,
    id: String,
    prompt: String,
}

impl DeleteRequest<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Question to put to the user
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub async fn confirm(self) -> Result<DeleteConfirmation, ClientError> {
        self.store.delete(&self.id).await
    }

    pub fn decline(self) {
        debug!("Delete of {} post {} declined", self.store.role, self.id);
    }

    /// Confirm or decline from a plain yes/no answer
    pub async fn resolve(self, confirmed: bool) -> Result<Option<DeleteConfirmation>, ClientError> {
        if confirmed {
            self.confirm().await.map(Some)
        } else {
            self.decline();
            Ok(None)
        }
    }
}
