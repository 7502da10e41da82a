//! The multi-resource dashboard loader.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::resource::{Resource, ResourceFetch, ResourceLoadError, SlotState};

/// Loads the dashboard's named resources in parallel and tracks each one's
/// state independently.
///
/// One failing resource never blanks the rest of the dashboard: each slot
/// settles on its own, keeping any previously loaded data when a re-fetch
/// fails. The loader is cheap to clone (clones share state) and all of its
/// methods take `&self`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use voltbank::{ApiGateway, ApiUrl, DashboardLoader, Resource, TokenStore};
///
/// # async fn example() -> Result<(), voltbank::Error> {
/// let base = ApiUrl::new("https://api.voltbank.example")?;
/// let gateway = ApiGateway::new(base, TokenStore::new());
/// let loader = DashboardLoader::new(Arc::new(gateway));
///
/// loader.load_all().await;
/// loader.refetch(Resource::Stations).await;
///
/// let snapshot = loader.snapshot();
/// println!("loading: {}", snapshot.loading);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DashboardLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    fetcher: Arc<dyn ResourceFetch>,
    slots: Mutex<BTreeMap<Resource, Slot>>,
    // Fetches currently in the air, across load_all and refetch.
    outstanding: AtomicUsize,
    // First error message seen since the last load_all.
    first_error: Mutex<Option<String>>,
}

#[derive(Default)]
struct Slot {
    state: SlotStateInner,
    data: Option<serde_json::Value>,
    error: Option<ResourceLoadError>,
    // Bumped each time a fetch begins; a settled fetch only writes back
    // if its generation is still current, so a superseded or abandoned
    // fetch never clobbers a newer one.
    generation: u64,
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum SlotStateInner {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

impl From<SlotStateInner> for SlotState {
    fn from(state: SlotStateInner) -> Self {
        match state {
            SlotStateInner::Idle => SlotState::Idle,
            SlotStateInner::Loading => SlotState::Loading,
            SlotStateInner::Loaded => SlotState::Loaded,
            SlotStateInner::Errored => SlotState::Errored,
        }
    }
}

/// Point-in-time view of one resource slot.
#[derive(Clone, Debug, Serialize)]
pub struct SlotSnapshot {
    pub resource: Resource,
    pub state: SlotState,
    pub data: Option<serde_json::Value>,
    pub error: Option<ResourceLoadError>,
}

/// Point-in-time view of the whole dashboard.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardSnapshot {
    pub slots: Vec<SlotSnapshot>,
    /// True while any fetch is outstanding.
    pub loading: bool,
    /// The first error message seen since the last `load_all`.
    pub error: Option<String>,
}

impl DashboardLoader {
    /// Create a loader over the given fetcher with every slot `Idle`.
    pub fn new(fetcher: Arc<dyn ResourceFetch>) -> Self {
        let slots = Resource::ALL
            .into_iter()
            .map(|resource| (resource, Slot::default()))
            .collect();

        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                slots: Mutex::new(slots),
                outstanding: AtomicUsize::new(0),
                first_error: Mutex::new(None),
            }),
        }
    }

    /// Load every resource concurrently.
    ///
    /// Each slot moves to `Loading`, then settles to `Loaded` or `Errored`
    /// on its own as its fetch completes; a failing resource never blocks or
    /// clears its siblings. Returns once all fetches have settled; inspect
    /// [`snapshot`](Self::snapshot) for the per-slot outcomes.
    #[instrument(skip(self))]
    pub async fn load_all(&self) {
        debug!("loading all dashboard resources");
        *self.inner.lock_first_error() = None;

        let fetches = Resource::ALL.map(|resource| self.run_fetch(resource));
        join_all(fetches).await;
    }

    /// Re-fetch a single resource, leaving the other slots untouched.
    ///
    /// Callable at any time, including while other fetches from
    /// [`load_all`](Self::load_all) are still outstanding.
    #[instrument(skip(self), fields(%resource))]
    pub async fn refetch(&self, resource: Resource) {
        debug!("refetching resource");
        self.run_fetch(resource).await;
    }

    /// Returns true while any fetch is outstanding.
    pub fn loading(&self) -> bool {
        self.inner.outstanding.load(Ordering::SeqCst) > 0
    }

    /// The first error message seen since the last `load_all`, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.lock_first_error().clone()
    }

    /// Point-in-time view of one slot.
    pub fn slot(&self, resource: Resource) -> SlotSnapshot {
        let slots = self.inner.lock_slots();
        snapshot_slot(resource, &slots[&resource])
    }

    /// Point-in-time view of the whole dashboard.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let slots = self.inner.lock_slots();
        DashboardSnapshot {
            slots: Resource::ALL
                .iter()
                .map(|&resource| snapshot_slot(resource, &slots[&resource]))
                .collect(),
            loading: self.loading(),
            error: self.error(),
        }
    }

    async fn run_fetch(&self, resource: Resource) {
        let generation = self.inner.begin(resource);
        let result = self.inner.fetcher.fetch_resource(resource).await;
        self.inner.settle(resource, generation, result);
    }
}

impl LoaderInner {
    /// Move a slot to `Loading` and stamp a new generation.
    fn begin(&self, resource: Resource) -> u64 {
        self.outstanding.fetch_add(1, Ordering::SeqCst);

        let mut slots = self.lock_slots();
        let slot = slots.get_mut(&resource).expect("slot table is fixed");
        slot.generation += 1;
        slot.state = SlotStateInner::Loading;
        slot.error = None;
        slot.generation
    }

    /// Settle a fetch: write the outcome back unless a newer fetch for the
    /// same slot has begun since.
    fn settle(
        &self,
        resource: Resource,
        generation: u64,
        result: Result<serde_json::Value, crate::error::Error>,
    ) {
        {
            let mut slots = self.lock_slots();
            let slot = slots.get_mut(&resource).expect("slot table is fixed");

            if slot.generation != generation {
                debug!(%resource, "discarding superseded fetch result");
            } else {
                match result {
                    Ok(data) => {
                        slot.state = SlotStateInner::Loaded;
                        slot.data = Some(data);
                        slot.error = None;
                    }
                    Err(err) => {
                        warn!(%resource, error = %err, "resource load failed");
                        slot.state = SlotStateInner::Errored;
                        // Prior data, if any, stays in place.
                        let load_error = ResourceLoadError::new(resource, err.to_string());
                        let mut first_error = self.lock_first_error();
                        if first_error.is_none() {
                            *first_error = Some(load_error.to_string());
                        }
                        slot.error = Some(load_error);
                    }
                }
            }
        }

        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    fn lock_slots(&self) -> MutexGuard<'_, BTreeMap<Resource, Slot>> {
        self.slots.lock().expect("slot table lock poisoned")
    }

    fn lock_first_error(&self) -> MutexGuard<'_, Option<String>> {
        self.first_error.lock().expect("first error lock poisoned")
    }
}

fn snapshot_slot(resource: Resource, slot: &Slot) -> SlotSnapshot {
    SlotSnapshot {
        resource,
        state: slot.state.into(),
        data: slot.data.clone(),
        error: slot.error.clone(),
    }
}

impl std::fmt::Debug for DashboardLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardLoader")
            .field("loading", &self.loading())
            .field("error", &self.error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::error::{Error, UpstreamError};

    use super::*;

    /// Fetcher scripted per resource: a fixed outcome, an optional gate that
    /// holds the fetch open, and a call counter.
    #[derive(Default)]
    struct ScriptedFetch {
        outcomes: HashMap<Resource, fn(u64) -> Result<serde_json::Value, Error>>,
        gates: HashMap<Resource, Arc<Notify>>,
        calls: Mutex<HashMap<Resource, u64>>,
        total_calls: AtomicUsize,
    }

    impl ScriptedFetch {
        fn succeed_all() -> Self {
            let mut fetch = Self::default();
            for resource in Resource::ALL {
                fetch.outcomes.insert(resource, |n| Ok(json!({ "call": n })));
            }
            fetch
        }

        fn fail(mut self, resource: Resource) -> Self {
            self.outcomes
                .insert(resource, |_| Err(UpstreamError::new(500, "boom").into()));
            self
        }

        fn gate(mut self, resource: Resource, gate: Arc<Notify>) -> Self {
            self.gates.insert(resource, gate);
            self
        }

        fn calls_for(&self, resource: Resource) -> u64 {
            self.calls.lock().unwrap().get(&resource).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ResourceFetch for ScriptedFetch {
        async fn fetch_resource(&self, resource: Resource) -> Result<serde_json::Value, Error> {
            self.total_calls.fetch_add(1, Ordering::SeqCst);
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let entry = calls.entry(resource).or_insert(0);
                *entry += 1;
                *entry
            };
            if let Some(gate) = self.gates.get(&resource) {
                gate.notified().await;
            }
            (self.outcomes[&resource])(call)
        }
    }

    #[tokio::test]
    async fn load_all_settles_every_slot() {
        let fetch = Arc::new(ScriptedFetch::succeed_all());
        let loader = DashboardLoader::new(fetch.clone());

        loader.load_all().await;

        for resource in Resource::ALL {
            let slot = loader.slot(resource);
            assert_eq!(slot.state, SlotState::Loaded);
            assert!(slot.data.is_some());
            assert!(slot.error.is_none());
        }
        assert!(!loader.loading());
        assert!(loader.error().is_none());
        assert_eq!(fetch.total_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn one_failing_resource_does_not_disturb_siblings() {
        let fetch = Arc::new(ScriptedFetch::succeed_all().fail(Resource::Stations));
        let loader = DashboardLoader::new(fetch);

        loader.load_all().await;

        for resource in Resource::ALL {
            let slot = loader.slot(resource);
            if resource == Resource::Stations {
                assert_eq!(slot.state, SlotState::Errored);
                assert!(slot.error.is_some());
            } else {
                assert_eq!(slot.state, SlotState::Loaded);
                assert!(slot.error.is_none());
            }
        }
        assert!(!loader.loading());
        let error = loader.error().unwrap();
        assert!(error.contains("stations"));
    }

    #[tokio::test]
    async fn errored_slot_keeps_previously_loaded_data() {
        // Packages succeeds on the first call and fails on the second.
        let flip = Arc::new({
            let mut fetch = ScriptedFetch::succeed_all();
            fetch.outcomes.insert(Resource::Packages, |call| {
                if call == 1 {
                    Ok(json!({ "call": 1 }))
                } else {
                    Err(UpstreamError::new(500, "boom").into())
                }
            });
            fetch
        });
        let loader = DashboardLoader::new(flip);

        loader.load_all().await;
        let first = loader.slot(Resource::Packages).data.clone().unwrap();

        loader.refetch(Resource::Packages).await;
        let slot = loader.slot(Resource::Packages);
        assert_eq!(slot.state, SlotState::Errored);
        assert_eq!(slot.data.as_ref(), Some(&first));
        assert!(slot.error.unwrap().message.contains("boom"));
    }

    #[tokio::test]
    async fn refetch_while_sibling_is_still_loading() {
        let users_gate = Arc::new(Notify::new());
        let fetch = Arc::new(
            ScriptedFetch::succeed_all().gate(Resource::Users, users_gate.clone()),
        );
        let loader = DashboardLoader::new(fetch.clone());

        let load_all = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load_all().await })
        };
        tokio::task::yield_now().await;

        // "users" is held open; everything else has settled.
        assert!(loader.loading());
        assert_eq!(loader.slot(Resource::Users).state, SlotState::Loading);
        assert_eq!(loader.slot(Resource::Stations).state, SlotState::Loaded);

        loader.refetch(Resource::Stations).await;
        assert_eq!(loader.slot(Resource::Stations).state, SlotState::Loaded);
        assert_eq!(fetch.calls_for(Resource::Stations), 2);

        // The held sibling was not disturbed and still resolves normally.
        assert_eq!(loader.slot(Resource::Users).state, SlotState::Loading);
        users_gate.notify_one();
        load_all.await.unwrap();

        assert_eq!(loader.slot(Resource::Users).state, SlotState::Loaded);
        assert!(!loader.loading());
    }

    #[tokio::test]
    async fn superseded_fetch_never_writes_back() {
        let gate = Arc::new(Notify::new());
        let fetch = Arc::new(
            ScriptedFetch::succeed_all().gate(Resource::Stations, gate.clone()),
        );
        let loader = DashboardLoader::new(fetch);

        // First fetch is held open at the gate.
        let held = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.refetch(Resource::Stations).await })
        };
        tokio::task::yield_now().await;

        // Second fetch begins, superseding the first, then both release.
        let second = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.refetch(Resource::Stations).await })
        };
        tokio::task::yield_now().await;

        gate.notify_waiters();
        second.await.unwrap();
        held.await.unwrap();

        // The slot keeps the second fetch's payload; the first was discarded.
        let slot = loader.slot(Resource::Stations);
        assert_eq!(slot.state, SlotState::Loaded);
        assert_eq!(slot.data.unwrap(), json!({ "call": 2 }));
        assert!(!loader.loading());
    }

    #[tokio::test]
    async fn error_is_cleared_by_the_next_load_all() {
        let flip = Arc::new({
            let mut fetch = ScriptedFetch::succeed_all();
            fetch.outcomes.insert(Resource::Users, |call| {
                if call == 1 {
                    Err(UpstreamError::new(500, "boom").into())
                } else {
                    Ok(json!({ "call": call }))
                }
            });
            fetch
        });
        let loader = DashboardLoader::new(flip);

        loader.load_all().await;
        assert!(loader.error().is_some());

        loader.load_all().await;
        assert!(loader.error().is_none());
        assert_eq!(loader.slot(Resource::Users).state, SlotState::Loaded);
    }
}
