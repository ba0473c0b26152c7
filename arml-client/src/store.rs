use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arml_core::{Entity, EntityId, sort::SortState};
use log::{info, warn};

use crate::api::{ApiResult, ArcEntityApi};

#[derive(Debug)]
pub struct StoreState<E> {
    pub entities: Vec<E>,
    pub entity: Option<E>,
    pub error: Option<String>,
    reads: usize,
    writes: usize,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            entity: None,
            error: None,
            reads: 0,
            writes: 0,
        }
    }
}

impl<E> StoreState<E> {
    pub fn loading(&self) -> bool {
        self.reads > 0
    }

    pub fn updating(&self) -> bool {
        self.writes > 0
    }
}

#[derive(Clone, Copy)]
enum Flag {
    Loading,
    Updating,
}

struct FlagGuard<'a, E: Entity> {
    store: &'a EntityStore<E>,
    flag: Flag,
}

impl<'a, E: Entity> FlagGuard<'a, E> {
    fn raise(store: &'a EntityStore<E>, flag: Flag) -> Self {
        let mut state = store.lock();
        match flag {
            Flag::Loading => state.reads += 1,
            Flag::Updating => state.writes += 1,
        }
        Self { store, flag }
    }
}

impl<E: Entity> Drop for FlagGuard<'_, E> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        match self.flag {
            Flag::Loading => state.reads = state.reads.saturating_sub(1),
            Flag::Updating => state.writes = state.writes.saturating_sub(1),
        }
    }
}

pub struct EntityStore<E: Entity> {
    api: ArcEntityApi<E>,
    state: Arc<Mutex<StoreState<E>>>,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(api: ArcEntityApi<E>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state<R>(&self, f: impl FnOnce(&StoreState<E>) -> R) -> R {
        f(&self.lock())
    }

    pub fn entities(&self) -> Vec<E> {
        self.lock().entities.clone()
    }

    pub fn entity(&self) -> Option<E> {
        self.lock().entity.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading()
    }

    pub fn is_updating(&self) -> bool {
        self.lock().updating()
    }

    fn record<T>(&self, action: &str, result: &ApiResult<T>) {
        let mut state = self.lock();
        match result {
            Ok(_) => state.error = None,
            Err(e) => {
                warn!("Failed to {} {}: {}", action, E::KIND, e);
                state.error = Some(e.to_string());
            }
        }
    }

    /// Replaces the collection with the backend's answer. A failed request
    /// keeps the previous collection.
    pub async fn list(&self, sort: Option<&SortState>) -> ApiResult<Vec<E>> {
        let _guard = FlagGuard::raise(self, Flag::Loading);
        let result = self.api.list(sort).await;
        self.record("list", &result);
        let entities = result?;
        self.lock().entities = entities.clone();
        Ok(entities)
    }

    pub async fn get(&self, id: EntityId) -> ApiResult<E> {
        let _guard = FlagGuard::raise(self, Flag::Loading);
        let result = self.api.get(id).await;
        self.record("get", &result);
        let entity = result?;
        self.lock().entity = Some(entity.clone());
        Ok(entity)
    }

    pub async fn create(&self, entity: &E) -> ApiResult<E> {
        let _guard = FlagGuard::raise(self, Flag::Updating);
        let result = self.api.create(entity).await;
        self.record("create", &result);
        let saved = result?;
        info!("Created {} {:?}", E::KIND, saved.id());
        self.lock().entity = Some(saved.clone());
        Ok(saved)
    }

    pub async fn update(&self, entity: &E) -> ApiResult<E> {
        let _guard = FlagGuard::raise(self, Flag::Updating);
        let result = self.api.update(entity).await;
        self.record("update", &result);
        let saved = result?;
        info!("Updated {} {:?}", E::KIND, saved.id());
        self.lock().entity = Some(saved.clone());
        Ok(saved)
    }

    pub async fn delete(&self, id: EntityId) -> ApiResult<()> {
        let _guard = FlagGuard::raise(self, Flag::Updating);
        let result = self.api.delete(id).await;
        self.record("delete", &result);
        result?;
        info!("Deleted {} {}", E::KIND, id);
        let mut state = self.lock();
        if state.entity.as_ref().and_then(|e| e.id()) == Some(id) {
            state.entity = None;
        }
        Ok(())
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.entity = None;
        state.error = None;
    }
}

#[cfg(test)]
mod tests {
    use arml_core::{League, Player, sort::SortOrder};

    use super::*;
    use crate::{api::ApiError, mock::MockBackend};

    fn player(player_id: i64, first_name: &str, last_name: &str) -> Player {
        Player {
            id: None,
            player_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            tenhou_name: None,
            league: League::A1,
            games: Some(vec![]),
        }
    }

    fn store(backend: &MockBackend) -> EntityStore<Player> {
        EntityStore::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_get_fills_entity_slot_with_requested_id() {
        let backend = MockBackend::new();
        backend.insert(player(1, "Ann", "Lee"));
        let stored = backend.insert(player(2, "Bo", "Kim"));
        let store = store(&backend);

        let id = stored.id.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.id, Some(id));
        assert_eq!(store.entity().and_then(|p| p.id), Some(id));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_get_unknown_id_fails_with_not_found() {
        let backend = MockBackend::new();
        let store = store(&backend);
        assert!(matches!(store.get(12).await, Err(ApiError::NotFound(..))));
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let backend = MockBackend::new();
        backend.insert(player(1, "Cy", "Lee"));
        backend.insert(player(2, "Ann", "Kim"));
        backend.insert(player(3, "Bo", "Lee"));
        let store = store(&backend);

        let sort = SortState::new("firstName", SortOrder::Descending);
        let first = store.list(Some(&sort)).await.unwrap();
        let second = store.list(Some(&sort)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.entities(), second);
        assert_eq!(first[0].first_name, "Cy");
    }

    #[tokio::test]
    async fn test_failed_list_keeps_previous_collection() {
        let backend = MockBackend::new();
        backend.insert(player(1, "Ann", "Lee"));
        let store = store(&backend);
        store.list(None).await.unwrap();

        backend.fail_next(Player::KIND, 503);
        let result = store.list(None).await;
        assert!(matches!(result, Err(ApiError::Server { status: 503, .. })));
        assert_eq!(store.entities().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let backend = MockBackend::new();
        let store = store(&backend);
        let mut submitted = player(42, "Ann", "Lee");
        submitted.tenhou_name = Some("annlee".to_string());

        let saved = store.create(&submitted).await.unwrap();
        let fetched = store.get(saved.id.unwrap()).await.unwrap();
        assert_eq!(Player { id: None, ..fetched }, submitted);
        assert!(!store.is_updating());
    }

    #[tokio::test]
    async fn test_flags_are_raised_while_in_flight() {
        let backend = MockBackend::new();
        let gate = backend.hold_responses();
        let store = store(&backend);

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.create(&player(1, "Ann", "Lee")).await }
        });
        tokio::task::yield_now().await;
        while !store.is_updating() {
            tokio::task::yield_now().await;
        }
        assert!(!store.is_loading());

        gate.add_permits(1);
        pending.await.unwrap().unwrap();
        assert!(!store.is_updating());
    }

    #[tokio::test]
    async fn test_delete_clears_matching_entity_slot() {
        let backend = MockBackend::new();
        let stored = backend.insert(player(1, "Ann", "Lee"));
        let store = store(&backend);
        let id = stored.id.unwrap();
        store.get(id).await.unwrap();

        store.delete(id).await.unwrap();
        assert!(store.entity().is_none());
        assert!(matches!(store.get(id).await, Err(ApiError::NotFound(..))));
    }

    #[tokio::test]
    async fn test_reset_clears_entity_and_error() {
        let backend = MockBackend::new();
        let stored = backend.insert(player(1, "Ann", "Lee"));
        let store = store(&backend);
        store.get(stored.id.unwrap()).await.unwrap();
        let _ = store.get(99).await;

        store.reset();
        assert!(store.entity().is_none());
        assert!(store.error().is_none());
    }
}
