use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use arml_core::{
    Cardinality, Entity, EntityId, EntityKind,
    reference_id,
    sort::{SortOrder, SortState},
};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::api::{ApiError, ApiResult, EntityApi};

/// In-memory backend following the REST contract of the real one: ids are
/// assigned on create, unknown ids are rejected, lists honour `sort`, and a
/// delete clears references to the removed record.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

#[derive(Default)]
struct MockState {
    tables: HashMap<EntityKind, BTreeMap<EntityId, Value>>,
    next_id: EntityId,
    failures: HashMap<EntityKind, u16>,
    requests: Vec<String>,
}

#[allow(unused)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert<E: Entity>(&self, entity: E) -> E {
        let mut value = entity.to_json().unwrap_or(Value::Null);
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        value["id"] = Value::from(id);
        state
            .tables
            .entry(E::KIND)
            .or_default()
            .insert(id, value.clone());
        E::from_json(value).unwrap_or(entity)
    }

    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.lock()
            .tables
            .get(&kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row(&self, kind: EntityKind, id: EntityId) -> Option<Value> {
        self.lock()
            .tables
            .get(&kind)
            .and_then(|table| table.get(&id).cloned())
    }

    /// The next request for `kind` fails with `status`.
    pub fn fail_next(&self, kind: EntityKind, status: u16) {
        self.lock().failures.insert(kind, status);
    }

    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn hold_responses(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(semaphore.clone());
        semaphore
    }

    async fn begin(&self, kind: EntityKind, request: String) -> ApiResult<()> {
        let gate = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let mut state = self.lock();
        state.requests.push(request);
        match state.failures.remove(&kind) {
            Some(404) => Err(ApiError::NotFound("injected".to_string())),
            Some(400) => Err(ApiError::BadRequest("injected".to_string())),
            Some(status) => Err(ApiError::Server {
                status,
                message: "injected".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn clear_references(state: &mut MockState, kind: EntityKind, id: EntityId) {
        for (owner, table) in state.tables.iter_mut() {
            for (field, relation) in owner.descriptor().relations() {
                if relation.target != kind {
                    continue;
                }
                for row in table.values_mut() {
                    let Some(value) = row.get_mut(field.name) else {
                        continue;
                    };
                    match relation.cardinality {
                        Cardinality::One => {
                            if reference_id(value) == Some(id) {
                                *value = Value::Null;
                            }
                        }
                        Cardinality::Many => {
                            if let Some(items) = value.as_array_mut() {
                                items.retain(|item| reference_id(item) != Some(id));
                            }
                        }
                    }
                }
            }
        }
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait::async_trait]
impl<E: Entity> EntityApi<E> for MockBackend {
    async fn list(&self, sort: Option<&SortState>) -> ApiResult<Vec<E>> {
        let request = match sort {
            Some(sort) => format!("GET {}?sort={}", E::KIND.endpoint(), sort.param()),
            None => format!("GET {}", E::KIND.endpoint()),
        };
        self.begin(E::KIND, request).await?;
        let mut rows = self.rows(E::KIND);
        if let Some(sort) = sort {
            rows.sort_by(|a, b| {
                let ordering = compare_field(a, b, &sort.field);
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        rows.into_iter()
            .map(|row| E::from_json(row).map_err(ApiError::from))
            .collect()
    }

    async fn get(&self, id: EntityId) -> ApiResult<E> {
        self.begin(E::KIND, format!("GET {}/{}", E::KIND.endpoint(), id))
            .await?;
        let row = self
            .row(E::KIND, id)
            .ok_or_else(|| ApiError::NotFound(format!("{} {}", E::KIND, id)))?;
        Ok(E::from_json(row)?)
    }

    async fn create(&self, entity: &E) -> ApiResult<E> {
        self.begin(E::KIND, format!("POST {}", E::KIND.endpoint()))
            .await?;
        if entity.id().is_some() {
            return Err(ApiError::BadRequest(format!(
                "A new {} cannot already have an ID",
                E::KIND
            )));
        }
        Ok(self.insert(entity.clone()))
    }

    async fn update(&self, entity: &E) -> ApiResult<E> {
        let Some(id) = entity.id() else {
            return Err(ApiError::BadRequest("Invalid id".to_string()));
        };
        self.begin(E::KIND, format!("PUT {}/{}", E::KIND.endpoint(), id))
            .await?;
        let value = entity.to_json()?;
        let mut state = self.lock();
        let table = state.tables.entry(E::KIND).or_default();
        if !table.contains_key(&id) {
            return Err(ApiError::BadRequest("Entity not found".to_string()));
        }
        table.insert(id, value.clone());
        drop(state);
        Ok(E::from_json(value)?)
    }

    async fn delete(&self, id: EntityId) -> ApiResult<()> {
        self.begin(E::KIND, format!("DELETE {}/{}", E::KIND.endpoint(), id))
            .await?;
        let mut state = self.lock();
        if let Some(table) = state.tables.get_mut(&E::KIND) {
            table.remove(&id);
        }
        MockBackend::clear_references(&mut state, E::KIND, id);
        Ok(())
    }
}
