use std::collections::{BTreeSet, HashMap};

use arml_core::{
    Cardinality, Entity, EntityId, EntityKind,
    form::{self, FormErrors, FormValues},
    reference_id,
};
use futures_util::future::{join, join_all};
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::{
    api::{ApiError, ApiResult},
    navigation::ArcNavigator,
    relation::RelationSources,
    store::EntityStore,
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] FormErrors),

    #[error("related records not loaded yet: {}", .0.join(", "))]
    RelationsPending(Vec<&'static str>),

    #[error("the record being edited has not been loaded")]
    NotLoaded,

    #[error("a save is already in progress")]
    InFlight,

    #[error("form does not describe a valid record")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct UpdateView<E: Entity> {
    store: EntityStore<E>,
    relations: RelationSources,
    navigator: ArcNavigator,
    id: Option<EntityId>,
    form: FormValues,
    base: Option<Value>,
    synced: Option<Value>,
    collections: HashMap<EntityKind, Vec<Value>>,
    mounted: bool,
}

impl<E: Entity> UpdateView<E> {
    pub fn new(
        store: EntityStore<E>,
        relations: RelationSources,
        navigator: ArcNavigator,
        id: Option<EntityId>,
    ) -> Self {
        Self {
            store,
            relations,
            navigator,
            id,
            form: FormValues::defaults(E::descriptor()),
            base: None,
            synced: None,
            collections: HashMap::new(),
            mounted: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    fn targets(&self) -> BTreeSet<EntityKind> {
        E::descriptor()
            .relations()
            .map(|(_, relation)| relation.target)
            .collect()
    }

    pub async fn mount(&mut self) -> ApiResult<()> {
        self.mounted = false;
        let targets = self.targets();
        let loads = targets.iter().filter_map(|kind| {
            self.relations
                .get(*kind)
                .map(|source| async move { (*kind, source.load_all().await) })
        });
        let entity = async {
            match self.id {
                Some(id) => self.store.get(id).await.map(Some),
                None => {
                    self.store.reset();
                    Ok(None)
                }
            }
        };
        let (entity, loaded) = join(entity, join_all(loads)).await;

        let mut relation_error = None;
        for (kind, result) in loaded {
            match result {
                Ok(values) => {
                    self.collections.insert(kind, values);
                }
                Err(e) => {
                    warn!("Failed to load {} options: {}", kind, e);
                    relation_error.get_or_insert(e);
                }
            }
        }

        match entity? {
            Some(entity) => {
                let value = entity.to_json()?;
                self.form = FormValues::from_entity(E::descriptor(), &value);
                self.synced = Some(value.clone());
                self.base = Some(value);
            }
            None => {
                self.form = FormValues::defaults(E::descriptor());
                self.base = None;
                self.synced = None;
            }
        }
        self.mounted = true;
        match relation_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn form(&self) -> &FormValues {
        &self.form
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.form.set(field, value);
    }

    /// Dropdown entries of a relation field, or `None` while its collection
    /// is not loaded.
    pub fn options(&self, field: &str) -> Option<Vec<(EntityId, String)>> {
        let relation = E::descriptor().field(field)?.relation()?;
        let target = relation.target.descriptor();
        let values = self.collections.get(&relation.target)?;
        Some(
            values
                .iter()
                .filter_map(|value| reference_id(value).map(|id| (id, target.option_text(value))))
                .collect(),
        )
    }

    pub fn pending_relations(&self) -> Vec<&'static str> {
        E::descriptor()
            .relations()
            .filter(|(_, relation)| !self.collections.contains_key(&relation.target))
            .map(|(field, _)| field.name)
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
            || self
                .targets()
                .into_iter()
                .filter_map(|kind| self.relations.get(kind))
                .any(|source| source.is_loading())
    }

    pub fn can_submit(&self) -> bool {
        self.mounted && !self.store.is_updating() && self.pending_relations().is_empty()
    }

    fn lookup(&self, kind: EntityKind, id: EntityId) -> Option<Value> {
        self.collections
            .get(&kind)?
            .iter()
            .find(|value| reference_id(value) == Some(id))
            .cloned()
    }

    pub async fn submit(&mut self) -> Result<E, SubmitError> {
        if self.store.is_updating() {
            return Err(SubmitError::InFlight);
        }
        let pending = self.pending_relations();
        if !pending.is_empty() {
            return Err(SubmitError::RelationsPending(pending));
        }
        if !self.mounted {
            return Err(SubmitError::NotLoaded);
        }

        let value = form::assemble(E::descriptor(), self.base.as_ref(), &self.form, |kind, id| {
            self.lookup(kind, id)
        })?;
        let entity = E::from_json(value)?;
        let saved = match self.id {
            Some(_) => self.store.update(&entity).await?,
            None => self.store.create(&entity).await?,
        };
        let saved_value = saved.to_json()?;
        // From here on a retry updates the stored record instead of creating another.
        self.id = saved.id().or(self.id);
        self.base = Some(saved_value.clone());
        self.sync_inverse_sides(&saved_value).await?;

        self.synced = Some(saved_value);
        self.navigator.navigate(&E::KIND.list_path());
        Ok(saved)
    }

    /// Writes a changed many-relation through its owner side: every added or
    /// removed related record gets its back reference updated.
    async fn sync_inverse_sides(&mut self, saved: &Value) -> ApiResult<()> {
        let Some(id) = reference_id(saved) else {
            return Ok(());
        };
        for (field, relation) in E::descriptor().relations() {
            let Some(inverse) = relation.inverse else {
                continue;
            };
            if relation.owner || relation.cardinality != Cardinality::Many {
                continue;
            }
            let Some(source) = self.relations.get(relation.target).cloned() else {
                continue;
            };
            let before =
                related_ids(self.synced.as_ref().and_then(|synced| synced.get(field.name)));
            let after = related_ids(saved.get(field.name));

            let mut back_reference = saved.clone();
            if let Some(map) = back_reference.as_object_mut() {
                map.remove(field.name);
            }

            for target_id in before.symmetric_difference(&after) {
                let Some(mut target) = self.lookup(relation.target, *target_id) else {
                    warn!("{} {} is not loaded, skipping {}", relation.target, target_id, inverse);
                    continue;
                };
                let mut references: Vec<Value> = target
                    .get(inverse)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                references.retain(|reference| reference_id(reference) != Some(id));
                if after.contains(target_id) {
                    references.push(back_reference.clone());
                }
                target[inverse] = Value::Array(references);

                let stored = source.save(target).await?;
                info!("Synced {} of {} {}", inverse, relation.target, target_id);
                if let Some(values) = self.collections.get_mut(&relation.target) {
                    for value in values.iter_mut() {
                        if reference_id(value) == Some(*target_id) {
                            *value = stored.clone();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.navigator.navigate(&E::KIND.list_path());
    }
}

fn related_ids(value: Option<&Value>) -> BTreeSet<EntityId> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(reference_id).collect())
        .unwrap_or_default()
}
