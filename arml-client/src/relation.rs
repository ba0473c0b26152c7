use std::{collections::HashMap, sync::Arc};

use arml_core::{Entity, EntityKind};
use serde_json::Value;

use crate::{api::ApiResult, store::EntityStore};

pub type ArcRelationSource = Arc<dyn RelationSource + Send + Sync + 'static>;

/// A related collection seen through JSON, so that a form can populate its
/// dropdowns and keep both sides of an association in step without knowing
/// the concrete record type.
#[async_trait::async_trait]
pub trait RelationSource {
    fn kind(&self) -> EntityKind;
    fn is_loading(&self) -> bool;
    async fn load_all(&self) -> ApiResult<Vec<Value>>;
    async fn save(&self, value: Value) -> ApiResult<Value>;
}

#[async_trait::async_trait]
impl<E: Entity> RelationSource for EntityStore<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    fn is_loading(&self) -> bool {
        EntityStore::is_loading(self)
    }

    async fn load_all(&self) -> ApiResult<Vec<Value>> {
        let entities = self.list(None).await?;
        Ok(entities
            .iter()
            .map(|entity| entity.to_json())
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn save(&self, value: Value) -> ApiResult<Value> {
        let entity = E::from_json(value)?;
        let saved = self.update(&entity).await?;
        Ok(saved.to_json()?)
    }
}

#[derive(Clone, Default)]
pub struct RelationSources {
    sources: HashMap<EntityKind, ArcRelationSource>,
}

impl RelationSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: ArcRelationSource) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    pub fn get(&self, kind: EntityKind) -> Option<&ArcRelationSource> {
        self.sources.get(&kind)
    }
}
