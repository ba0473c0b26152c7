use arml_core::{
    Entity, EntityId, display_value,
    route::{Route, RouteAction},
};

use crate::{api::ApiResult, store::EntityStore};

pub struct DetailView<E: Entity> {
    store: EntityStore<E>,
    id: EntityId,
}

impl<E: Entity> DetailView<E> {
    pub fn new(store: EntityStore<E>, id: EntityId) -> Self {
        Self { store, id }
    }

    pub async fn mount(&self) -> ApiResult<E> {
        self.store.get(self.id).await
    }

    pub fn entity(&self) -> Option<E> {
        self.store.entity().filter(|entity| entity.id() == Some(self.id))
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let Some(entity) = self.entity() else {
            return Vec::new();
        };
        let value = entity.to_json().unwrap_or_default();
        let mut fields = vec![("ID", self.id.to_string())];
        fields.extend(
            E::descriptor()
                .fields
                .iter()
                .map(|field| (field.label, display_value(field, value.get(field.name)))),
        );
        fields
    }

    pub fn edit_path(&self) -> String {
        Route::new(E::KIND, RouteAction::Edit(self.id)).to_string()
    }

    pub fn back_path(&self) -> String {
        E::KIND.list_path()
    }
}
