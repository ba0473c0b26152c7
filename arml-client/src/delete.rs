use arml_core::{Entity, EntityId};
use thiserror::Error;

use crate::{
    api::{ApiError, ApiResult},
    navigation::ArcNavigator,
    store::EntityStore,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteState {
    Loading,
    Loaded { error: Option<String> },
    Deleting,
    Deleted,
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("nothing to delete in state {0:?}")]
    NotPossible(DeleteState),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct DeleteFlow<E: Entity> {
    store: EntityStore<E>,
    navigator: ArcNavigator,
    id: EntityId,
    state: DeleteState,
    fetched: bool,
    ready: bool,
}

impl<E: Entity> DeleteFlow<E> {
    pub fn new(store: EntityStore<E>, navigator: ArcNavigator, id: EntityId) -> Self {
        Self {
            store,
            navigator,
            id,
            state: DeleteState::Loading,
            fetched: false,
            ready: false,
        }
    }

    pub async fn mount(&mut self) -> ApiResult<E> {
        self.state = DeleteState::Loading;
        self.ready = true;
        let result = self.store.get(self.id).await;
        self.fetched = result.is_ok();
        self.state = DeleteState::Loaded {
            error: result.as_ref().err().map(ToString::to_string),
        };
        result
    }

    pub fn state(&self) -> &DeleteState {
        &self.state
    }

    pub fn entity(&self) -> Option<E> {
        self.store.entity().filter(|entity| entity.id() == Some(self.id))
    }

    pub fn prompt(&self) -> String {
        format!("Are you sure you want to delete {} {}?", E::KIND, self.id)
    }

    pub async fn confirm(&mut self) -> Result<(), DeleteError> {
        // A failed delete leaves the prompt open for another attempt.
        if !self.fetched || !matches!(self.state, DeleteState::Loaded { .. }) {
            return Err(DeleteError::NotPossible(self.state.clone()));
        }
        self.state = DeleteState::Deleting;
        match self.store.delete(self.id).await {
            Ok(()) => {
                self.state = DeleteState::Deleted;
                if self.ready {
                    self.ready = false;
                    self.navigator.navigate(&E::KIND.list_path());
                }
                Ok(())
            }
            Err(e) => {
                self.state = DeleteState::Loaded {
                    error: Some(e.to_string()),
                };
                Err(e.into())
            }
        }
    }

    pub fn cancel(&mut self) {
        self.ready = false;
        self.navigator.navigate(&E::KIND.list_path());
    }
}
