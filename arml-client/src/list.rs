use arml_core::{
    Entity, EntityId, display_value,
    route::{Route, RouteAction},
    sort::{DEFAULT_SORT_FIELD, SortIndicator, SortState},
};
use log::warn;
use serde_json::Value;

use crate::{api::ApiResult, navigation::ArcNavigator, store::EntityStore};

/// A table column. `indicator` is `None` for columns that cannot be sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub label: &'static str,
    pub indicator: Option<SortIndicator>,
}

pub struct ListView<E: Entity> {
    store: EntityStore<E>,
    navigator: ArcNavigator,
    sort: SortState,
}

impl<E: Entity> ListView<E> {
    pub fn new(store: EntityStore<E>, navigator: ArcNavigator) -> Self {
        let sort = SortState::from_query(&navigator.location().query, DEFAULT_SORT_FIELD);
        Self {
            store,
            navigator,
            sort,
        }
    }

    pub async fn mount(&mut self) -> ApiResult<()> {
        self.sort_entities().await
    }

    pub async fn sort_by(&mut self, field: &str) -> ApiResult<()> {
        if !E::descriptor().is_sortable(field) {
            warn!("Column {} of {} is not sortable", field, E::KIND);
            return Ok(());
        }
        self.sort = self.sort.toggle(field);
        self.sort_entities().await
    }

    pub async fn refresh(&mut self) -> ApiResult<()> {
        self.sort_entities().await
    }

    async fn sort_entities(&self) -> ApiResult<()> {
        let location = self.navigator.location();
        let query = self.sort.to_query();
        if location.query != query {
            self.navigator
                .navigate(&format!("{}{}", location.path, query));
        }
        self.store.list(Some(&self.sort)).await?;
        Ok(())
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn entities(&self) -> Vec<E> {
        self.store.entities()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// The empty-state notice never shows while a request is in flight.
    pub fn show_not_found(&self) -> bool {
        self.store
            .state(|state| state.entities.is_empty() && !state.loading())
    }

    pub fn sort_indicator(&self, field: &str) -> SortIndicator {
        self.sort.indicator(field)
    }

    pub fn columns(&self) -> Vec<Column> {
        let id = Column {
            name: "id",
            label: "ID",
            indicator: Some(self.sort.indicator("id")),
        };
        let fields = E::descriptor().fields.iter().map(|field| Column {
            name: field.name,
            label: field.label,
            indicator: field.sortable.then(|| self.sort.indicator(field.name)),
        });
        std::iter::once(id).chain(fields).collect()
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        let descriptor = E::descriptor();
        self.store.state(|state| {
            state
                .entities
                .iter()
                .map(|entity| {
                    let value = entity.to_json().unwrap_or(Value::Null);
                    let id = entity.id().map(|id| id.to_string()).unwrap_or_default();
                    std::iter::once(id)
                        .chain(
                            descriptor
                                .fields
                                .iter()
                                .map(|field| display_value(field, value.get(field.name))),
                        )
                        .collect()
                })
                .collect()
        })
    }

    pub fn new_path(&self) -> String {
        Route::new(E::KIND, RouteAction::New).to_string()
    }

    pub fn detail_path(&self, id: EntityId) -> String {
        Route::new(E::KIND, RouteAction::Detail(id)).to_string()
    }

    pub fn edit_path(&self, id: EntityId) -> String {
        Route::new(E::KIND, RouteAction::Edit(id)).to_string()
    }

    pub fn delete_path(&self, id: EntityId) -> String {
        Route::new(E::KIND, RouteAction::Delete(id)).to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arml_core::{Game, League, Player, sort::SortOrder};

    use super::*;
    use crate::{
        mock::MockBackend,
        navigation::{HistoryNavigator, Navigator},
    };

    fn player(player_id: i64, last_name: &str) -> Player {
        Player {
            id: None,
            player_id,
            first_name: "Ann".to_string(),
            last_name: last_name.to_string(),
            tenhou_name: None,
            league: League::B2,
            games: Some(vec![]),
        }
    }

    fn view<E: Entity>(
        backend: &MockBackend,
        url: &str,
    ) -> (ListView<E>, Arc<HistoryNavigator>)
    where
        MockBackend: crate::api::EntityApi<E>,
    {
        let navigator = Arc::new(HistoryNavigator::new(url));
        let store = EntityStore::new(Arc::new(backend.clone()));
        (ListView::new(store, navigator.clone()), navigator)
    }

    #[tokio::test]
    async fn test_mount_uses_query_sort() {
        let backend = MockBackend::new();
        backend.insert(player(1, "Abe"));
        backend.insert(player(2, "Cho"));
        let (mut view, navigator) = view::<Player>(&backend, "/arml-player?sort=lastName,desc");

        view.mount().await.unwrap();
        assert_eq!(view.sort(), &SortState::new("lastName", SortOrder::Descending));
        let names: Vec<String> = view.entities().into_iter().map(|p| p.last_name).collect();
        assert_eq!(names, vec!["Cho", "Abe"]);
        assert_eq!(navigator.history().len(), 1);
    }

    #[tokio::test]
    async fn test_mount_without_query_defaults_and_syncs_location() {
        let backend = MockBackend::new();
        let (mut view, navigator) = view::<Player>(&backend, "/arml-player");

        view.mount().await.unwrap();
        assert_eq!(view.sort(), &SortState::default());
        assert_eq!(navigator.location().to_string(), "/arml-player?sort=id,asc");

        view.refresh().await.unwrap();
        assert_eq!(navigator.history().len(), 2);
    }

    #[tokio::test]
    async fn test_sort_by_toggles_and_resets() {
        let backend = MockBackend::new();
        let (mut view, navigator) = view::<Game>(&backend, "/arml-game");
        view.mount().await.unwrap();

        view.sort_by("gameID").await.unwrap();
        assert_eq!(view.sort(), &SortState::new("gameID", SortOrder::Ascending));
        view.sort_by("gameID").await.unwrap();
        assert_eq!(view.sort(), &SortState::new("gameID", SortOrder::Descending));
        assert_eq!(view.sort_indicator("gameID"), SortIndicator::Descending);
        assert_eq!(view.sort_indicator("id"), SortIndicator::Unsorted);

        view.sort_by("id").await.unwrap();
        assert_eq!(view.sort(), &SortState::new("id", SortOrder::Ascending));
        assert_eq!(navigator.location().query, "?sort=id,asc");
        assert_eq!(
            backend.requests().last().map(String::as_str),
            Some("GET api/arml-games?sort=id,asc")
        );
    }

    #[tokio::test]
    async fn test_sort_by_unsortable_column_is_ignored() {
        let backend = MockBackend::new();
        let (mut view, _navigator) = view::<Game>(&backend, "/arml-game");
        view.mount().await.unwrap();
        let requests = backend.requests().len();

        view.sort_by("players").await.unwrap();
        assert_eq!(view.sort(), &SortState::default());
        assert_eq!(backend.requests().len(), requests);
    }

    #[tokio::test]
    async fn test_not_found_hidden_while_loading() {
        let backend = MockBackend::new();
        let gate = backend.hold_responses();
        let (mut view, _navigator) = view::<Player>(&backend, "/arml-player");
        let store = view.store.clone();

        assert!(view.show_not_found());
        let pending = tokio::spawn(async move { store.list(None).await });
        while !view.is_loading() {
            tokio::task::yield_now().await;
        }
        assert!(!view.show_not_found());

        gate.add_permits(1);
        pending.await.unwrap().unwrap();
        assert!(view.show_not_found());

        gate.add_permits(1);
        view.mount().await.unwrap();
        assert!(view.show_not_found());
    }

    #[tokio::test]
    async fn test_columns_and_rows() {
        let backend = MockBackend::new();
        let game = backend.insert(Game {
            id: None,
            game_id: 7,
            players: None,
        });
        let mut ann = player(42, "Lee");
        ann.games = Some(vec![game]);
        backend.insert(ann);
        let (mut view, _navigator) = view::<Player>(&backend, "/arml-player");
        view.mount().await.unwrap();

        let columns = view.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["id", "playerID", "firstName", "lastName", "tenhouName", "league", "games"]
        );
        assert_eq!(columns[0].indicator, Some(SortIndicator::Ascending));
        assert_eq!(columns[6].indicator, None);

        assert_eq!(
            view.rows(),
            vec![vec!["2", "42", "Ann", "Lee", "", "B2", "1"]]
        );
        assert_eq!(view.edit_path(2), "/arml-player/2/edit");
        assert_eq!(view.new_path(), "/arml-player/new");
    }
}
