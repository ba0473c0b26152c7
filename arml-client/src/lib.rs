pub mod api;
pub mod config;
pub mod delete;
pub mod detail;
pub mod http;
pub mod list;
pub mod mock;
pub mod navigation;
pub mod relation;
pub mod store;
pub mod update;

use std::sync::Arc;

use arml_core::{EntityId, Game, GameScore, Player, Profile, User};

use crate::{
    api::EntityApi,
    delete::DeleteFlow,
    detail::DetailView,
    list::ListView,
    navigation::ArcNavigator,
    relation::RelationSources,
    store::EntityStore,
    update::UpdateView,
};

/// Application root: one store per entity kind over a shared backend, and
/// the navigator every screen reports to.
#[derive(Clone)]
pub struct AdminClient {
    players: EntityStore<Player>,
    games: EntityStore<Game>,
    game_scores: EntityStore<GameScore>,
    profiles: EntityStore<Profile>,
    users: EntityStore<User>,
    navigator: ArcNavigator,
}

pub trait StoreOf<E: arml_core::Entity> {
    fn store(&self) -> &EntityStore<E>;
}

macro_rules! store_of {
    ($entity:ty, $field:ident) => {
        impl StoreOf<$entity> for AdminClient {
            fn store(&self) -> &EntityStore<$entity> {
                &self.$field
            }
        }
    };
}

store_of!(Player, players);
store_of!(Game, games);
store_of!(GameScore, game_scores);
store_of!(Profile, profiles);
store_of!(User, users);

impl AdminClient {
    pub fn new<A>(api: A, navigator: ArcNavigator) -> Self
    where
        A: EntityApi<Player>
            + EntityApi<Game>
            + EntityApi<GameScore>
            + EntityApi<Profile>
            + EntityApi<User>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        Self {
            players: EntityStore::new(Arc::new(api.clone())),
            games: EntityStore::new(Arc::new(api.clone())),
            game_scores: EntityStore::new(Arc::new(api.clone())),
            profiles: EntityStore::new(Arc::new(api.clone())),
            users: EntityStore::new(Arc::new(api)),
            navigator,
        }
    }

    pub fn navigator(&self) -> &ArcNavigator {
        &self.navigator
    }

    pub fn relation_sources(&self) -> RelationSources {
        RelationSources::new()
            .with(Arc::new(self.players.clone()))
            .with(Arc::new(self.games.clone()))
            .with(Arc::new(self.game_scores.clone()))
            .with(Arc::new(self.profiles.clone()))
            .with(Arc::new(self.users.clone()))
    }

    pub fn list_view<E: arml_core::Entity>(&self) -> ListView<E>
    where
        Self: StoreOf<E>,
    {
        ListView::new(StoreOf::<E>::store(self).clone(), self.navigator.clone())
    }

    pub fn detail_view<E: arml_core::Entity>(&self, id: EntityId) -> DetailView<E>
    where
        Self: StoreOf<E>,
    {
        DetailView::new(StoreOf::<E>::store(self).clone(), id)
    }

    pub fn update_view<E: arml_core::Entity>(&self, id: Option<EntityId>) -> UpdateView<E>
    where
        Self: StoreOf<E>,
    {
        UpdateView::new(
            StoreOf::<E>::store(self).clone(),
            self.relation_sources(),
            self.navigator.clone(),
            id,
        )
    }

    pub fn delete_flow<E: arml_core::Entity>(&self, id: EntityId) -> DeleteFlow<E>
    where
        Self: StoreOf<E>,
    {
        DeleteFlow::new(StoreOf::<E>::store(self).clone(), self.navigator.clone(), id)
    }
}

#[cfg(test)]
mod tests {
    use arml_core::{League, sort::SortState};

    use super::*;
    use crate::{
        mock::MockBackend,
        navigation::{HistoryNavigator, Navigator},
    };

    fn client(url: &str) -> (AdminClient, MockBackend, Arc<HistoryNavigator>) {
        let backend = MockBackend::new();
        let navigator = Arc::new(HistoryNavigator::new(url));
        let client = AdminClient::new(backend.clone(), navigator.clone());
        (client, backend, navigator)
    }

    #[tokio::test]
    async fn test_created_player_is_listed_with_empty_games() {
        let (client, _backend, navigator) = client("/arml-player/new");

        let mut form = client.update_view::<Player>(None);
        form.mount().await.unwrap();
        form.set("playerID", "42");
        form.set("firstName", "Ann");
        form.set("lastName", "Lee");
        form.set("league", "A1");
        form.submit().await.unwrap();
        assert_eq!(navigator.location().path, "/arml-player");

        let mut list = client.list_view::<Player>();
        list.mount().await.unwrap();
        assert_eq!(list.sort(), &SortState::default());
        let players = list.entities();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].player_id, 42);
        assert_eq!(players[0].first_name, "Ann");
        assert_eq!(players[0].last_name, "Lee");
        assert_eq!(players[0].league, League::A1);
        assert_eq!(players[0].games, Some(vec![]));
        assert!(!list.show_not_found());
    }

    #[tokio::test]
    async fn test_screens_share_stores() {
        let (client, backend, _navigator) = client("/arml-game");
        let game = backend.insert(Game {
            id: None,
            game_id: 1,
            players: None,
        });
        let id = game.id.unwrap();

        let detail = client.detail_view::<Game>(id);
        detail.mount().await.unwrap();
        assert_eq!(StoreOf::<Game>::store(&client).entity(), Some(game));

        let mut delete = client.delete_flow::<Game>(id);
        delete.mount().await.unwrap();
        delete.confirm().await.unwrap();
        assert!(StoreOf::<Game>::store(&client).entity().is_none());
        assert!(detail.entity().is_none());
    }
}
