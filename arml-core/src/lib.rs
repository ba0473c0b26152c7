mod descriptor;
pub mod form;
mod model;
pub mod route;
pub mod sort;

use std::fmt::{self, Debug};

use serde::{Serialize, de::DeserializeOwned};

pub use descriptor::{
    Cardinality, EntityDescriptor, FieldDescriptor, FieldKind, Relation, Rules, display_value,
};
pub use model::{Game, GameScore, League, Player, Profile, User};

pub type EntityId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Player,
    Game,
    GameScore,
    Profile,
    User,
}

impl EntityKind {
    /// Kinds that have their own list/detail/edit/delete screens.
    pub const MANAGED: [EntityKind; 4] = [
        EntityKind::Player,
        EntityKind::Game,
        EntityKind::GameScore,
        EntityKind::Profile,
    ];

    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Player => "api/arml-players",
            EntityKind::Game => "api/arml-games",
            EntityKind::GameScore => "api/arml-game-scores",
            EntityKind::Profile => "api/arml-profiles",
            EntityKind::User => "api/users",
        }
    }

    pub fn route_segment(&self) -> Option<&'static str> {
        match self {
            EntityKind::Player => Some("arml-player"),
            EntityKind::Game => Some("arml-game"),
            EntityKind::GameScore => Some("arml-game-score"),
            EntityKind::Profile => Some("arml-profile"),
            EntityKind::User => None,
        }
    }

    pub fn from_route_segment(segment: &str) -> Option<EntityKind> {
        EntityKind::MANAGED
            .into_iter()
            .find(|kind| kind.route_segment() == Some(segment))
    }

    /// Path of the list screen, without a query string.
    pub fn list_path(&self) -> String {
        format!("/{}", self.route_segment().unwrap_or_default())
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        match self {
            EntityKind::Player => &descriptor::PLAYER,
            EntityKind::Game => &descriptor::GAME,
            EntityKind::GameScore => &descriptor::GAME_SCORE,
            EntityKind::Profile => &descriptor::PROFILE,
            EntityKind::User => &descriptor::USER,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().name)
    }
}

/// A server-owned record. The id is assigned by the backend and absent
/// until the record has been created.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Option<EntityId>;

    fn descriptor() -> &'static EntityDescriptor {
        Self::KIND.descriptor()
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// Extracts the `id` of an embedded reference object (`{"id": n, ...}`).
pub fn reference_id(value: &serde_json::Value) -> Option<EntityId> {
    value.get("id").and_then(serde_json::Value::as_i64)
}
