use serde::{Deserialize, Serialize};

use crate::{Entity, EntityId, EntityKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum League {
    #[default]
    A1,
    A2,
    B1,
    B2,
}

impl League {
    pub const ALL: [League; 4] = [League::A1, League::A2, League::B1, League::B2];
    pub const CODES: [&'static str; 4] = ["A1", "A2", "B1", "B2"];

    pub fn code(&self) -> &'static str {
        match self {
            League::A1 => "A1",
            League::A2 => "A2",
            League::B1 => "B1",
            League::B2 => "B2",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(rename = "playerID")]
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub tenhou_name: Option<String>,
    pub league: League,
    #[serde(default)]
    pub games: Option<Vec<Game>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(rename = "gameID")]
    pub game_id: i64,
    #[serde(default)]
    pub players: Option<Vec<Player>>,
}

/// One player's result in one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub score: i64,
    #[serde(rename = "armlGame", default)]
    pub game: Option<Game>,
    #[serde(rename = "armlPlayer", default)]
    pub player: Option<Player>,
}

/// Aggregate performance statistics of a player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub feed_rate: Option<f64>,
    #[serde(default)]
    pub call_rate: Option<f64>,
    #[serde(default)]
    pub rii_rate: Option<f64>,
    #[serde(rename = "feedEV", default)]
    pub feed_ev: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(rename = "playerID", default)]
    pub player: Option<Player>,
}

/// Account reference, only ever read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<EntityId>,
    #[serde(default)]
    pub login: Option<String>,
}

impl Entity for Player {
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Entity for Game {
    const KIND: EntityKind = EntityKind::Game;

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Entity for GameScore {
    const KIND: EntityKind = EntityKind::GameScore;

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Entity for Profile {
    const KIND: EntityKind = EntityKind::Profile;

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_player_wire_names() {
        let player = Player {
            id: Some(3),
            player_id: 42,
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            tenhou_name: None,
            league: League::A1,
            games: Some(vec![]),
        };
        let value = player.to_json().unwrap();
        assert_eq!(value["playerID"], json!(42));
        assert_eq!(value["firstName"], json!("Ann"));
        assert_eq!(value["league"], json!("A1"));
        assert_eq!(value["games"], json!([]));
    }

    #[test]
    fn test_game_score_from_backend_json() {
        let score = GameScore::from_json(json!({
            "id": 5,
            "score": -1200,
            "armlGame": { "id": 2, "gameID": 17 },
            "armlPlayer": null
        }))
        .unwrap();
        assert_eq!(score.score, -1200);
        assert_eq!(score.game.as_ref().and_then(|g| g.id), Some(2));
        assert_eq!(score.game.as_ref().and_then(|g| g.players.clone()), None);
        assert!(score.player.is_none());
    }

    #[test]
    fn test_profile_missing_fields_default_to_none() {
        let profile = Profile::from_json(json!({ "id": 1, "winRate": 55.5 })).unwrap();
        assert_eq!(profile.win_rate, Some(55.5));
        assert_eq!(profile.feed_ev, None);
        assert!(profile.user.is_none());
        assert!(profile.player.is_none());
    }

    #[test]
    fn test_new_entity_omits_id() {
        let game = Game {
            id: None,
            game_id: 9,
            players: None,
        };
        let value = game.to_json().unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_league_codes_match_serde() {
        for (league, code) in League::ALL.iter().zip(League::CODES) {
            assert_eq!(league.code(), code);
            assert_eq!(serde_json::to_value(league).unwrap(), json!(code));
        }
        assert_eq!(League::default(), League::A1);
    }
}
