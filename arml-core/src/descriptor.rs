use serde_json::Value;

use crate::{EntityKind, League, reference_id};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    pub target: EntityKind,
    pub cardinality: Cardinality,
    /// Wire name of the field on the target that points back at this entity.
    pub inverse: Option<&'static str>,
    /// Whether the backend persists the association from this side.
    pub owner: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Integer,
    Decimal,
    Text,
    Enum(&'static [&'static str]),
    Relation(Relation),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rules {
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_length: Option<u64>,
    pub no_whitespace: bool,
}

impl Rules {
    pub const NONE: Rules = Rules {
        required: false,
        min: None,
        max: None,
        max_length: None,
        no_whitespace: false,
    };

    pub const REQUIRED: Rules = Rules {
        required: true,
        ..Rules::NONE
    };

    pub const PERCENTAGE: Rules = Rules {
        min: Some(0.0),
        max: Some(100.0),
        ..Rules::NONE
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub rules: Rules,
    pub sortable: bool,
}

impl FieldDescriptor {
    pub fn relation(&self) -> Option<&Relation> {
        match &self.kind {
            FieldKind::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FieldKind::Integer | FieldKind::Decimal)
    }
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
    /// Field shown next to the id in relation dropdowns.
    pub option_label: Option<&'static str>,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&'static FieldDescriptor, &'static Relation)> {
        self.fields
            .iter()
            .filter_map(|field| field.relation().map(|relation| (field, relation)))
    }

    /// `id` is always sortable even though it is not an editable field.
    pub fn is_sortable(&self, name: &str) -> bool {
        name == "id" || self.field(name).is_some_and(|field| field.sortable)
    }

    pub fn option_text(&self, value: &Value) -> String {
        let id = reference_id(value)
            .map(|id| id.to_string())
            .unwrap_or_default();
        match self.option_label.and_then(|name| value.get(name)) {
            Some(Value::String(label)) => format!("{} ({})", id, label),
            _ => id,
        }
    }
}

/// Renders a field value of an entity as list/detail text.
pub fn display_value(field: &FieldDescriptor, value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match (&field.kind, value) {
        (_, Value::Null) => String::new(),
        (FieldKind::Relation(relation), _) => match relation.cardinality {
            Cardinality::One => reference_id(value)
                .map(|id| id.to_string())
                .unwrap_or_default(),
            Cardinality::Many => value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(reference_id)
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
        },
        (_, Value::String(text)) => text.clone(),
        (_, other) => other.to_string(),
    }
}

const GAMES_OF_PLAYER: Relation = Relation {
    target: EntityKind::Game,
    cardinality: Cardinality::Many,
    inverse: Some("players"),
    owner: true,
};

const PLAYERS_OF_GAME: Relation = Relation {
    target: EntityKind::Player,
    cardinality: Cardinality::Many,
    inverse: Some("games"),
    owner: false,
};

pub(crate) static PLAYER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Player,
    name: "ArmlPlayer",
    option_label: None,
    fields: &[
        FieldDescriptor {
            name: "playerID",
            label: "Player ID",
            kind: FieldKind::Integer,
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "firstName",
            label: "First Name",
            kind: FieldKind::Text,
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "lastName",
            label: "Last Name",
            kind: FieldKind::Text,
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "tenhouName",
            label: "Tenhou Name",
            kind: FieldKind::Text,
            rules: Rules {
                max_length: Some(8),
                no_whitespace: true,
                ..Rules::NONE
            },
            sortable: true,
        },
        FieldDescriptor {
            name: "league",
            label: "League",
            kind: FieldKind::Enum(&League::CODES),
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "games",
            label: "Games",
            kind: FieldKind::Relation(GAMES_OF_PLAYER),
            rules: Rules::NONE,
            sortable: false,
        },
    ],
};

pub(crate) static GAME: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Game,
    name: "ArmlGame",
    option_label: None,
    fields: &[
        FieldDescriptor {
            name: "gameID",
            label: "Game ID",
            kind: FieldKind::Integer,
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "players",
            label: "Players",
            kind: FieldKind::Relation(PLAYERS_OF_GAME),
            rules: Rules::NONE,
            sortable: false,
        },
    ],
};

pub(crate) static GAME_SCORE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::GameScore,
    name: "ArmlGameScore",
    option_label: None,
    fields: &[
        FieldDescriptor {
            name: "score",
            label: "Score",
            kind: FieldKind::Integer,
            rules: Rules::REQUIRED,
            sortable: true,
        },
        FieldDescriptor {
            name: "armlGame",
            label: "Arml Game",
            kind: FieldKind::Relation(Relation {
                target: EntityKind::Game,
                cardinality: Cardinality::One,
                inverse: None,
                owner: true,
            }),
            rules: Rules::NONE,
            sortable: false,
        },
        FieldDescriptor {
            name: "armlPlayer",
            label: "Arml Player",
            kind: FieldKind::Relation(Relation {
                target: EntityKind::Player,
                cardinality: Cardinality::One,
                inverse: None,
                owner: true,
            }),
            rules: Rules::NONE,
            sortable: false,
        },
    ],
};

pub(crate) static PROFILE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Profile,
    name: "ArmlProfile",
    option_label: None,
    fields: &[
        FieldDescriptor {
            name: "winRate",
            label: "Win Rate",
            kind: FieldKind::Decimal,
            rules: Rules::PERCENTAGE,
            sortable: true,
        },
        FieldDescriptor {
            name: "feedRate",
            label: "Feed Rate",
            kind: FieldKind::Decimal,
            rules: Rules::PERCENTAGE,
            sortable: true,
        },
        FieldDescriptor {
            name: "callRate",
            label: "Call Rate",
            kind: FieldKind::Decimal,
            rules: Rules::PERCENTAGE,
            sortable: true,
        },
        FieldDescriptor {
            name: "riiRate",
            label: "Rii Rate",
            kind: FieldKind::Decimal,
            rules: Rules::PERCENTAGE,
            sortable: true,
        },
        FieldDescriptor {
            name: "feedEV",
            label: "Feed EV",
            kind: FieldKind::Integer,
            rules: Rules::NONE,
            sortable: true,
        },
        FieldDescriptor {
            name: "user",
            label: "User",
            kind: FieldKind::Relation(Relation {
                target: EntityKind::User,
                cardinality: Cardinality::One,
                inverse: None,
                owner: true,
            }),
            rules: Rules::NONE,
            sortable: false,
        },
        FieldDescriptor {
            name: "playerID",
            label: "Player",
            kind: FieldKind::Relation(Relation {
                target: EntityKind::Player,
                cardinality: Cardinality::One,
                inverse: None,
                owner: true,
            }),
            rules: Rules::NONE,
            sortable: false,
        },
    ],
};

pub(crate) static USER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    name: "User",
    option_label: Some("login"),
    fields: &[FieldDescriptor {
        name: "login",
        label: "Login",
        kind: FieldKind::Text,
        rules: Rules::NONE,
        sortable: true,
    }],
};
