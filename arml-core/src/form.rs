use std::{borrow::Cow, collections::BTreeMap, fmt};

use serde_json::{Map, Value};
use validator::{ValidateLength, ValidateRange, ValidationError};

use crate::{
    Cardinality, EntityDescriptor, EntityId, EntityKind, FieldDescriptor, FieldKind, Relation,
    reference_id,
};

/// Raw input of an entity form, keyed by wire name. Values are whatever the
/// input widgets produced: strings, numbers, id lists or null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormValues(Map<String, Value>);

impl FormValues {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Initial values of a create form: enumerations start on their first
    /// option, many-relations start empty.
    pub fn defaults(descriptor: &EntityDescriptor) -> Self {
        let mut values = FormValues::new();
        for field in descriptor.fields {
            match field.kind {
                FieldKind::Enum(options) => {
                    if let Some(first) = options.first() {
                        values.set(field.name, *first);
                    }
                }
                FieldKind::Relation(Relation {
                    cardinality: Cardinality::Many,
                    ..
                }) => values.set(field.name, Value::Array(Vec::new())),
                _ => {}
            }
        }
        values
    }

    /// Initial values of an edit form. Relations are reduced to their ids.
    pub fn from_entity(descriptor: &EntityDescriptor, entity: &Value) -> Self {
        let mut values = FormValues::new();
        for field in descriptor.fields {
            let value = entity.get(field.name).cloned().unwrap_or(Value::Null);
            let value = match field.relation().map(|r| r.cardinality) {
                Some(Cardinality::One) => reference_id(&value)
                    .map(|id| Value::String(id.to_string()))
                    .unwrap_or(Value::Null),
                Some(Cardinality::Many) => Value::Array(
                    value
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(reference_id)
                                .map(|id| Value::String(id.to_string()))
                                .collect()
                        })
                        .unwrap_or_default(),
                ),
                None => value,
            };
            values.set(field.name, value);
        }
        values
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Field-level validation failures, at most one per field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormErrors {
    errors: BTreeMap<&'static str, ValidationError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors.get(field)
    }

    pub fn code(&self, field: &str) -> Option<&str> {
        self.get(field).map(|error| error.code.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ValidationError)> {
        self.errors.iter().map(|(field, error)| (*field, error))
    }

    fn add(&mut self, field: &'static str, error: ValidationError) {
        self.errors.entry(field).or_insert(error);
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .errors
            .iter()
            .map(|(field, error)| format!("{}: {}", field, error))
            .collect();
        write!(f, "invalid form ({})", fields.join(", "))
    }
}

impl std::error::Error for FormErrors {}

/// Validates `values` against the descriptor and builds the entity JSON to
/// send: `base` (the stored entity, if editing) with every submitted field
/// replaced by its coerced value. Relation ids are resolved through `lookup`
/// into full objects of the related collection.
pub fn assemble<F>(
    descriptor: &EntityDescriptor,
    base: Option<&Value>,
    values: &FormValues,
    lookup: F,
) -> Result<Value, FormErrors>
where
    F: Fn(EntityKind, EntityId) -> Option<Value>,
{
    let mut entity = match base {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    let mut errors = FormErrors::default();

    for field in descriptor.fields {
        let Some(raw) = values.get(field.name) else {
            let stored = entity.get(field.name).is_some_and(|v| !v.is_null());
            if field.rules.required && !stored {
                errors.add(field.name, required());
            }
            continue;
        };
        match coerce(field, raw, &lookup) {
            Ok(value) => {
                entity.insert(field.name.to_string(), value);
            }
            Err(error) => errors.add(field.name, error),
        }
    }

    if errors.is_empty() {
        Ok(Value::Object(entity))
    } else {
        Err(errors)
    }
}

fn coerce<F>(field: &FieldDescriptor, raw: &Value, lookup: &F) -> Result<Value, ValidationError>
where
    F: Fn(EntityKind, EntityId) -> Option<Value>,
{
    if let FieldKind::Relation(relation) = &field.kind {
        let value = coerce_relation(relation, raw, lookup)?;
        let empty = value.is_null() || value.as_array().is_some_and(|items| items.is_empty());
        if field.rules.required && empty {
            return Err(required());
        }
        return Ok(value);
    }

    if is_blank(raw) {
        if field.rules.required {
            return Err(required());
        }
        return Ok(Value::Null);
    }

    match &field.kind {
        FieldKind::Integer => {
            let number = parse_integer(raw).ok_or_else(not_a_number)?;
            check_range(field, number as f64)?;
            Ok(Value::from(number))
        }
        FieldKind::Decimal => {
            let number = parse_decimal(raw).ok_or_else(not_a_number)?;
            check_range(field, number)?;
            Ok(Value::from(number))
        }
        FieldKind::Text => {
            let text = match raw {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            check_text(field, &text)?;
            Ok(Value::String(text))
        }
        FieldKind::Enum(options) => match raw {
            Value::String(choice) if options.contains(&choice.as_str()) => {
                Ok(Value::String(choice.clone()))
            }
            _ => {
                let mut error = invalid("choice", format!("must be one of {}", options.join(", ")));
                error.add_param(Cow::from("value"), raw);
                Err(error)
            }
        },
        FieldKind::Relation(_) => unreachable!("relations are coerced above"),
    }
}

fn coerce_relation<F>(relation: &Relation, raw: &Value, lookup: &F) -> Result<Value, ValidationError>
where
    F: Fn(EntityKind, EntityId) -> Option<Value>,
{
    let resolve = |item: &Value| -> Result<Value, ValidationError> {
        let id = parse_reference(item).ok_or_else(|| unknown_reference(item))?;
        lookup(relation.target, id).ok_or_else(|| unknown_reference(item))
    };

    match relation.cardinality {
        Cardinality::One => {
            if is_blank(raw) {
                return Ok(Value::Null);
            }
            resolve(raw)
        }
        Cardinality::Many => {
            let items: Vec<Value> = match raw {
                Value::Null => Vec::new(),
                Value::Array(items) => items.clone(),
                Value::String(text) => text
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
                other => vec![other.clone()],
            };
            let resolved = items
                .iter()
                .filter(|item| !is_blank(item))
                .map(resolve)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(resolved))
        }
    }
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn parse_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_decimal(raw: &Value) -> Option<f64> {
    let number = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn parse_reference(raw: &Value) -> Option<EntityId> {
    match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Object(_) => reference_id(raw),
        _ => None,
    }
}

fn check_range(field: &FieldDescriptor, number: f64) -> Result<(), ValidationError> {
    let (min, max) = (field.rules.min, field.rules.max);
    if number.validate_range(min, max, None, None) {
        return Ok(());
    }
    let message = match (min, max) {
        (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
        (Some(min), None) => format!("must be at least {}", min),
        (None, Some(max)) => format!("must be at most {}", max),
        (None, None) => "out of range".to_string(),
    };
    let mut error = invalid("range", message);
    if let Some(min) = min {
        error.add_param(Cow::from("min"), &min);
    }
    if let Some(max) = max {
        error.add_param(Cow::from("max"), &max);
    }
    error.add_param(Cow::from("value"), &number);
    Err(error)
}

fn check_text(field: &FieldDescriptor, text: &str) -> Result<(), ValidationError> {
    if let Some(max) = field.rules.max_length {
        if !text.validate_length(None, Some(max), None) {
            let mut error = invalid("length", format!("cannot be longer than {} characters", max));
            error.add_param(Cow::from("max"), &max);
            return Err(error);
        }
    }
    if field.rules.no_whitespace && text.chars().any(char::is_whitespace) {
        return Err(invalid("pattern", "cannot contain whitespace"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn required() -> ValidationError {
    invalid("required", "this field is required")
}

fn not_a_number() -> ValidationError {
    invalid("number", "this field should be a number")
}

fn unknown_reference(raw: &Value) -> ValidationError {
    let mut error = invalid("reference", "does not match any loaded entry");
    error.add_param(Cow::from("value"), raw);
    error
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn no_lookup(_: EntityKind, _: EntityId) -> Option<Value> {
        None
    }

    fn games_lookup(kind: EntityKind, id: EntityId) -> Option<Value> {
        match (kind, id) {
            (EntityKind::Game, 1 | 2) => Some(json!({ "id": id, "gameID": id * 10 })),
            (EntityKind::Player, 7) => Some(json!({ "id": 7, "playerID": 70 })),
            _ => None,
        }
    }

    fn player_values() -> FormValues {
        let mut values = FormValues::defaults(EntityKind::Player.descriptor());
        values.set("playerID", "42");
        values.set("firstName", "Ann");
        values.set("lastName", "Lee");
        values
    }

    fn profile_with_win_rate(rate: Value) -> Result<Value, FormErrors> {
        let mut values = FormValues::new();
        values.set("winRate", rate);
        assemble(EntityKind::Profile.descriptor(), None, &values, no_lookup)
    }

    #[test]
    fn test_defaults_select_first_league() {
        let values = FormValues::defaults(EntityKind::Player.descriptor());
        assert_eq!(values.get("league"), Some(&json!("A1")));
        assert_eq!(values.get("games"), Some(&json!([])));
        assert_eq!(values.get("firstName"), None);
    }

    #[test]
    fn test_numeric_text_is_coerced_to_number() {
        let entity = assemble(
            EntityKind::Player.descriptor(),
            None,
            &player_values(),
            no_lookup,
        )
        .unwrap();
        assert_eq!(entity["playerID"], json!(42));
        assert!(entity["playerID"].is_number());
        assert_eq!(entity["league"], json!("A1"));
        assert_eq!(entity["tenhouName"], Value::Null);
        assert_eq!(entity["games"], json!([]));
    }

    #[test]
    fn test_number_widget_value_stays_number() {
        let mut values = FormValues::new();
        values.set("score", 2500);
        let entity = assemble(EntityKind::GameScore.descriptor(), None, &values, no_lookup).unwrap();
        assert_eq!(entity["score"], json!(2500));

        values.set("score", " -300 ");
        let entity = assemble(EntityKind::GameScore.descriptor(), None, &values, no_lookup).unwrap();
        assert_eq!(entity["score"], json!(-300));
    }

    #[test]
    fn test_non_numeric_input_fails() {
        let mut values = player_values();
        values.set("playerID", "forty-two");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("playerID"), Some("number"));

        values.set("playerID", "4.5");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("playerID"), Some("number"));
    }

    #[test]
    fn test_required_fields() {
        let mut values = FormValues::defaults(EntityKind::Player.descriptor());
        values.set("firstName", "   ");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("firstName"), Some("required"));
        assert_eq!(errors.code("playerID"), Some("required"));
        assert_eq!(errors.code("lastName"), Some("required"));
        assert_eq!(errors.code("league"), None);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_rate_bounds_are_inclusive() {
        assert_eq!(profile_with_win_rate(json!("0")).unwrap()["winRate"], json!(0.0));
        assert_eq!(profile_with_win_rate(json!("100")).unwrap()["winRate"], json!(100.0));
        assert_eq!(profile_with_win_rate(json!(100.0)).unwrap()["winRate"], json!(100.0));

        let above = profile_with_win_rate(json!("100.01")).unwrap_err();
        assert_eq!(above.code("winRate"), Some("range"));
        let below = profile_with_win_rate(json!("-0.01")).unwrap_err();
        assert_eq!(below.code("winRate"), Some("range"));
        assert_eq!(
            below.get("winRate").unwrap().params.get("min"),
            Some(&json!(0.0))
        );
    }

    #[test]
    fn test_unconstrained_numeric_field() {
        let mut values = FormValues::new();
        values.set("feedEV", "-5000");
        let entity = assemble(EntityKind::Profile.descriptor(), None, &values, no_lookup).unwrap();
        assert_eq!(entity["feedEV"], json!(-5000));
    }

    #[test]
    fn test_tenhou_name_rules() {
        let mut values = player_values();
        values.set("tenhouName", "ABCDEFGH");
        assert!(assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).is_ok());

        values.set("tenhouName", "ABCDEFGHI");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("tenhouName"), Some("length"));

        values.set("tenhouName", "AB CD");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("tenhouName"), Some("pattern"));
    }

    #[test]
    fn test_unknown_league_is_rejected() {
        let mut values = player_values();
        values.set("league", "Z9");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert_eq!(errors.code("league"), Some("choice"));
    }

    #[test]
    fn test_relations_resolve_to_full_objects() {
        let mut values = player_values();
        values.set("games", json!(["1", 2]));
        let entity = assemble(EntityKind::Player.descriptor(), None, &values, games_lookup).unwrap();
        assert_eq!(
            entity["games"],
            json!([{ "id": 1, "gameID": 10 }, { "id": 2, "gameID": 20 }])
        );

        values.set("games", "2, 1");
        let entity = assemble(EntityKind::Player.descriptor(), None, &values, games_lookup).unwrap();
        assert_eq!(entity["games"][0]["id"], json!(2));
    }

    #[test]
    fn test_unmatched_relation_id_is_an_error() {
        let mut values = FormValues::new();
        values.set("score", "10");
        values.set("armlGame", "99");
        values.set("armlPlayer", "7");
        let errors =
            assemble(EntityKind::GameScore.descriptor(), None, &values, games_lookup).unwrap_err();
        assert_eq!(errors.code("armlGame"), Some("reference"));
        assert_eq!(errors.code("armlPlayer"), None);
    }

    #[test]
    fn test_empty_relation_is_null() {
        let mut values = FormValues::new();
        values.set("score", "10");
        values.set("armlGame", "");
        let entity = assemble(EntityKind::GameScore.descriptor(), None, &values, games_lookup).unwrap();
        assert_eq!(entity["armlGame"], Value::Null);
    }

    #[test]
    fn test_edit_merges_into_stored_entity() {
        let stored = json!({
            "id": 3,
            "playerID": 42,
            "firstName": "Ann",
            "lastName": "Lee",
            "tenhouName": "annlee",
            "league": "A2",
            "games": [{ "id": 1, "gameID": 10 }],
            "extra": "kept"
        });
        let mut values = FormValues::from_entity(EntityKind::Player.descriptor(), &stored);
        assert_eq!(values.get("games"), Some(&json!(["1"])));
        assert_eq!(values.get("playerID"), Some(&json!(42)));
        values.set("firstName", "Anne");

        let entity = assemble(
            EntityKind::Player.descriptor(),
            Some(&stored),
            &values,
            games_lookup,
        )
        .unwrap();
        assert_eq!(entity["id"], json!(3));
        assert_eq!(entity["firstName"], json!("Anne"));
        assert_eq!(entity["league"], json!("A2"));
        assert_eq!(entity["extra"], json!("kept"));
        assert_eq!(entity["games"], json!([{ "id": 1, "gameID": 10 }]));
    }

    #[test]
    fn test_absent_value_keeps_stored_field() {
        let stored = json!({ "id": 1, "score": 500 });
        let entity = assemble(
            EntityKind::GameScore.descriptor(),
            Some(&stored),
            &FormValues::new(),
            no_lookup,
        )
        .unwrap();
        assert_eq!(entity["score"], json!(500));
    }

    #[test]
    fn test_errors_display_lists_fields() {
        let mut values = player_values();
        values.set("playerID", "x");
        let errors = assemble(EntityKind::Player.descriptor(), None, &values, no_lookup).unwrap_err();
        assert!(errors.to_string().contains("playerID"));
    }
}
