//! Field Resolution Tests
//!
//! Tests for the resolution rules:
//! - Requiredness of union-with-none fields
//! - Explicit defaults shared by reference vs per-instance factories
//! - Alias precedence
//! - Serialize / instantiate round trip

use fieldmodel::model::{
    instantiate, resolve_requiredness, serialize, DefaultFactory, ExtraPolicy,
    FieldResolutionEngine, FieldSpec, FieldType, ModelError, ModelSpec, ValidationMode,
};
use serde_json::{json, Value};

fn names_model() -> ModelSpec {
    ModelSpec::new(
        "Names",
        vec![
            FieldSpec::new("first_name", FieldType::String),
            FieldSpec::new("middle_name", FieldType::String).nullable(),
            FieldSpec::new("title", FieldType::String)
                .nullable()
                .default_value(Value::Null),
        ],
    )
    .unwrap()
}

// =============================================================================
// Requiredness
// =============================================================================

/// Allowing "none" does not make "none" an implicit default.
#[test]
fn test_union_with_none_without_default_is_required() {
    let model = names_model();
    assert!(resolve_requiredness(model.field("middle_name").unwrap()));

    let err = instantiate(&model, &json!({"first_name": "marc"})).unwrap_err();
    assert_eq!(err, ModelError::missing("middle_name"));
}

#[test]
fn test_explicit_none_satisfies_union_with_none() {
    let instance =
        instantiate(&names_model(), &json!({"first_name": "marc", "middle_name": null})).unwrap();

    assert_eq!(
        Value::Object(serialize(&instance, false)),
        json!({"first_name": "marc", "middle_name": null, "title": null})
    );
}

#[test]
fn test_union_with_none_default_none_is_optional() {
    let model = ModelSpec::new(
        "NameModel",
        vec![
            FieldSpec::new("first_name", FieldType::String),
            FieldSpec::new("middle_name", FieldType::String)
                .nullable()
                .default_value(Value::Null),
            FieldSpec::new("last_name", FieldType::String),
        ],
    )
    .unwrap();

    let with_middle = instantiate(
        &model,
        &json!({"first_name": "John", "middle_name": "Michael", "last_name": "Doe"}),
    )
    .unwrap();
    assert_eq!(with_middle.get("middle_name"), Some(json!("Michael")));

    let without_middle =
        instantiate(&model, &json!({"first_name": "Jane", "last_name": "Smith"})).unwrap();
    assert_eq!(without_middle.get("middle_name"), Some(Value::Null));

    // last_name stays required
    let err = instantiate(&model, &json!({"first_name": "Bob"})).unwrap_err();
    assert_eq!(err, ModelError::missing("last_name"));
}

#[test]
fn test_required_field_must_conform_exactly() {
    let model = ModelSpec::new(
        "MyFirstModel",
        vec![
            FieldSpec::new("first_name", FieldType::String),
            FieldSpec::new("last_name", FieldType::String),
        ],
    )
    .unwrap();

    assert!(instantiate(&model, &json!({"first_name": "marc", "last_name": "nealer"})).is_ok());

    let err = instantiate(&model, &json!({"first_name": 123, "last_name": "nealer"})).unwrap_err();
    match err {
        ModelError::TypeMismatch {
            field,
            expected,
            received,
        } => {
            assert_eq!(field, "first_name");
            assert_eq!(expected, "string");
            assert_eq!(received, json!(123));
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
}

// =============================================================================
// Default Sharing
// =============================================================================

fn defaults_model(middle: FieldSpec) -> ModelSpec {
    ModelSpec::new(
        "DefaultsModel",
        vec![
            FieldSpec::new("first_name", FieldType::String).default_value(json!("Cynthia")),
            middle,
            FieldSpec::new("last_name", FieldType::String).default_value(json!("Frong")),
        ],
    )
    .unwrap()
}

/// Two instances omitting an explicit container default hold the same object.
#[test]
fn test_explicit_mutable_default_is_shared() {
    let model = defaults_model(
        FieldSpec::new("middle_name", FieldType::list(FieldType::Any)).default_value(json!([])),
    );
    assert_eq!(model.shared_mutable_defaults(), ["middle_name"]);

    let mut a = instantiate(&model, &json!({})).unwrap();
    let b = instantiate(&model, &json!({})).unwrap();

    a.update("middle_name", |v| v.as_array_mut().unwrap().push(json!("Marie")))
        .unwrap();

    assert_eq!(a.get("middle_name"), Some(json!(["Marie"])));
    assert_eq!(b.get("middle_name"), Some(json!(["Marie"])));
    assert!(a.shares_value_with(&b, "middle_name"));

    // the model's default itself changed; later instances see it too
    let c = instantiate(&model, &json!({})).unwrap();
    assert_eq!(c.get("middle_name"), Some(json!(["Marie"])));
}

/// Factory defaults are fresh per instance.
#[test]
fn test_default_factory_values_are_independent() {
    let model = defaults_model(
        FieldSpec::new("middle_name", FieldType::list(FieldType::Any))
            .default_factory(DefaultFactory::list()),
    );
    assert!(model.shared_mutable_defaults().is_empty());

    let mut x = instantiate(&model, &json!({})).unwrap();
    let y = instantiate(&model, &json!({})).unwrap();

    x.update("middle_name", |v| v.as_array_mut().unwrap().push(json!("Holden")))
        .unwrap();

    assert_eq!(x.get("middle_name"), Some(json!(["Holden"])));
    assert_eq!(y.get("middle_name"), Some(json!([])));
    assert!(!x.shares_value_with(&y, "middle_name"));
}

/// Supplied values are never shared, even for fields with an explicit default.
#[test]
fn test_supplied_value_is_owned() {
    let model = defaults_model(
        FieldSpec::new("middle_name", FieldType::list(FieldType::Any)).default_value(json!([])),
    );
    let a = instantiate(&model, &json!({"middle_name": ["Anne"]})).unwrap();
    let b = instantiate(&model, &json!({})).unwrap();

    assert!(!a.is_shared("middle_name"));
    assert!(b.is_shared("middle_name"));
    assert!(a.is_shared("first_name"));
}

#[test]
fn test_rebinding_does_not_touch_shared_default() {
    let model = defaults_model(
        FieldSpec::new("middle_name", FieldType::list(FieldType::Any)).default_value(json!([])),
    );
    let mut a = instantiate(&model, &json!({})).unwrap();
    let b = instantiate(&model, &json!({})).unwrap();

    a.set("middle_name", json!(["Marie"])).unwrap();

    assert_eq!(b.get("middle_name"), Some(json!([])));
    assert_eq!(
        model.field("middle_name").unwrap().explicit_default_value(),
        Some(json!([]))
    );
}

// =============================================================================
// Aliases
// =============================================================================

/// The first declared alias wins when several are present.
#[test]
fn test_first_alias_wins() {
    let model = ModelSpec::new(
        "Person",
        vec![FieldSpec::new("name", FieldType::String)
            .validation_alias("fname")
            .validation_alias("surname")],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"surname": "nealer", "fname": "marc"})).unwrap();
    assert_eq!(instance.get("name"), Some(json!("marc")));

    let instance = instantiate(&model, &json!({"surname": "nealer"})).unwrap();
    assert_eq!(instance.get("name"), Some(json!("nealer")));
}

#[test]
fn test_own_name_precedes_aliases() {
    let model = ModelSpec::new(
        "Person",
        vec![FieldSpec::new("name", FieldType::String).validation_alias("fname")],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"fname": "alias", "name": "canonical"})).unwrap();
    assert_eq!(instance.get("name"), Some(json!("canonical")));
}

/// Values are stored under the canonical name, not the alias used.
#[test]
fn test_alias_input_stored_under_canonical_name() {
    let model = ModelSpec::new(
        "Person",
        vec![FieldSpec::new("first_name", FieldType::String).validation_alias("fname")],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"fname": "marc"})).unwrap();
    assert_eq!(
        Value::Object(serialize(&instance, false)),
        json!({"first_name": "marc"})
    );
    // validation aliases are not output aliases
    assert_eq!(
        Value::Object(serialize(&instance, true)),
        json!({"first_name": "marc"})
    );
}

#[test]
fn test_serialization_alias_used_only_on_output() {
    let model = ModelSpec::new(
        "Person",
        vec![FieldSpec::new("first_name", FieldType::String)
            .serialization_alias("firstName")
            .serialization_alias("given")],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"first_name": "marc"})).unwrap();
    assert_eq!(
        Value::Object(serialize(&instance, true)),
        json!({"firstName": "marc"})
    );

    // output alias is not accepted as input
    assert!(instantiate(&model, &json!({"firstName": "marc"})).is_err());
}

#[test]
fn test_overlapping_aliases_resolve_in_declaration_order() {
    let model = ModelSpec::new(
        "Person",
        vec![
            FieldSpec::new("first_name", FieldType::String).validation_alias("name"),
            FieldSpec::new("nickname", FieldType::String)
                .validation_alias("name")
                .default_value(json!("none given")),
        ],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"name": "marc"})).unwrap();
    assert_eq!(instance.get("first_name"), Some(json!("marc")));
    assert_eq!(instance.get("nickname"), Some(json!("none given")));
}

/// An alias equal to a later field's own name does not take that key.
#[test]
fn test_alias_does_not_capture_another_fields_name() {
    let model = ModelSpec::new(
        "Person",
        vec![
            FieldSpec::new("full_name", FieldType::String).validation_alias("last_name"),
            FieldSpec::new("last_name", FieldType::String),
        ],
    )
    .unwrap();

    let instance =
        instantiate(&model, &json!({"full_name": "marc nealer", "last_name": "nealer"})).unwrap();
    assert_eq!(instance.get("full_name"), Some(json!("marc nealer")));
    assert_eq!(instance.get("last_name"), Some(json!("nealer")));

    let err = instantiate(&model, &json!({"last_name": "nealer"})).unwrap_err();
    assert_eq!(err, ModelError::missing("full_name"));

    let dumped = Value::Object(serialize(&instance, false));
    assert_eq!(instantiate(&model, &dumped).unwrap(), instance);
}

// =============================================================================
// Round Trip
// =============================================================================

fn collections_model() -> ModelSpec {
    ModelSpec::new(
        "MyThirdModel",
        vec![
            FieldSpec::new("name", FieldType::dict(FieldType::String)).alias("fullName"),
            FieldSpec::new("skills", FieldType::list(FieldType::String)),
            FieldSpec::new(
                "holidays",
                FieldType::list(FieldType::Union(vec![FieldType::String, FieldType::Timestamp])),
            ),
            FieldSpec::new("tags", FieldType::list(FieldType::String))
                .default_factory(DefaultFactory::list()),
        ],
    )
    .unwrap()
}

#[test]
fn test_round_trip_by_canonical_name() {
    let engine = FieldResolutionEngine::new();
    let model = collections_model();
    let raw = json!({
        "fullName": {"first": "Eve", "last": "Anderson"},
        "skills": ["Machine Learning", "Data Science"],
        "holidays": ["Memorial Day", 1716768000]
    });

    let first = engine.instantiate(&model, &raw).unwrap();
    let dumped = Value::Object(engine.serialize(&first, false));
    let second = engine.instantiate(&model, &dumped).unwrap();

    assert_eq!(first, second);
    assert_eq!(Value::Object(engine.serialize(&second, false)), dumped);
    assert_eq!(dumped["holidays"][1], json!("2024-05-27T00:00:00Z"));
}

#[test]
fn test_round_trip_by_alias() {
    let model = collections_model();
    let raw = json!({
        "name": {"first": "Frank", "last": "Miller"},
        "skills": ["Photography"],
        "holidays": ["Labor Day", "2024-09-02"]
    });

    let first = instantiate(&model, &raw).unwrap();
    let dumped = Value::Object(serialize(&first, true));
    assert!(dumped.get("fullName").is_some());

    let second = instantiate(&model, &dumped).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Collections and Coercion
// =============================================================================

#[test]
fn test_collection_item_errors_name_the_path() {
    let model = collections_model();

    let err = instantiate(
        &model,
        &json!({"name": {"first": "Ava", "last": 524}, "skills": [], "holidays": []}),
    )
    .unwrap_err();
    assert_eq!(err.field(), Some("name.last"));

    let err = instantiate(
        &model,
        &json!({"name": {}, "skills": ["Chronically Online", 123], "holidays": []}),
    )
    .unwrap_err();
    assert_eq!(err.field(), Some("skills[1]"));
}

#[test]
fn test_numeric_string_coerces_to_timestamp() {
    let model = ModelSpec::new(
        "Event",
        vec![FieldSpec::new("at", FieldType::Timestamp)],
    )
    .unwrap();

    let instance = instantiate(&model, &json!({"at": "1735084800"})).unwrap();
    assert_eq!(instance.get("at"), Some(json!("2024-12-25T00:00:00Z")));

    let err = instantiate(&model, &json!({"at": "Christmas"})).unwrap_err();
    assert_eq!(err.code(), "FM_TYPE_MISMATCH");
}

#[test]
fn test_empty_collections_are_valid() {
    let instance = instantiate(
        &collections_model(),
        &json!({"name": {}, "skills": [], "holidays": []}),
    )
    .unwrap();
    assert_eq!(instance.get("tags"), Some(json!([])));
}

// =============================================================================
// Modes and Policies
// =============================================================================

#[test]
fn test_collect_all_orders_errors_by_declaration() {
    let model = collections_model().with_mode(ValidationMode::CollectAll);
    let err = instantiate(&model, &json!({"skills": "Python"})).unwrap_err();

    match err {
        ModelError::Multiple(errors) => {
            let fields: Vec<_> = errors.iter().filter_map(ModelError::field).collect();
            assert_eq!(fields, ["name", "skills", "holidays"]);
        }
        other => panic!("expected Multiple, got {:?}", other),
    }
}

#[test]
fn test_forbid_extra_accepts_aliases() {
    let model = collections_model().with_extra(ExtraPolicy::Forbid);
    let raw = json!({"fullName": {}, "skills": [], "holidays": []});
    assert!(instantiate(&model, &raw).is_ok());

    let raw = json!({"fullName": {}, "skills": [], "holidays": [], "hobbies": []});
    let err = instantiate(&model, &raw).unwrap_err();
    assert_eq!(err.field(), Some("hobbies"));
}
