//! Qualifier compilation integration tests
//!
//! Loads stored query definitions and a data map from disk the way a model
//! loader does at startup.

use cim_object_graph::{
    queries::{
        compile_qualifier, AggregateKind, BindingType, ComparisonOperator, ComparisonValue,
        Expression, QualifierError, QueryDefinition,
    },
    schema::DataMap,
};
use serde_json::json;
use std::collections::HashMap;

const DATA_MAP: &str = r#"{
    "name": "gallery",
    "entities": {
        "Artist": {
            "name": "Artist",
            "className": "org.example.Artist",
            "attributes": {
                "artistName": {"name": "artistName", "valueType": "java.lang.String"},
                "dateOfBirth": {"name": "dateOfBirth", "valueType": "java.util.Date"}
            },
            "relationships": {
                "paintings": {"name": "paintings", "targetEntity": "Painting", "toMany": true}
            }
        },
        "Painting": {
            "name": "Painting",
            "className": "org.example.Painting",
            "attributes": {
                "paintingTitle": {"name": "paintingTitle", "valueType": "java.lang.String"},
                "estimatedPrice": {"name": "estimatedPrice", "valueType": "java.math.BigDecimal"}
            },
            "relationships": {
                "toArtist": {"name": "toArtist", "targetEntity": "Artist", "toMany": false}
            }
        }
    }
}"#;

fn key_value(key: &str, selector: &str, value: serde_json::Value) -> serde_json::Value {
    json!({"class": "EOKeyValueQualifier", "key": key, "selectorName": selector, "value": value})
}

fn variable(name: &str) -> serde_json::Value {
    json!({"class": "EOQualifierVariable", "_key": name})
}

#[test]
fn test_nested_qualifier_compiles_to_tree() {
    let qualifier = json!({
        "class": "EOOrQualifier",
        "qualifiers": [
            {
                "class": "EOAndQualifier",
                "qualifiers": [
                    key_value("toArtist.artistName", "isCaseInsensitiveLike:", json!("%monet%")),
                    key_value("estimatedPrice", "isGreaterThan:", json!({"class": "NSNumber", "value": "1000"})),
                ],
            },
            {"class": "EONotQualifier", "qualifier": key_value("paintingTitle", "isEqualTo:", json!({"class": "EONull"}))},
        ],
    });

    let expr = compile_qualifier(&qualifier).unwrap();

    let Expression::Aggregate { kind: AggregateKind::Or, children } = &expr else {
        panic!("Expected OR, got {expr:?}");
    };
    assert_eq!(children.len(), 2);
    assert_eq!(
        expr.to_string(),
        r#"((toArtist.artistName likeIgnoreCase "%monet%") and (estimatedPrice > 1000)) or (not (paintingTitle = null))"#
    );
}

#[test]
fn test_bound_query_from_stored_definition() {
    let data_map: DataMap = serde_json::from_str(DATA_MAP).unwrap();
    let query = QueryDefinition::from_plist(
        "PaintingsByArtistAndPrice",
        &json!({
            "entityName": "Painting",
            "qualifier": {
                "class": "EOAndQualifier",
                "qualifiers": [
                    key_value("toArtist", "=", variable("artist")),
                    key_value("estimatedPrice", "isLessThanOrEqualTo:", variable("maxPrice")),
                ],
            },
            "sortOrderings": [{"key": "paintingTitle", "selectorName": "compareAscending:"}],
        }),
    )
    .unwrap();

    let bindings: HashMap<_, _> = query
        .parameter_bindings(&data_map)
        .into_iter()
        .map(|binding| (binding.name, binding.binding_type))
        .collect();
    assert_eq!(bindings["artist"], BindingType::Entity("org.example.Artist".to_string()));
    assert_eq!(
        bindings["maxPrice"],
        BindingType::Attribute("java.math.BigDecimal".to_string())
    );

    let qualifier = query.qualifier.unwrap();
    let bound = qualifier
        .with_parameters_pruned(&HashMap::from([("maxPrice".to_string(), json!(5000))]))
        .unwrap();
    assert_eq!(
        bound,
        Expression::comparison(
            ComparisonOperator::LessOrEqual,
            "estimatedPrice",
            ComparisonValue::Literal(json!(5000)),
        )
    );

    let missing = qualifier.with_parameters(&HashMap::new());
    assert!(matches!(missing, Err(QualifierError::MissingParameter(_))));
}

#[test]
fn test_key_comparison_inside_aggregate_is_unsupported() {
    let result = compile_qualifier(&json!({
        "class": "EOAndQualifier",
        "qualifiers": [
            key_value("artistName", "=", json!("x")),
            {"class": "EOKeyComparisonQualifier", "leftKey": "a", "selectorName": "=", "rightKey": "b"},
        ],
    }));

    assert!(matches!(result, Err(QualifierError::Unsupported { class }) if class == "EOKeyComparisonQualifier"));
}

#[test]
fn test_untagged_child_is_comparison() {
    let expr = compile_qualifier(&json!({
        "class": "EOAndQualifier",
        "qualifiers": [
            {"key": "artistName", "selectorName": "isLike:", "value": "A%"},
            key_value("dateOfBirth", "<", json!("1900-01-01")),
        ],
    }))
    .unwrap();

    let mut operators = Vec::new();
    expr.visit_comparisons(&mut |operator, _, _| operators.push(operator));
    assert_eq!(
        operators,
        vec![ComparisonOperator::Like, ComparisonOperator::LessThan]
    );
}

#[test]
fn test_definitions_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("datamap.json");
    std::fs::write(&path, DATA_MAP).unwrap();

    let data_map = DataMap::from_path(&path).unwrap();
    let query = QueryDefinition::from_plist(
        "ArtistsBornBefore",
        &json!({
            "entityName": "Artist",
            "qualifier": key_value("dateOfBirth", "<", variable("date")),
        }),
    )
    .unwrap();

    let bindings = query.parameter_bindings(&data_map);
    assert_eq!(bindings.len(), 1);
    assert_eq!(
        bindings[0].binding_type,
        BindingType::Attribute("java.util.Date".to_string())
    );
}
