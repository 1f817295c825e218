//! RFD ingestion: parsing, defaults and validation.

use rfd_solver::{DataType, EntityFilter, Enforcement, Rfd, RfdRequest, SolverError};

fn parse(json: &str) -> rfd_solver::Result<Rfd> {
    Rfd::from_json(json)
}

#[test]
fn entity_rfd_with_all_filters() {
    let rfd = parse(
        r#"{
            "rfd_id": "42",
            "name": "Dragons",
            "description": "dragon types from kanto",
            "data_type": "entity",
            "num_records": 15,
            "era": 1,
            "type_filter": "dragon",
            "include_moves": true,
            "schema": {"required": ["id", "name"], "properties": {"id": {"type": "integer"}}}
        }"#,
    )
    .unwrap();

    assert_eq!(rfd.rfd_id, "42");
    assert_eq!(rfd.num_records, 15);
    assert_eq!(rfd.schema.required, vec!["id", "name"]);
    assert_eq!(rfd.schema.enforcement, Enforcement::Representative);
    let RfdRequest::Entity(filter) = &rfd.request else {
        panic!("expected entity request");
    };
    assert_eq!(filter.generation, Some(1));
    assert_eq!(filter.type_filter.as_deref(), Some("dragon"));
    assert!(filter.include_moves());
}

#[test]
fn moves_rfd() {
    let rfd = parse(r#"{"rfd_id": "m", "data_type": "moves", "min_power": 80}"#).unwrap();
    assert_eq!(rfd.request.data_type(), DataType::Moves);
    let RfdRequest::Moves(filter) = &rfd.request else {
        panic!("expected moves request");
    };
    assert_eq!(filter.min_power, Some(80));
}

#[test]
fn filterless_variants() {
    for (tag, expected) in [
        ("abilities", RfdRequest::Abilities),
        ("types", RfdRequest::Types),
        ("evolution", RfdRequest::Evolution),
    ] {
        let rfd = parse(&format!(r#"{{"rfd_id": "x", "data_type": "{tag}"}}"#)).unwrap();
        assert_eq!(rfd.request, expected);
    }
}

#[test]
fn every_record_enforcement() {
    let rfd = parse(
        r#"{"rfd_id": "x", "data_type": "types", "schema": {"required": ["id"], "enforcement": "every_record"}}"#,
    )
    .unwrap();
    assert_eq!(rfd.schema.enforcement, Enforcement::EveryRecord);
}

#[test]
fn rejects_unknown_data_type() {
    let err = parse(r#"{"rfd_id": "x", "data_type": "berries"}"#).unwrap_err();
    assert!(matches!(err, SolverError::InvalidRfd(_)));
}

#[test]
fn rejects_empty_id() {
    assert!(matches!(
        parse(r#"{"rfd_id": "  "}"#),
        Err(SolverError::InvalidRfd(_))
    ));
    assert!(matches!(parse(r#"{}"#), Err(SolverError::InvalidRfd(_))));
}

#[test]
fn rejects_too_many_records() {
    assert!(parse(r#"{"rfd_id": "x", "num_records": 1000}"#).is_ok());
    assert!(matches!(
        parse(r#"{"rfd_id": "x", "num_records": 1001}"#),
        Err(SolverError::InvalidRfd(_))
    ));
}

#[test]
fn rejects_unknown_generation() {
    assert!(parse(r#"{"rfd_id": "x", "era": 9}"#).is_ok());
    assert!(parse(r#"{"rfd_id": "x", "era": 0}"#).is_err());
    assert!(parse(r#"{"rfd_id": "x", "generation": 10}"#).is_err());
}

#[test]
fn rejects_malformed_json() {
    assert!(matches!(parse("{"), Err(SolverError::Json(_))));
}

#[test]
fn reads_rfd_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rfd.json");
    std::fs::write(&path, r#"{"rfd_id": "file", "data_type": "pokemon", "pokemon_ids": [25]}"#)
        .unwrap();

    let rfd = Rfd::from_path(&path).unwrap();
    assert_eq!(
        rfd.request,
        RfdRequest::Entity(EntityFilter {
            pokemon_ids: vec![25],
            ..Default::default()
        })
    );

    let missing = Rfd::from_path(&dir.path().join("nope.json")).unwrap_err();
    assert!(missing.to_string().contains("nope.json"));
}
