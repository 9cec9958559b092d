// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end runs over CityJSON files

use bigsolid::error::Stage;
use bigsolid::pipeline::FoldMode;
use bigsolid::{run, CityJsonDocument, PipelineConfig, PipelineError};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// One-metre cube shell over vertices `base..base + 8`, optionally missing its last face.
fn cube_shell(base: usize, open: bool) -> Value {
    let count = if open { 5 } else { 6 };
    Value::Array(
        FACES[..count]
            .iter()
            .map(|face| json!([face.iter().map(|i| i + base).collect::<Vec<_>>()]))
            .collect(),
    )
}

fn cube_vertices(x: i64) -> Vec<Value> {
    let mut vertices = Vec::new();
    for z in [0, 1000] {
        for (dx, dy) in [(0, 0), (1000, 0), (1000, 1000), (0, 1000)] {
            vertices.push(json!([x + dx, dy, z]));
        }
    }
    vertices
}

/// A row of touching cubes; ids listed in `open` lose a face.
fn write_document(path: &Path, ids: &[&str], open: &[&str]) {
    let mut objects = serde_json::Map::new();
    let mut vertices = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        vertices.extend(cube_vertices(i as i64 * 1000));
        objects.insert(
            id.to_string(),
            json!({
                "type": "Building",
                "geometry": [{
                    "type": "Solid",
                    "lod": "2.2",
                    "boundaries": [cube_shell(i * 8, open.contains(id))]
                }]
            }),
        );
    }

    let document = json!({
        "type": "CityJSON",
        "version": "1.1",
        "transform": { "scale": [0.001, 0.001, 0.001], "translate": [100.0, 200.0, 0.0] },
        "CityObjects": objects,
        "vertices": vertices
    });
    fs::write(path, document.to_string()).unwrap();
}

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        input: dir.join("input.city.json"),
        output: dir.join("out").join("bigsolid.city.json"),
        cell_size: 0.5,
        minkowski_enabled: false,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_run_writes_consolidated_shell() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    write_document(&config.input, &["b1", "b2", "b3"], &[]);

    let report = run(config.clone()).unwrap();

    assert_eq!(report.mode, FoldMode::ForkJoin);
    assert_eq!(report.records, 3);
    assert_eq!(report.built, 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.cells, 24);
    assert!((report.volume - 3.0).abs() < 1e-9);
    assert!(report.simple);
    assert_eq!(report.shells, 1);

    let written = CityJsonDocument::from_path(&config.output).unwrap();
    assert_eq!(written.object_count(), 1);
    let record = written.record("bigsolid", 2.2).unwrap();
    assert_eq!(record.surfaces().len(), report.exterior_faces);
    assert_eq!(written.vertex_count(), report.exterior_vertices);

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["mode"], "fork_join");
    assert_eq!(json["cells"], 24);
}

#[test]
fn test_selected_ids_only() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        object_ids: vec!["b3".to_string(), "b1".to_string()],
        multithreading_enabled: false,
        ..config(dir.path())
    };
    write_document(&config.input, &["b1", "b2", "b3"], &[]);

    let report = run(config).unwrap();

    assert_eq!(report.mode, FoldMode::Sequential);
    assert_eq!(report.records, 2);
    assert_eq!(report.cells, 16);
    assert_eq!(report.topology.volumes, 2);
    assert!(!report.simple);
}

#[test]
fn test_open_object_is_skipped() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        per_object_ingestion: true,
        ..config(dir.path())
    };
    write_document(&config.input, &["b1", "b2", "b3", "b4"], &["b3"]);

    let report = run(config).unwrap();

    assert_eq!(report.mode, FoldMode::PerObject);
    assert_eq!(report.built, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, "b3");
    assert_eq!(report.cells, 24);
    assert_eq!(report.topology.volumes, 2);
}

#[test]
fn test_convex_hull_and_distance() {
    let dir = tempdir().unwrap();
    let hull_output = dir.path().join("hull.city.json");
    let config = PipelineConfig {
        convex_hull_enabled: true,
        hausdorff_enabled: true,
        hull_output: Some(hull_output.clone()),
        ..config(dir.path())
    };
    write_document(&config.input, &["b1", "b2"], &[]);

    let report = run(config).unwrap();

    let hull = report.hull.as_ref().unwrap();
    assert_eq!(hull.output, hull_output);
    assert_eq!(hull.cells, 16);
    assert!(report.hausdorff_distance.unwrap() < 1e-3);

    let written = CityJsonDocument::from_path(&hull_output).unwrap();
    assert!(written.record("bigsolid_convex", 2.2).is_ok());
}

#[test]
fn test_missing_object_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        object_ids: vec!["nope".to_string()],
        ..config(dir.path())
    };
    write_document(&config.input, &["b1"], &[]);

    let error = run(config.clone()).unwrap_err();
    assert_eq!(error.stage(), Stage::Parse);
    assert!(!config.output.exists());
}

#[test]
fn test_missing_input_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let error = run(config(dir.path())).unwrap_err();
    assert!(matches!(error, PipelineError::Parse(_)));
}

#[test]
fn test_all_skipped_is_an_empty_result() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    write_document(&config.input, &["b1", "b2"], &["b1", "b2"]);

    let error = run(config.clone()).unwrap_err();
    assert!(matches!(error, PipelineError::EmptyResult));
    assert_eq!(error.stage(), Stage::Extract);
    assert!(!config.output.exists());
}

#[test]
fn test_unwritable_output_is_a_write_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let config = PipelineConfig {
        output: blocker.join("bigsolid.city.json"),
        ..config(dir.path())
    };
    write_document(&config.input, &["b1"], &[]);

    let error = run(config).unwrap_err();
    assert_eq!(error.stage(), Stage::Write);
}

#[test]
fn test_invalid_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        max_workers: Some(0),
        ..config(dir.path())
    };
    assert_eq!(run(config).unwrap_err().stage(), Stage::Config);
}
