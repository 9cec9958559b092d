// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CityJSON reader
//!
//! Only the parts needed to rebuild per-object boundaries are read: the
//! shared vertex list (with its optional transform), each city object's
//! geometries and its `children`.

use crate::config::LOD_EPSILON;
use crate::error::ParseError;
use crate::record::{ObjectRecord, Surface};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

type Ring = Vec<usize>;
type SurfaceRings = Vec<Ring>;

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    transform: Option<RawTransform>,
    #[serde(rename = "CityObjects", default)]
    city_objects: BTreeMap<String, RawCityObject>,
    #[serde(default)]
    vertices: Vec<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
struct RawTransform {
    scale: [f64; 3],
    translate: [f64; 3],
}

#[derive(Debug, Deserialize)]
struct RawCityObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    geometry: Vec<RawGeometry>,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lod: Option<Value>,
    #[serde(default)]
    boundaries: Value,
}

/// Id, type and available detail levels of one city object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub id: String,
    pub kind: String,
    pub lods: Vec<f64>,
    pub children: usize,
}

/// A parsed CityJSON document with world-space vertices.
#[derive(Debug)]
pub struct CityJsonDocument {
    version: Option<String>,
    objects: BTreeMap<String, RawCityObject>,
    vertices: Vec<Point3<f64>>,
}

fn parse_lod(id: &str, value: &Value) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidLod {
        id: id.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::Number(number) => number.as_f64().ok_or_else(invalid),
        Value::String(text) => text.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn lod_matches(a: f64, b: f64) -> bool {
    (a - b).abs() < LOD_EPSILON
}

/// Flatten the boundaries of one geometry into surfaces of vertex indices.
fn boundary_surfaces(id: &str, geometry: &RawGeometry) -> Result<Vec<SurfaceRings>, ParseError> {
    let malformed = |source| ParseError::Boundaries {
        id: id.to_string(),
        kind: geometry.kind.clone(),
        source,
    };

    let surfaces = match geometry.kind.as_str() {
        "MultiSurface" | "CompositeSurface" => {
            Vec::<SurfaceRings>::deserialize(&geometry.boundaries).map_err(malformed)?
        }
        "Solid" => Vec::<Vec<SurfaceRings>>::deserialize(&geometry.boundaries)
            .map_err(malformed)?
            .into_iter()
            .flatten()
            .collect(),
        "MultiSolid" | "CompositeSolid" => {
            Vec::<Vec<Vec<SurfaceRings>>>::deserialize(&geometry.boundaries)
                .map_err(malformed)?
                .into_iter()
                .flatten()
                .flatten()
                .collect()
        }
        other => {
            tracing::debug!(id, kind = other, "unsupported geometry type ignored");
            Vec::new()
        }
    };
    Ok(surfaces)
}

impl CityJsonDocument {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            objects = document.objects.len(),
            vertices = document.vertices.len(),
            "document loaded"
        );
        Ok(document)
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let raw: RawDocument = serde_json::from_str(text)?;
        if raw.kind != "CityJSON" {
            return Err(ParseError::NotCityJson(raw.kind));
        }

        let (scale, translate) = raw
            .transform
            .map_or(([1.0; 3], [0.0; 3]), |t| (t.scale, t.translate));
        let vertices = raw
            .vertices
            .iter()
            .map(|v| {
                Point3::new(
                    v[0] * scale[0] + translate[0],
                    v[1] * scale[1] + translate[1],
                    v[2] * scale[2] + translate[2],
                )
            })
            .collect();

        Ok(Self {
            version: raw.version,
            objects: raw.city_objects,
            vertices,
        })
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Every object with the detail levels it carries, in id order.
    pub fn object_summaries(&self) -> Result<Vec<ObjectSummary>, ParseError> {
        self.objects
            .iter()
            .map(|(id, object)| {
                let mut lods = Vec::new();
                for geometry in &object.geometry {
                    if let Some(value) = &geometry.lod {
                        let lod = parse_lod(id, value)?;
                        if !lods.iter().any(|&known| lod_matches(known, lod)) {
                            lods.push(lod);
                        }
                    }
                }
                lods.sort_by(f64::total_cmp);
                Ok(ObjectSummary {
                    id: id.clone(),
                    kind: object.kind.clone(),
                    lods,
                    children: object.children.len(),
                })
            })
            .collect()
    }

    /// Records for `ids`, in that order, at detail level `lod`.
    ///
    /// An empty `ids` selects every object with its own geometry at `lod`,
    /// in ascending id order.
    pub fn select(&self, ids: &[String], lod: f64) -> Result<Vec<ObjectRecord>, ParseError> {
        if !ids.is_empty() {
            return ids.iter().map(|id| self.record(id, lod)).collect();
        }

        let mut records = Vec::new();
        for (id, object) in &self.objects {
            let surfaces = self.own_surfaces(id, object, lod)?;
            if !surfaces.is_empty() {
                records.push(ObjectRecord::new(id.clone(), lod, surfaces));
            }
        }
        Ok(records)
    }

    /// Record for one object. Falls back to the object's children when it has
    /// no geometry of its own at `lod`.
    pub fn record(&self, id: &str, lod: f64) -> Result<ObjectRecord, ParseError> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| ParseError::ObjectNotFound(id.to_string()))?;

        let mut surfaces = self.own_surfaces(id, object, lod)?;
        if surfaces.is_empty() {
            for child_id in &object.children {
                let child = self
                    .objects
                    .get(child_id)
                    .ok_or_else(|| ParseError::ObjectNotFound(child_id.clone()))?;
                surfaces.extend(self.own_surfaces(child_id, child, lod)?);
            }
        }

        if surfaces.is_empty() {
            return Err(ParseError::LodNotFound {
                id: id.to_string(),
                lod,
            });
        }
        Ok(ObjectRecord::new(id, lod, surfaces))
    }

    fn own_surfaces(
        &self,
        id: &str,
        object: &RawCityObject,
        lod: f64,
    ) -> Result<Vec<Surface>, ParseError> {
        let mut surfaces = Vec::new();
        for geometry in &object.geometry {
            let Some(value) = &geometry.lod else {
                continue;
            };
            if !lod_matches(parse_lod(id, value)?, lod) {
                continue;
            }
            for rings in boundary_surfaces(id, geometry)? {
                if let Some(surface) = self.resolve_surface(id, &rings)? {
                    surfaces.push(surface);
                }
            }
        }
        Ok(surfaces)
    }

    fn resolve_surface(&self, id: &str, rings: &[Ring]) -> Result<Option<Surface>, ParseError> {
        let mut points = rings
            .iter()
            .map(|ring| self.resolve_ring(id, ring))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();

        Ok(points
            .next()
            .map(|outer| Surface::with_holes(outer, points.collect())))
    }

    fn resolve_ring(&self, id: &str, ring: &[usize]) -> Result<Vec<Point3<f64>>, ParseError> {
        let mut indices = ring;
        // Some writers repeat the first vertex at the end
        if indices.len() > 1 && indices.first() == indices.last() {
            indices = &indices[..indices.len() - 1];
        }

        indices
            .iter()
            .map(|&index| {
                self.vertices
                    .get(index)
                    .copied()
                    .ok_or_else(|| ParseError::VertexIndex {
                        id: id.to_string(),
                        index,
                        count: self.vertices.len(),
                    })
            })
            .collect()
    }
}

/// Read `path` and select `ids` at detail level `lod`.
pub fn parse_and_select(
    path: impl AsRef<Path>,
    ids: &[String],
    lod: f64,
) -> Result<Vec<ObjectRecord>, ParseError> {
    CityJsonDocument::from_path(path)?.select(ids, lod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Unit cube as a CityJSON Solid shell over vertices 0..8.
    fn cube_shell(base: usize) -> Value {
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        Value::Array(
            faces
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

    fn document() -> String {
        let mut vertices = cube_vertices(0);
        vertices.extend(cube_vertices(2000));
        vertices.extend(cube_vertices(4000));

        json!({
            "type": "CityJSON",
            "version": "1.1",
            "transform": { "scale": [0.001, 0.001, 0.001], "translate": [100.0, 200.0, 0.0] },
            "CityObjects": {
                "b2": {
                    "type": "Building",
                    "geometry": [
                        { "type": "Solid", "lod": "2.2", "boundaries": [cube_shell(8)] },
                        { "type": "MultiSurface", "lod": 1.2, "boundaries": cube_shell(8) }
                    ]
                },
                "b1": {
                    "type": "Building",
                    "geometry": [{ "type": "Solid", "lod": "2.2", "boundaries": [cube_shell(0)] }]
                },
                "b3": { "type": "Building", "children": ["b3-part"] },
                "b3-part": {
                    "type": "BuildingPart",
                    "geometry": [{ "type": "Solid", "lod": "2.2", "boundaries": [cube_shell(16)] }]
                }
            },
            "vertices": vertices
        })
        .to_string()
    }

    #[test]
    fn test_select_by_id_keeps_order() {
        let document = CityJsonDocument::parse(&document()).unwrap();
        let ids = vec!["b2".to_string(), "b1".to_string()];
        let records = document.select(&ids, 2.2).unwrap();

        assert_eq!(document.version(), Some("1.1"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "b2");
        assert_eq!(records[1].id(), "b1");
        assert_eq!(records[0].surfaces().len(), 6);
    }

    #[test]
    fn test_transform_is_applied() {
        let document = CityJsonDocument::parse(&document()).unwrap();
        let record = document.record("b2", 2.2).unwrap();
        let first = record.surfaces()[0].outer()[0];

        assert!((first.x - 102.0).abs() < 1e-9);
        assert!((first.y - 200.0).abs() < 1e-9);
        assert!((first.z - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_children_fallback() {
        let document = CityJsonDocument::parse(&document()).unwrap();
        let record = document.record("b3", 2.2).unwrap();
        assert_eq!(record.id(), "b3");
        assert_eq!(record.surfaces().len(), 6);
    }

    #[test]
    fn test_select_all_at_lod() {
        let document = CityJsonDocument::parse(&document()).unwrap();

        let ids: Vec<String> = document
            .select(&[], 2.2)
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, ["b1", "b2", "b3-part"]);

        let lod12 = document.select(&[], 1.2).unwrap();
        assert_eq!(lod12.len(), 1);
        assert_eq!(lod12[0].id(), "b2");
    }

    #[test]
    fn test_missing_object_and_lod() {
        let document = CityJsonDocument::parse(&document()).unwrap();
        assert!(matches!(
            document.select(&["nope".to_string()], 2.2),
            Err(ParseError::ObjectNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            document.record("b1", 1.3),
            Err(ParseError::LodNotFound { .. })
        ));
    }

    #[test]
    fn test_summaries() {
        let document = CityJsonDocument::parse(&document()).unwrap();
        let summaries = document.object_summaries().unwrap();

        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[1].id, "b2");
        assert_eq!(summaries[1].lods, vec![1.2, 2.2]);
        assert_eq!(summaries[2].children, 1);
    }

    #[test]
    fn test_closing_vertex_is_dropped() {
        let text = json!({
            "type": "CityJSON",
            "CityObjects": {
                "t": {
                    "type": "Building",
                    "geometry": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 2, 0]]] }]
                }
            },
            "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]
        })
        .to_string();

        let document = CityJsonDocument::parse(&text).unwrap();
        assert_eq!(document.version(), None);
        let record = document.record("t", 1.0).unwrap();
        assert_eq!(record.surfaces()[0].outer().len(), 3);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            CityJsonDocument::parse("{ not json"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            CityJsonDocument::parse(r#"{ "type": "FeatureCollection" }"#),
            Err(ParseError::NotCityJson(kind)) if kind == "FeatureCollection"
        ));

        let bad_index = json!({
            "type": "CityJSON",
            "CityObjects": {
                "t": { "type": "Building", "geometry": [{ "type": "MultiSurface", "lod": "1", "boundaries": [[[0, 1, 7]]] }] }
            },
            "vertices": [[0, 0, 0], [1, 0, 0]]
        })
        .to_string();
        let document = CityJsonDocument::parse(&bad_index).unwrap();
        assert!(matches!(
            document.record("t", 1.0),
            Err(ParseError::VertexIndex { index: 7, count: 2, .. })
        ));

        let bad_boundaries = json!({
            "type": "CityJSON",
            "CityObjects": {
                "t": { "type": "Building", "geometry": [{ "type": "Solid", "lod": "1", "boundaries": [[0, 1, 2]] }] }
            },
            "vertices": []
        })
        .to_string();
        let document = CityJsonDocument::parse(&bad_boundaries).unwrap();
        assert!(matches!(
            document.record("t", 1.0),
            Err(ParseError::Boundaries { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CityJsonDocument::from_path("/definitely/not/here.city.json"),
            Err(ParseError::Io { .. })
        ));
    }
}
