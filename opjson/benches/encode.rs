//! Encoding benchmarks over synthetic GeoJSON and map-heavy documents.

use std::collections::HashMap;

use divan::{Bencher, black_box};
use opjson::{EncodeOptions, describe};

fn main() {
    divan::main();
}

// =============================================================================
// Types
// =============================================================================

describe! {
    struct FeatureCollection {
        #[json(rename = "type")]
        type_: String,
        features: Vec<Feature>,
    }
}

describe! {
    struct Feature {
        #[json(rename = "type")]
        type_: String,
        properties: Properties,
        geometry: Geometry,
    }
}

describe! {
    struct Properties {
        name: String,
        #[json(omitempty)]
        population: u64,
    }
}

describe! {
    struct Geometry {
        #[json(rename = "type")]
        type_: String,
        coordinates: Vec<Vec<Vec<f64>>>,
    }
}

describe! {
    struct Catalog {
        entries: HashMap<String, Entry>,
    }
}

describe! {
    struct Entry {
        id: u32,
        title: String,
        tags: Vec<String>,
    }
}

// =============================================================================
// Data
// =============================================================================

fn collection() -> FeatureCollection {
    let ring = |offset: f64| {
        (0..200)
            .map(|i| {
                let t = i as f64 / 200.0;
                vec![-65.0 + offset + t * 1.25, 43.0 + t * 0.0371]
            })
            .collect::<Vec<_>>()
    };
    FeatureCollection {
        type_: "FeatureCollection".into(),
        features: (0..20)
            .map(|i| Feature {
                type_: "Feature".into(),
                properties: Properties {
                    name: format!("Region <{i}>"),
                    population: i * 1000,
                },
                geometry: Geometry {
                    type_: "Polygon".into(),
                    coordinates: (0..5).map(|r| ring(r as f64 * 0.5)).collect(),
                },
            })
            .collect(),
    }
}

fn catalog() -> Catalog {
    Catalog {
        entries: (0..1000u32)
            .map(|id| {
                (
                    format!("entry-{:x}", id.wrapping_mul(2654435761)),
                    Entry {
                        id,
                        title: format!("Entry \"{id}\" & friends"),
                        tags: vec!["a".into(), "b".into()],
                    },
                )
            })
            .collect(),
    }
}

// =============================================================================
// Benchmarks
// =============================================================================

#[divan::bench]
fn geojson_compact(bencher: Bencher) {
    let data = collection();
    bencher.bench(|| black_box(opjson::to_vec(black_box(&data)).unwrap()));
}

#[divan::bench]
fn geojson_pretty(bencher: Bencher) {
    let data = collection();
    bencher.bench(|| black_box(opjson::to_vec_pretty(black_box(&data)).unwrap()));
}

#[divan::bench]
fn catalog_sorted(bencher: Bencher) {
    let data = catalog();
    bencher.bench(|| black_box(opjson::to_vec(black_box(&data)).unwrap()));
}

#[divan::bench]
fn catalog_unordered(bencher: Bencher) {
    let data = catalog();
    let options = EncodeOptions::default().unordered_map();
    bencher.bench(|| black_box(opjson::to_vec_with_options(black_box(&data), &options).unwrap()));
}
