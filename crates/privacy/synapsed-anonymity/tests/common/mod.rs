//! Common test utilities and helpers.
#![allow(dead_code)]

use synapsed_anonymity::{Dataset, HierarchyManager};
use tracing_subscriber::EnvFilter;

pub const EDUCATION: [&str; 16] = [
    "Preschool",
    "1st-4th",
    "5th-6th",
    "7th-8th",
    "9th",
    "10th",
    "11th",
    "12th",
    "HS-grad",
    "Some-college",
    "Assoc-voc",
    "Assoc-acdm",
    "Bachelors",
    "Masters",
    "Prof-school",
    "Doctorate",
];

pub const MARITAL: [&str; 7] = [
    "Married-civ-spouse",
    "Married-spouse-absent",
    "Married-AF-spouse",
    "Never-married",
    "Divorced",
    "Separated",
    "Widowed",
];

pub const RACE: [&str; 5] = ["White", "Black", "Asian-Pac-Islander", "Amer-Indian-Eskimo", "Other"];

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("synapsed_anonymity=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

/// `(age, education, marital-status, race)` with its k
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str, usize);

pub fn dataset(manager: &HierarchyManager, rows: &[Row<'_>]) -> Dataset {
    let mut builder = Dataset::builder(manager);
    for (age, education, marital, race, k) in rows {
        builder
            .push(
                [
                    ("age", *age),
                    ("education", *education),
                    ("marital-status", *marital),
                    ("race", *race),
                ],
                *k,
            )
            .unwrap();
    }
    builder.build()
}

/// Dataset built from domain indices, as produced by proptest strategies
pub fn indexed_dataset(manager: &HierarchyManager, rows: &[(i64, usize, usize, usize, usize)]) -> Dataset {
    let mut builder = Dataset::builder(manager);
    for &(age, education, marital, race, k) in rows {
        let age = age.to_string();
        builder
            .push(
                [
                    ("age", age.as_str()),
                    ("education", EDUCATION[education % EDUCATION.len()]),
                    ("marital-status", MARITAL[marital % MARITAL.len()]),
                    ("race", RACE[race % RACE.len()]),
                ],
                k,
            )
            .unwrap();
    }
    builder.build()
}

/// Deterministic spread of records over the whole Adult domain
pub fn synthetic_dataset(manager: &HierarchyManager, size: usize) -> Dataset {
    let rows: Vec<(i64, usize, usize, usize, usize)> = (0..size)
        .map(|i| {
            let age = 17 + ((i * 37) % 74) as i64;
            let k = match i % 20 {
                0..=13 => 2,
                14..=17 => 3,
                18 => 4,
                _ => 5,
            };
            (age, (i * 7) % 16, (i * 3) % 7, (i / 5) % 5, k)
        })
        .collect();
    indexed_dataset(manager, &rows)
}

/// Four identical records plus two singletons sharing nothing with them
pub fn singleton_scenario(manager: &HierarchyManager) -> Dataset {
    dataset(
        manager,
        &[
            ("25", "HS-grad", "Never-married", "White", 2),
            ("25", "HS-grad", "Never-married", "White", 2),
            ("25", "HS-grad", "Never-married", "White", 2),
            ("25", "HS-grad", "Never-married", "White", 2),
            ("47", "Doctorate", "Married-civ-spouse", "Asian-Pac-Islander", 2),
            ("70", "Preschool", "Divorced", "Black", 2),
        ],
    )
}

/// Two ages by two races, everything else shared
pub fn four_corners(manager: &HierarchyManager) -> Dataset {
    dataset(
        manager,
        &[
            ("20", "HS-grad", "Never-married", "White", 2),
            ("60", "HS-grad", "Never-married", "White", 2),
            ("20", "HS-grad", "Never-married", "Black", 2),
            ("60", "HS-grad", "Never-married", "Black", 2),
        ],
    )
}
