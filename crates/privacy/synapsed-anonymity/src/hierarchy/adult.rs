//! Built-in hierarchies for the Adult census dataset
//!
//! Quasi-identifiers: age (17-90), education (16 categories), marital status
//! (7 categories) and race (5 categories).

use super::{Hierarchy, HierarchySpec, IntervalLevel};
use crate::error::Result;

pub const AGE: &str = "age";
pub const EDUCATION: &str = "education";
pub const MARITAL_STATUS: &str = "marital-status";
pub const RACE: &str = "race";

/// Ages observed in the Adult dataset
pub const AGE_DOMAIN: std::ops::RangeInclusive<i64> = 17..=90;

/// Age: 5-year bands, 10-year bands, life stages, suppressed.
///
/// Life stages are cut on the 10-year grid (Young < 37 <= Adult < 57 <= Senior)
/// so that no 10-year band straddles two stages.
pub fn age() -> Result<Hierarchy> {
    let mut five_year = IntervalLevel::new("five_year_ranges", 0.2);
    for lower in (17..72).step_by(5) {
        five_year = five_year.band(lower, format!("[{}-{})", lower, lower + 5));
    }
    five_year = five_year.band(72, "[72+)");

    let mut ten_year = IntervalLevel::new("ten_year_ranges", 0.4);
    for lower in (17..67).step_by(10) {
        ten_year = ten_year.band(lower, format!("[{}-{})", lower, lower + 10));
    }
    ten_year = ten_year.band(67, "[67+)");

    let life_stages = IntervalLevel::new("life_stages", 0.7)
        .band(17, "Young")
        .band(37, "Adult")
        .band(57, "Senior");

    Hierarchy::from_intervals(AGE, AGE_DOMAIN, vec![five_year, ten_year, life_stages])
}

/// Education: detailed level, education level, degree / no degree, suppressed
pub fn education() -> Result<Hierarchy> {
    let detailed = [
        ("Preschool", "Elementary"),
        ("1st-4th", "Elementary"),
        ("5th-6th", "Elementary"),
        ("7th-8th", "Middle"),
        ("9th", "Middle"),
        ("10th", "High-School"),
        ("11th", "High-School"),
        ("12th", "High-School"),
        ("HS-grad", "High-School"),
        ("Some-college", "Some-College"),
        ("Assoc-voc", "Associate"),
        ("Assoc-acdm", "Associate"),
        ("Bachelors", "Bachelors"),
        ("Masters", "Graduate"),
        ("Prof-school", "Graduate"),
        ("Doctorate", "Graduate"),
    ];
    let domain = detailed.iter().map(|(from, _)| from.to_string()).collect();

    HierarchySpec::new(EDUCATION, domain)
        .level("detailed_level", 0.15, detailed)
        .level(
            "education_level",
            0.35,
            [
                ("Elementary", "K12"),
                ("Middle", "K12"),
                ("High-School", "K12"),
                ("Some-College", "Some-College"),
                ("Associate", "College-Degree"),
                ("Bachelors", "College-Degree"),
                ("Graduate", "Graduate-Degree"),
            ],
        )
        .level(
            "broad_category",
            0.65,
            [
                ("K12", "No-Degree"),
                ("Some-College", "No-Degree"),
                ("College-Degree", "Degree"),
                ("Graduate-Degree", "Degree"),
            ],
        )
        .build()
}

/// Marital status: relationship status, partnership status, suppressed
pub fn marital_status() -> Result<Hierarchy> {
    let relationship = [
        ("Married-civ-spouse", "Married"),
        ("Married-spouse-absent", "Married"),
        ("Married-AF-spouse", "Married"),
        ("Never-married", "Single"),
        ("Divorced", "Previously-Married"),
        ("Separated", "Previously-Married"),
        ("Widowed", "Previously-Married"),
    ];
    let domain = relationship.iter().map(|(from, _)| from.to_string()).collect();

    HierarchySpec::new(MARITAL_STATUS, domain)
        .level("relationship_status", 0.3, relationship)
        .level(
            "partnership_status",
            0.6,
            [
                ("Married", "Partnered"),
                ("Single", "Not-Partnered"),
                ("Previously-Married", "Not-Partnered"),
            ],
        )
        .build()
}

/// Race: a single "Person" category, then suppressed
pub fn race() -> Result<Hierarchy> {
    let races = ["White", "Black", "Asian-Pac-Islander", "Amer-Indian-Eskimo", "Other"];
    HierarchySpec::new(RACE, races.iter().map(|r| r.to_string()).collect())
        .level("person", 0.8, races.iter().map(|r| (*r, "Person")))
        .build()
}

/// All four hierarchies in attribute order
pub fn all() -> Result<Vec<Hierarchy>> {
    Ok(vec![age()?, education()?, marital_status()?, race()?])
}
