//! Subject catalog.
//!
//! Tags are drawn from five broad research fields with five sub-fields
//! each. A submission picks one broad field and any of its sub-fields.

use crate::error::{ResearchError, Result};
use serde::Serialize;

/// A broad research field and its sub-fields
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub subfields: &'static [&'static str],
}

const CATALOG: &[Field] = &[
    Field {
        name: "Computer Science",
        subfields: &[
            "Artificial Intelligence",
            "Machine Learning",
            "Data Science",
            "Computer Vision",
            "Natural Language Processing",
        ],
    },
    Field {
        name: "Medical",
        subfields: &[
            "Biotechnology",
            "Genetics",
            "Neuroscience",
            "Immunology",
            "Medical Imaging",
        ],
    },
    Field {
        name: "Physics",
        subfields: &[
            "Quantum Mechanics",
            "Astrophysics",
            "Nuclear Physics",
            "Condensed Matter Physics",
            "Particle Physics",
        ],
    },
    Field {
        name: "Chemistry",
        subfields: &[
            "Organic Chemistry",
            "Inorganic Chemistry",
            "Biochemistry",
            "Physical Chemistry",
            "Analytical Chemistry",
        ],
    },
    Field {
        name: "Engineering",
        subfields: &[
            "Electrical Engineering",
            "Mechanical Engineering",
            "Civil Engineering",
            "Aerospace Engineering",
            "Biomedical Engineering",
        ],
    },
];

/// All broad fields in display order
pub fn catalog() -> &'static [Field] {
    CATALOG
}

/// Look up a broad field by name (case-insensitive)
pub fn field(name: &str) -> Option<&'static Field> {
    let name = name.trim();
    CATALOG.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Check that every tag is a sub-field of `field_name`.
///
/// Returns the tags in canonical spelling, in the order given.
pub fn validate_tags(field_name: &str, tags: &[String]) -> Result<Vec<String>> {
    let field = field(field_name).ok_or_else(|| {
        ResearchError::Validation(format!("Unknown research field '{}'", field_name.trim()))
    })?;

    tags.iter()
        .map(|tag| {
            field
                .subfields
                .iter()
                .find(|s| s.eq_ignore_ascii_case(tag.trim()))
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    ResearchError::Validation(format!(
                        "'{}' is not a sub-field of {}",
                        tag.trim(),
                        field.name
                    ))
                })
        })
        .collect()
}
