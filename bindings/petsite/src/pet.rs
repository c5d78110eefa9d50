use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Fields every entry returned by the search API must carry.
pub const REQUIRED_PET_FIELDS: [&str; 4] = ["pettype", "petid", "petcolor", "availability"];

/// A pet as the search API describes it. Extra fields such as price and image are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub pettype: String,
    pub petid: String,
    pub petcolor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

impl Pet {
    pub fn new(
        pettype: impl Into<String>,
        petcolor: impl Into<String>,
        petid: impl Into<String>,
    ) -> Self {
        Self {
            pettype: pettype.into(),
            petid: petid.into(),
            petcolor: petcolor.into(),
            availability: None,
        }
    }

    /// The pet the fixed adoption workflow adopts.
    pub fn test_pet() -> Self {
        Self::new("dog", "brown", "test-123")
    }
}

/// Check the structure of a search API response.
///
/// Returns the first problem found, in the form it is written to the report.
pub fn validate_pet_listing(pets: &serde_json::Value) -> Result<usize, String> {
    let pets = match pets.as_array() {
        Some(pets) if !pets.is_empty() => pets,
        _ => return Err("Invalid pets data structure or empty response".to_string()),
    };

    for (index, pet) in pets.iter().enumerate() {
        for field in REQUIRED_PET_FIELDS {
            if pet.get(field).is_none() {
                return Err(format!("Missing required field: {field} (pet {index})"));
            }
        }
    }

    Ok(pets.len())
}

/// Count pets per type for the first `limit` types, in the order the types first appear.
pub fn type_counts(pets: &[Pet], limit: usize) -> Vec<(String, usize)> {
    let counts = pets.iter().counts_by(|pet| pet.pettype.as_str());

    pets.iter()
        .map(|pet| pet.pettype.as_str())
        .unique()
        .take(limit)
        .map(|pettype| (pettype.to_string(), counts.get(pettype).copied().unwrap_or(0)))
        .collect()
}
