// Bundled datasets used when no external workflow is configured

use serde::Deserialize;

use super::{ChatError, ChatResult};
use crate::models::chat::DataRow;

const CARS_JSON: &str = include_str!("../../../fixtures/cars.json");
const STUDENTS_JSON: &str = include_str!("../../../fixtures/students.json");

/// Starter questions offered before the first turn
pub const SUGGESTED_PROMPTS: [&str; 4] = [
    "查询 7 天订单趋势",
    "查询 30 天订单趋势",
    "查询 10 个月订单趋势",
    "查询 1 年订单趋势",
];

/// Name of a bundled dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fixture {
    #[default]
    Cars,
    Students,
}

impl Fixture {
    pub fn name(&self) -> &'static str {
        match self {
            Fixture::Cars => "cars",
            Fixture::Students => "students",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Fixture::Cars => CARS_JSON,
            Fixture::Students => STUDENTS_JSON,
        }
    }

    /// Parse the dataset's rows
    pub fn rows(&self) -> ChatResult<Vec<DataRow>> {
        let file: FixtureFile = serde_json::from_str(self.source())
            .map_err(|e| ChatError::Fixture(format!("Invalid {} dataset: {}", self.name(), e)))?;
        Ok(file.data_source)
    }
}

impl std::str::FromStr for Fixture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cars" => Ok(Fixture::Cars),
            "students" => Ok(Fixture::Students),
            _ => Err(format!("Unknown fixture: {}", s)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureFile {
    data_source: Vec<DataRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cars_dataset() {
        let rows = Fixture::Cars.rows().unwrap();
        assert!(!rows.is_empty());
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys[0], "Name");
        assert!(rows.iter().all(|r| r.contains_key("Horsepower")));
    }

    #[test]
    fn test_suggested_prompts() {
        assert!(SUGGESTED_PROMPTS.iter().all(|p| p.ends_with("订单趋势")));
        assert_eq!(Fixture::default(), Fixture::Cars);
    }

    #[test]
    fn test_students_dataset() {
        let rows = Fixture::Students.rows().unwrap();
        assert!(rows.iter().all(|r| r.contains_key("math")));
        assert_eq!("Students".parse::<Fixture>().unwrap(), Fixture::Students);
        assert!("planes".parse::<Fixture>().is_err());
    }
}
