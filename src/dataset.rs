//! Read-only user dataset
//!
//! Loaded once per process before the listener is bound and never mutated
//! afterwards, so every worker holds its own copy and no locking is needed.

use crate::error::{DatasetError, LookupError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::PathBuf;

const BUNDLED_DATASET: &str = include_str!("../data/db.json");

/// A single user record.
///
/// Only `id` has fixed meaning; every other field is carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DatasetDocument {
    users: Vec<User>,
}

/// Where the dataset is read from at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatasetSource {
    /// The JSON document compiled into the binary
    #[default]
    Bundled,
    File(PathBuf),
}

impl DatasetSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(DatasetSource::Bundled, DatasetSource::File)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    users: Vec<User>,
}

impl Dataset {
    /// Build a dataset from records, rejecting duplicate ids.
    pub fn new(users: Vec<User>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(users.len());
        for user in &users {
            if !seen.insert(user.id) {
                return Err(DatasetError::DuplicateId { id: user.id });
            }
        }
        Ok(Self { users })
    }

    /// Parse a `{"users": [...]}` document.
    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        let document: DatasetDocument = serde_json::from_str(text)?;
        Self::new(document.users)
    }

    pub fn bundled() -> Result<Self, DatasetError> {
        Self::from_json_str(BUNDLED_DATASET)
    }

    pub fn load(source: &DatasetSource) -> Result<Self, DatasetError> {
        match source {
            DatasetSource::Bundled => Self::bundled(),
            DatasetSource::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::from_json_str(&text)
            }
        }
    }

    /// All records in load order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Resolve a raw path segment to a user.
    ///
    /// The segment must be a base-10 integer; anything else, or an id that is
    /// not in the dataset, is `NotFound`.
    pub fn lookup(&self, raw: &str) -> Result<&User, LookupError> {
        raw.parse::<i64>()
            .ok()
            .and_then(|id| self.find(id))
            .ok_or_else(|| LookupError::NotFound {
                raw: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    const SAMPLE: &str = r#"{"users":[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]}"#;

    fn sample() -> Dataset {
        Dataset::from_json_str(SAMPLE).expect("sample dataset parses")
    }

    #[test]
    fn keeps_load_order() {
        let ids: Vec<i64> = sample().users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn lookup_returns_matching_record() {
        let dataset = sample();
        let user = dataset.lookup("1").expect("user 1 exists");
        assert_eq!(
            serde_json::to_value(user).unwrap(),
            json!({"id": 1, "name": "Alice"})
        );
    }

    #[test_case("99" ; "absent id")]
    #[test_case("0" ; "zero")]
    #[test_case("-1" ; "negative")]
    #[test_case("abc" ; "non numeric")]
    #[test_case("1abc" ; "numeric prefix")]
    #[test_case(" 1" ; "leading whitespace")]
    #[test_case("99999999999999999999" ; "overflow")]
    fn lookup_miss_is_not_found(raw: &str) {
        assert_eq!(
            sample().lookup(raw),
            Err(LookupError::NotFound { raw: raw.to_string() })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Dataset::from_json_str(r#"{"users":[{"id":5},{"id":5}]}"#).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateId { id: 5 }));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            Dataset::from_json_str("{\"users\": [").unwrap_err(),
            DatasetError::Parse(_)
        ));
        assert!(matches!(
            Dataset::from_json_str(r#"{"users":[{"name":"no id"}]}"#).unwrap_err(),
            DatasetError::Parse(_)
        ));
    }

    #[test]
    fn bundled_dataset_loads() {
        let dataset = Dataset::load(&DatasetSource::Bundled).expect("bundled dataset is valid");
        assert!(!dataset.is_empty());
        assert_eq!(dataset.find(1).and_then(|u| u.profile.get("name")), Some(&json!("Alice")));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/usersvc/db.json");
        match Dataset::load(&DatasetSource::File(path.clone())) {
            Err(DatasetError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
