//! The action catalog

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Fixed ordered list of action labels understood by the environment
///
/// The order is also the column order of the Q-table, so it must not
/// change between a run that saves a table and one that loads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ActionCatalog {
    labels: Vec<String>,
}

impl ActionCatalog {
    /// Create a catalog from labels; rejects empty and duplicate entries
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(RLError::InvalidConfig("action catalog is empty".to_string()));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(RLError::InvalidConfig(format!(
                    "action {i} has an empty label"
                )));
            }
            if labels[..i].contains(label) {
                return Err(RLError::InvalidConfig(format!(
                    "duplicate action label {label:?}"
                )));
            }
        }
        Ok(Self { labels })
    }

    /// Number of actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; an empty catalog cannot be constructed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for an action index
    pub fn label(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(RLError::InvalidAction {
                index,
                len: self.labels.len(),
            })
    }

    /// Index for an action label
    pub fn index(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| RLError::UnknownAction(label.to_string()))
    }

    /// Draw an action index uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.labels.len())
    }

    /// Labels in catalog order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self {
            labels: vec!["left".to_string(), "right".to_string(), "jump".to_string()],
        }
    }
}

impl TryFrom<Vec<String>> for ActionCatalog {
    type Error = RLError;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<ActionCatalog> for Vec<String> {
    fn from(catalog: ActionCatalog) -> Self {
        catalog.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn default_catalog_order() {
        let catalog = ActionCatalog::default();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.label(0).unwrap(), "left");
        assert_eq!(catalog.label(2).unwrap(), "jump");
        assert_eq!(catalog.index("right").unwrap(), 1);
    }

    #[test]
    fn unknown_label_and_bad_index() {
        let catalog = ActionCatalog::default();
        assert!(matches!(catalog.index("crouch"), Err(RLError::UnknownAction(l)) if l == "crouch"));
        assert!(matches!(
            catalog.label(3),
            Err(RLError::InvalidAction { index: 3, len: 3 })
        ));
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(ActionCatalog::new(Vec::<String>::new()).is_err());
        assert!(ActionCatalog::new(["left", "left"]).is_err());
        assert!(ActionCatalog::new(["left", " "]).is_err());
    }

    #[test]
    fn deserializes_from_label_list() {
        let catalog: ActionCatalog = serde_json::from_str(r#"["up","down"]"#).unwrap();
        assert_eq!(catalog.index("down").unwrap(), 1);
        assert!(serde_json::from_str::<ActionCatalog>(r#"["up","up"]"#).is_err());
    }

    #[test]
    fn sample_stays_in_range() {
        let catalog = ActionCatalog::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(catalog.sample(&mut rng) < catalog.len());
        }
    }
}
