use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            tag: None,
            modified: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub name: String,
    pub path: String,
}

impl EnvironmentInfo {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CatalogKind {
    Models,
    Environments,
    Probes,
}

impl CatalogKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Models => "models",
            CatalogKind::Environments => "environments",
            CatalogKind::Probes => "probes",
        }
    }
}

/// Snapshot of selectable resources, fetched once at startup.
///
/// A catalog whose fetch failed is empty and carries an issue describing why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCatalogs {
    pub models: Vec<ModelInfo>,
    pub environments: Vec<EnvironmentInfo>,
    pub probes: Vec<String>,
    issues: BTreeMap<CatalogKind, String>,
}

impl ResourceCatalogs {
    /// Record that a catalog could not be loaded and drop whatever it held.
    pub fn degrade(&mut self, kind: CatalogKind, reason: impl Into<String>) {
        match kind {
            CatalogKind::Models => self.models.clear(),
            CatalogKind::Environments => self.environments.clear(),
            CatalogKind::Probes => self.probes.clear(),
        }
        self.issues.insert(kind, reason.into());
    }

    #[must_use]
    pub fn issue(&self, kind: CatalogKind) -> Option<&str> {
        self.issues.get(&kind).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self, kind: CatalogKind) -> usize {
        match kind {
            CatalogKind::Models => self.models.len(),
            CatalogKind::Environments => self.environments.len(),
            CatalogKind::Probes => self.probes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self, kind: CatalogKind) -> bool {
        self.len(kind) == 0
    }

    #[must_use]
    pub fn contains_model(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }

    #[must_use]
    pub fn contains_environment(&self, name: &str) -> bool {
        self.environments.iter().any(|e| e.name == name)
    }

    #[must_use]
    pub fn contains_probe(&self, name: &str) -> bool {
        self.probes.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrade_empties_only_that_catalog() {
        let mut catalogs = ResourceCatalogs {
            models: vec![ModelInfo::new("llama3", "4.7 GB")],
            environments: vec![EnvironmentInfo::new("garak", "/opt/conda/envs/garak")],
            probes: vec!["dan.Dan_11_0".into()],
            ..ResourceCatalogs::default()
        };

        catalogs.degrade(CatalogKind::Environments, "Conda not available");

        assert!(catalogs.is_empty(CatalogKind::Environments));
        assert_eq!(
            catalogs.issue(CatalogKind::Environments),
            Some("Conda not available")
        );
        assert!(catalogs.contains_model("llama3"));
        assert!(catalogs.contains_probe("dan.Dan_11_0"));
        assert_eq!(catalogs.issue(CatalogKind::Models), None);
    }

    #[test]
    fn test_model_info_tolerates_extra_fields() {
        let json = r#"{"name":"llama3","tag":"latest","size":"4.7","modified":"2 days ago"}"#;
        let model: ModelInfo = serde_json::from_str(json).unwrap();
        assert_eq!(model.name, "llama3");
        assert_eq!(model.tag.as_deref(), Some("latest"));

        let bare: ModelInfo = serde_json::from_str(r#"{"name":"m","size":"1"}"#).unwrap();
        assert_eq!(bare.modified, None);
    }
}
