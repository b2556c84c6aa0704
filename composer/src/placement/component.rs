//! Component bean: the subject of a placement

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Generate a fresh component or composite UID
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A component to instantiate somewhere in the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawComponent {
    /// Unique identifier of this component instance
    #[serde(default = "new_uid")]
    pub uid: String,
    /// Instance name, unique in its composition
    pub name: String,
    /// Factory instantiating the component
    pub factory: String,
    /// Implementation language of the factory
    pub language: String,
    /// Isolate hosting the component, once placed
    #[serde(default)]
    pub isolate: Option<String>,
    /// Node hosting the component, once placed
    #[serde(default)]
    pub node: Option<String>,
    /// Instance properties
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl RawComponent {
    /// Create a component with a generated UID
    pub fn new(
        name: impl Into<String>,
        factory: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            uid: new_uid(),
            name: name.into(),
            factory: factory.into(),
            language: language.into(),
            isolate: None,
            node: None,
            properties: BTreeMap::new(),
        }
    }

    /// Replace the generated UID
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Set an instance property
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Whether the component has been assigned to an isolate
    pub fn is_placed(&self) -> bool {
        self.isolate.is_some()
    }
}

impl std::fmt::Display for RawComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.factory, self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uids_are_unique() {
        let a = RawComponent::new("a", "factory", "python");
        let b = RawComponent::new("a", "factory", "python");
        assert_ne!(a.uid, b.uid);
        assert!(!a.is_placed());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let component: RawComponent = serde_json::from_str(
            r#"{"name": "logger", "factory": "logger-factory", "language": "rust"}"#,
        )
        .unwrap();

        assert!(!component.uid.is_empty());
        assert_eq!(component.isolate, None);
        assert!(component.properties.is_empty());
        assert_eq!(component.to_string(), "logger (logger-factory/rust)");
    }
}
