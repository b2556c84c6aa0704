//! Composition beans: the tree of composites describing an application

use serde::{Deserialize, Serialize};

use crate::placement::component::{new_uid, RawComponent};

/// Intermediate node of a composition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    #[serde(default = "new_uid")]
    pub uid: String,
    pub name: String,
    /// Components declared directly in this composite
    #[serde(default)]
    pub components: Vec<RawComponent>,
    /// Child composites
    #[serde(default)]
    pub composites: Vec<Composite>,
}

impl Composite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uid: new_uid(),
            name: name.into(),
            components: Vec::new(),
            composites: Vec::new(),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_component(mut self, component: RawComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_composite(mut self, composite: Composite) -> Self {
        self.composites.push(composite);
        self
    }

    /// This composite and all its descendants, depth-first, each composite
    /// before its children
    pub fn walk(&self) -> Vec<&Composite> {
        let mut visited = Vec::new();
        let mut stack = vec![self];
        while let Some(composite) = stack.pop() {
            visited.push(composite);
            stack.extend(composite.composites.iter().rev());
        }
        visited
    }

    /// Components of the whole subtree, in walk order
    pub fn all_components(&self) -> Vec<&RawComponent> {
        self.walk()
            .into_iter()
            .flat_map(|composite| composite.components.iter())
            .collect()
    }
}

/// A named composition, rooted at a composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default = "new_uid")]
    pub uid: String,
    pub name: String,
    pub root: Composite,
}

impl Composition {
    pub fn new(name: impl Into<String>, root: Composite) -> Self {
        Self {
            uid: new_uid(),
            name: name.into(),
            root,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Composite {
        Composite::new("root")
            .with_uid("root")
            .with_component(RawComponent::new("a", "fa", "python"))
            .with_composite(
                Composite::new("left")
                    .with_uid("left")
                    .with_composite(Composite::new("left-leaf").with_uid("left-leaf"))
                    .with_component(RawComponent::new("b", "fb", "java")),
            )
            .with_composite(Composite::new("right").with_uid("right"))
    }

    #[test]
    fn test_walk_is_preorder() {
        let root = tree();
        let order: Vec<&str> = root.walk().iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(order, vec!["root", "left", "left-leaf", "right"]);
    }

    #[test]
    fn test_all_components() {
        let root = tree();
        let names: Vec<&str> = root.all_components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
