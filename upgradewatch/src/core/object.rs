//! Tracked objects and the references used to address them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{Condition, HasConditions};

/// Identity of a single remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object kind, e.g. `Upgrade`.
    pub kind: String,
    /// Namespace the object lives in.
    pub namespace: String,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Creates a new object reference.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns `namespace/name`, the form other objects use to point at this one.
    #[must_use]
    pub fn namespaced_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A set of objects of one kind in one namespace, optionally narrowed by labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Object kind.
    pub kind: String,
    /// Namespace to list.
    pub namespace: String,
    /// Label selector; every entry must match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl CollectionRef {
    /// Creates a collection reference with no label selector.
    #[must_use]
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label requirement.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns true if `object` belongs to this collection.
    #[must_use]
    pub fn contains(&self, object: &TrackedObject) -> bool {
        object.kind == self.kind
            && object.namespace == self.namespace
            && self
                .labels
                .iter()
                .all(|(k, v)| object.labels.get(k) == Some(v))
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.kind, self.namespace)?;
        if !self.labels.is_empty() {
            let selector: Vec<String> =
                self.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", selector.join(","))?;
        }
        Ok(())
    }
}

/// A snapshot of a remote object.
///
/// Snapshots are never refreshed in place: every poll asks the store for a new
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedObject {
    /// Object kind.
    pub kind: String,
    /// Namespace.
    pub namespace: String,
    /// Name. Empty on a create request that uses `generate_name`.
    #[serde(default)]
    pub name: String,
    /// Prefix the store completes into a unique name on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Kind-specific desired state. Opaque to the engine.
    #[serde(default)]
    pub spec: serde_json::Value,
    /// Observed conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl TrackedObject {
    /// Creates an object with a fixed name.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            generate_name: None,
            labels: BTreeMap::new(),
            spec: serde_json::Value::Null,
            conditions: Vec::new(),
        }
    }

    /// Creates an object whose name the store generates from `prefix`.
    #[must_use]
    pub fn generated(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            generate_name: Some(prefix.into()),
            ..Self::new(kind, namespace, String::new())
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the spec.
    #[must_use]
    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    /// Adds or replaces a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.set_condition(condition);
        self
    }

    /// Adds a condition, replacing any existing one of the same type.
    pub fn set_condition(&mut self, condition: Condition) {
        match self.conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    /// Returns the object's identity.
    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.kind, &self.namespace, &self.name)
    }

    /// Describes the object for logs, including a pending generated name.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.generate_name, self.name.is_empty()) {
            (Some(prefix), true) => format!("{} {}/{}*", self.kind, self.namespace, prefix),
            _ => self.object_ref().to_string(),
        }
    }
}

impl HasConditions for TrackedObject {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}
