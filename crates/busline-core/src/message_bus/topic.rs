//! Topic keys and namespacing.
//!
//! A topic is matched by exact string equality on its fully-qualified form.
//! With a namespace the key is `namespace::name`; without one it is just the
//! name, so `Topic::new("x")` and `Topic::namespaced("ns", "x")` never collide.

use serde::{Deserialize, Serialize};

/// Separator between namespace and topic name
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Suffix used by namespace-wide subscriptions
pub const NAMESPACE_WILDCARD: &str = ".*";

/// A routing key, optionally scoped by a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    namespace: String,
    name: String,
}

impl Topic {
    /// Topic without a namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
        }
    }

    /// Topic scoped by `namespace`
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The `ns.*` topic used by namespace-wide subscriptions
    ///
    /// This is only a naming convention. Dispatch does not expand it against
    /// concrete topics, so it only receives messages published to exactly
    /// `ns::ns.*`.
    pub fn namespace_wildcard(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = format!("{}{}", namespace, NAMESPACE_WILDCARD);
        Self { namespace, name }
    }

    /// Topic name without the namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, empty when unscoped
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key used for routing
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.name)
        }
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Topic::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Topic::new(name)
    }
}

impl From<&String> for Topic {
    fn from(name: &String) -> Self {
        Topic::new(name.as_str())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
