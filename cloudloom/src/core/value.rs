//! Input and output value model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value produced by a constructed node.
///
/// Opaque to the engine; the provisioning collaborator decides the shape.
pub type OutputValue = serde_json::Value;

/// An input parameter of a resource node.
///
/// Either a literal known at declaration time, or a reference to another
/// node's output that stays unresolved until that node reaches Ready and
/// the propagator writes the concrete value in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputValue {
    /// A concrete value known at declaration time.
    Literal(OutputValue),
    /// A reference to another node's output, unresolved until propagation.
    Reference {
        /// The producer node id.
        node: String,
        /// The producer output key.
        output: String,
    },
}

impl InputValue {
    /// Creates a literal input from anything serializable to JSON.
    ///
    /// # Panics
    ///
    /// Panics only if `value` fails JSON serialization, which cannot happen
    /// for the string/number types used at declaration sites.
    #[must_use]
    pub fn literal(value: impl Serialize) -> Self {
        Self::Literal(serde_json::json!(value))
    }

    /// Creates a reference to another node's output.
    #[must_use]
    pub fn reference(node: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Reference {
            node: node.into(),
            output: output.into(),
        }
    }

    /// Returns true if this input holds a concrete value.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns the concrete value, if resolved.
    #[must_use]
    pub fn resolved(&self) -> Option<&OutputValue> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Reference { .. } => None,
        }
    }

    /// Returns the `(node, output)` pair, if this is a reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<(&str, &str)> {
        match self {
            Self::Literal(_) => None,
            Self::Reference { node, output } => Some((node, output)),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Reference { node, output } => write!(f, "${{{node}.{output}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_resolved() {
        let input = InputValue::literal("vpc-123");
        assert!(input.is_resolved());
        assert_eq!(input.resolved(), Some(&serde_json::json!("vpc-123")));
        assert!(input.as_reference().is_none());
    }

    #[test]
    fn test_reference_is_unresolved() {
        let input = InputValue::reference("database", "hostname");
        assert!(!input.is_resolved());
        assert_eq!(input.as_reference(), Some(("database", "hostname")));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            InputValue::reference("network", "vpc_id").to_string(),
            "${network.vpc_id}"
        );
    }
}
