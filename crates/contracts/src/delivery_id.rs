//! DeliveryId - identifier returned by a successful delivery
//!
//! Recursive sum type: a target yields `Null` or a `Scalar`, the
//! multi-target dispatcher yields a `Composite` of its children.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between children when rendering a composite
pub const COMPOSITE_SEPARATOR: &str = ",";

/// Identifier of one delivered artifact
///
/// Serializes untagged: `null`, a number, a string or an array.
///
/// # Examples
/// ```
/// use contracts::DeliveryId;
///
/// let id = DeliveryId::composite([DeliveryId::from("A"), DeliveryId::int(42)]);
/// assert_eq!(id.render(), "A,42");
/// assert_eq!(DeliveryId::Null.render(), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeliveryId {
    /// Delivery attempted, target has no addressable result
    #[default]
    Null,
    /// One identifier issued by the target
    Scalar(ScalarId),
    /// One child per delivery performed by a dispatcher
    Composite(Vec<DeliveryId>),
}

/// Underlying identifier issued by a target
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarId {
    Int(i64),
    Text(String),
}

impl DeliveryId {
    #[inline]
    pub fn int(value: i64) -> Self {
        Self::Scalar(ScalarId::Int(value))
    }

    #[inline]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(ScalarId::Text(value.into()))
    }

    pub fn composite(children: impl IntoIterator<Item = DeliveryId>) -> Self {
        Self::Composite(children.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Children of a composite; empty for every other variant
    pub fn children(&self) -> &[DeliveryId] {
        match self {
            Self::Composite(children) => children,
            _ => &[],
        }
    }

    /// Canonical string rendering
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Scalar(scalar) => scalar.to_string(),
            Self::Composite(children) => children
                .iter()
                .map(DeliveryId::render)
                .collect::<Vec<_>>()
                .join(COMPOSITE_SEPARATOR),
        }
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Display for ScalarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

// Conversions
impl From<i64> for DeliveryId {
    #[inline]
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<&str> for DeliveryId {
    #[inline]
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for DeliveryId {
    #[inline]
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<Vec<DeliveryId>> for DeliveryId {
    #[inline]
    fn from(children: Vec<DeliveryId>) -> Self {
        Self::Composite(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_variants() {
        assert_eq!(DeliveryId::Null.render(), "");
        assert_eq!(DeliveryId::int(1234567890123).render(), "1234567890123");
        assert_eq!(DeliveryId::text("abc").render(), "abc");
    }

    #[test]
    fn test_render_nested_composite() {
        let id = DeliveryId::composite([
            DeliveryId::from("A"),
            DeliveryId::composite([DeliveryId::int(1), DeliveryId::int(2)]),
            DeliveryId::Null,
        ]);
        assert_eq!(id.to_string(), "A,1,2,");
        assert_eq!(id.children().len(), 3);
    }

    #[test]
    fn test_json_shape_is_untagged() {
        let id = DeliveryId::composite([DeliveryId::from("A"), DeliveryId::int(7), DeliveryId::Null]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"["A",7,null]"#);

        let back: DeliveryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_ordering_allows_sorted_comparison() {
        let mut children = vec![DeliveryId::from("B"), DeliveryId::from("A")];
        children.sort();
        assert_eq!(children, vec![DeliveryId::from("A"), DeliveryId::from("B")]);
        assert!(DeliveryId::default().is_null());
    }
}
