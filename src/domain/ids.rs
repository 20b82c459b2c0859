//! Platform global ids (`gid://shopify/<Type>/<id>`).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const GID_SCHEME: &str = "gid://shopify/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GidError {
    #[error("malformed id {raw:?}: {reason}")]
    Malformed { raw: String, reason: &'static str },
    #[error("expected an order or draft order id, got {0}")]
    UnexpectedType(String),
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gid(String);

impl Gid {
    pub fn parse(s: impl Into<String>) -> Result<Self, GidError> {
        let raw = s.into();
        let Some(rest) = raw.strip_prefix(GID_SCHEME) else {
            return Err(GidError::Malformed {
                raw,
                reason: "missing gid://shopify/ scheme",
            });
        };
        let Some((object_type, id)) = rest.split_once('/') else {
            return Err(GidError::Malformed {
                raw,
                reason: "missing object id",
            });
        };
        if object_type.is_empty() || !object_type.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(GidError::Malformed {
                raw,
                reason: "invalid object type",
            });
        }
        if id.is_empty() || id.contains('/') {
            return Err(GidError::Malformed {
                raw,
                reason: "invalid object id",
            });
        }
        Ok(Self(raw))
    }

    /// Builds a gid from its parts, e.g. `Gid::new("Order", 1)`.
    pub fn new(object_type: &str, id: impl fmt::Display) -> Result<Self, GidError> {
        Self::parse(format!("{GID_SCHEME}{object_type}/{id}"))
    }

    pub fn object_type(&self) -> &str {
        self.0[GID_SCHEME.len()..]
            .split_once('/')
            .map_or("", |(object_type, _)| object_type)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({:?})", self.0)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Gid {
    type Error = GidError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Gid::parse(s)
    }
}

impl From<Gid> for String {
    fn from(id: Gid) -> String {
        id.0
    }
}

/// Whether an external order is a real order or a still-editable draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Order,
    DraftOrder,
}

impl OrderKind {
    pub fn of(id: &Gid) -> Result<Self, GidError> {
        match id.object_type() {
            "Order" => Ok(Self::Order),
            "DraftOrder" => Ok(Self::DraftOrder),
            other => Err(GidError::UnexpectedType(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::DraftOrder => "DRAFT_ORDER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORDER" => Some(Self::Order),
            "DRAFT_ORDER" => Some(Self::DraftOrder),
            _ => None,
        }
    }
}

/// Malformed ids are an error rather than being treated as a real order.
pub fn is_order_id(raw: &str) -> Result<bool, GidError> {
    let id = Gid::parse(raw)?;
    Ok(OrderKind::of(&id)? == OrderKind::Order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_order_gid() {
        let id = Gid::parse("gid://shopify/Order/123").expect("valid gid");
        assert_eq!(id.object_type(), "Order");
        assert_eq!(id.as_str(), "gid://shopify/Order/123");
    }

    #[test]
    fn new_builds_same_gid_as_parse() {
        let id = Gid::new("DraftOrder", 42).expect("valid gid");
        assert_eq!(id, Gid::parse("gid://shopify/DraftOrder/42").unwrap());
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(matches!(
            Gid::parse("Order/123"),
            Err(GidError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_missing_object_id() {
        assert!(Gid::parse("gid://shopify/Order/").is_err());
        assert!(Gid::parse("gid://shopify/Order").is_err());
    }

    #[test]
    fn rejects_bad_object_type() {
        assert!(Gid::parse("gid://shopify/Or-der/1").is_err());
        assert!(Gid::parse("gid://shopify//1").is_err());
    }

    #[test]
    fn order_kind_of_known_types() {
        let order = Gid::parse("gid://shopify/Order/1").unwrap();
        let draft = Gid::parse("gid://shopify/DraftOrder/1").unwrap();
        assert_eq!(OrderKind::of(&order).unwrap(), OrderKind::Order);
        assert_eq!(OrderKind::of(&draft).unwrap(), OrderKind::DraftOrder);
    }

    #[test]
    fn order_kind_of_other_type_is_error() {
        let product = Gid::parse("gid://shopify/Product/1").unwrap();
        assert_eq!(
            OrderKind::of(&product),
            Err(GidError::UnexpectedType("Product".to_string()))
        );
    }

    #[test]
    fn is_order_id_fails_closed_on_malformed_ids() {
        assert_eq!(is_order_id("gid://shopify/Order/9"), Ok(true));
        assert_eq!(is_order_id("gid://shopify/DraftOrder/9"), Ok(false));
        assert!(is_order_id("not-a-gid").is_err());
    }

    #[test]
    fn order_kind_string_form() {
        assert_eq!(OrderKind::parse(OrderKind::DraftOrder.as_str()), Some(OrderKind::DraftOrder));
        assert_eq!(OrderKind::parse("ORDER"), Some(OrderKind::Order));
        assert_eq!(OrderKind::parse("order"), None);
    }

    #[test]
    fn serde_goes_through_parse() {
        let id: Gid = serde_json::from_str("\"gid://shopify/LineItem/5\"").unwrap();
        assert_eq!(id.object_type(), "LineItem");
        assert!(serde_json::from_str::<Gid>("\"garbage\"").is_err());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"gid://shopify/LineItem/5\""
        );
    }
}
