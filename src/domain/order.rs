use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attributes::{CorrelationNamespace, CustomAttribute};
use super::errors::DomainError;
use super::ids::{Gid, OrderKind};

/// An external order or draft order as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub id: Gid,
    pub name: String,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
}

impl OrderSnapshot {
    pub fn kind(&self) -> Result<OrderKind, DomainError> {
        Ok(OrderKind::of(&self.id)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemSnapshot {
    pub id: Gid,
    pub quantity: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
}

/// Outcome of one linking pass over an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReport {
    pub work_order_name: String,
    /// Rows that now point at a line item, per namespace.
    pub linked: BTreeMap<CorrelationNamespace, Vec<Uuid>>,
    /// Tagged uuids with no matching row, per namespace.
    pub missing: BTreeMap<CorrelationNamespace, Vec<Uuid>>,
    pub deleted_draft_orders: Vec<Gid>,
}

impl LinkReport {
    pub fn linked_count(&self) -> usize {
        self.linked.values().map(Vec::len).sum()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.values().map(Vec::len).sum()
    }
}
