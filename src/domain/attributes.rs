//! Custom attributes that correlate external line items with internal rows.
//!
//! The order creation step tags every line item it produces with an attribute
//! whose *key* is a namespace prefix followed by the uuid of the item or
//! charge the line realizes. The attribute value is not used. The key strings
//! are a contract with that step and must not change.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::Gid;
use super::order::LineItemSnapshot;
use super::work_order::{ChargeKind, ChargeRef, ItemRef};

/// Order-level attribute naming the owning work order.
pub const WORK_ORDER_CUSTOM_ATTRIBUTE_NAME: &str = "Work Order";

pub const ITEM_UUID_PREFIX: &str = "_wm_item_uuid_";
pub const HOURLY_CHARGE_UUID_PREFIX: &str = "_wm_hourly_charge_uuid_";
pub const FIXED_CHARGE_UUID_PREFIX: &str = "_wm_fixed_charge_uuid_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl CustomAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CorrelationNamespace {
    Item,
    HourlyCharge,
    FixedCharge,
}

impl CorrelationNamespace {
    pub const ALL: [Self; 3] = [Self::Item, Self::HourlyCharge, Self::FixedCharge];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Item => ITEM_UUID_PREFIX,
            Self::HourlyCharge => HOURLY_CHARGE_UUID_PREFIX,
            Self::FixedCharge => FIXED_CHARGE_UUID_PREFIX,
        }
    }
}

impl From<ChargeKind> for CorrelationNamespace {
    fn from(kind: ChargeKind) -> Self {
        match kind {
            ChargeKind::Hourly => Self::HourlyCharge,
            ChargeKind::Fixed => Self::FixedCharge,
        }
    }
}

impl fmt::Display for CorrelationNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::HourlyCharge => write!(f, "hourly charge"),
            Self::FixedCharge => write!(f, "fixed charge"),
        }
    }
}

/// A decoded correlation attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub namespace: CorrelationNamespace,
    pub uuid: Uuid,
}

impl CorrelationKey {
    pub fn parse(key: &str) -> Option<Self> {
        CorrelationNamespace::ALL.into_iter().find_map(|namespace| {
            let raw = key.strip_prefix(namespace.prefix())?;
            match Uuid::parse_str(raw) {
                Ok(uuid) => Some(Self { namespace, uuid }),
                Err(err) => {
                    log::warn!("ignoring correlation attribute {key:?}: {err}");
                    None
                }
            }
        })
    }

    pub fn attribute_key(&self) -> String {
        format!("{}{}", self.namespace.prefix(), self.uuid)
    }

    pub fn attribute(&self) -> CustomAttribute {
        CustomAttribute {
            key: self.attribute_key(),
            value: Some(String::new()),
        }
    }
}

impl From<ItemRef> for CorrelationKey {
    fn from(item: ItemRef) -> Self {
        Self {
            namespace: CorrelationNamespace::Item,
            uuid: item.uuid,
        }
    }
}

impl From<ChargeRef> for CorrelationKey {
    fn from(charge: ChargeRef) -> Self {
        Self {
            namespace: charge.kind.into(),
            uuid: charge.uuid,
        }
    }
}

/// The work order named by an order's custom attributes, if any.
pub fn work_order_name(attributes: &[CustomAttribute]) -> Option<&str> {
    attributes
        .iter()
        .find(|attr| attr.key == WORK_ORDER_CUSTOM_ATTRIBUTE_NAME)
        .and_then(|attr| attr.value.as_deref())
        .filter(|name| !name.is_empty())
}

/// `uuid → line item id`, per namespace.
pub type Correlations = BTreeMap<CorrelationNamespace, BTreeMap<Uuid, Gid>>;

pub fn extract_correlations(line_items: &[LineItemSnapshot]) -> Correlations {
    let mut correlations: Correlations = CorrelationNamespace::ALL
        .into_iter()
        .map(|namespace| (namespace, BTreeMap::new()))
        .collect();

    for line_item in line_items {
        for attr in &line_item.custom_attributes {
            let Some(key) = CorrelationKey::parse(&attr.key) else {
                continue;
            };
            let links = correlations.entry(key.namespace).or_default();
            if let Some(previous) = links.insert(key.uuid, line_item.id.clone()) {
                if previous != line_item.id {
                    log::warn!(
                        "{} {} is tagged on both {previous} and {}",
                        key.namespace,
                        key.uuid,
                        line_item.id
                    );
                }
            }
        }
    }

    correlations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_order::ItemKind;

    fn line_item(id: u64, keys: &[String]) -> LineItemSnapshot {
        LineItemSnapshot {
            id: Gid::new("LineItem", id).unwrap(),
            quantity: 1,
            title: None,
            custom_attributes: keys
                .iter()
                .map(|key| CustomAttribute::new(key.clone(), ""))
                .collect(),
        }
    }

    #[test]
    fn prefixes_are_stable() {
        assert_eq!(ITEM_UUID_PREFIX, "_wm_item_uuid_");
        assert_eq!(HOURLY_CHARGE_UUID_PREFIX, "_wm_hourly_charge_uuid_");
        assert_eq!(FIXED_CHARGE_UUID_PREFIX, "_wm_fixed_charge_uuid_");
        assert_eq!(WORK_ORDER_CUSTOM_ATTRIBUTE_NAME, "Work Order");
    }

    #[test]
    fn parse_decodes_each_namespace() {
        let uuid = Uuid::new_v4();
        for namespace in CorrelationNamespace::ALL {
            let key = CorrelationKey { namespace, uuid };
            assert_eq!(CorrelationKey::parse(&key.attribute_key()), Some(key));
        }
    }

    #[test]
    fn hourly_prefix_is_not_confused_with_item_prefix() {
        let uuid = Uuid::new_v4();
        let parsed = CorrelationKey::parse(&format!("{HOURLY_CHARGE_UUID_PREFIX}{uuid}")).unwrap();
        assert_eq!(parsed.namespace, CorrelationNamespace::HourlyCharge);
    }

    #[test]
    fn parse_skips_unrelated_and_malformed_keys() {
        assert_eq!(CorrelationKey::parse("Work Order"), None);
        assert_eq!(CorrelationKey::parse("_wm_item_uuid_not-a-uuid"), None);
        assert_eq!(CorrelationKey::parse(""), None);
    }

    #[test]
    fn refs_convert_to_keys() {
        let uuid = Uuid::new_v4();
        let key: CorrelationKey = ItemRef { kind: ItemKind::Product, uuid }.into();
        assert_eq!(key.attribute_key(), format!("_wm_item_uuid_{uuid}"));

        let key: CorrelationKey = ChargeRef { kind: ChargeKind::Fixed, uuid }.into();
        assert_eq!(key.namespace, CorrelationNamespace::FixedCharge);
    }

    #[test]
    fn work_order_name_reads_order_attribute() {
        let attrs = vec![
            CustomAttribute::new("Other", "x"),
            CustomAttribute::new(WORK_ORDER_CUSTOM_ATTRIBUTE_NAME, "#WO-12"),
        ];
        assert_eq!(work_order_name(&attrs), Some("#WO-12"));
        assert_eq!(work_order_name(&attrs[..1]), None);
        assert_eq!(
            work_order_name(&[CustomAttribute::new(WORK_ORDER_CUSTOM_ATTRIBUTE_NAME, "")]),
            None
        );
    }

    #[test]
    fn extract_groups_by_namespace() {
        let item = Uuid::new_v4();
        let hourly = Uuid::new_v4();
        let fixed = Uuid::new_v4();
        let line_items = vec![
            line_item(1, &[format!("{ITEM_UUID_PREFIX}{item}"), format!("{HOURLY_CHARGE_UUID_PREFIX}{hourly}")]),
            line_item(2, &[format!("{FIXED_CHARGE_UUID_PREFIX}{fixed}")]),
            line_item(3, &[]),
        ];

        let correlations = extract_correlations(&line_items);

        assert_eq!(
            correlations[&CorrelationNamespace::Item].get(&item),
            Some(&Gid::new("LineItem", 1).unwrap())
        );
        assert_eq!(
            correlations[&CorrelationNamespace::HourlyCharge].get(&hourly),
            Some(&Gid::new("LineItem", 1).unwrap())
        );
        assert_eq!(
            correlations[&CorrelationNamespace::FixedCharge].get(&fixed),
            Some(&Gid::new("LineItem", 2).unwrap())
        );
    }

    #[test]
    fn extract_keeps_last_line_item_for_duplicate_uuid() {
        let item = Uuid::new_v4();
        let key = format!("{ITEM_UUID_PREFIX}{item}");
        let correlations =
            extract_correlations(&[line_item(1, &[key.clone()]), line_item(2, &[key])]);
        assert_eq!(
            correlations[&CorrelationNamespace::Item][&item],
            Gid::new("LineItem", 2).unwrap()
        );
    }
}
