//! The work-in-progress work order and its items and charges.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::ids::Gid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Custom,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub kind: ItemKind,
    pub uuid: Uuid,
    #[serde(default)]
    pub product_variant_id: Option<Gid>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: Option<BigDecimal>,
    #[serde(default)]
    pub absorb_charges: bool,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl Item {
    pub fn product(uuid: Uuid, product_variant_id: Gid, quantity: i32) -> Self {
        Self {
            kind: ItemKind::Product,
            uuid,
            product_variant_id: Some(product_variant_id),
            name: None,
            quantity,
            unit_price: None,
            absorb_charges: false,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn custom(uuid: Uuid, name: impl Into<String>, quantity: i32, unit_price: BigDecimal) -> Self {
        Self {
            kind: ItemKind::Custom,
            uuid,
            product_variant_id: None,
            name: Some(name.into()),
            quantity,
            unit_price: Some(unit_price),
            absorb_charges: false,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            kind: self.kind,
            uuid: self.uuid,
        }
    }

    pub fn is(&self, item: &ItemRef) -> bool {
        self.kind == item.kind && self.uuid == item.uuid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeKind {
    Hourly,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChargeRef {
    pub kind: ChargeKind,
    pub uuid: Uuid,
}

/// Amount-determining fields of a charge; `kind` is the JSON tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChargePricing {
    Hourly { hours: BigDecimal, rate: BigDecimal },
    Fixed { amount: BigDecimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub work_order_item: Option<ItemRef>,
    #[serde(default)]
    pub employee_id: Option<Gid>,
    #[serde(flatten)]
    pub pricing: ChargePricing,
}

impl Charge {
    pub fn fixed(uuid: Uuid, name: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            uuid,
            name: name.into(),
            work_order_item: None,
            employee_id: None,
            pricing: ChargePricing::Fixed { amount },
        }
    }

    pub fn hourly(uuid: Uuid, name: impl Into<String>, hours: BigDecimal, rate: BigDecimal) -> Self {
        Self {
            uuid,
            name: name.into(),
            work_order_item: None,
            employee_id: None,
            pricing: ChargePricing::Hourly { hours, rate },
        }
    }

    pub fn linked_to(mut self, item: ItemRef) -> Self {
        self.work_order_item = Some(item);
        self
    }

    pub fn kind(&self) -> ChargeKind {
        match self.pricing {
            ChargePricing::Hourly { .. } => ChargeKind::Hourly,
            ChargePricing::Fixed { .. } => ChargeKind::Fixed,
        }
    }

    pub fn charge_ref(&self) -> ChargeRef {
        ChargeRef {
            kind: self.kind(),
            uuid: self.uuid,
        }
    }

    pub fn is_linked_to(&self, item: &ItemRef) -> bool {
        self.work_order_item.as_ref() == Some(item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    pub template_id: Gid,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// The editable work order aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WipWorkOrder {
    pub name: Option<String>,
    pub status: String,
    pub note: String,
    pub due_date: Option<DateTime<Utc>>,
    pub customer_id: Option<Gid>,
    pub company_id: Option<Gid>,
    pub company_location_id: Option<Gid>,
    pub company_contact_id: Option<Gid>,
    pub items: Vec<Item>,
    pub charges: Vec<Charge>,
    pub discount: Option<Discount>,
    pub payment_terms: Option<PaymentTerms>,
}

/// Deserializes a present field as `Some`, so `null` becomes `Some(None)` and
/// an absent field stays `None` through `#[serde(default)]`.
pub(crate) fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A shallow update: `None` leaves a field untouched, `Some(None)` clears it.
/// Supplied `items` and `charges` replace the whole list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderPatch {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub customer_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_location_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_contact_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub discount: Option<Option<Discount>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_terms: Option<Option<PaymentTerms>>,
    #[serde(default, deserialize_with = "present")]
    pub items: Option<Vec<Item>>,
    #[serde(default, deserialize_with = "present")]
    pub charges: Option<Vec<Charge>>,
}

impl WorkOrderPatch {
    /// Whether applying the patch replaces items or charges.
    pub fn touches_lines(&self) -> bool {
        self.items.is_some() || self.charges.is_some()
    }

    pub fn apply_to(self, wip: &mut WipWorkOrder) {
        fn set<T>(field: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *field = value;
            }
        }

        set(&mut wip.name, self.name);
        set(&mut wip.status, self.status);
        set(&mut wip.note, self.note);
        set(&mut wip.due_date, self.due_date);
        set(&mut wip.customer_id, self.customer_id);
        set(&mut wip.company_id, self.company_id);
        set(&mut wip.company_location_id, self.company_location_id);
        set(&mut wip.company_contact_id, self.company_contact_id);
        set(&mut wip.discount, self.discount);
        set(&mut wip.payment_terms, self.payment_terms);
        set(&mut wip.items, self.items);
        set(&mut wip.charges, self.charges);
    }
}

/// B2B assignment: the company, its location and contact, and the contact's
/// customer. Follows the same absent/null rules as [`WorkOrderPatch`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyAssignment {
    #[serde(default, deserialize_with = "present")]
    pub customer_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_location_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub company_contact_id: Option<Option<Gid>>,
    #[serde(default, deserialize_with = "present")]
    pub payment_terms: Option<Option<PaymentTerms>>,
}

impl From<CompanyAssignment> for WorkOrderPatch {
    fn from(company: CompanyAssignment) -> Self {
        Self {
            customer_id: company.customer_id,
            company_id: company.company_id,
            company_location_id: company.company_location_id,
            company_contact_id: company.company_contact_id,
            payment_terms: company.payment_terms,
            ..Self::default()
        }
    }
}
