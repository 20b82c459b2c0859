//! The most recently synced state of the external orders a work order is
//! realized in, used to decide which items and charges are locked.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ids::{Gid, GidError, OrderKind};
use super::work_order::{ChargeRef, ItemRef};

/// The external line item an item or charge was last linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedLineItem {
    pub line_item_id: Gid,
    pub order_id: Gid,
    pub order_kind: OrderKind,
}

impl LinkedLineItem {
    /// Fails when `order_id` is neither an order nor a draft order id.
    pub fn new(line_item_id: Gid, order_id: Gid) -> Result<Self, GidError> {
        let order_kind = OrderKind::of(&order_id)?;
        Ok(Self {
            line_item_id,
            order_id,
            order_kind,
        })
    }

    pub fn in_real_order(&self) -> bool {
        self.order_kind == OrderKind::Order
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommittedOrderContext {
    items: HashMap<ItemRef, LinkedLineItem>,
    charges: HashMap<ChargeRef, LinkedLineItem>,
}

impl CommittedOrderContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn link_item(&mut self, item: ItemRef, line_item: LinkedLineItem) {
        self.items.insert(item, line_item);
    }

    pub fn link_charge(&mut self, charge: ChargeRef, line_item: LinkedLineItem) {
        self.charges.insert(charge, line_item);
    }

    pub fn item_line_item(&self, item: &ItemRef) -> Option<&LinkedLineItem> {
        self.items.get(item)
    }

    pub fn charge_line_item(&self, charge: &ChargeRef) -> Option<&LinkedLineItem> {
        self.charges.get(charge)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.charges.is_empty()
    }
}

/// An item is locked once it is part of a line on a real order. Items that
/// only appear on draft orders stay editable and mergeable.
pub fn is_item_locked(item: &ItemRef, context: &CommittedOrderContext) -> bool {
    context
        .item_line_item(item)
        .is_some_and(LinkedLineItem::in_real_order)
}

pub fn is_charge_locked(charge: &ChargeRef, context: &CommittedOrderContext) -> bool {
    context
        .charge_line_item(charge)
        .is_some_and(LinkedLineItem::in_real_order)
}

/// Wire form of the context, as returned to editing clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedOrderContextDto {
    pub items: Vec<LinkedItemDto>,
    pub charges: Vec<LinkedChargeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedItemDto {
    pub item: ItemRef,
    pub line_item: LinkedLineItem,
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedChargeDto {
    pub charge: ChargeRef,
    pub line_item: LinkedLineItem,
    pub locked: bool,
}

impl From<&CommittedOrderContext> for CommittedOrderContextDto {
    fn from(context: &CommittedOrderContext) -> Self {
        let mut items: Vec<LinkedItemDto> = context
            .items
            .iter()
            .map(|(item, line_item)| LinkedItemDto {
                item: *item,
                line_item: line_item.clone(),
                locked: line_item.in_real_order(),
            })
            .collect();
        items.sort_by_key(|linked| linked.item);

        let mut charges: Vec<LinkedChargeDto> = context
            .charges
            .iter()
            .map(|(charge, line_item)| LinkedChargeDto {
                charge: *charge,
                line_item: line_item.clone(),
                locked: line_item.in_real_order(),
            })
            .collect();
        charges.sort_by_key(|linked| linked.charge);

        Self { items, charges }
    }
}

impl TryFrom<CommittedOrderContextDto> for CommittedOrderContext {
    type Error = GidError;

    /// Re-derives each order kind from its id instead of trusting the wire.
    fn try_from(dto: CommittedOrderContextDto) -> Result<Self, Self::Error> {
        let mut context = Self::empty();
        for linked in dto.items {
            let line_item = LinkedLineItem::new(linked.line_item.line_item_id, linked.line_item.order_id)?;
            context.link_item(linked.item, line_item);
        }
        for linked in dto.charges {
            let line_item = LinkedLineItem::new(linked.line_item.line_item_id, linked.line_item.order_id)?;
            context.link_charge(linked.charge, line_item);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::work_order::{ChargeKind, ItemKind};

    fn linked(order: &str) -> LinkedLineItem {
        LinkedLineItem::new(
            Gid::parse("gid://shopify/LineItem/1").unwrap(),
            Gid::parse(order).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn unlinked_item_is_not_locked() {
        let item = ItemRef { kind: ItemKind::Product, uuid: Uuid::new_v4() };
        assert!(!is_item_locked(&item, &CommittedOrderContext::empty()));
    }

    #[test]
    fn item_in_draft_order_is_not_locked() {
        let item = ItemRef { kind: ItemKind::Product, uuid: Uuid::new_v4() };
        let mut context = CommittedOrderContext::empty();
        context.link_item(item, linked("gid://shopify/DraftOrder/7"));
        assert!(!is_item_locked(&item, &context));
    }

    #[test]
    fn item_in_real_order_is_locked() {
        let item = ItemRef { kind: ItemKind::Custom, uuid: Uuid::new_v4() };
        let mut context = CommittedOrderContext::empty();
        context.link_item(item, linked("gid://shopify/Order/7"));
        assert!(is_item_locked(&item, &context));
    }

    #[test]
    fn charge_lock_follows_its_order() {
        let charge = ChargeRef { kind: ChargeKind::Hourly, uuid: Uuid::new_v4() };
        let mut context = CommittedOrderContext::empty();
        context.link_charge(charge, linked("gid://shopify/Order/3"));
        assert!(is_charge_locked(&charge, &context));
    }

    #[test]
    fn line_item_rejects_non_order_parent() {
        let result = LinkedLineItem::new(
            Gid::parse("gid://shopify/LineItem/1").unwrap(),
            Gid::parse("gid://shopify/Customer/1").unwrap(),
        );
        assert!(matches!(result, Err(GidError::UnexpectedType(_))));
    }

    #[test]
    fn dto_conversion_recomputes_order_kind() {
        let item = ItemRef { kind: ItemKind::Product, uuid: Uuid::new_v4() };
        let dto = CommittedOrderContextDto {
            items: vec![LinkedItemDto {
                item,
                line_item: LinkedLineItem {
                    line_item_id: Gid::parse("gid://shopify/LineItem/1").unwrap(),
                    order_id: Gid::parse("gid://shopify/Order/1").unwrap(),
                    order_kind: OrderKind::DraftOrder,
                },
                locked: false,
            }],
            charges: vec![],
        };

        let context = CommittedOrderContext::try_from(dto).unwrap();
        assert!(is_item_locked(&item, &context));
    }
}
