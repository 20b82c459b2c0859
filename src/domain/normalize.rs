//! Merge-Split normalization of a work order's items.
//!
//! Charges are priced per line, so a line that carries charges must stand for
//! exactly one unit. Uncharged, unlocked lines of the same product variant are
//! folded together instead.

use std::collections::HashSet;

use uuid::Uuid;

use super::order_context::{is_item_locked, CommittedOrderContext};
use super::work_order::{Charge, Item, ItemKind, ItemRef};

/// Normalizes `items` against `charges`, minting fresh uuids for split-off
/// remainders.
pub fn normalize(
    items: Vec<Item>,
    charges: Vec<Charge>,
    context: &CommittedOrderContext,
) -> (Vec<Item>, Vec<Charge>) {
    normalize_with(items, charges, context, Uuid::new_v4)
}

/// Runs merge, then split. A split remainder is folded into an existing
/// mergeable line when there is one, so normalizing the output again changes
/// nothing. Merges whose total would overflow are skipped. Charges linked to
/// items dropped for having no quantity left are dropped with them;
/// references that were already dangling are left alone.
pub fn normalize_with(
    items: Vec<Item>,
    charges: Vec<Charge>,
    context: &CommittedOrderContext,
    mut new_uuid: impl FnMut() -> Uuid,
) -> (Vec<Item>, Vec<Charge>) {
    let charged: HashSet<ItemRef> = charges
        .iter()
        .filter_map(|charge| charge.work_order_item)
        .collect();

    let before: HashSet<ItemRef> = items.iter().map(Item::item_ref).collect();

    let items = merge_items(items, &charged, context);
    let items = split_items(items, &charged, context, &mut new_uuid);

    let after: HashSet<ItemRef> = items.iter().map(Item::item_ref).collect();
    let charges = charges
        .into_iter()
        .filter(|charge| match &charge.work_order_item {
            Some(item) => !before.contains(item) || after.contains(item),
            None => true,
        })
        .collect();

    (items, charges)
}

/// Whether `a` and `b` can be represented by a single line.
pub fn should_merge(
    a: &Item,
    b: &Item,
    charged: &HashSet<ItemRef>,
    context: &CommittedOrderContext,
) -> bool {
    same_line(a, b) && is_free(a, charged, context) && is_free(b, charged, context)
}

fn same_line(a: &Item, b: &Item) -> bool {
    a.kind == ItemKind::Product
        && b.kind == ItemKind::Product
        && a.product_variant_id.is_some()
        && a.product_variant_id == b.product_variant_id
        && !a.absorb_charges
        && !b.absorb_charges
}

fn is_free(item: &Item, charged: &HashSet<ItemRef>, context: &CommittedOrderContext) -> bool {
    let item = item.item_ref();
    !charged.contains(&item) && !is_item_locked(&item, context)
}

fn merge_items(
    items: Vec<Item>,
    charged: &HashSet<ItemRef>,
    context: &CommittedOrderContext,
) -> Vec<Item> {
    let mut merged: Vec<Item> = Vec::with_capacity(items.len());

    for item in items {
        let target = merged.iter_mut().find(|target| {
            should_merge(target, &item, charged, context)
                && target.quantity.checked_add(item.quantity).is_some()
        });
        match target {
            Some(target) => target.quantity += item.quantity,
            None => merged.push(item),
        }
    }

    merged.retain(|item| item.quantity > 0);
    merged
}

/// Cuts every charged line down to one unit. The rest goes to the first free
/// line of the same variant, or to a new line right after the charged one.
fn split_items(
    mut items: Vec<Item>,
    charged: &HashSet<ItemRef>,
    context: &CommittedOrderContext,
    new_uuid: &mut impl FnMut() -> Uuid,
) -> Vec<Item> {
    let mut i = 0;
    while i < items.len() {
        let item = &items[i];
        if item.quantity <= 1 || !charged.contains(&item.item_ref()) {
            i += 1;
            continue;
        }

        let remainder = item.quantity - 1;
        let target = items.iter().position(|target| {
            same_line(target, item)
                && is_free(target, charged, context)
                && target.quantity.checked_add(remainder).is_some()
        });

        match target {
            Some(target) => items[target].quantity += remainder,
            None => {
                let line = Item {
                    uuid: new_uuid(),
                    quantity: remainder,
                    ..item.clone()
                };
                items.insert(i + 1, line);
            }
        }
        items[i].quantity = 1;
        i += 1;
    }

    items
}
