//! Links synced external line items back onto work order items and charges.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::domain::attributes::{extract_correlations, work_order_name, CorrelationNamespace};
use crate::domain::errors::DomainError;
use crate::domain::ids::Gid;
use crate::domain::order::{LineItemSnapshot, LinkReport, OrderSnapshot};
use crate::domain::ports::{OrderPlatform, WorkOrderStore};

/// Records which line item realizes each tagged item or charge, then deletes
/// draft orders that no row references anymore.
///
/// `line_items` must be the complete line item list of `order`; a partial
/// page would make legitimate links look orphaned. Must run inside a
/// transaction so a failed draft order deletion rolls the links back and the
/// whole sync can be retried.
///
/// Returns `None` when the order does not belong to a known work order.
pub fn link_work_order_items_and_charges(
    store: &mut dyn WorkOrderStore,
    platform: &dyn OrderPlatform,
    order: &OrderSnapshot,
    line_items: &[LineItemSnapshot],
) -> Result<Option<LinkReport>, DomainError> {
    let Some(name) = work_order_name(&order.custom_attributes) else {
        log::debug!("order {} has no work order attribute, skipping", order.id);
        return Ok(None);
    };

    let Some(work_order_id) = store.lock_work_order(name)? else {
        log::debug!("order {} names unknown work order {name:?}, skipping", order.id);
        return Ok(None);
    };

    let old_draft_orders = store.linked_draft_order_ids(work_order_id)?;

    let mut report = LinkReport {
        work_order_name: name.to_string(),
        ..LinkReport::default()
    };

    for (namespace, links) in extract_correlations(line_items) {
        let (linked, missing) = link_namespace(store, work_order_id, namespace, &links)?;
        if !missing.is_empty() {
            log::warn!(
                "order {}: {} of {} tagged {namespace} uuids have no row in work order {name:?}: {missing:?}",
                order.id,
                missing.len(),
                links.len(),
            );
            report.missing.insert(namespace, missing);
        }
        if !linked.is_empty() {
            report.linked.insert(namespace, linked);
        }
    }

    let new_draft_orders = store.linked_draft_order_ids(work_order_id)?;

    for orphan in old_draft_orders.difference(&new_draft_orders) {
        log::info!("deleting draft order {orphan} orphaned by work order {name:?}");
        platform.delete_draft_order(orphan)?;
        report.deleted_draft_orders.push(orphan.clone());
    }

    Ok(Some(report))
}

fn link_namespace(
    store: &mut dyn WorkOrderStore,
    work_order_id: i32,
    namespace: CorrelationNamespace,
    links: &BTreeMap<Uuid, Gid>,
) -> Result<(Vec<Uuid>, Vec<Uuid>), DomainError> {
    if links.is_empty() {
        return Ok((vec![], vec![]));
    }

    let uuids: Vec<Uuid> = links.keys().copied().collect();
    let mut found = store.find_row_uuids(work_order_id, namespace, &uuids)?;
    found.sort();

    for uuid in &found {
        if let Some(line_item_id) = links.get(uuid) {
            store.set_line_item(work_order_id, namespace, *uuid, line_item_id)?;
        }
    }

    let missing = uuids
        .into_iter()
        .filter(|uuid| found.binary_search(uuid).is_err())
        .collect();

    Ok((found, missing))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::attributes::{CorrelationKey, CustomAttribute, WORK_ORDER_CUSTOM_ATTRIBUTE_NAME};
    use crate::domain::ports::WorkOrderRepository;
    use crate::domain::work_order::{Charge, Item, WipWorkOrder};
    use crate::infrastructure::memory::InMemoryWorkOrderRepository;

    #[derive(Default)]
    struct RecordingPlatform {
        deleted: Mutex<Vec<Gid>>,
        fail: bool,
    }

    impl OrderPlatform for RecordingPlatform {
        fn delete_draft_order(&self, id: &Gid) -> Result<(), DomainError> {
            if self.fail {
                return Err(DomainError::Platform("unavailable".to_string()));
            }
            self.deleted.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    impl RecordingPlatform {
        fn deleted(&self) -> Vec<Gid> {
            self.deleted.lock().unwrap().clone()
        }
    }

    fn gid(object_type: &str, id: u64) -> Gid {
        Gid::new(object_type, id).unwrap()
    }

    fn order(object_type: &str, id: u64, work_order: &str) -> OrderSnapshot {
        OrderSnapshot {
            id: gid(object_type, id),
            name: format!("#{id}"),
            custom_attributes: vec![CustomAttribute::new(WORK_ORDER_CUSTOM_ATTRIBUTE_NAME, work_order)],
        }
    }

    fn line_item(id: u64, keys: &[CorrelationKey]) -> LineItemSnapshot {
        LineItemSnapshot {
            id: gid("LineItem", id),
            quantity: 1,
            title: None,
            custom_attributes: keys.iter().map(CorrelationKey::attribute).collect(),
        }
    }

    fn sync(
        repo: &InMemoryWorkOrderRepository,
        platform: &RecordingPlatform,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<Option<LinkReport>, DomainError> {
        repo.transaction(|store| {
            store.upsert_order(order, line_items)?;
            link_work_order_items_and_charges(store, platform, order, line_items)
        })
    }

    struct Fixture {
        repo: InMemoryWorkOrderRepository,
        work_order_id: i32,
        item: Item,
        other: Item,
        charge: Charge,
    }

    fn fixture() -> Fixture {
        let repo = InMemoryWorkOrderRepository::default();
        let item = Item::product(Uuid::new_v4(), gid("ProductVariant", 1), 1);
        let other = Item::custom(Uuid::new_v4(), "Cleaning", 1, BigDecimal::from(5));
        let charge = Charge::fixed(Uuid::new_v4(), "Fitting", BigDecimal::from(10)).linked_to(item.item_ref());
        let work_order = WipWorkOrder {
            items: vec![item.clone(), other.clone()],
            charges: vec![charge.clone()],
            ..WipWorkOrder::default()
        };
        let work_order_id = repo
            .transaction(|store| store.save_work_order("#WO-1", &work_order))
            .unwrap();
        Fixture {
            repo,
            work_order_id,
            item,
            other,
            charge,
        }
    }

    #[test]
    fn unrelated_order_is_skipped() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let mut order = order("Order", 1, "#WO-1");
        order.custom_attributes.clear();

        let report = sync(&f.repo, &platform, &order, &[line_item(1, &[f.item.item_ref().into()])]).unwrap();

        assert!(report.is_none());
    }

    #[test]
    fn unknown_work_order_is_skipped() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let report = sync(
            &f.repo,
            &platform,
            &order("Order", 1, "#WO-404"),
            &[line_item(1, &[f.item.item_ref().into()])],
        )
        .unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn links_items_and_charges() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let line_items = [
            line_item(1, &[f.item.item_ref().into(), f.charge.charge_ref().into()]),
            line_item(2, &[]),
        ];

        let report = sync(&f.repo, &platform, &order("DraftOrder", 1, "#WO-1"), &line_items)
            .unwrap()
            .unwrap();

        assert_eq!(report.linked[&CorrelationNamespace::Item], vec![f.item.uuid]);
        assert_eq!(report.linked[&CorrelationNamespace::FixedCharge], vec![f.charge.uuid]);
        assert_eq!(report.missing_count(), 0);

        let context = f
            .repo
            .transaction(|store| store.committed_order_context(f.work_order_id))
            .unwrap();
        let linked = context.item_line_item(&f.item.item_ref()).unwrap();
        assert_eq!(linked.line_item_id, gid("LineItem", 1));
        assert_eq!(linked.order_id, gid("DraftOrder", 1));
        assert!(context.item_line_item(&f.other.item_ref()).is_none());
    }

    #[test]
    fn missing_rows_are_reported_without_blocking_others() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let removed = Uuid::new_v4();
        let line_items = [
            line_item(1, &[f.item.item_ref().into()]),
            line_item(
                2,
                &[CorrelationKey { namespace: CorrelationNamespace::Item, uuid: removed }],
            ),
        ];

        let report = sync(&f.repo, &platform, &order("Order", 1, "#WO-1"), &line_items)
            .unwrap()
            .unwrap();

        assert_eq!(report.linked[&CorrelationNamespace::Item], vec![f.item.uuid]);
        assert_eq!(report.missing[&CorrelationNamespace::Item], vec![removed]);
    }

    #[test]
    fn relinking_is_idempotent() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let order = order("DraftOrder", 1, "#WO-1");
        let line_items = [line_item(1, &[f.item.item_ref().into(), f.other.item_ref().into()])];

        let first = sync(&f.repo, &platform, &order, &line_items).unwrap().unwrap();
        let context_first = f
            .repo
            .transaction(|store| store.committed_order_context(f.work_order_id))
            .unwrap();
        let second = sync(&f.repo, &platform, &order, &line_items).unwrap().unwrap();
        let context_second = f
            .repo
            .transaction(|store| store.committed_order_context(f.work_order_id))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(context_first, context_second);
        assert!(platform.deleted().is_empty());
    }

    #[test]
    fn moving_all_links_deletes_old_draft_order_once() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let keys = [f.item.item_ref().into(), f.charge.charge_ref().into()];

        sync(&f.repo, &platform, &order("DraftOrder", 1, "#WO-1"), &[line_item(1, &keys)]).unwrap();
        let report = sync(&f.repo, &platform, &order("DraftOrder", 2, "#WO-1"), &[line_item(2, &keys)])
            .unwrap()
            .unwrap();
        sync(&f.repo, &platform, &order("DraftOrder", 2, "#WO-1"), &[line_item(2, &keys)]).unwrap();

        assert_eq!(report.deleted_draft_orders, vec![gid("DraftOrder", 1)]);
        assert_eq!(platform.deleted(), vec![gid("DraftOrder", 1)]);
    }

    #[test]
    fn draft_order_still_referenced_is_kept() {
        let f = fixture();
        let platform = RecordingPlatform::default();

        sync(
            &f.repo,
            &platform,
            &order("DraftOrder", 1, "#WO-1"),
            &[
                line_item(1, &[f.item.item_ref().into()]),
                line_item(2, &[f.other.item_ref().into()]),
            ],
        )
        .unwrap();
        let report = sync(
            &f.repo,
            &platform,
            &order("DraftOrder", 2, "#WO-1"),
            &[line_item(3, &[f.item.item_ref().into()])],
        )
        .unwrap()
        .unwrap();

        assert!(report.deleted_draft_orders.is_empty());
        assert!(platform.deleted().is_empty());
    }

    #[test]
    fn moving_to_real_order_deletes_draft() {
        let f = fixture();
        let platform = RecordingPlatform::default();
        let keys = [f.item.item_ref().into()];

        sync(&f.repo, &platform, &order("DraftOrder", 1, "#WO-1"), &[line_item(1, &keys)]).unwrap();
        sync(&f.repo, &platform, &order("Order", 1, "#WO-1"), &[line_item(2, &keys)]).unwrap();

        assert_eq!(platform.deleted(), vec![gid("DraftOrder", 1)]);
        let context = f
            .repo
            .transaction(|store| store.committed_order_context(f.work_order_id))
            .unwrap();
        assert!(crate::domain::order_context::is_item_locked(&f.item.item_ref(), &context));
    }

    #[test]
    fn platform_failure_rolls_back_links() {
        let f = fixture();
        let ok = RecordingPlatform::default();
        let failing = RecordingPlatform {
            fail: true,
            ..RecordingPlatform::default()
        };
        let keys = [f.item.item_ref().into()];

        sync(&f.repo, &ok, &order("DraftOrder", 1, "#WO-1"), &[line_item(1, &keys)]).unwrap();
        let result = sync(&f.repo, &failing, &order("DraftOrder", 2, "#WO-1"), &[line_item(2, &keys)]);

        assert!(matches!(result, Err(DomainError::Platform(_))));
        let context = f
            .repo
            .transaction(|store| store.committed_order_context(f.work_order_id))
            .unwrap();
        assert_eq!(
            context.item_line_item(&f.item.item_ref()).unwrap().order_id,
            gid("DraftOrder", 1)
        );

        let retried = sync(&f.repo, &ok, &order("DraftOrder", 2, "#WO-1"), &[line_item(2, &keys)])
            .unwrap()
            .unwrap();
        assert_eq!(retried.deleted_draft_orders, vec![gid("DraftOrder", 1)]);
    }
}
