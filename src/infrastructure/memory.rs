//! A process-local repository with the same semantics as the Diesel one.
//! Transactions run against a copy of the state and are serialized by a
//! single mutex.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::attributes::CorrelationNamespace;
use crate::domain::errors::DomainError;
use crate::domain::ids::{Gid, OrderKind};
use crate::domain::order::{LineItemSnapshot, OrderSnapshot};
use crate::domain::order_context::{CommittedOrderContext, LinkedLineItem};
use crate::domain::ports::{WorkOrderRepository, WorkOrderStore};
use crate::domain::work_order::WipWorkOrder;

#[derive(Debug, Clone)]
struct StoredWorkOrder {
    name: String,
    work_order: WipWorkOrder,
    links: HashMap<(CorrelationNamespace, Uuid), Gid>,
}

impl StoredWorkOrder {
    fn has_row(&self, namespace: CorrelationNamespace, uuid: Uuid) -> bool {
        match namespace {
            CorrelationNamespace::Item => self.work_order.items.iter().any(|i| i.uuid == uuid),
            _ => self
                .work_order
                .charges
                .iter()
                .any(|c| c.uuid == uuid && CorrelationNamespace::from(c.kind()) == namespace),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredLineItem {
    order_id: Gid,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i32,
    work_orders: BTreeMap<i32, StoredWorkOrder>,
    orders: BTreeMap<Gid, OrderKind>,
    line_items: BTreeMap<Gid, StoredLineItem>,
}

impl MemoryState {
    fn work_order(&self, id: i32) -> Result<&StoredWorkOrder, DomainError> {
        self.work_orders.get(&id).ok_or(DomainError::NotFound)
    }

    fn drop_line_items(&mut self, line_item_ids: &BTreeSet<Gid>) {
        if line_item_ids.is_empty() {
            return;
        }
        self.line_items.retain(|id, _| !line_item_ids.contains(id));
        for stored in self.work_orders.values_mut() {
            stored.links.retain(|_, line_item_id| !line_item_ids.contains(line_item_id));
        }
    }

    fn linked_line_item(&self, line_item_id: &Gid) -> Result<Option<LinkedLineItem>, DomainError> {
        let Some(line_item) = self.line_items.get(line_item_id) else {
            return Ok(None);
        };
        Ok(Some(LinkedLineItem::new(
            line_item_id.clone(),
            line_item.order_id.clone(),
        )?))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkOrderRepository {
    state: Mutex<MemoryState>,
}

impl WorkOrderRepository for InMemoryWorkOrderRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn WorkOrderStore) -> Result<T, DomainError>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let mut working = guard.clone();
        let result = f(&mut MemoryStore { state: &mut working })?;
        *guard = working;
        Ok(result)
    }
}

struct MemoryStore<'a> {
    state: &'a mut MemoryState,
}

impl WorkOrderStore for MemoryStore<'_> {
    fn lock_work_order(&mut self, name: &str) -> Result<Option<i32>, DomainError> {
        Ok(self
            .state
            .work_orders
            .iter()
            .find(|(_, stored)| stored.name == name)
            .map(|(id, _)| *id))
    }

    fn save_work_order(&mut self, name: &str, work_order: &WipWorkOrder) -> Result<i32, DomainError> {
        let id = match self.lock_work_order(name)? {
            Some(id) => id,
            None => {
                self.state.next_id += 1;
                let id = self.state.next_id;
                self.state.work_orders.insert(
                    id,
                    StoredWorkOrder {
                        name: name.to_string(),
                        work_order: WipWorkOrder::default(),
                        links: HashMap::new(),
                    },
                );
                id
            }
        };

        let mut claimed = BTreeSet::new();
        for (other_id, other) in &self.state.work_orders {
            if *other_id != id {
                claimed.extend(other.work_order.items.iter().map(|i| i.uuid));
                claimed.extend(other.work_order.charges.iter().map(|c| c.uuid));
            }
        }
        let uuids = work_order
            .items
            .iter()
            .map(|i| i.uuid)
            .chain(work_order.charges.iter().map(|c| c.uuid));
        for uuid in uuids {
            if claimed.contains(&uuid) {
                return Err(DomainError::InvalidInput(format!(
                    "{uuid} belongs to another work order"
                )));
            }
        }

        let stored = self
            .state
            .work_orders
            .get_mut(&id)
            .ok_or(DomainError::NotFound)?;
        stored.work_order = WipWorkOrder {
            name: Some(name.to_string()),
            ..work_order.clone()
        };
        let snapshot = stored.clone();
        stored
            .links
            .retain(|(namespace, uuid), _| snapshot.has_row(*namespace, *uuid));

        Ok(id)
    }

    fn load_work_order(&mut self, work_order_id: i32) -> Result<WipWorkOrder, DomainError> {
        Ok(self.state.work_order(work_order_id)?.work_order.clone())
    }

    fn upsert_order(
        &mut self,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<(), DomainError> {
        let kind = order.kind()?;
        self.state.orders.insert(order.id.clone(), kind);

        let keep: BTreeSet<&Gid> = line_items.iter().map(|li| &li.id).collect();
        let stale: BTreeSet<Gid> = self
            .state
            .line_items
            .iter()
            .filter(|(id, li)| li.order_id == order.id && !keep.contains(id))
            .map(|(id, _)| id.clone())
            .collect();
        self.state.drop_line_items(&stale);

        for line_item in line_items {
            self.state.line_items.insert(
                line_item.id.clone(),
                StoredLineItem {
                    order_id: order.id.clone(),
                },
            );
        }
        Ok(())
    }

    fn remove_order(&mut self, order_id: &Gid) -> Result<bool, DomainError> {
        if self.state.orders.remove(order_id).is_none() {
            return Ok(false);
        }
        let owned: BTreeSet<Gid> = self
            .state
            .line_items
            .iter()
            .filter(|(_, li)| &li.order_id == order_id)
            .map(|(id, _)| id.clone())
            .collect();
        self.state.drop_line_items(&owned);
        Ok(true)
    }

    fn linked_draft_order_ids(&mut self, work_order_id: i32) -> Result<BTreeSet<Gid>, DomainError> {
        let stored = self.state.work_order(work_order_id)?;
        Ok(stored
            .links
            .values()
            .filter_map(|line_item_id| self.state.line_items.get(line_item_id))
            .map(|li| &li.order_id)
            .filter(|order_id| self.state.orders.get(*order_id) == Some(&OrderKind::DraftOrder))
            .cloned()
            .collect())
    }

    fn find_row_uuids(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuids: &[Uuid],
    ) -> Result<Vec<Uuid>, DomainError> {
        let stored = self.state.work_order(work_order_id)?;
        Ok(uuids
            .iter()
            .copied()
            .filter(|uuid| stored.has_row(namespace, *uuid))
            .collect())
    }

    fn set_line_item(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuid: Uuid,
        line_item_id: &Gid,
    ) -> Result<(), DomainError> {
        if !self.state.line_items.contains_key(line_item_id) {
            return Err(DomainError::Internal(format!(
                "line item {line_item_id} is not mirrored"
            )));
        }
        let stored = self
            .state
            .work_orders
            .get_mut(&work_order_id)
            .ok_or(DomainError::NotFound)?;
        if stored.has_row(namespace, uuid) {
            stored.links.insert((namespace, uuid), line_item_id.clone());
        }
        Ok(())
    }

    fn committed_order_context(
        &mut self,
        work_order_id: i32,
    ) -> Result<CommittedOrderContext, DomainError> {
        let stored = self.state.work_order(work_order_id)?;
        let mut context = CommittedOrderContext::empty();

        for item in &stored.work_order.items {
            if let Some(line_item_id) = stored.links.get(&(CorrelationNamespace::Item, item.uuid)) {
                if let Some(linked) = self.state.linked_line_item(line_item_id)? {
                    context.link_item(item.item_ref(), linked);
                }
            }
        }
        for charge in &stored.work_order.charges {
            let namespace = CorrelationNamespace::from(charge.kind());
            if let Some(line_item_id) = stored.links.get(&(namespace, charge.uuid)) {
                if let Some(linked) = self.state.linked_line_item(line_item_id)? {
                    context.link_charge(charge.charge_ref(), linked);
                }
            }
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::work_order::{Charge, Item};

    fn gid(object_type: &str, id: u64) -> Gid {
        Gid::new(object_type, id).unwrap()
    }

    #[test]
    fn save_preserves_links_of_surviving_rows() {
        let repo = InMemoryWorkOrderRepository::default();
        let kept = Item::product(Uuid::new_v4(), gid("ProductVariant", 1), 1);
        let dropped = Item::product(Uuid::new_v4(), gid("ProductVariant", 2), 1);
        let work_order = WipWorkOrder {
            items: vec![kept.clone(), dropped.clone()],
            ..WipWorkOrder::default()
        };
        let order = OrderSnapshot {
            id: gid("DraftOrder", 1),
            name: "#D1".to_string(),
            custom_attributes: vec![],
        };
        let line_items = [1, 2].map(|n| LineItemSnapshot {
            id: gid("LineItem", n),
            quantity: 1,
            title: None,
            custom_attributes: vec![],
        });

        let id = repo
            .transaction(|store| {
                let id = store.save_work_order("#WO-1", &work_order)?;
                store.upsert_order(&order, &line_items)?;
                store.set_line_item(id, CorrelationNamespace::Item, kept.uuid, &gid("LineItem", 1))?;
                store.set_line_item(id, CorrelationNamespace::Item, dropped.uuid, &gid("LineItem", 2))?;
                Ok(id)
            })
            .unwrap();

        let context = repo
            .transaction(|store| {
                let only_kept = WipWorkOrder {
                    items: vec![kept.clone()],
                    ..WipWorkOrder::default()
                };
                assert_eq!(store.save_work_order("#WO-1", &only_kept)?, id);
                store.committed_order_context(id)
            })
            .unwrap();

        assert!(context.item_line_item(&kept.item_ref()).is_some());
        assert!(context.item_line_item(&dropped.item_ref()).is_none());
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let repo = InMemoryWorkOrderRepository::default();
        let result: Result<(), DomainError> = repo.transaction(|store| {
            store.save_work_order("#WO-1", &WipWorkOrder::default())?;
            Err(DomainError::Platform("boom".to_string()))
        });
        assert!(result.is_err());

        let found = repo.transaction(|store| store.lock_work_order("#WO-1")).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn uuids_cannot_be_shared_across_work_orders() {
        let repo = InMemoryWorkOrderRepository::default();
        let charge = Charge::fixed(Uuid::new_v4(), "Fee", BigDecimal::from(1));
        let work_order = WipWorkOrder {
            charges: vec![charge],
            ..WipWorkOrder::default()
        };

        repo.transaction(|store| store.save_work_order("#WO-1", &work_order))
            .unwrap();
        let result = repo.transaction(|store| store.save_work_order("#WO-2", &work_order));

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn removing_order_clears_links() {
        let repo = InMemoryWorkOrderRepository::default();
        let item = Item::product(Uuid::new_v4(), gid("ProductVariant", 1), 1);
        let work_order = WipWorkOrder {
            items: vec![item.clone()],
            ..WipWorkOrder::default()
        };
        let order = OrderSnapshot {
            id: gid("Order", 1),
            name: "#1001".to_string(),
            custom_attributes: vec![],
        };
        let line_item = LineItemSnapshot {
            id: gid("LineItem", 1),
            quantity: 1,
            title: None,
            custom_attributes: vec![],
        };

        let context = repo
            .transaction(|store| {
                let id = store.save_work_order("#WO-1", &work_order)?;
                store.upsert_order(&order, std::slice::from_ref(&line_item))?;
                store.set_line_item(id, CorrelationNamespace::Item, item.uuid, &line_item.id)?;
                assert!(store.remove_order(&order.id)?);
                assert!(!store.remove_order(&order.id)?);
                store.committed_order_context(id)
            })
            .unwrap();

        assert!(context.is_empty());
    }
}
