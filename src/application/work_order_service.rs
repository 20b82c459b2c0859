use std::collections::HashSet;

use serde::Serialize;

use crate::application::linker::link_work_order_items_and_charges;
use crate::domain::errors::DomainError;
use crate::domain::ids::Gid;
use crate::domain::order::{LineItemSnapshot, LinkReport, OrderSnapshot};
use crate::domain::order_context::{CommittedOrderContext, CommittedOrderContextDto};
use crate::domain::ports::{OrderPlatform, WorkOrderRepository};
use crate::domain::reducer::{WorkOrderAction, WorkOrderDraft};
use crate::domain::work_order::WipWorkOrder;

/// A stored work order together with what has already been committed of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedWorkOrder {
    pub work_order: WipWorkOrder,
    pub context: CommittedOrderContextDto,
}

/// Object-safe facade over [`WorkOrderService`] for the HTTP layer.
pub trait WorkOrderOperations: Send + Sync {
    fn sync_order(
        &self,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<Option<LinkReport>, DomainError>;

    fn remove_order(&self, order_id: &Gid) -> Result<bool, DomainError>;

    fn save_work_order(&self, name: &str, work_order: &WipWorkOrder) -> Result<WipWorkOrder, DomainError>;

    fn load_work_order(&self, name: &str) -> Result<LoadedWorkOrder, DomainError>;

    fn committed_order_context(&self, name: &str) -> Result<CommittedOrderContext, DomainError>;

    fn reduce_draft(
        &self,
        name: Option<&str>,
        state: WipWorkOrder,
        actions: Vec<WorkOrderAction>,
    ) -> Result<WipWorkOrder, DomainError>;
}

pub struct WorkOrderService<R, P> {
    repo: R,
    platform: P,
}

impl<R: WorkOrderRepository, P: OrderPlatform> WorkOrderService<R, P> {
    pub fn new(repo: R, platform: P) -> Self {
        Self { repo, platform }
    }
}

fn validate(name: &str, work_order: &WipWorkOrder) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidInput("work order name must not be empty".to_string()));
    }

    if let Some(item) = work_order.items.iter().find(|item| item.quantity <= 0) {
        return Err(DomainError::InvalidInput(format!(
            "item {} has non-positive quantity {}",
            item.uuid, item.quantity
        )));
    }

    let mut seen = HashSet::new();
    let uuids = work_order
        .items
        .iter()
        .map(|i| i.uuid)
        .chain(work_order.charges.iter().map(|c| c.uuid));
    for uuid in uuids {
        if !seen.insert(uuid) {
            return Err(DomainError::InvalidInput(format!("duplicate uuid {uuid}")));
        }
    }

    Ok(())
}

impl<R: WorkOrderRepository, P: OrderPlatform> WorkOrderOperations for WorkOrderService<R, P> {
    /// Mirrors the order and links its line items in one transaction. A
    /// failed draft order deletion rolls everything back, so the webhook can
    /// simply be redelivered.
    fn sync_order(
        &self,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<Option<LinkReport>, DomainError> {
        let report = self.repo.transaction(|store| {
            store.upsert_order(order, line_items)?;
            link_work_order_items_and_charges(store, &self.platform, order, line_items)
        })?;

        if let Some(report) = &report {
            log::info!(
                "synced {} {} into work order {:?}: {} linked, {} missing, {} draft order(s) deleted",
                order.kind()?.as_str(),
                order.id,
                report.work_order_name,
                report.linked_count(),
                report.missing_count(),
                report.deleted_draft_orders.len(),
            );
        }
        Ok(report)
    }

    fn remove_order(&self, order_id: &Gid) -> Result<bool, DomainError> {
        let removed = self.repo.transaction(|store| store.remove_order(order_id))?;
        if removed {
            log::info!("removed order {order_id}");
        }
        Ok(removed)
    }

    fn save_work_order(&self, name: &str, work_order: &WipWorkOrder) -> Result<WipWorkOrder, DomainError> {
        validate(name, work_order)?;

        self.repo.transaction(|store| {
            let id = store.save_work_order(name, work_order)?;
            store.load_work_order(id)
        })
    }

    fn load_work_order(&self, name: &str) -> Result<LoadedWorkOrder, DomainError> {
        self.repo.transaction(|store| {
            let id = store.lock_work_order(name)?.ok_or(DomainError::NotFound)?;
            let work_order = store.load_work_order(id)?;
            let context = store.committed_order_context(id)?;
            Ok(LoadedWorkOrder {
                work_order,
                context: CommittedOrderContextDto::from(&context),
            })
        })
    }

    fn committed_order_context(&self, name: &str) -> Result<CommittedOrderContext, DomainError> {
        self.repo.transaction(|store| {
            let id = store.lock_work_order(name)?.ok_or(DomainError::NotFound)?;
            store.committed_order_context(id)
        })
    }

    /// Unsaved work orders have nothing committed yet and reduce against an
    /// empty context.
    fn reduce_draft(
        &self,
        name: Option<&str>,
        state: WipWorkOrder,
        actions: Vec<WorkOrderAction>,
    ) -> Result<WipWorkOrder, DomainError> {
        let context = match name {
            Some(name) => match self.committed_order_context(name) {
                Err(DomainError::NotFound) => CommittedOrderContext::empty(),
                other => other?,
            },
            None => CommittedOrderContext::empty(),
        };

        let mut draft = WorkOrderDraft::with_context(state, context);
        for action in actions {
            draft.dispatch(action)?;
        }
        Ok(draft.into_state())
    }
}
