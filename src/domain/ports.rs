use std::collections::BTreeSet;

use uuid::Uuid;

use super::attributes::CorrelationNamespace;
use super::errors::DomainError;
use super::ids::Gid;
use super::order::{LineItemSnapshot, OrderSnapshot};
use super::order_context::CommittedOrderContext;
use super::work_order::WipWorkOrder;

/// Storage operations available inside one transaction.
pub trait WorkOrderStore {
    /// Resolves a work order by name and locks its row for the rest of the
    /// transaction.
    fn lock_work_order(&mut self, name: &str) -> Result<Option<i32>, DomainError>;

    /// Creates or updates a work order with its items and charges. Existing
    /// line-item links of rows that survive are kept.
    fn save_work_order(&mut self, name: &str, work_order: &WipWorkOrder) -> Result<i32, DomainError>;

    fn load_work_order(&mut self, work_order_id: i32) -> Result<WipWorkOrder, DomainError>;

    /// Mirrors an order and replaces its line items with `line_items`.
    fn upsert_order(
        &mut self,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<(), DomainError>;

    /// Drops a mirrored order and its line items, clearing links to them.
    fn remove_order(&mut self, order_id: &Gid) -> Result<bool, DomainError>;

    /// Draft orders that at least one item or charge of the work order is
    /// linked to.
    fn linked_draft_order_ids(&mut self, work_order_id: i32) -> Result<BTreeSet<Gid>, DomainError>;

    /// The subset of `uuids` that exist as rows of the work order.
    fn find_row_uuids(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuids: &[Uuid],
    ) -> Result<Vec<Uuid>, DomainError>;

    fn set_line_item(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuid: Uuid,
        line_item_id: &Gid,
    ) -> Result<(), DomainError>;

    fn committed_order_context(
        &mut self,
        work_order_id: i32,
    ) -> Result<CommittedOrderContext, DomainError>;
}

pub trait WorkOrderRepository: Send + Sync + 'static {
    /// Runs `f` atomically; any error rolls back everything it wrote.
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn WorkOrderStore) -> Result<T, DomainError>;
}

/// The external commerce platform.
pub trait OrderPlatform: Send + Sync + 'static {
    fn delete_draft_order(&self, id: &Gid) -> Result<(), DomainError>;
}
