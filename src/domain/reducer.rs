//! Actions over a work-in-progress work order.
//!
//! `reduce` is a pure function of the current state, one action and the
//! committed order context. Every action that changes items or the charges
//! linked to them re-runs Merge-Split normalization. `set` and `setPartial`
//! are shallow merges: absent fields are kept, `null` clears a field.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::errors::DomainError;
use super::ids::Gid;
use super::normalize::normalize;
use super::order_context::CommittedOrderContext;
use super::work_order::{
    present, Charge, CompanyAssignment, Item, ItemRef, WipWorkOrder, WorkOrderPatch,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkOrderAction {
    SetPartial(WorkOrderPatch),
    SetCompany(CompanyAssignment),
    #[serde(rename_all = "camelCase")]
    SetCustomer {
        #[serde(default, deserialize_with = "present")]
        customer_id: Option<Option<Gid>>,
    },
    AddItems {
        items: Vec<Item>,
    },
    RemoveItem {
        item: ItemRef,
    },
    UpdateItem {
        item: Item,
    },
    UpdateItemCharges {
        item: ItemRef,
        charges: Vec<Charge>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateItemCustomFields {
        item: ItemRef,
        custom_fields: BTreeMap<String, String>,
    },
    Set(Box<WorkOrderPatch>),
}

pub fn reduce(
    mut state: WipWorkOrder,
    action: WorkOrderAction,
    context: &CommittedOrderContext,
) -> WipWorkOrder {
    match action {
        WorkOrderAction::SetPartial(patch) => apply_patch(state, patch, context),
        WorkOrderAction::Set(patch) => apply_patch(state, *patch, context),
        WorkOrderAction::SetCompany(company) => {
            WorkOrderPatch::from(company).apply_to(&mut state);
            state
        }
        WorkOrderAction::SetCustomer { customer_id } => {
            if let Some(customer_id) = customer_id {
                state.customer_id = customer_id;
            }
            state.company_id = None;
            state.company_location_id = None;
            state.company_contact_id = None;
            state
        }
        WorkOrderAction::AddItems { items } => {
            state.items.extend(items);
            renormalize(state, context)
        }
        WorkOrderAction::UpdateItem { item } => {
            if let Some(existing) = state.items.iter_mut().find(|i| i.uuid == item.uuid) {
                *existing = item;
            }
            renormalize(state, context)
        }
        WorkOrderAction::RemoveItem { item } => {
            state.items.retain(|i| !i.is(&item));
            state.charges.retain(|charge| !charge.is_linked_to(&item));
            state
        }
        WorkOrderAction::UpdateItemCharges { item, charges } => {
            state.charges.retain(|charge| !charge.is_linked_to(&item));
            state
                .charges
                .extend(charges.into_iter().map(|charge| charge.linked_to(item)));
            renormalize(state, context)
        }
        WorkOrderAction::UpdateItemCustomFields {
            item,
            custom_fields,
        } => {
            if let Some(existing) = state.items.iter_mut().find(|i| i.is(&item)) {
                existing.custom_fields = custom_fields;
            }
            state
        }
    }
}

fn apply_patch(
    mut state: WipWorkOrder,
    patch: WorkOrderPatch,
    context: &CommittedOrderContext,
) -> WipWorkOrder {
    let touches_lines = patch.touches_lines();
    patch.apply_to(&mut state);
    if touches_lines {
        renormalize(state, context)
    } else {
        state
    }
}

fn renormalize(mut state: WipWorkOrder, context: &CommittedOrderContext) -> WipWorkOrder {
    let items = std::mem::take(&mut state.items);
    let charges = std::mem::take(&mut state.charges);
    let (items, charges) = normalize(items, charges, context);
    state.items = items;
    state.charges = charges;
    state
}

/// An editing session: the WIP value plus the committed order context it is
/// validated against. Actions are rejected until the context is loaded.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderDraft {
    state: WipWorkOrder,
    context: Option<CommittedOrderContext>,
}

impl WorkOrderDraft {
    pub fn new(state: WipWorkOrder) -> Self {
        Self {
            state,
            context: None,
        }
    }

    pub fn with_context(state: WipWorkOrder, context: CommittedOrderContext) -> Self {
        Self {
            state,
            context: Some(context),
        }
    }

    pub fn load_context(&mut self, context: CommittedOrderContext) {
        self.context = Some(context);
    }

    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    pub fn state(&self) -> &WipWorkOrder {
        &self.state
    }

    pub fn into_state(self) -> WipWorkOrder {
        self.state
    }

    pub fn dispatch(&mut self, action: WorkOrderAction) -> Result<&WipWorkOrder, DomainError> {
        let Some(context) = &self.context else {
            return Err(DomainError::RequiresLoadedWorkOrder);
        };
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action, context);
        Ok(&self.state)
    }
}
