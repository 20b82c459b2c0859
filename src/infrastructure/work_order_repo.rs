use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::attributes::CorrelationNamespace;
use crate::domain::errors::DomainError;
use crate::domain::ids::{Gid, OrderKind};
use crate::domain::order::{LineItemSnapshot, OrderSnapshot};
use crate::domain::order_context::{CommittedOrderContext, LinkedLineItem};
use crate::domain::ports::{WorkOrderRepository, WorkOrderStore};
use crate::domain::work_order::{
    Charge, ChargePricing, Item, ItemKind, ItemRef, WipWorkOrder,
};
use crate::schema::{
    shopify_order_line_items, shopify_orders, work_order_fixed_charges, work_order_hourly_charges,
    work_order_items, work_orders,
};

use super::models::{
    FixedChargeRow, HourlyChargeRow, ItemRow, NewFixedChargeRow, NewHourlyChargeRow, NewItemRow,
    NewLineItemRow, NewShopifyOrderRow, WorkOrderRow, WorkOrderValues,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselWorkOrderRepository {
    pool: DbPool,
}

impl DieselWorkOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl WorkOrderRepository for DieselWorkOrderRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn WorkOrderStore) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| f(&mut DieselWorkOrderStore { conn }))
    }
}

pub struct DieselWorkOrderStore<'a> {
    conn: &'a mut PgConnection,
}

// ── Row conversions ───────────────────────────────────────────────────────────

fn gid(raw: String) -> Result<Gid, DomainError> {
    Ok(Gid::parse(raw)?)
}

fn optional_gid(raw: Option<String>) -> Result<Option<Gid>, DomainError> {
    raw.map(gid).transpose()
}

fn item_ref(uuid: Option<Uuid>, kind: Option<String>) -> Result<Option<ItemRef>, DomainError> {
    match (uuid, kind) {
        (Some(uuid), Some(kind)) => {
            let kind = ItemKind::parse(&kind)
                .ok_or_else(|| DomainError::Internal(format!("unknown item kind {kind:?}")))?;
            Ok(Some(ItemRef { kind, uuid }))
        }
        _ => Ok(None),
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = DomainError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let kind = ItemKind::parse(&row.kind)
            .ok_or_else(|| DomainError::Internal(format!("unknown item kind {:?}", row.kind)))?;
        Ok(Item {
            kind,
            uuid: row.uuid,
            product_variant_id: optional_gid(row.product_variant_id)?,
            name: row.name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            absorb_charges: row.absorb_charges,
            custom_fields: serde_json::from_value(row.custom_fields)?,
        })
    }
}

impl TryFrom<HourlyChargeRow> for Charge {
    type Error = DomainError;

    fn try_from(row: HourlyChargeRow) -> Result<Self, Self::Error> {
        Ok(Charge {
            uuid: row.uuid,
            name: row.name,
            work_order_item: item_ref(row.work_order_item_uuid, row.work_order_item_kind)?,
            employee_id: optional_gid(row.employee_id)?,
            pricing: ChargePricing::Hourly {
                hours: row.hours,
                rate: row.rate,
            },
        })
    }
}

impl TryFrom<FixedChargeRow> for Charge {
    type Error = DomainError;

    fn try_from(row: FixedChargeRow) -> Result<Self, Self::Error> {
        Ok(Charge {
            uuid: row.uuid,
            name: row.name,
            work_order_item: item_ref(row.work_order_item_uuid, row.work_order_item_kind)?,
            employee_id: optional_gid(row.employee_id)?,
            pricing: ChargePricing::Fixed { amount: row.amount },
        })
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

impl DieselWorkOrderStore<'_> {
    /// Every line item id any row of the work order is linked to.
    fn linked_line_item_ids(&mut self, work_order_id: i32) -> QueryResult<Vec<String>> {
        let mut ids: Vec<Option<String>> = work_order_items::table
            .filter(work_order_items::work_order_id.eq(work_order_id))
            .filter(work_order_items::shopify_order_line_item_id.is_not_null())
            .select(work_order_items::shopify_order_line_item_id)
            .load(self.conn)?;
        ids.extend(
            work_order_hourly_charges::table
                .filter(work_order_hourly_charges::work_order_id.eq(work_order_id))
                .filter(work_order_hourly_charges::shopify_order_line_item_id.is_not_null())
                .select(work_order_hourly_charges::shopify_order_line_item_id)
                .load::<Option<String>>(self.conn)?,
        );
        ids.extend(
            work_order_fixed_charges::table
                .filter(work_order_fixed_charges::work_order_id.eq(work_order_id))
                .filter(work_order_fixed_charges::shopify_order_line_item_id.is_not_null())
                .select(work_order_fixed_charges::shopify_order_line_item_id)
                .load::<Option<String>>(self.conn)?,
        );
        Ok(ids.into_iter().flatten().collect())
    }

    /// `line item id → (order id, order type)` for mirrored line items.
    fn line_item_orders(&mut self, line_item_ids: &[String]) -> QueryResult<HashMap<String, (String, String)>> {
        let rows: Vec<(String, String, String)> = shopify_order_line_items::table
            .inner_join(shopify_orders::table)
            .filter(shopify_order_line_items::line_item_id.eq_any(line_item_ids))
            .select((
                shopify_order_line_items::line_item_id,
                shopify_orders::order_id,
                shopify_orders::order_type,
            ))
            .load(self.conn)?;
        Ok(rows
            .into_iter()
            .map(|(line_item_id, order_id, order_type)| (line_item_id, (order_id, order_type)))
            .collect())
    }

    fn ensure_uuids_unclaimed(&mut self, work_order_id: i32, uuids: &[Uuid]) -> Result<(), DomainError> {
        let claimed: i64 = work_order_items::table
            .filter(work_order_items::uuid.eq_any(uuids))
            .filter(work_order_items::work_order_id.ne(work_order_id))
            .count()
            .get_result(self.conn)?;
        let claimed = claimed
            + work_order_hourly_charges::table
                .filter(work_order_hourly_charges::uuid.eq_any(uuids))
                .filter(work_order_hourly_charges::work_order_id.ne(work_order_id))
                .count()
                .get_result::<i64>(self.conn)?
            + work_order_fixed_charges::table
                .filter(work_order_fixed_charges::uuid.eq_any(uuids))
                .filter(work_order_fixed_charges::work_order_id.ne(work_order_id))
                .count()
                .get_result::<i64>(self.conn)?;

        if claimed > 0 {
            return Err(DomainError::InvalidInput(format!(
                "{claimed} item or charge uuid(s) belong to another work order"
            )));
        }
        Ok(())
    }

    fn save_items(&mut self, work_order_id: i32, items: &[Item]) -> Result<(), DomainError> {
        let uuids: Vec<Uuid> = items.iter().map(|i| i.uuid).collect();
        diesel::delete(
            work_order_items::table
                .filter(work_order_items::work_order_id.eq(work_order_id))
                .filter(work_order_items::uuid.ne_all(&uuids)),
        )
        .execute(self.conn)?;

        if items.is_empty() {
            return Ok(());
        }

        let rows = items
            .iter()
            .zip(0..)
            .map(|(item, position)| {
                Ok(NewItemRow {
                    uuid: item.uuid,
                    work_order_id,
                    position,
                    kind: item.kind.as_str().to_string(),
                    product_variant_id: item.product_variant_id.as_ref().map(|id| id.to_string()),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    absorb_charges: item.absorb_charges,
                    custom_fields: serde_json::to_value(&item.custom_fields)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        diesel::insert_into(work_order_items::table)
            .values(&rows)
            .on_conflict(work_order_items::uuid)
            .do_update()
            .set((
                work_order_items::position.eq(excluded(work_order_items::position)),
                work_order_items::kind.eq(excluded(work_order_items::kind)),
                work_order_items::product_variant_id.eq(excluded(work_order_items::product_variant_id)),
                work_order_items::name.eq(excluded(work_order_items::name)),
                work_order_items::quantity.eq(excluded(work_order_items::quantity)),
                work_order_items::unit_price.eq(excluded(work_order_items::unit_price)),
                work_order_items::absorb_charges.eq(excluded(work_order_items::absorb_charges)),
                work_order_items::custom_fields.eq(excluded(work_order_items::custom_fields)),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn save_charges(&mut self, work_order_id: i32, charges: &[Charge]) -> Result<(), DomainError> {
        let mut hourly = Vec::new();
        let mut fixed = Vec::new();

        for (charge, position) in charges.iter().zip(0..) {
            let work_order_item_uuid = charge.work_order_item.map(|item| item.uuid);
            let work_order_item_kind = charge.work_order_item.map(|item| item.kind.as_str().to_string());
            let employee_id = charge.employee_id.as_ref().map(|id| id.to_string());
            match &charge.pricing {
                ChargePricing::Hourly { hours, rate } => hourly.push(NewHourlyChargeRow {
                    uuid: charge.uuid,
                    work_order_id,
                    position,
                    work_order_item_uuid,
                    work_order_item_kind,
                    name: charge.name.clone(),
                    employee_id,
                    hours: hours.clone(),
                    rate: rate.clone(),
                }),
                ChargePricing::Fixed { amount } => fixed.push(NewFixedChargeRow {
                    uuid: charge.uuid,
                    work_order_id,
                    position,
                    work_order_item_uuid,
                    work_order_item_kind,
                    name: charge.name.clone(),
                    employee_id,
                    amount: amount.clone(),
                }),
            }
        }

        let hourly_uuids: Vec<Uuid> = hourly.iter().map(|row| row.uuid).collect();
        diesel::delete(
            work_order_hourly_charges::table
                .filter(work_order_hourly_charges::work_order_id.eq(work_order_id))
                .filter(work_order_hourly_charges::uuid.ne_all(&hourly_uuids)),
        )
        .execute(self.conn)?;

        let fixed_uuids: Vec<Uuid> = fixed.iter().map(|row| row.uuid).collect();
        diesel::delete(
            work_order_fixed_charges::table
                .filter(work_order_fixed_charges::work_order_id.eq(work_order_id))
                .filter(work_order_fixed_charges::uuid.ne_all(&fixed_uuids)),
        )
        .execute(self.conn)?;

        if !hourly.is_empty() {
            diesel::insert_into(work_order_hourly_charges::table)
                .values(&hourly)
                .on_conflict(work_order_hourly_charges::uuid)
                .do_update()
                .set((
                    work_order_hourly_charges::position.eq(excluded(work_order_hourly_charges::position)),
                    work_order_hourly_charges::work_order_item_uuid
                        .eq(excluded(work_order_hourly_charges::work_order_item_uuid)),
                    work_order_hourly_charges::work_order_item_kind
                        .eq(excluded(work_order_hourly_charges::work_order_item_kind)),
                    work_order_hourly_charges::name.eq(excluded(work_order_hourly_charges::name)),
                    work_order_hourly_charges::employee_id.eq(excluded(work_order_hourly_charges::employee_id)),
                    work_order_hourly_charges::hours.eq(excluded(work_order_hourly_charges::hours)),
                    work_order_hourly_charges::rate.eq(excluded(work_order_hourly_charges::rate)),
                ))
                .execute(self.conn)?;
        }

        if !fixed.is_empty() {
            diesel::insert_into(work_order_fixed_charges::table)
                .values(&fixed)
                .on_conflict(work_order_fixed_charges::uuid)
                .do_update()
                .set((
                    work_order_fixed_charges::position.eq(excluded(work_order_fixed_charges::position)),
                    work_order_fixed_charges::work_order_item_uuid
                        .eq(excluded(work_order_fixed_charges::work_order_item_uuid)),
                    work_order_fixed_charges::work_order_item_kind
                        .eq(excluded(work_order_fixed_charges::work_order_item_kind)),
                    work_order_fixed_charges::name.eq(excluded(work_order_fixed_charges::name)),
                    work_order_fixed_charges::employee_id.eq(excluded(work_order_fixed_charges::employee_id)),
                    work_order_fixed_charges::amount.eq(excluded(work_order_fixed_charges::amount)),
                ))
                .execute(self.conn)?;
        }

        Ok(())
    }
}

impl WorkOrderStore for DieselWorkOrderStore<'_> {
    fn lock_work_order(&mut self, name: &str) -> Result<Option<i32>, DomainError> {
        Ok(work_orders::table
            .filter(work_orders::name.eq(name))
            .select(work_orders::id)
            .for_update()
            .first::<i32>(self.conn)
            .optional()?)
    }

    fn save_work_order(&mut self, name: &str, work_order: &WipWorkOrder) -> Result<i32, DomainError> {
        let values = WorkOrderValues {
            name: name.to_string(),
            status: work_order.status.clone(),
            note: work_order.note.clone(),
            due_date: work_order.due_date,
            customer_id: work_order.customer_id.as_ref().map(|id| id.to_string()),
            company_id: work_order.company_id.as_ref().map(|id| id.to_string()),
            company_location_id: work_order.company_location_id.as_ref().map(|id| id.to_string()),
            company_contact_id: work_order.company_contact_id.as_ref().map(|id| id.to_string()),
            discount: work_order.discount.as_ref().map(serde_json::to_value).transpose()?,
            payment_terms: work_order.payment_terms.as_ref().map(serde_json::to_value).transpose()?,
            updated_at: Utc::now(),
        };

        let id: i32 = diesel::insert_into(work_orders::table)
            .values(&values)
            .on_conflict(work_orders::name)
            .do_update()
            .set(&values)
            .returning(work_orders::id)
            .get_result(self.conn)?;

        let uuids: Vec<Uuid> = work_order
            .items
            .iter()
            .map(|i| i.uuid)
            .chain(work_order.charges.iter().map(|c| c.uuid))
            .collect();
        self.ensure_uuids_unclaimed(id, &uuids)?;

        self.save_items(id, &work_order.items)?;
        self.save_charges(id, &work_order.charges)?;

        Ok(id)
    }

    fn load_work_order(&mut self, work_order_id: i32) -> Result<WipWorkOrder, DomainError> {
        let row = work_orders::table
            .find(work_order_id)
            .select(WorkOrderRow::as_select())
            .first(self.conn)
            .optional()?
            .ok_or(DomainError::NotFound)?;

        let items = ItemRow::belonging_to(&row)
            .select(ItemRow::as_select())
            .order(work_order_items::position.asc())
            .load(self.conn)?
            .into_iter()
            .map(Item::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut charges: Vec<(i32, Charge)> = HourlyChargeRow::belonging_to(&row)
            .select(HourlyChargeRow::as_select())
            .load(self.conn)?
            .into_iter()
            .map(|charge| Ok((charge.position, Charge::try_from(charge)?)))
            .collect::<Result<_, DomainError>>()?;
        for charge in FixedChargeRow::belonging_to(&row)
            .select(FixedChargeRow::as_select())
            .load(self.conn)?
        {
            charges.push((charge.position, Charge::try_from(charge)?));
        }
        charges.sort_by_key(|(position, _)| *position);

        Ok(WipWorkOrder {
            name: Some(row.name),
            status: row.status,
            note: row.note,
            due_date: row.due_date,
            customer_id: optional_gid(row.customer_id)?,
            company_id: optional_gid(row.company_id)?,
            company_location_id: optional_gid(row.company_location_id)?,
            company_contact_id: optional_gid(row.company_contact_id)?,
            items,
            charges: charges.into_iter().map(|(_, charge)| charge).collect(),
            discount: row.discount.map(serde_json::from_value).transpose()?,
            payment_terms: row.payment_terms.map(serde_json::from_value).transpose()?,
        })
    }

    fn upsert_order(
        &mut self,
        order: &OrderSnapshot,
        line_items: &[LineItemSnapshot],
    ) -> Result<(), DomainError> {
        let kind = order.kind()?;
        let order_id = order.id.to_string();

        diesel::insert_into(shopify_orders::table)
            .values(&NewShopifyOrderRow {
                order_id: order_id.clone(),
                order_type: kind.as_str().to_string(),
                name: order.name.clone(),
            })
            .on_conflict(shopify_orders::order_id)
            .do_update()
            .set((
                shopify_orders::order_type.eq(kind.as_str()),
                shopify_orders::name.eq(&order.name),
                shopify_orders::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;

        // Dropping a line item nulls every link to it (ON DELETE SET NULL).
        let ids: Vec<String> = line_items.iter().map(|li| li.id.to_string()).collect();
        diesel::delete(
            shopify_order_line_items::table
                .filter(shopify_order_line_items::order_id.eq(&order_id))
                .filter(shopify_order_line_items::line_item_id.ne_all(&ids)),
        )
        .execute(self.conn)?;

        if line_items.is_empty() {
            return Ok(());
        }

        let rows: Vec<NewLineItemRow> = line_items
            .iter()
            .map(|li| NewLineItemRow {
                line_item_id: li.id.to_string(),
                order_id: order_id.clone(),
                quantity: li.quantity,
                title: li.title.clone(),
            })
            .collect();
        diesel::insert_into(shopify_order_line_items::table)
            .values(&rows)
            .on_conflict(shopify_order_line_items::line_item_id)
            .do_update()
            .set((
                shopify_order_line_items::order_id.eq(excluded(shopify_order_line_items::order_id)),
                shopify_order_line_items::quantity.eq(excluded(shopify_order_line_items::quantity)),
                shopify_order_line_items::title.eq(excluded(shopify_order_line_items::title)),
            ))
            .execute(self.conn)?;

        Ok(())
    }

    fn remove_order(&mut self, order_id: &Gid) -> Result<bool, DomainError> {
        // Line items cascade; links to them are nulled.
        let deleted = diesel::delete(shopify_orders::table.find(order_id.as_str())).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn linked_draft_order_ids(&mut self, work_order_id: i32) -> Result<BTreeSet<Gid>, DomainError> {
        let line_item_ids = self.linked_line_item_ids(work_order_id)?;
        self.line_item_orders(&line_item_ids)?
            .into_values()
            .filter(|(_, order_type)| OrderKind::parse(order_type) == Some(OrderKind::DraftOrder))
            .map(|(order_id, _)| gid(order_id))
            .collect()
    }

    fn find_row_uuids(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuids: &[Uuid],
    ) -> Result<Vec<Uuid>, DomainError> {
        let found = match namespace {
            CorrelationNamespace::Item => work_order_items::table
                .filter(work_order_items::work_order_id.eq(work_order_id))
                .filter(work_order_items::uuid.eq_any(uuids))
                .select(work_order_items::uuid)
                .load(self.conn)?,
            CorrelationNamespace::HourlyCharge => work_order_hourly_charges::table
                .filter(work_order_hourly_charges::work_order_id.eq(work_order_id))
                .filter(work_order_hourly_charges::uuid.eq_any(uuids))
                .select(work_order_hourly_charges::uuid)
                .load(self.conn)?,
            CorrelationNamespace::FixedCharge => work_order_fixed_charges::table
                .filter(work_order_fixed_charges::work_order_id.eq(work_order_id))
                .filter(work_order_fixed_charges::uuid.eq_any(uuids))
                .select(work_order_fixed_charges::uuid)
                .load(self.conn)?,
        };
        Ok(found)
    }

    fn set_line_item(
        &mut self,
        work_order_id: i32,
        namespace: CorrelationNamespace,
        uuid: Uuid,
        line_item_id: &Gid,
    ) -> Result<(), DomainError> {
        let line_item_id = Some(line_item_id.to_string());
        match namespace {
            CorrelationNamespace::Item => diesel::update(
                work_order_items::table
                    .find(uuid)
                    .filter(work_order_items::work_order_id.eq(work_order_id)),
            )
            .set(work_order_items::shopify_order_line_item_id.eq(line_item_id))
            .execute(self.conn)?,
            CorrelationNamespace::HourlyCharge => diesel::update(
                work_order_hourly_charges::table
                    .find(uuid)
                    .filter(work_order_hourly_charges::work_order_id.eq(work_order_id)),
            )
            .set(work_order_hourly_charges::shopify_order_line_item_id.eq(line_item_id))
            .execute(self.conn)?,
            CorrelationNamespace::FixedCharge => diesel::update(
                work_order_fixed_charges::table
                    .find(uuid)
                    .filter(work_order_fixed_charges::work_order_id.eq(work_order_id)),
            )
            .set(work_order_fixed_charges::shopify_order_line_item_id.eq(line_item_id))
            .execute(self.conn)?,
        };
        Ok(())
    }

    fn committed_order_context(
        &mut self,
        work_order_id: i32,
    ) -> Result<CommittedOrderContext, DomainError> {
        let line_item_ids = self.linked_line_item_ids(work_order_id)?;
        let orders = self.line_item_orders(&line_item_ids)?;
        let linked = |line_item_id: &str| -> Result<Option<LinkedLineItem>, DomainError> {
            let Some((order_id, _)) = orders.get(line_item_id) else {
                return Ok(None);
            };
            Ok(Some(LinkedLineItem::new(
                gid(line_item_id.to_string())?,
                gid(order_id.clone())?,
            )?))
        };

        let mut context = CommittedOrderContext::empty();

        let items: Vec<ItemRow> = work_order_items::table
            .filter(work_order_items::work_order_id.eq(work_order_id))
            .filter(work_order_items::shopify_order_line_item_id.is_not_null())
            .select(ItemRow::as_select())
            .load(self.conn)?;
        for row in items {
            let Some(line_item_id) = &row.shopify_order_line_item_id else {
                continue;
            };
            if let Some(line_item) = linked(line_item_id)? {
                let item = Item::try_from(row)?;
                context.link_item(item.item_ref(), line_item);
            }
        }

        let hourly: Vec<HourlyChargeRow> = work_order_hourly_charges::table
            .filter(work_order_hourly_charges::work_order_id.eq(work_order_id))
            .filter(work_order_hourly_charges::shopify_order_line_item_id.is_not_null())
            .select(HourlyChargeRow::as_select())
            .load(self.conn)?;
        for row in hourly {
            let Some(line_item) = row.shopify_order_line_item_id.as_deref().map(&linked).transpose()?.flatten() else {
                continue;
            };
            context.link_charge(Charge::try_from(row)?.charge_ref(), line_item);
        }

        let fixed: Vec<FixedChargeRow> = work_order_fixed_charges::table
            .filter(work_order_fixed_charges::work_order_id.eq(work_order_id))
            .filter(work_order_fixed_charges::shopify_order_line_item_id.is_not_null())
            .select(FixedChargeRow::as_select())
            .load(self.conn)?;
        for row in fixed {
            let Some(line_item) = row.shopify_order_line_item_id.as_deref().map(&linked).transpose()?.flatten() else {
                continue;
            };
            context.link_charge(Charge::try_from(row)?.charge_ref(), line_item);
        }

        Ok(context)
    }
}
