use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    shopify_order_line_items, shopify_orders, work_order_fixed_charges, work_order_hourly_charges,
    work_order_items, work_orders,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = work_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkOrderRow {
    pub id: i32,
    pub name: String,
    pub status: String,
    pub note: String,
    pub due_date: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub company_id: Option<String>,
    pub company_location_id: Option<String>,
    pub company_contact_id: Option<String>,
    pub discount: Option<Value>,
    pub payment_terms: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert values, doubling as the changeset when the name already exists.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = work_orders)]
#[diesel(treat_none_as_null = true)]
pub struct WorkOrderValues {
    pub name: String,
    pub status: String,
    pub note: String,
    pub due_date: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub company_id: Option<String>,
    pub company_location_id: Option<String>,
    pub company_contact_id: Option<String>,
    pub discount: Option<Value>,
    pub payment_terms: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = work_order_items)]
#[diesel(primary_key(uuid))]
#[diesel(belongs_to(WorkOrderRow, foreign_key = work_order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub kind: String,
    pub product_variant_id: Option<String>,
    pub name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
    pub absorb_charges: bool,
    pub custom_fields: Value,
    pub shopify_order_line_item_id: Option<String>,
}

/// Leaves `shopify_order_line_item_id` out so upserts never touch links.
#[derive(Debug, Insertable)]
#[diesel(table_name = work_order_items)]
pub struct NewItemRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub kind: String,
    pub product_variant_id: Option<String>,
    pub name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
    pub absorb_charges: bool,
    pub custom_fields: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = work_order_hourly_charges)]
#[diesel(primary_key(uuid))]
#[diesel(belongs_to(WorkOrderRow, foreign_key = work_order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HourlyChargeRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub work_order_item_uuid: Option<Uuid>,
    pub work_order_item_kind: Option<String>,
    pub name: String,
    pub employee_id: Option<String>,
    pub hours: BigDecimal,
    pub rate: BigDecimal,
    pub shopify_order_line_item_id: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = work_order_hourly_charges)]
pub struct NewHourlyChargeRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub work_order_item_uuid: Option<Uuid>,
    pub work_order_item_kind: Option<String>,
    pub name: String,
    pub employee_id: Option<String>,
    pub hours: BigDecimal,
    pub rate: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = work_order_fixed_charges)]
#[diesel(primary_key(uuid))]
#[diesel(belongs_to(WorkOrderRow, foreign_key = work_order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FixedChargeRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub work_order_item_uuid: Option<Uuid>,
    pub work_order_item_kind: Option<String>,
    pub name: String,
    pub employee_id: Option<String>,
    pub amount: BigDecimal,
    pub shopify_order_line_item_id: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = work_order_fixed_charges)]
pub struct NewFixedChargeRow {
    pub uuid: Uuid,
    pub work_order_id: i32,
    pub position: i32,
    pub work_order_item_uuid: Option<Uuid>,
    pub work_order_item_kind: Option<String>,
    pub name: String,
    pub employee_id: Option<String>,
    pub amount: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shopify_orders)]
pub struct NewShopifyOrderRow {
    pub order_id: String,
    pub order_type: String,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shopify_order_line_items)]
pub struct NewLineItemRow {
    pub line_item_id: String,
    pub order_id: String,
    pub quantity: i32,
    pub title: Option<String>,
}
