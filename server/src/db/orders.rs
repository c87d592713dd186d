//! Order persistence across the two physical record sets
//!
//! Registered-student orders and guest orders live in separate tables with
//! different identity columns. Every read goes through one UNION view that
//! projects both into the common [`OrderView`] shape, tagged with the kind
//! letter so the composite [`OrderId`] round-trips.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::error::AppError;
use shared::models::{Buyer, GuestIdentity, OrderId, OrderStatus, OrderView, PaymentMode};
use sqlx::{PgPool, PgTransaction};

use crate::db::query::ListQuery;
use crate::error::ServiceResult;

/// Combined projection of both order tables into the common view columns.
///
/// The registered side joins buyer identity from `students`; the guest side
/// carries it inline. `student_id` doubles as the guest's student number so
/// the listing filter behaves the same for both kinds.
const ORDER_VIEW_SQL: &str = "\
SELECT 'S' AS kind, o.id, o.reference, o.public_id, o.student_id, \
'' AS student_number, s.first_name, s.last_name, s.email_address AS email, \
0 AS course, s.year_level, \
o.product_id, p.name AS product_name, p.price AS product_price, \
o.variation_id, v.name AS variation_name, o.quantity, o.mode_of_payment, o.status, \
o.user_remarks, o.admin_remarks, o.status_updated, o.edit_date, o.created_at \
FROM student_orders o \
JOIN students s ON s.student_id = o.student_id \
JOIN products p ON p.id = o.product_id \
LEFT JOIN product_variations v ON v.id = o.variation_id \
UNION ALL \
SELECT 'G', o.id, o.reference, o.public_id, o.student_number, \
o.student_number, o.first_name, o.last_name, o.email, \
o.course, o.year_level, \
o.product_id, p.name, p.price, \
o.variation_id, v.name, o.quantity, o.mode_of_payment, o.status, \
o.user_remarks, o.admin_remarks, o.status_updated, o.edit_date, o.created_at \
FROM guest_orders o \
JOIN products p ON p.id = o.product_id \
LEFT JOIN product_variations v ON v.id = o.variation_id";

/// Raw row from the combined view, before enum decoding
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderViewRow {
    pub kind: String,
    pub id: i64,
    pub reference: String,
    pub public_id: String,
    pub student_id: String,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: i32,
    pub year_level: i32,
    pub product_id: i64,
    pub product_name: String,
    pub product_price: Decimal,
    pub variation_id: Option<i64>,
    pub variation_name: Option<String>,
    pub quantity: i32,
    pub mode_of_payment: i16,
    pub status: i16,
    pub user_remarks: String,
    pub admin_remarks: String,
    pub status_updated: Option<DateTime<Utc>>,
    pub edit_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderViewRow {
    /// Decode the stored discriminants into the typed view
    pub fn into_view(self) -> Result<OrderView, AppError> {
        let id: OrderId = format!("{}-{}", self.kind, self.id).parse()?;
        let buyer = match self.kind.as_str() {
            "S" => Buyer::Registered {
                student_id: self.student_id,
            },
            _ => Buyer::Guest(GuestIdentity {
                student_number: self.student_number,
                first_name: self.first_name.clone(),
                last_name: self.last_name.clone(),
                email: self.email.clone(),
                course: self.course,
                year_level: self.year_level,
            }),
        };
        Ok(OrderView {
            id,
            reference: self.reference,
            public_id: self.public_id,
            buyer,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            product_id: self.product_id,
            product_name: self.product_name,
            product_price: self.product_price,
            variation_id: self.variation_id,
            variation_name: self.variation_name,
            quantity: self.quantity,
            payment_mode: PaymentMode::try_from(self.mode_of_payment)?,
            status: OrderStatus::try_from(self.status)?,
            user_remarks: self.user_remarks,
            admin_remarks: self.admin_remarks,
            status_updated: self.status_updated,
            edit_date: self.edit_date,
            created_at: self.created_at,
        })
    }
}

/// Common columns of a new order, buyer identity supplied separately
#[derive(Debug, Clone)]
pub struct OrderInsert<'a> {
    pub reference: &'a str,
    pub public_id: &'a str,
    pub product_id: i64,
    pub variation_id: Option<i64>,
    pub quantity: i32,
    pub mode_of_payment: PaymentMode,
    pub user_remarks: &'a str,
}

/// Insert a registered-student order; returns the new row id
pub async fn insert_registered(
    tx: &mut PgTransaction<'_>,
    order: &OrderInsert<'_>,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO student_orders \
         (reference, public_id, student_id, product_id, variation_id, quantity, \
          mode_of_payment, status, user_remarks) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(order.reference)
    .bind(order.public_id)
    .bind(student_id)
    .bind(order.product_id)
    .bind(order.variation_id)
    .bind(order.quantity)
    .bind(order.mode_of_payment.as_i16())
    .bind(OrderStatus::PendingPayment.as_i16())
    .bind(order.user_remarks)
    .fetch_one(&mut **tx)
    .await
}

/// Insert a guest order with inline identity; returns the new row id
pub async fn insert_guest(
    tx: &mut PgTransaction<'_>,
    order: &OrderInsert<'_>,
    guest: &GuestIdentity,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO guest_orders \
         (reference, public_id, student_number, first_name, last_name, email, course, \
          year_level, product_id, variation_id, quantity, mode_of_payment, status, user_remarks) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING id",
    )
    .bind(order.reference)
    .bind(order.public_id)
    .bind(&guest.student_number)
    .bind(&guest.first_name)
    .bind(&guest.last_name)
    .bind(&guest.email)
    .bind(guest.course)
    .bind(guest.year_level)
    .bind(order.product_id)
    .bind(order.variation_id)
    .bind(order.quantity)
    .bind(order.mode_of_payment.as_i16())
    .bind(OrderStatus::PendingPayment.as_i16())
    .bind(order.user_remarks)
    .fetch_one(&mut **tx)
    .await
}

/// Count orders (both kinds) created on the given calendar date.
///
/// Runs on the creation transaction so the daily sequence number observes
/// concurrent inserts that committed before our locks were taken.
pub async fn count_created_on(
    tx: &mut PgTransaction<'_>,
    date: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM student_orders WHERE created_at::date = $1) \
              + (SELECT COUNT(*) FROM guest_orders WHERE created_at::date = $1)",
    )
    .bind(date)
    .fetch_one(&mut **tx)
    .await
}

async fn fetch_view(
    pool: &PgPool,
    predicate: &str,
    binds: &[&str],
) -> ServiceResult<Option<OrderView>> {
    let sql = format!("SELECT * FROM ({ORDER_VIEW_SQL}) o WHERE {predicate}");
    let mut query = sqlx::query_as::<_, OrderViewRow>(&sql);
    for bind in binds {
        query = query.bind(*bind);
    }
    match query.fetch_optional(pool).await? {
        Some(row) => Ok(Some(row.into_view()?)),
        None => Ok(None),
    }
}

/// Look up one order by its composite id
pub async fn find_view_by_id(pool: &PgPool, id: OrderId) -> ServiceResult<Option<OrderView>> {
    let sql = format!("SELECT * FROM ({ORDER_VIEW_SQL}) o WHERE kind = $1 AND id = $2");
    let row = sqlx::query_as::<_, OrderViewRow>(&sql)
        .bind(id.kind.tag().to_string())
        .bind(id.id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(row.into_view()?)),
        None => Ok(None),
    }
}

/// Look up one order by its opaque public identifier
pub async fn find_view_by_public_id(
    pool: &PgPool,
    public_id: &str,
) -> ServiceResult<Option<OrderView>> {
    fetch_view(pool, "public_id = $1", &[public_id]).await
}

/// Look up one order by reference, optionally scoped to a buyer's student id
pub async fn find_view_by_reference(
    pool: &PgPool,
    reference: &str,
    student_id: Option<&str>,
) -> ServiceResult<Option<OrderView>> {
    match student_id {
        Some(student_id) => {
            fetch_view(
                pool,
                "reference = $1 AND student_id = $2",
                &[reference, student_id],
            )
            .await
        }
        None => fetch_view(pool, "reference = $1", &[reference]).await,
    }
}

/// Filtered, sorted, paginated listing plus the unpaginated match count
pub async fn list_views(pool: &PgPool, query: &ListQuery) -> ServiceResult<(Vec<OrderView>, i64)> {
    let built = query.build(ORDER_VIEW_SQL);

    let mut list = sqlx::query_as::<_, OrderViewRow>(&built.query);
    for bind in &built.binds {
        list = list.bind(bind);
    }
    let rows = list.fetch_all(pool).await?;

    let mut count = sqlx::query_scalar::<_, i64>(&built.count_query);
    for bind in &built.binds {
        count = count.bind(bind);
    }
    let total = count.fetch_one(pool).await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(row.into_view()?);
    }
    Ok((views, total))
}

/// Stock-relevant order columns read under a row lock
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct OrderStockRow {
    pub status: i16,
    pub quantity: i32,
    pub product_id: i64,
    pub variation_id: Option<i64>,
}

/// Lock an order row for the duration of a status transition
pub async fn lock_for_update(
    tx: &mut PgTransaction<'_>,
    id: OrderId,
) -> Result<Option<OrderStockRow>, sqlx::Error> {
    let sql = match id.kind {
        shared::models::OrderKind::Registered => {
            "SELECT status, quantity, product_id, variation_id \
             FROM student_orders WHERE id = $1 FOR UPDATE"
        }
        shared::models::OrderKind::Guest => {
            "SELECT status, quantity, product_id, variation_id \
             FROM guest_orders WHERE id = $1 FOR UPDATE"
        }
    };
    sqlx::query_as(sql).bind(id.id).fetch_optional(&mut **tx).await
}

/// Persist a status change, stamping both audit timestamps
pub async fn set_status(
    tx: &mut PgTransaction<'_>,
    id: OrderId,
    status: OrderStatus,
) -> Result<u64, sqlx::Error> {
    let sql = match id.kind {
        shared::models::OrderKind::Registered => {
            "UPDATE student_orders \
             SET status = $1, status_updated = now(), edit_date = now() WHERE id = $2"
        }
        shared::models::OrderKind::Guest => {
            "UPDATE guest_orders \
             SET status = $1, status_updated = now(), edit_date = now() WHERE id = $2"
        }
    };
    let result = sqlx::query(sql)
        .bind(status.as_i16())
        .bind(id.id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Value for an allow-listed field update
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Smallint(i16),
}

/// Update one allow-listed column on an order row.
///
/// `column` must come from the typed edit allow-list; it is never taken from
/// request input directly.
pub async fn update_field(
    pool: &PgPool,
    id: OrderId,
    column: &'static str,
    value: FieldValue,
) -> Result<u64, sqlx::Error> {
    let table = match id.kind {
        shared::models::OrderKind::Registered => "student_orders",
        shared::models::OrderKind::Guest => "guest_orders",
    };
    let sql = format!("UPDATE {table} SET {column} = $1, edit_date = now() WHERE id = $2");
    let query = match value {
        FieldValue::Text(text) => sqlx::query(&sql).bind(text).bind(id.id).execute(pool).await?,
        FieldValue::Smallint(n) => sqlx::query(&sql).bind(n).bind(id.id).execute(pool).await?,
    };
    Ok(query.rows_affected())
}
