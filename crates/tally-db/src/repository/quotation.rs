//! # Quotation Repository
//!
//! SQLite-backed [`QuotationStore`].
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                             │
//! │     └── create() → id (uuid v4), quotation_no (QT-YYYYMMDD-NNNN),      │
//! │                    created_at; updated_at stays NULL                   │
//! │                                                                         │
//! │  2. ATTACH IMAGES (after upload, needs the id)                         │
//! │     └── set_image_urls() → payment_images JSON, updated_at untouched   │
//! │                                                                         │
//! │  3. RE-SAVE                                                            │
//! │     └── update() → every editable column + updated_at = now            │
//! │                                                                         │
//! │  4. DELETE                                                             │
//! │     └── image_urls() first (caller releases blobs), then delete()      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::{Quotation, QuotationSummary};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::mapper::{self, QuotationRow, SummaryRow};
use crate::store::QuotationStore;

const ENTITY: &str = "Quotation";

const SELECT_ROW: &str = r#"
    SELECT
        id, quotation_no, party, phone, address, sales_person, remark,
        rate_discount, sp_discount, bill_discount, shipping, advance,
        items, payment_images, created_at, updated_at
    FROM quotations
"#;

/// Repository for quotation records.
#[derive(Debug, Clone)]
pub struct QuotationRepository {
    pool: SqlitePool,
}

impl QuotationRepository {
    /// Creates a new QuotationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QuotationRepository { pool }
    }
}

/// Next human-readable number for the day `created_at` falls on (local
/// calendar): one past the highest number already issued that day.
/// Sequences widen past four digits, so longer numbers sort higher.
async fn next_quotation_no(
    conn: &mut SqliteConnection,
    created_at: DateTime<Utc>,
) -> DbResult<String> {
    let prefix = format!("QT-{}-", created_at.with_timezone(&Local).format("%Y%m%d"));

    let last: Option<String> = sqlx::query_scalar(
        "SELECT quotation_no FROM quotations WHERE quotation_no LIKE ?1 \
         ORDER BY length(quotation_no) DESC, quotation_no DESC LIMIT 1",
    )
    .bind(format!("{}%", prefix))
    .fetch_optional(&mut *conn)
    .await?;

    let sequence = last
        .as_deref()
        .and_then(|no| no.strip_prefix(&prefix))
        .and_then(|seq| seq.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;

    Ok(format!("{}{:04}", prefix, sequence))
}

#[async_trait]
impl QuotationStore for QuotationRepository {
    async fn create(&self, quotation: &Quotation) -> DbResult<Quotation> {
        let id = Uuid::new_v4().to_string();
        let created_at = mapper::now();

        let mut tx = self.pool.begin().await?;
        let quotation_no = next_quotation_no(&mut *tx, created_at).await?;

        let mut record = quotation.clone();
        record.id = Some(id.clone());
        record.quotation_no = Some(quotation_no.clone());
        record.created_at = Some(created_at);
        record.updated_at = None;
        let row = mapper::to_row(&record)?;

        debug!(id = %id, quotation_no = %quotation_no, items = record.items().len(), "Creating quotation");

        sqlx::query(
            r#"
            INSERT INTO quotations (
                id, quotation_no, party, phone, address, sales_person, remark,
                rate_discount, sp_discount, bill_discount, shipping, advance,
                items, payment_images, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&row.id)
        .bind(&row.quotation_no)
        .bind(&row.party)
        .bind(&row.phone)
        .bind(&row.address)
        .bind(&row.sales_person)
        .bind(&row.remark)
        .bind(row.rate_discount)
        .bind(row.sp_discount)
        .bind(row.bill_discount)
        .bind(row.shipping)
        .bind(row.advance)
        .bind(&row.items)
        .bind(&row.payment_images)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch(&id).await
    }

    async fn update(&self, quotation: &Quotation) -> DbResult<Quotation> {
        let id = quotation
            .id
            .clone()
            .ok_or_else(|| DbError::Internal("update called on an unsaved quotation".to_string()))?;

        // Number and creation time are owned by the store; the row mapper
        // only needs placeholders for them here.
        let mut record = quotation.clone();
        record.quotation_no.get_or_insert_with(String::new);
        record.created_at.get_or_insert_with(mapper::now);
        record.updated_at = Some(mapper::now());
        let row = mapper::to_row(&record)?;

        debug!(id = %id, items = record.items().len(), "Updating quotation");

        let result = sqlx::query(
            r#"
            UPDATE quotations SET
                party = ?1, phone = ?2, address = ?3, sales_person = ?4, remark = ?5,
                rate_discount = ?6, sp_discount = ?7, bill_discount = ?8,
                shipping = ?9, advance = ?10,
                items = ?11, payment_images = ?12, updated_at = ?13
            WHERE id = ?14
            "#,
        )
        .bind(&row.party)
        .bind(&row.phone)
        .bind(&row.address)
        .bind(&row.sales_person)
        .bind(&row.remark)
        .bind(row.rate_discount)
        .bind(row.sp_discount)
        .bind(row.bill_discount)
        .bind(row.shipping)
        .bind(row.advance)
        .bind(&row.items)
        .bind(&row.payment_images)
        .bind(&row.updated_at)
        .bind(&row.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        self.fetch(&id).await
    }

    async fn fetch(&self, id: &str) -> DbResult<Quotation> {
        debug!(id = %id, "Fetching quotation");

        let row: Option<QuotationRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_ROW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = row.ok_or_else(|| DbError::not_found(ENTITY, id))?;
        mapper::from_row(row)
    }

    async fn list(&self) -> DbResult<Vec<QuotationSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, quotation_no, party, created_at, updated_at
            FROM quotations
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed quotations");

        rows.into_iter().map(mapper::summary_from_row).collect()
    }

    async fn image_urls(&self, id: &str) -> DbResult<Vec<String>> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT payment_images FROM quotations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let raw = raw.ok_or_else(|| DbError::not_found(ENTITY, id))?;
        mapper::parse_json_list(raw.as_deref().unwrap_or_default())
    }

    async fn set_image_urls(&self, id: &str, urls: &[String]) -> DbResult<()> {
        debug!(id = %id, count = urls.len(), "Writing payment image urls");

        let result = sqlx::query("UPDATE quotations SET payment_images = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(urls)?)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting quotation");

        let result = sqlx::query("DELETE FROM quotations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
