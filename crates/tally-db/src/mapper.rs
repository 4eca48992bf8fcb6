//! # Row Mapper
//!
//! The one place where persisted column/key names meet the domain types.
//!
//! ## Field Map
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ quotations column            │ Quotation                                │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ id, quotation_no             │ id, quotation_no                         │
//! │ party, phone, address        │ party, phone, address                    │
//! │ sales_person, remark         │ sales_person, remark                     │
//! │ rate_discount, sp_discount   │ discounts()                              │
//! │ bill_discount, shipping,     │ bill_discount(), shipping(), advance()   │
//! │ advance                      │   (minor units)                          │
//! │ items (JSON)                 │ items()        via ItemRecord            │
//! │ payment_images (JSON urls)   │ payment_images() as Stored               │
//! │ created_at, updated_at       │ created_at, updated_at                   │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ item key                     │ LineItem                                 │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ desc, size                   │ description, sizes                       │
//! │ pcs, pcs_per_box             │ piece_count, pack_size                   │
//! │ rate, amount, mrp            │ rate, amount, unit_price_at_entry        │
//! │ is_manual, is_sample, priced │ is_manual_rate, is_sample, priced        │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Both directions destructure or build every field explicitly, so a new
//! column that is only mapped one way does not compile.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tally_core::{
    LineItem, Money, PaymentImage, Quotation, QuotationParts, QuotationSummary,
    RestoredLineItem, SizeSet,
};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

/// A full `quotations` row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct QuotationRow {
    pub id: String,
    pub quotation_no: String,
    pub party: String,
    pub phone: String,
    pub address: String,
    pub sales_person: String,
    pub remark: String,
    pub rate_discount: i64,
    pub sp_discount: i64,
    pub bill_discount: i64,
    pub shipping: i64,
    pub advance: i64,
    pub items: String,
    pub payment_images: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// The columns the picker needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    pub id: String,
    pub quotation_no: String,
    pub party: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// One element of the `items` JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub desc: String,
    /// Written by other clients as a number or null at times; anything that
    /// is not a string reads back as the empty size set.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub size: String,
    #[serde(default)]
    pub pcs: i64,
    #[serde(default = "default_pack_size")]
    pub pcs_per_box: u32,
    #[serde(default)]
    pub rate: i64,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub mrp: i64,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub is_sample: bool,
    /// Missing on records written before pending prices were tracked.
    #[serde(default)]
    pub priced: Option<bool>,
}

fn default_pack_size() -> u32 {
    1
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

// =============================================================================
// Timestamps
// =============================================================================

/// Current time at the precision that survives a round trip through the
/// text columns.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order is time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(id: &str, raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidRecord {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

// =============================================================================
// Items
// =============================================================================

pub fn item_to_record(item: &LineItem) -> ItemRecord {
    ItemRecord {
        desc: item.description().to_string(),
        size: item.size_label(),
        pcs: item.piece_count(),
        pcs_per_box: item.pack_size(),
        rate: item.rate().minor(),
        amount: item.amount().minor(),
        mrp: item.unit_price_at_entry().minor(),
        is_manual: item.is_manual_rate(),
        is_sample: item.is_sample(),
        priced: Some(item.is_priced()),
    }
}

pub fn item_from_record(record: ItemRecord) -> LineItem {
    let ItemRecord {
        desc,
        size,
        pcs,
        pcs_per_box,
        rate,
        amount: _,
        mrp,
        is_manual,
        is_sample,
        priced,
    } = record;

    LineItem::restore(RestoredLineItem {
        description: desc,
        sizes: SizeSet::parse(&size),
        piece_count: pcs,
        pack_size: pcs_per_box,
        rate: Money::from_minor(rate),
        unit_price_at_entry: Money::from_minor(mrp),
        is_manual_rate: is_manual,
        is_sample,
        priced: priced.unwrap_or(is_manual || rate > 0),
    })
}

// =============================================================================
// Quotations
// =============================================================================

/// Builds the row for a quotation the store has already assigned an id,
/// number and creation time to.
///
/// Only stored images are written; unsent image data is uploaded by the
/// caller and added through `set_image_urls`.
pub fn to_row(quotation: &Quotation) -> DbResult<QuotationRow> {
    let id = quotation
        .id
        .clone()
        .ok_or_else(|| DbError::Internal("quotation has no id".to_string()))?;
    let quotation_no = quotation
        .quotation_no
        .clone()
        .ok_or_else(|| DbError::Internal(format!("quotation {} has no number", id)))?;
    let created_at = quotation
        .created_at
        .ok_or_else(|| DbError::Internal(format!("quotation {} has no creation time", id)))?;

    let items: Vec<ItemRecord> = quotation.items().iter().map(item_to_record).collect();
    let urls: Vec<&str> = quotation
        .payment_images()
        .iter()
        .filter_map(PaymentImage::url)
        .collect();

    Ok(QuotationRow {
        id,
        quotation_no,
        party: quotation.party.trim().to_string(),
        phone: quotation.phone.clone(),
        address: quotation.address.clone(),
        sales_person: quotation.sales_person.clone(),
        remark: quotation.remark.clone(),
        rate_discount: i64::from(quotation.rate_discount_pct()),
        sp_discount: i64::from(quotation.sp_discount_pct()),
        bill_discount: quotation.bill_discount().minor(),
        shipping: quotation.shipping().minor(),
        advance: quotation.advance().minor(),
        items: serde_json::to_string(&items)?,
        payment_images: serde_json::to_string(&urls)?,
        created_at: format_timestamp(created_at),
        updated_at: quotation.updated_at.map(format_timestamp),
    })
}

/// Rebuilds the aggregate from a stored row.
///
/// `payment_images` always comes back as a list; an empty or null column
/// reads as no images.
pub fn from_row(row: QuotationRow) -> DbResult<Quotation> {
    let QuotationRow {
        id,
        quotation_no,
        party,
        phone,
        address,
        sales_person,
        remark,
        rate_discount,
        sp_discount,
        bill_discount,
        shipping,
        advance,
        items,
        payment_images,
        created_at,
        updated_at,
    } = row;

    let items: Vec<ItemRecord> = parse_json_list(&items)?;
    let urls: Vec<String> = parse_json_list(&payment_images)?;
    let created_at = parse_timestamp(&id, &created_at)?;
    let updated_at = updated_at
        .as_deref()
        .map(|raw| parse_timestamp(&id, raw))
        .transpose()?;

    let parts = QuotationParts {
        id: Some(id.clone()),
        quotation_no: Some(quotation_no),
        party,
        phone,
        address,
        sales_person,
        remark,
        rate_discount_pct: rate_discount,
        sp_discount_pct: sp_discount,
        bill_discount: Money::from_minor(bill_discount),
        shipping: Money::from_minor(shipping),
        advance: Money::from_minor(advance),
        items: items.into_iter().map(item_from_record).collect(),
        payment_images: urls.into_iter().map(PaymentImage::stored).collect(),
        created_at: Some(created_at),
        updated_at,
    };

    Quotation::restore(parts).map_err(|e| DbError::InvalidRecord {
        id,
        reason: e.to_string(),
    })
}

pub fn summary_from_row(row: SummaryRow) -> DbResult<QuotationSummary> {
    let created_at = parse_timestamp(&row.id, &row.created_at)?;
    let updated_at = row
        .updated_at
        .as_deref()
        .map(|raw| parse_timestamp(&row.id, raw))
        .transpose()?;

    Ok(QuotationSummary {
        id: row.id,
        quotation_no: row.quotation_no,
        party: row.party,
        created_at,
        updated_at,
    })
}

/// Parses a JSON array column; blank or `null` is an empty list.
pub fn parse_json_list<T: serde::de::DeserializeOwned>(raw: &str) -> DbResult<Vec<T>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tally_core::{build_from_catalog, build_sample, Catalog, CatalogEntry, ItemEntry};

    fn populated() -> Quotation {
        let catalog = Catalog::from_entries([
            ("ABC".to_string(), CatalogEntry::new(Money::from_major(1000), 6)),
            ("NOPRICE".to_string(), CatalogEntry::new(Money::zero(), 2)),
        ]);

        let mut q = Quotation::new();
        q.id = Some("6f1c1f8e-0000-4000-8000-000000000001".to_string());
        q.quotation_no = Some("QT-20260301-0007".to_string());
        q.party = "Acme Traders".to_string();
        q.phone = "98765 43210".to_string();
        q.address = "12 Market Road".to_string();
        q.sales_person = "Ravi".to_string();
        q.remark = "Deliver by Friday".to_string();
        q.created_at = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap());
        q.updated_at = Some(Utc.with_ymd_and_hms(2026, 3, 2, 18, 5, 12).unwrap());

        q.set_rate_discount(55).unwrap();
        q.set_sp_discount(4);
        q.set_bill_discount(Money::from_major(100)).unwrap();
        q.set_shipping(Money::from_minor(25_050)).unwrap();
        q.set_advance(Money::from_major(500)).unwrap();

        q.add_item(build_from_catalog(&catalog, &ItemEntry::auto("ABC", SizeSet::parse("S-1, M-2")), None).unwrap());
        q.add_item(
            build_from_catalog(
                &catalog,
                &ItemEntry::manual("XYZ BIG SIZE", SizeSet::parse("3XL-2"), Money::from_major(250)),
                None,
            )
            .unwrap(),
        );
        q.add_item(build_from_catalog(&catalog, &ItemEntry::auto("NOPRICE", SizeSet::parse("L-1")), None).unwrap());
        q.add_item(build_sample("Cap", 3, Money::from_major(40)).unwrap());

        q.set_payment_images(vec![
            PaymentImage::stored("file:///blobs/payment-images/q1/1-a.png"),
            PaymentImage::stored("file:///blobs/payment-images/q1/2-b.jpg"),
        ])
        .unwrap();
        q
    }

    #[test]
    fn test_fully_populated_round_trip() {
        let original = populated();
        let row = to_row(&original).unwrap();

        assert_eq!(row.rate_discount, 55);
        assert_eq!(row.sp_discount, 4);
        assert_eq!(row.shipping, 25_050);
        assert_eq!(row.created_at, "2026-03-01T09:30:00.000000Z");

        let restored = from_row(row).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_item_keys_use_persisted_names() {
        let row = to_row(&populated()).unwrap();
        let items: serde_json::Value = serde_json::from_str(&row.items).unwrap();
        let first = &items[0];

        assert_eq!(first["desc"], "ABC");
        assert_eq!(first["size"], "S-1, M-2");
        assert_eq!(first["pcs"], 18);
        assert_eq!(first["pcs_per_box"], 6);
        assert_eq!(first["mrp"], 100_000);
        assert_eq!(first["is_manual"], false);
        assert_eq!(first["priced"], true);

        assert_eq!(items[3]["size"], "-");
        assert_eq!(items[3]["is_sample"], true);
    }

    #[test]
    fn test_non_string_size_reads_as_empty() {
        let record: ItemRecord =
            serde_json::from_str(r#"{"desc":"X","size":42,"pcs":5,"rate":1000}"#).unwrap();
        assert_eq!(record.size, "");
        assert_eq!(record.pcs_per_box, 1);

        let item = item_from_record(record);
        assert!(item.sizes().is_empty());
        assert!(item.is_priced());
        assert_eq!(item.amount(), Money::from_minor(5000));
    }

    #[test]
    fn test_null_images_column_is_empty_list() {
        let mut row = to_row(&populated()).unwrap();
        row.payment_images = "null".to_string();
        assert!(from_row(row.clone()).unwrap().payment_images().is_empty());

        row.payment_images = String::new();
        assert!(from_row(row).unwrap().payment_images().is_empty());
    }

    #[test]
    fn test_invalid_row_is_reported() {
        let mut row = to_row(&populated()).unwrap();
        row.rate_discount = 140;
        assert!(matches!(from_row(row), Err(DbError::InvalidRecord { .. })));
    }

    #[test]
    fn test_unsaved_quotation_has_no_row() {
        assert!(to_row(&Quotation::new()).is_err());
    }
}
