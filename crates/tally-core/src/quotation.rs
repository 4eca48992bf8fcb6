//! # Quotation Aggregate
//!
//! The document being edited: customer fields, discount knobs, line items,
//! payment-proof images and bill-level adjustments.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item ─────────────┐                                                │
//! │  update_item (auto) ───┤                                                │
//! │  set_rate_discount ────┼──► pricing::apply_auto_rates(all items)        │
//! │  set_sp_discount ──────┘                                                │
//! │                                                                         │
//! │  update_item (manual), delete_item ──► no repricing                     │
//! │                                                                         │
//! │  totals() ──► recomputed from the items on every call, never cached     │
//! │                                                                         │
//! │  validate_for_save() ──► MissingParty │ NoItems │ InvalidItems          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, SaveBlocker, ValidationError};
use crate::line_item::LineItem;
use crate::money::Money;
use crate::pricing::{apply_auto_rates, Discounts};
use crate::validation::{
    check_save_ready, clamp_sp_discount, validate_adjustment, validate_image_count,
    validate_rate_discount, validate_stored_rate_discount,
};
use crate::MAX_PAYMENT_IMAGES;

// =============================================================================
// Payment Images
// =============================================================================

/// Raw image data with its content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    content_type: String,
    #[serde(rename = "data", serialize_with = "serialize_base64")]
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        EncodedImage {
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Decodes a `data:image/...;base64,...` URL as produced by a file picker.
    ///
    /// ```rust
    /// use tally_core::EncodedImage;
    ///
    /// let image = EncodedImage::from_data_url("data:image/png;base64,iVBORw0K").unwrap();
    /// assert_eq!(image.content_type(), "image/png");
    /// assert_eq!(image.extension(), "png");
    /// ```
    pub fn from_data_url(url: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "payment image".to_string(),
            reason: reason.to_string(),
        };

        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("expected a data: URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing data payload"))?;
        let header = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("only base64 data URLs are supported"))?;

        let content_type = header.split(';').next().unwrap_or_default().trim();
        if !content_type.starts_with("image/") {
            return Err(invalid("content type must be an image"));
        }

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| invalid(&e.to_string()))?;
        if bytes.is_empty() {
            return Err(invalid("image is empty"));
        }

        Ok(EncodedImage::new(content_type.to_ascii_lowercase(), bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, BASE64.encode(&self.bytes))
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File extension used when the image is uploaded.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

fn serialize_base64<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&BASE64.encode(bytes.as_ref()))
}

/// A payment-proof image: either pixel data not yet uploaded, or the URL of
/// a stored blob.
///
/// `Stored::cached` keeps pixel data uploaded during this session so that a
/// document can be rendered without downloading it again. It is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentImage {
    Encoded(EncodedImage),
    Stored {
        url: String,
        #[serde(skip)]
        cached: Option<EncodedImage>,
    },
}

impl PaymentImage {
    pub fn stored(url: impl Into<String>) -> Self {
        PaymentImage::Stored {
            url: url.into(),
            cached: None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            PaymentImage::Stored { url, .. } => Some(url),
            PaymentImage::Encoded(_) => None,
        }
    }

    pub fn is_unsent(&self) -> bool {
        matches!(self, PaymentImage::Encoded(_))
    }

    /// Pixel data available without a download.
    pub fn local(&self) -> Option<&EncodedImage> {
        match self {
            PaymentImage::Encoded(image) => Some(image),
            PaymentImage::Stored { cached, .. } => cached.as_ref(),
        }
    }
}

// =============================================================================
// Totals and Summary
// =============================================================================

/// Bill totals, recomputed from the items on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Totals {
    pub total_pieces: i64,
    pub total_amount: Money,
    pub bill_discount: Money,
    pub shipping: Money,
    pub advance: Money,
    /// `total_amount − bill_discount + shipping − advance`
    pub net: Money,
    /// Auto items still waiting for a rate (unknown MRP).
    pub pending_items: usize,
}

/// One row of the saved-quotation picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuotationSummary {
    pub id: String,
    pub quotation_no: String,
    pub party: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Quotation
// =============================================================================

/// The quotation aggregate root.
///
/// Customer fields and store-assigned metadata are public. Discounts,
/// adjustments, items and images go through methods that keep the item
/// rates and the image limit consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quotation {
    /// `None` until the store has created the record.
    pub id: Option<String>,
    pub quotation_no: Option<String>,
    pub party: String,
    pub phone: String,
    pub address: String,
    pub sales_person: String,
    pub remark: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    discounts: Discounts,
    bill_discount: Money,
    shipping: Money,
    advance: Money,
    items: Vec<LineItem>,
    payment_images: Vec<PaymentImage>,
}

/// Every stored field of a quotation, used to rebuild one after a load.
#[derive(Debug, Clone, Default)]
pub struct QuotationParts {
    pub id: Option<String>,
    pub quotation_no: Option<String>,
    pub party: String,
    pub phone: String,
    pub address: String,
    pub sales_person: String,
    pub remark: String,
    pub rate_discount_pct: i64,
    pub sp_discount_pct: i64,
    pub bill_discount: Money,
    pub shipping: Money,
    pub advance: Money,
    pub items: Vec<LineItem>,
    pub payment_images: Vec<PaymentImage>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Quotation {
    fn default() -> Self {
        Quotation::new()
    }
}

impl Quotation {
    /// A fresh, unsaved quotation: default tier, no secondary discount,
    /// zero adjustments, nothing attached.
    pub fn new() -> Self {
        Quotation {
            id: None,
            quotation_no: None,
            party: String::new(),
            phone: String::new(),
            address: String::new(),
            sales_person: String::new(),
            remark: String::new(),
            created_at: None,
            updated_at: None,
            discounts: Discounts::default(),
            bill_discount: Money::zero(),
            shipping: Money::zero(),
            advance: Money::zero(),
            items: Vec::new(),
            payment_images: Vec::new(),
        }
    }

    /// Rebuilds a stored quotation.
    ///
    /// Stored rate discounts only need to be a percentage (older records may
    /// use a tier that is no longer offered); the secondary discount is
    /// clamped. Item rates are kept as stored.
    pub fn restore(parts: QuotationParts) -> CoreResult<Quotation> {
        let rate_discount_pct = validate_stored_rate_discount(parts.rate_discount_pct)?;
        validate_adjustment("bill discount", parts.bill_discount)?;
        validate_adjustment("shipping", parts.shipping)?;
        validate_adjustment("advance", parts.advance)?;
        if parts.payment_images.len() > MAX_PAYMENT_IMAGES {
            return Err(ValidationError::ImageLimitExceeded {
                max: MAX_PAYMENT_IMAGES,
            }
            .into());
        }

        Ok(Quotation {
            id: parts.id,
            quotation_no: parts.quotation_no,
            party: parts.party,
            phone: parts.phone,
            address: parts.address,
            sales_person: parts.sales_person,
            remark: parts.remark,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            discounts: Discounts::new(rate_discount_pct, clamp_sp_discount(parts.sp_discount_pct)),
            bill_discount: parts.bill_discount,
            shipping: parts.shipping,
            advance: parts.advance,
            items: parts.items,
            payment_images: parts.payment_images,
        })
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    pub fn discounts(&self) -> Discounts {
        self.discounts
    }

    pub fn rate_discount_pct(&self) -> u8 {
        self.discounts.rate_discount_pct
    }

    pub fn sp_discount_pct(&self) -> u8 {
        self.discounts.sp_discount_pct
    }

    /// Switches the base tier and reprices every auto item.
    pub fn set_rate_discount(&mut self, pct: u8) -> Result<(), ValidationError> {
        validate_rate_discount(pct)?;
        self.discounts.rate_discount_pct = pct;
        self.reprice();
        Ok(())
    }

    /// Sets the secondary discount, clamped into `0..=10`, and reprices.
    /// Returns the value actually stored.
    pub fn set_sp_discount(&mut self, pct: i64) -> u8 {
        let pct = clamp_sp_discount(pct);
        self.discounts.sp_discount_pct = pct;
        self.reprice();
        pct
    }

    /// Runs the pricing engine over every item.
    pub fn reprice(&mut self) -> usize {
        apply_auto_rates(&mut self.items, self.discounts)
    }

    // -------------------------------------------------------------------------
    // Bill-level adjustments
    // -------------------------------------------------------------------------

    pub fn bill_discount(&self) -> Money {
        self.bill_discount
    }

    pub fn shipping(&self) -> Money {
        self.shipping
    }

    pub fn advance(&self) -> Money {
        self.advance
    }

    pub fn set_bill_discount(&mut self, amount: Money) -> Result<(), ValidationError> {
        validate_adjustment("bill discount", amount)?;
        self.bill_discount = amount;
        Ok(())
    }

    pub fn set_shipping(&mut self, amount: Money) -> Result<(), ValidationError> {
        validate_adjustment("shipping", amount)?;
        self.shipping = amount;
        Ok(())
    }

    pub fn set_advance(&mut self, amount: Money) -> Result<(), ValidationError> {
        validate_adjustment("advance", amount)?;
        self.advance = amount;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Appends an item and prices it under the current discounts.
    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
        self.reprice();
    }

    /// Replaces the item at `index`.
    ///
    /// A manual or sample replacement keeps its typed rate; an auto
    /// replacement is priced immediately so it is never shown unpriced.
    pub fn update_item(&mut self, index: usize, item: LineItem) -> CoreResult<()> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(CoreError::ItemIndexOutOfRange { index, len })?;

        let needs_pricing = item.is_auto_priced();
        *slot = item;
        if needs_pricing {
            self.reprice();
        }
        Ok(())
    }

    /// Removes and returns the item at `index`. Rates are unaffected.
    pub fn delete_item(&mut self, index: usize) -> CoreResult<LineItem> {
        if index >= self.items.len() {
            return Err(CoreError::ItemIndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    // -------------------------------------------------------------------------
    // Totals + save gate
    // -------------------------------------------------------------------------

    pub fn totals(&self) -> Totals {
        let total_pieces = self
            .items
            .iter()
            .map(LineItem::piece_count)
            .fold(0i64, i64::saturating_add);
        let total_amount: Money = self.items.iter().map(LineItem::amount).sum();
        let pending_items = self.items.iter().filter(|i| i.is_pending_price()).count();

        Totals {
            total_pieces,
            total_amount,
            bill_discount: self.bill_discount,
            shipping: self.shipping,
            advance: self.advance,
            net: total_amount - self.bill_discount + self.shipping - self.advance,
            pending_items,
        }
    }

    /// Checks the save rules in order, reporting the first failure.
    pub fn validate_for_save(&self) -> Result<(), SaveBlocker> {
        check_save_ready(&self.party, &self.items)
    }

    // -------------------------------------------------------------------------
    // Payment images
    // -------------------------------------------------------------------------

    pub fn payment_images(&self) -> &[PaymentImage] {
        &self.payment_images
    }

    /// Attaches unsent image data.
    pub fn add_image(&mut self, image: EncodedImage) -> Result<(), ValidationError> {
        validate_image_count(self.payment_images.len())?;
        self.payment_images.push(PaymentImage::Encoded(image));
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> CoreResult<PaymentImage> {
        if index >= self.payment_images.len() {
            return Err(CoreError::ImageIndexOutOfRange {
                index,
                len: self.payment_images.len(),
            });
        }
        Ok(self.payment_images.remove(index))
    }

    /// Replaces the image list wholesale (used when merging a save result).
    pub fn set_payment_images(&mut self, images: Vec<PaymentImage>) -> Result<(), ValidationError> {
        if images.len() > MAX_PAYMENT_IMAGES {
            return Err(ValidationError::ImageLimitExceeded {
                max: MAX_PAYMENT_IMAGES,
            });
        }
        self.payment_images = images;
        Ok(())
    }

    pub fn unsent_images(&self) -> usize {
        self.payment_images.iter().filter(|i| i.is_unsent()).count()
    }

    /// Picker row for a stored quotation; `None` while unsaved.
    pub fn summary(&self) -> Option<QuotationSummary> {
        Some(QuotationSummary {
            id: self.id.clone()?,
            quotation_no: self.quotation_no.clone().unwrap_or_default(),
            party: self.party.clone(),
            created_at: self.created_at?,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry};
    use crate::line_item::{build_from_catalog, build_sample, ItemEntry};
    use crate::sizes::SizeSet;

    fn catalog() -> Catalog {
        Catalog::from_entries([
            ("ABC".to_string(), CatalogEntry::new(Money::from_major(1000), 6)),
            ("NOPRICE".to_string(), CatalogEntry::new(Money::zero(), 2)),
        ])
    }

    fn abc(sizes: &str) -> LineItem {
        build_from_catalog(&catalog(), &ItemEntry::auto("ABC", SizeSet::parse(sizes)), None).unwrap()
    }

    fn png() -> EncodedImage {
        EncodedImage::new("image/png", vec![1, 2, 3])
    }

    #[test]
    fn test_new_defaults() {
        let q = Quotation::new();
        assert!(!q.is_saved());
        assert_eq!(q.rate_discount_pct(), 57);
        assert_eq!(q.sp_discount_pct(), 0);
        assert!(q.items().is_empty());
        assert!(q.payment_images().is_empty());
        assert_eq!(q.totals().net, Money::zero());
    }

    #[test]
    fn test_add_item_prices_immediately() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));

        let item = &q.items()[0];
        assert!(item.is_priced());
        assert_eq!(item.rate(), Money::from_major(430));
        assert_eq!(q.totals().total_pieces, 12);
        assert_eq!(q.totals().total_amount, Money::from_major(5160));
    }

    #[test]
    fn test_sp_discount_reprices_and_clamps() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));

        assert_eq!(q.set_sp_discount(10), 10);
        assert_eq!(q.items()[0].rate(), Money::from_major(387));
        assert_eq!(q.items()[0].amount(), Money::from_major(4644));

        assert_eq!(q.set_sp_discount(15), 10);
        assert_eq!(q.set_sp_discount(-2), 0);
        assert_eq!(q.items()[0].rate(), Money::from_major(430));
    }

    #[test]
    fn test_rate_discount_tier() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));

        q.set_rate_discount(55).unwrap();
        assert_eq!(q.items()[0].rate(), Money::from_major(450));

        assert!(q.set_rate_discount(50).is_err());
        assert_eq!(q.rate_discount_pct(), 55);
    }

    #[test]
    fn test_update_item_manual_is_not_repriced() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));

        let manual = build_from_catalog(
            &catalog(),
            &ItemEntry::manual("ABC", SizeSet::parse("M-2"), Money::from_major(500)),
            None,
        )
        .unwrap();
        q.update_item(0, manual).unwrap();
        assert_eq!(q.items()[0].rate(), Money::from_major(500));

        q.set_sp_discount(5);
        assert_eq!(q.items()[0].rate(), Money::from_major(500));
    }

    #[test]
    fn test_update_item_auto_is_priced() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));
        q.update_item(0, abc("M-3")).unwrap();

        assert_eq!(q.items()[0].rate(), Money::from_major(430));
        assert_eq!(q.items()[0].amount(), Money::from_major(430 * 18));
    }

    #[test]
    fn test_item_index_out_of_range() {
        let mut q = Quotation::new();
        assert!(matches!(
            q.update_item(0, abc("M-1")),
            Err(CoreError::ItemIndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(q.delete_item(3).is_err());
    }

    #[test]
    fn test_delete_item_recomputes_totals() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));
        q.add_item(build_sample("Cap", 4, Money::from_major(25)).unwrap());
        assert_eq!(q.totals().total_amount, Money::from_major(5260));

        let removed = q.delete_item(0).unwrap();
        assert_eq!(removed.description(), "ABC");
        assert_eq!(q.totals().total_amount, Money::from_major(100));
        assert_eq!(q.totals().total_pieces, 4);
    }

    #[test]
    fn test_net_payable() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));
        q.set_bill_discount(Money::from_major(160)).unwrap();
        q.set_shipping(Money::from_major(200)).unwrap();
        q.set_advance(Money::from_major(1000)).unwrap();

        assert_eq!(q.totals().net, Money::from_major(5160 - 160 + 200 - 1000));
        assert!(q.set_shipping(Money::from_minor(-1)).is_err());
    }

    #[test]
    fn test_totals_saturate_on_huge_items() {
        let mut q = Quotation::new();
        let huge = build_sample("Bale", i64::MAX / 2, Money::from_minor(1)).unwrap();
        q.add_item(huge.clone());
        q.add_item(huge.clone());
        q.add_item(huge);

        let totals = q.totals();
        assert_eq!(totals.total_pieces, i64::MAX);
        assert_eq!(totals.total_amount, Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_validate_for_save_ordering() {
        let mut q = Quotation::new();
        assert_eq!(q.validate_for_save(), Err(SaveBlocker::MissingParty));

        q.party = "Acme Traders".to_string();
        assert_eq!(q.validate_for_save(), Err(SaveBlocker::NoItems));

        let pending = build_from_catalog(
            &catalog(),
            &ItemEntry::auto("NOPRICE", SizeSet::parse("S-1")),
            None,
        )
        .unwrap();
        q.add_item(pending);
        assert!(q.items()[0].is_pending_price());
        assert_eq!(q.totals().pending_items, 1);
        assert_eq!(q.validate_for_save(), Err(SaveBlocker::InvalidItems));

        q.add_item(build_sample("Cap", 1, Money::from_major(5)).unwrap());
        assert_eq!(q.validate_for_save(), Ok(()));
    }

    #[test]
    fn test_image_limit() {
        let mut q = Quotation::new();
        q.add_image(png()).unwrap();
        q.add_image(png()).unwrap();
        assert_eq!(
            q.add_image(png()),
            Err(ValidationError::ImageLimitExceeded { max: 2 })
        );
        assert_eq!(q.unsent_images(), 2);

        assert!(q.remove_image(2).is_err());
        q.remove_image(0).unwrap();
        assert_eq!(q.payment_images().len(), 1);
    }

    #[test]
    fn test_data_url_round_trip() {
        let url = png().to_data_url();
        assert_eq!(url, "data:image/png;base64,AQID");
        assert_eq!(EncodedImage::from_data_url(&url).unwrap(), png());

        assert!(EncodedImage::from_data_url("https://x/y.png").is_err());
        assert!(EncodedImage::from_data_url("data:text/plain;base64,AQID").is_err());
        assert!(EncodedImage::from_data_url("data:image/png,raw").is_err());
    }

    #[test]
    fn test_payment_image_local_data() {
        assert!(PaymentImage::stored("https://blob/a.png").local().is_none());
        let cached = PaymentImage::Stored {
            url: "https://blob/a.png".to_string(),
            cached: Some(png()),
        };
        assert_eq!(cached.local(), Some(&png()));
        assert_eq!(cached.url(), Some("https://blob/a.png"));
    }

    #[test]
    fn test_restore_keeps_stored_rates() {
        let mut q = Quotation::new();
        q.add_item(abc("M-2"));
        let item = q.items()[0].clone();

        let restored = Quotation::restore(QuotationParts {
            id: Some("id-1".to_string()),
            party: "Acme".to_string(),
            rate_discount_pct: 50,
            sp_discount_pct: 30,
            items: vec![item.clone()],
            payment_images: vec![PaymentImage::stored("u1")],
            ..QuotationParts::default()
        })
        .unwrap();

        assert!(restored.is_saved());
        assert_eq!(restored.rate_discount_pct(), 50);
        assert_eq!(restored.sp_discount_pct(), 10);
        assert_eq!(restored.items()[0], item);

        let too_many = QuotationParts {
            payment_images: vec![PaymentImage::stored("a"), PaymentImage::stored("b"), PaymentImage::stored("c")],
            ..QuotationParts::default()
        };
        assert!(Quotation::restore(too_many).is_err());
    }
}
