use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use uuid::Uuid;

/// Maximum length of the natural name of a vendor or category
pub const MAX_NAME_LENGTH: usize = 100;

/// The collections held by the catalog store, one per entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Vendors,
    Categories,
    Items,
}

impl Collection {
    /// Every collection, in seeding order
    pub const ALL: [Collection; 3] = [Collection::Vendors, Collection::Categories, Collection::Items];

    /// Storage name of the collection
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Vendors => "vendors",
            Collection::Categories => "categories",
            Collection::Items => "items",
        }
    }

    /// Human-readable name of a single record in this collection
    pub fn kind(&self) -> &'static str {
        match self {
            Collection::Vendors => "Vendor",
            Collection::Categories => "Category",
            Collection::Items => "Item",
        }
    }

    /// Path of the list view
    pub fn list_path(&self) -> &'static str {
        match self {
            Collection::Vendors => "/catalog/vendors",
            Collection::Categories => "/catalog/categories",
            Collection::Items => "/catalog/items",
        }
    }

    /// Prefix shared by the detail, update and delete paths
    pub fn detail_prefix(&self) -> &'static str {
        match self {
            Collection::Vendors => "/catalog/vendor",
            Collection::Categories => "/catalog/category",
            Collection::Items => "/catalog/item",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Canonical detail path of a record
pub fn entity_url(collection: Collection, id: &Uuid) -> String {
    format!("{}/{}", collection.detail_prefix(), id)
}

/// A record type that can be persisted in one of the catalog collections
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity is stored in
    const COLLECTION: Collection;

    /// Primary name field, used to order list views
    fn sort_key(&self) -> &str;
}

/// A persisted entity together with its store-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Identifier assigned by the store on insert
    pub id: Uuid,

    #[serde(flatten)]
    pub data: T,
}

impl<T: Entity> Record<T> {
    pub fn new(id: Uuid, data: T) -> Self {
        Self { id, data }
    }

    /// Canonical detail-page path
    pub fn url(&self) -> String {
        entity_url(T::COLLECTION, &self.id)
    }
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// A watch maker or distributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    /// Company name, at most 100 characters
    pub company_name: String,

    /// Free-text description of the company
    pub description: String,

    /// Company home page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,

    /// Date the company was registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_date: Option<NaiveDate>,
}

impl Vendor {
    pub fn new(company_name: String, description: String) -> Self {
        Self {
            company_name,
            description,
            company_url: None,
            register_date: None,
        }
    }

    /// Register date in medium style, e.g. "Jun 6, 1833"
    pub fn register_date_formatted(&self) -> String {
        self.register_date
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_default()
    }

    /// Register date as an ISO date, suitable for a date input
    pub fn register_date_only(&self) -> String {
        self.register_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

impl Entity for Vendor {
    const COLLECTION: Collection = Collection::Vendors;

    fn sort_key(&self) -> &str {
        &self.company_name
    }
}

/// A grouping of items, e.g. "Chronograph" or "Dress"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category name, at most 100 characters
    pub category_name: String,

    pub description: String,
}

impl Category {
    pub fn new(category_name: String, description: String) -> Self {
        Self {
            category_name,
            description,
        }
    }
}

impl Entity for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn sort_key(&self) -> &str {
        &self.category_name
    }
}

/// A stocked watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,

    pub description: String,

    /// Unit price, never negative
    pub price: f64,

    /// Units in stock, never negative
    pub stock: f64,

    /// Picture of the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,

    /// The vendor supplying this item
    pub vendor: Uuid,

    /// Categories the item belongs to; always present, possibly empty
    #[serde(default)]
    pub category: Vec<Uuid>,
}

impl Item {
    pub fn new(name: String, description: String, vendor: Uuid, price: f64, stock: f64) -> Self {
        Self {
            name,
            description,
            price,
            stock,
            pic_url: None,
            vendor,
            category: Vec::new(),
        }
    }
}

impl Entity for Item {
    const COLLECTION: Collection = Collection::Items;

    fn sort_key(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_url() {
        let id = Uuid::new_v4();
        let vendor = Record::new(id, Vendor::new("Piaget".into(), "Thin watches".into()));
        assert_eq!(vendor.url(), format!("/catalog/vendor/{}", id));

        let category = Record::new(id, Category::new("Pilot".into(), "Aviation".into()));
        assert_eq!(category.url(), format!("/catalog/category/{}", id));

        let item = Record::new(id, Item::new("Reverso".into(), "Flips".into(), id, 1.0, 1.0));
        assert_eq!(item.url(), format!("/catalog/item/{}", id));
    }

    #[test]
    fn test_vendor_register_date_renderings() {
        let mut vendor = Vendor::new("Jaeger-LeCoultre".into(), "Swiss".into());
        assert_eq!(vendor.register_date_formatted(), "");
        assert_eq!(vendor.register_date_only(), "");

        vendor.register_date = NaiveDate::from_ymd_opt(1833, 6, 6);
        assert_eq!(vendor.register_date_formatted(), "Jun 6, 1833");
        assert_eq!(vendor.register_date_only(), "1833-06-06");
    }

    #[test]
    fn test_record_serializes_flat_with_empty_category() {
        let id = Uuid::new_v4();
        let vendor_id = Uuid::new_v4();
        let item = Record::new(id, Item::new("Tank".into(), "Cartier".into(), vendor_id, 10.0, 2.0));

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], serde_json::json!(id.to_string()));
        assert_eq!(value["vendor"], serde_json::json!(vendor_id.to_string()));
        assert_eq!(value["category"], serde_json::json!([]));
        assert!(value.get("pic_url").is_none());

        let back: Record<Item> = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_item_without_category_field_deserializes_empty() {
        let value = serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "name": "Royal Oak",
            "description": "Steel",
            "price": 1285000,
            "stock": 20,
            "vendor": Uuid::new_v4().to_string(),
        });
        let item: Record<Item> = serde_json::from_value(value).unwrap();
        assert!(item.category.is_empty());
        assert_eq!(item.price, 1285000.0);
    }
}
