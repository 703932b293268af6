//! Form validation and sanitization
//!
//! Every submitted form passes through here before any entity is built.
//! Validation never touches the store: it trims and escapes each field,
//! collects field-level errors, and hands back the sanitized candidate
//! whether or not it passed so the form can be re-rendered.

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{Category, Item, Vendor, MAX_NAME_LENGTH};

/// A raw submitted value: form encodings carry either a lone string or a
/// list when the same key is repeated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    Many(Vec<String>),
}

/// Raw form input, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: BTreeMap<String, FieldValue>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds form data from decoded key/value pairs; repeated keys
    /// accumulate into a list
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut form = Self::new();
        for (key, value) in pairs {
            form.insert(key, value);
        }
        form
    }

    /// Adds a value, turning an existing scalar into a list
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let name = name.into();
        let next = match self.fields.remove(&name) {
            None => FieldValue::Single(value),
            Some(FieldValue::Single(first)) => FieldValue::Many(vec![first, value]),
            Some(FieldValue::Many(mut values)) => {
                values.push(value);
                FieldValue::Many(values)
            }
        };
        self.fields.insert(name, next);
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field to an explicit list of values
    pub fn with_many<S: Into<String>>(mut self, name: impl Into<String>, values: Vec<S>) -> Self {
        self.fields.insert(
            name.into(),
            FieldValue::Many(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The scalar value of a field, or "" when absent. A list yields its
    /// first element.
    pub fn text(&self, name: &str) -> &str {
        match self.fields.get(name) {
            Some(FieldValue::Single(value)) => value,
            Some(FieldValue::Many(values)) => values.first().map(String::as_str).unwrap_or(""),
            None => "",
        }
    }

    /// The values of a multi-select field. Absent becomes empty and a lone
    /// scalar becomes a single-element list.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(FieldValue::Single(value)) => vec![value.clone()],
            Some(FieldValue::Many(values)) => values.clone(),
            None => Vec::new(),
        }
    }
}

/// A failed rule on a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result of running a form through the pipeline: the sanitized candidate
/// plus every error found
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<F> {
    pub form: F,
    pub errors: Vec<FieldError>,
}

impl<F: EntityForm> Validated<F> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// The typed entity, available only when no rule failed
    pub fn entity(&self) -> Option<F::Entity> {
        if self.is_valid() {
            self.form.to_entity()
        } else {
            None
        }
    }
}

/// A sanitized, string-typed view of an entity used to fill in forms
pub trait EntityForm: Sized + Clone {
    type Entity;

    /// Runs the field rules over raw input
    fn validate(input: &FormData) -> Validated<Self>;

    /// Pre-fills a form from a stored entity
    fn from_entity(entity: &Self::Entity) -> Self;

    /// Converts sanitized values into the entity. Returns None if a typed
    /// field does not parse.
    fn to_entity(&self) -> Option<Self::Entity>;
}

/// Replaces markup-significant characters with HTML entities
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trims surrounding whitespace and escapes the remainder
pub fn sanitize(input: &str) -> String {
    escape(input.trim())
}

/// Parses an ISO-8601 calendar date, or the date part of an RFC 3339 timestamp
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}

/// Parses a finite, non-negative number
pub fn parse_non_negative(input: &str) -> Option<f64> {
    input
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn require(errors: &mut Vec<FieldError>, field: &str, value: &str, message: &str) {
    if value.is_empty() {
        errors.push(FieldError::new(field, message));
    }
}

fn limit_length(errors: &mut Vec<FieldError>, field: &str, value: &str, label: &str) {
    if value.chars().count() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("{} must be at most {} characters", label, MAX_NAME_LENGTH),
        ));
    }
}

/// Vendor form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorForm {
    pub company_name: String,
    pub description: String,
    pub company_url: String,
    pub register_date: String,
}

impl EntityForm for VendorForm {
    type Entity = Vendor;

    fn validate(input: &FormData) -> Validated<Self> {
        let form = VendorForm {
            company_name: sanitize(input.text("company_name")),
            description: sanitize(input.text("description")),
            company_url: sanitize(input.text("company_url")),
            register_date: sanitize(input.text("register_date")),
        };

        let mut errors = Vec::new();
        require(&mut errors, "company_name", &form.company_name, "Company name required");
        limit_length(&mut errors, "company_name", &form.company_name, "Company name");
        require(&mut errors, "description", &form.description, "Description required");
        if !form.register_date.is_empty() && parse_iso_date(&form.register_date).is_none() {
            errors.push(FieldError::new("register_date", "Invalid date format"));
        }

        Validated { form, errors }
    }

    fn from_entity(vendor: &Vendor) -> Self {
        VendorForm {
            company_name: vendor.company_name.clone(),
            description: vendor.description.clone(),
            company_url: vendor.company_url.clone().unwrap_or_default(),
            register_date: vendor.register_date_only(),
        }
    }

    fn to_entity(&self) -> Option<Vendor> {
        let register_date = if self.register_date.is_empty() {
            None
        } else {
            Some(parse_iso_date(&self.register_date)?)
        };
        Some(Vendor {
            company_name: self.company_name.clone(),
            description: self.description.clone(),
            company_url: optional(self.company_url.clone()),
            register_date,
        })
    }
}

/// Category form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryForm {
    pub category_name: String,
    pub description: String,
}

impl EntityForm for CategoryForm {
    type Entity = Category;

    fn validate(input: &FormData) -> Validated<Self> {
        let form = CategoryForm {
            category_name: sanitize(input.text("category_name")),
            description: sanitize(input.text("description")),
        };

        let mut errors = Vec::new();
        require(&mut errors, "category_name", &form.category_name, "Category name required");
        limit_length(&mut errors, "category_name", &form.category_name, "Category name");
        require(&mut errors, "description", &form.description, "Description required");

        Validated { form, errors }
    }

    fn from_entity(category: &Category) -> Self {
        CategoryForm {
            category_name: category.category_name.clone(),
            description: category.description.clone(),
        }
    }

    fn to_entity(&self) -> Option<Category> {
        Some(Category::new(self.category_name.clone(), self.description.clone()))
    }
}

/// Item form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    pub pic_url: String,
    pub vendor: String,
    pub category: Vec<String>,
}

impl ItemForm {
    /// The submitted vendor as an identifier, if it is one
    pub fn vendor_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.vendor).ok()
    }

    /// The submitted categories as identifiers; None if any is malformed
    pub fn category_ids(&self) -> Option<Vec<Uuid>> {
        self.category
            .iter()
            .map(|c| Uuid::parse_str(c).ok())
            .collect()
    }

    /// Whether the given category was selected on the form
    pub fn has_category(&self, id: &Uuid) -> bool {
        let id = id.to_string();
        self.category.iter().any(|c| *c == id)
    }
}

impl EntityForm for ItemForm {
    type Entity = Item;

    fn validate(input: &FormData) -> Validated<Self> {
        let form = ItemForm {
            name: sanitize(input.text("name")),
            description: sanitize(input.text("description")),
            price: sanitize(input.text("price")),
            stock: sanitize(input.text("stock")),
            pic_url: sanitize(input.text("pic_url")),
            vendor: sanitize(input.text("vendor")),
            category: input.list("category").iter().map(|c| sanitize(c)).collect(),
        };

        let mut errors = Vec::new();
        require(&mut errors, "name", &form.name, "Name must not be empty.");
        require(&mut errors, "vendor", &form.vendor, "Vendor must not be empty.");
        require(&mut errors, "description", &form.description, "Description must not be empty.");
        if parse_non_negative(&form.price).is_none() {
            errors.push(FieldError::new("price", "Price minimum is 0"));
        }
        if parse_non_negative(&form.stock).is_none() {
            errors.push(FieldError::new("stock", "Stock minimum is 0"));
        }

        Validated { form, errors }
    }

    fn from_entity(item: &Item) -> Self {
        ItemForm {
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price.to_string(),
            stock: item.stock.to_string(),
            pic_url: item.pic_url.clone().unwrap_or_default(),
            vendor: item.vendor.to_string(),
            category: item.category.iter().map(Uuid::to_string).collect(),
        }
    }

    fn to_entity(&self) -> Option<Item> {
        Some(Item {
            name: self.name.clone(),
            description: self.description.clone(),
            price: parse_non_negative(&self.price)?,
            stock: parse_non_negative(&self.stock)?,
            pic_url: optional(self.pic_url.clone()),
            vendor: self.vendor_id()?,
            category: self.category_ids()?,
        })
    }
}
