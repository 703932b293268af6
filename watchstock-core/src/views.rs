//! View models handed from the controllers to a renderer
//!
//! Each `View` variant corresponds to one page template. A renderer is a pure
//! function of the view; this crate does not care whether it produces HTML,
//! JSON or terminal output.

use uuid::Uuid;

use crate::models::{Category, Collection, Item, Record, Vendor};
use crate::validation::{CategoryForm, FieldError, ItemForm, VendorForm};

/// Title of the dashboard page
pub const SITE_TITLE: &str = "Local Watch Stock";

/// Record counts shown on the dashboard; a count that failed to load is None
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    pub vendor_count: Option<usize>,
    pub category_count: Option<usize>,
    pub item_count: Option<usize>,
}

/// An item with its vendor resolved, for list pages
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub item: Record<Item>,
    pub vendor: Option<Record<Vendor>>,
}

/// A selectable vendor on the item form
#[derive(Debug, Clone, PartialEq)]
pub struct VendorOption {
    pub vendor: Record<Vendor>,
    pub selected: bool,
}

/// A checkable category on the item form
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryOption {
    pub category: Record<Category>,
    pub checked: bool,
}

/// An item with every reference resolved, for the detail and delete pages
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    pub item: Record<Item>,
    pub vendor: Option<Record<Vendor>>,
    pub categories: Vec<Record<Category>>,
}

/// Whether a form creates a new record or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(Uuid),
}

impl FormMode {
    /// Path the form posts back to
    pub fn action(&self, collection: Collection) -> String {
        match self {
            FormMode::Create => format!("{}/create", collection.detail_prefix()),
            FormMode::Update(id) => format!("{}/{}/update", collection.detail_prefix(), id),
        }
    }

    fn title(&self, collection: Collection) -> String {
        match self {
            FormMode::Create => format!("Create {}", collection.kind()),
            FormMode::Update(_) => format!("Update {}", collection.kind()),
        }
    }
}

/// A page to render
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Index {
        dashboard: Dashboard,
        /// Messages for the counts that could not be loaded
        errors: Vec<String>,
    },
    VendorList {
        vendors: Vec<Record<Vendor>>,
    },
    VendorDetail {
        vendor: Record<Vendor>,
        items: Vec<Record<Item>>,
    },
    VendorForm {
        mode: FormMode,
        vendor: VendorForm,
        errors: Vec<FieldError>,
    },
    VendorDelete {
        vendor: Record<Vendor>,
        items: Vec<Record<Item>>,
    },
    CategoryList {
        categories: Vec<Record<Category>>,
    },
    CategoryDetail {
        category: Record<Category>,
        items: Vec<Record<Item>>,
    },
    CategoryForm {
        mode: FormMode,
        category: CategoryForm,
        errors: Vec<FieldError>,
    },
    CategoryDelete {
        category: Record<Category>,
        items: Vec<Record<Item>>,
    },
    ItemList {
        items: Vec<ItemSummary>,
    },
    ItemDetail(ItemDetail),
    ItemForm {
        mode: FormMode,
        item: ItemForm,
        vendors: Vec<VendorOption>,
        categories: Vec<CategoryOption>,
        errors: Vec<FieldError>,
    },
    ItemDelete(ItemDetail),
}

impl View {
    /// Template identifier
    pub fn template(&self) -> &'static str {
        match self {
            View::Index { .. } => "index",
            View::VendorList { .. } => "vendor_list",
            View::VendorDetail { .. } => "vendor_detail",
            View::VendorForm { .. } => "vendor_form",
            View::VendorDelete { .. } => "vendor_delete",
            View::CategoryList { .. } => "category_list",
            View::CategoryDetail { .. } => "category_detail",
            View::CategoryForm { .. } => "category_form",
            View::CategoryDelete { .. } => "category_delete",
            View::ItemList { .. } => "item_list",
            View::ItemDetail(_) => "item_detail",
            View::ItemForm { .. } => "item_form",
            View::ItemDelete(_) => "item_delete",
        }
    }

    /// Page title
    pub fn title(&self) -> String {
        match self {
            View::Index { .. } => SITE_TITLE.to_string(),
            View::VendorList { .. } => "Vendor List".to_string(),
            View::VendorDetail { .. } => "Vendor Detail".to_string(),
            View::VendorForm { mode, .. } => mode.title(Collection::Vendors),
            View::VendorDelete { .. } => "Delete Vendor".to_string(),
            View::CategoryList { .. } => "Category List".to_string(),
            View::CategoryDetail { .. } => "Category Detail".to_string(),
            View::CategoryForm { mode, .. } => mode.title(Collection::Categories),
            View::CategoryDelete { .. } => "Delete Category".to_string(),
            View::ItemList { .. } => "Item List".to_string(),
            View::ItemDetail(detail) => detail.item.name.clone(),
            View::ItemForm { mode, .. } => mode.title(Collection::Items),
            View::ItemDelete(_) => "Delete Item".to_string(),
        }
    }

    /// Field errors carried by a form view
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            View::VendorForm { errors, .. }
            | View::CategoryForm { errors, .. }
            | View::ItemForm { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// What a handler decided to do with a request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Render(View),
    Redirect(String),
}

impl Outcome {
    pub fn view(&self) -> Option<&View> {
        match self {
            Outcome::Render(view) => Some(view),
            Outcome::Redirect(_) => None,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Outcome::Redirect(path) => Some(path),
            Outcome::Render(_) => None,
        }
    }
}

/// Turns a view into a response body
pub trait Renderer: Send + Sync {
    fn render(&self, view: &View) -> anyhow::Result<String>;
}
