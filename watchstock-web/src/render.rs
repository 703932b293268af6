//! HTML rendering of catalog views
//!
//! Text that came from the store has already been escaped by the validation
//! pipeline and is written as-is. Anything else that can carry outside input
//! (error messages, identifiers echoed back) goes through `escape` first.

use std::fmt::Write;

use watchstock_core::models::{Category, Collection, Item, Record, Vendor};
use watchstock_core::validation::{escape, CategoryForm, FieldError, ItemForm, VendorForm};
use watchstock_core::views::{
    CategoryOption, Dashboard, FormMode, ItemDetail, ItemSummary, Renderer, VendorOption, View,
    SITE_TITLE,
};

type Html = anyhow::Result<String>;

/// Renders every view as a complete HTML page
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, view: &View) -> Html {
        let body = match view {
            View::Index { dashboard, errors } => index(dashboard, errors)?,
            View::VendorList { vendors } => vendor_list(vendors)?,
            View::VendorDetail { vendor, items } => vendor_detail(vendor, items)?,
            View::VendorForm { mode, vendor, errors } => vendor_form(*mode, vendor, errors)?,
            View::VendorDelete { vendor, items } => vendor_delete(vendor, items)?,
            View::CategoryList { categories } => category_list(categories)?,
            View::CategoryDetail { category, items } => category_detail(category, items)?,
            View::CategoryForm { mode, category, errors } => category_form(*mode, category, errors)?,
            View::CategoryDelete { category, items } => category_delete(category, items)?,
            View::ItemList { items } => item_list(items)?,
            View::ItemDetail(detail) => item_detail(detail)?,
            View::ItemForm {
                mode,
                item,
                vendors,
                categories,
                errors,
            } => item_form(*mode, item, vendors, categories, errors)?,
            View::ItemDelete(detail) => item_delete(detail)?,
        };
        layout(&view.title(), &body)
    }
}

/// Page shown when a request fails
pub fn error_page(status: u16, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/catalog\">Back to the catalog</a></p>\n",
        status,
        escape(message)
    );
    layout("Error", &body).unwrap_or(body)
}

fn layout(title: &str, body: &str) -> Html {
    let mut page = String::new();
    writeln!(page, "<!DOCTYPE html>")?;
    writeln!(page, "<html lang=\"en\">")?;
    writeln!(page, "<head><meta charset=\"utf-8\"><title>{}</title></head>", title)?;
    writeln!(page, "<body>")?;
    writeln!(page, "<nav><ul>")?;
    writeln!(page, "<li><a href=\"/catalog\">Home</a></li>")?;
    for collection in Collection::ALL {
        writeln!(
            page,
            "<li><a href=\"{}\">All {}</a></li>",
            collection.list_path(),
            collection
        )?;
    }
    for collection in Collection::ALL {
        writeln!(
            page,
            "<li><a href=\"{}\">Create new {}</a></li>",
            FormMode::Create.action(collection),
            collection.kind().to_lowercase()
        )?;
    }
    writeln!(page, "</ul></nav>")?;
    writeln!(page, "<main>")?;
    writeln!(page, "<h1>{}</h1>", title)?;
    page.push_str(body);
    writeln!(page, "</main>")?;
    writeln!(page, "</body>")?;
    writeln!(page, "</html>")?;
    Ok(page)
}

fn index(dashboard: &Dashboard, errors: &[String]) -> Html {
    let mut out = String::new();
    writeln!(out, "<p>Welcome to {}.</p>", SITE_TITLE)?;
    writeln!(out, "<h2>Dynamic content</h2>")?;
    writeln!(out, "<p>The catalog has the following record counts:</p>")?;
    writeln!(out, "<ul>")?;
    let counts = [
        ("Vendors", dashboard.vendor_count),
        ("Categories", dashboard.category_count),
        ("Items", dashboard.item_count),
    ];
    for (label, count) in counts {
        match count {
            Some(count) => writeln!(out, "<li><strong>{}:</strong> {}</li>", label, count)?,
            None => writeln!(out, "<li><strong>{}:</strong> unavailable</li>", label)?,
        }
    }
    writeln!(out, "</ul>")?;
    if !errors.is_empty() {
        writeln!(out, "<ul class=\"errors\">")?;
        for message in errors {
            writeln!(out, "<li>{}</li>", escape(message))?;
        }
        writeln!(out, "</ul>")?;
    }
    Ok(out)
}

fn link_list<T, F>(out: &mut String, records: &[T], empty: &str, entry: F) -> std::fmt::Result
where
    F: Fn(&T) -> String,
{
    if records.is_empty() {
        return writeln!(out, "<p>{}</p>", empty);
    }
    writeln!(out, "<ul>")?;
    for record in records {
        writeln!(out, "<li>{}</li>", entry(record))?;
    }
    writeln!(out, "</ul>")
}

fn item_link(item: &Record<Item>) -> String {
    format!("<a href=\"{}\">{}</a>", item.url(), item.name)
}

fn vendor_link(vendor: &Record<Vendor>) -> String {
    format!("<a href=\"{}\">{}</a>", vendor.url(), vendor.company_name)
}

fn category_link(category: &Record<Category>) -> String {
    format!("<a href=\"{}\">{}</a>", category.url(), category.category_name)
}

fn field_errors(out: &mut String, errors: &[FieldError]) -> std::fmt::Result {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(out, "<ul class=\"errors\">")?;
    for error in errors {
        writeln!(out, "<li data-field=\"{}\">{}</li>", error.field, error.message)?;
    }
    writeln!(out, "</ul>")
}

fn text_input(out: &mut String, label: &str, name: &str, value: &str, kind: &str) -> std::fmt::Result {
    writeln!(
        out,
        "<div><label for=\"{name}\">{label}</label> <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\"></div>"
    )
}

fn textarea(out: &mut String, label: &str, name: &str, value: &str) -> std::fmt::Result {
    writeln!(
        out,
        "<div><label for=\"{name}\">{label}</label> <textarea id=\"{name}\" name=\"{name}\">{value}</textarea></div>"
    )
}

fn delete_confirmation(out: &mut String, action: &str, kind: &str, blocked_by: &[Record<Item>]) -> std::fmt::Result {
    if blocked_by.is_empty() {
        writeln!(out, "<p>Do you really want to delete this {}?</p>", kind)?;
        writeln!(out, "<form method=\"POST\" action=\"{}\">", action)?;
        writeln!(out, "<button type=\"submit\">Delete</button>")?;
        return writeln!(out, "</form>");
    }
    writeln!(
        out,
        "<p><strong>Delete the following items before attempting to delete this {}.</strong></p>",
        kind
    )?;
    link_list(out, blocked_by, "", item_link)
}

fn vendor_list(vendors: &[Record<Vendor>]) -> Html {
    let mut out = String::new();
    link_list(&mut out, vendors, "There are no vendors.", |v| {
        let registered = v.register_date_formatted();
        if registered.is_empty() {
            vendor_link(v)
        } else {
            format!("{} (registered {})", vendor_link(v), registered)
        }
    })?;
    Ok(out)
}

fn vendor_summary(out: &mut String, vendor: &Record<Vendor>) -> std::fmt::Result {
    writeln!(out, "<h2>{}</h2>", vendor.company_name)?;
    writeln!(out, "<p>{}</p>", vendor.description)?;
    if let Some(url) = &vendor.company_url {
        writeln!(out, "<p><a href=\"{url}\">{url}</a></p>")?;
    }
    let registered = vendor.register_date_formatted();
    if !registered.is_empty() {
        writeln!(out, "<p><strong>Registered:</strong> {}</p>", registered)?;
    }
    Ok(())
}

fn vendor_detail(vendor: &Record<Vendor>, items: &[Record<Item>]) -> Html {
    let mut out = String::new();
    vendor_summary(&mut out, vendor)?;
    writeln!(out, "<h3>Items</h3>")?;
    link_list(&mut out, items, "This vendor has no items.", item_link)?;
    writeln!(out, "<p><a href=\"{}/update\">Update vendor</a></p>", vendor.url())?;
    writeln!(out, "<p><a href=\"{}/delete\">Delete vendor</a></p>", vendor.url())?;
    Ok(out)
}

fn vendor_form(mode: FormMode, vendor: &VendorForm, errors: &[FieldError]) -> Html {
    let mut out = String::new();
    writeln!(out, "<form method=\"POST\" action=\"{}\">", mode.action(Collection::Vendors))?;
    text_input(&mut out, "Company name:", "company_name", &vendor.company_name, "text")?;
    textarea(&mut out, "Description:", "description", &vendor.description)?;
    text_input(&mut out, "Company URL:", "company_url", &vendor.company_url, "url")?;
    text_input(&mut out, "Register date:", "register_date", &vendor.register_date, "date")?;
    writeln!(out, "<button type=\"submit\">Submit</button>")?;
    writeln!(out, "</form>")?;
    field_errors(&mut out, errors)?;
    Ok(out)
}

fn vendor_delete(vendor: &Record<Vendor>, items: &[Record<Item>]) -> Html {
    let mut out = String::new();
    vendor_summary(&mut out, vendor)?;
    delete_confirmation(&mut out, &format!("{}/delete", vendor.url()), "vendor", items)?;
    Ok(out)
}

fn category_list(categories: &[Record<Category>]) -> Html {
    let mut out = String::new();
    link_list(&mut out, categories, "There are no categories.", category_link)?;
    Ok(out)
}

fn category_detail(category: &Record<Category>, items: &[Record<Item>]) -> Html {
    let mut out = String::new();
    writeln!(out, "<h2>{}</h2>", category.category_name)?;
    writeln!(out, "<p>{}</p>", category.description)?;
    writeln!(out, "<h3>Items</h3>")?;
    link_list(&mut out, items, "This category has no items.", item_link)?;
    writeln!(out, "<p><a href=\"{}/update\">Update category</a></p>", category.url())?;
    writeln!(out, "<p><a href=\"{}/delete\">Delete category</a></p>", category.url())?;
    Ok(out)
}

fn category_form(mode: FormMode, category: &CategoryForm, errors: &[FieldError]) -> Html {
    let mut out = String::new();
    writeln!(out, "<form method=\"POST\" action=\"{}\">", mode.action(Collection::Categories))?;
    text_input(&mut out, "Category name:", "category_name", &category.category_name, "text")?;
    textarea(&mut out, "Description:", "description", &category.description)?;
    writeln!(out, "<button type=\"submit\">Submit</button>")?;
    writeln!(out, "</form>")?;
    field_errors(&mut out, errors)?;
    Ok(out)
}

fn category_delete(category: &Record<Category>, items: &[Record<Item>]) -> Html {
    let mut out = String::new();
    writeln!(out, "<h2>{}</h2>", category.category_name)?;
    writeln!(out, "<p>{}</p>", category.description)?;
    delete_confirmation(&mut out, &format!("{}/delete", category.url()), "category", items)?;
    Ok(out)
}

fn item_list(items: &[ItemSummary]) -> Html {
    let mut out = String::new();
    link_list(&mut out, items, "There are no items.", |summary| match &summary.vendor {
        Some(vendor) => format!("{} ({})", item_link(&summary.item), vendor.company_name),
        None => item_link(&summary.item),
    })?;
    Ok(out)
}

fn item_summary(out: &mut String, detail: &ItemDetail) -> std::fmt::Result {
    let item = &detail.item;
    if let Some(pic) = &item.pic_url {
        writeln!(out, "<img src=\"{}\" alt=\"{}\">", pic, item.name)?;
    }
    writeln!(out, "<p>{}</p>", item.description)?;
    writeln!(out, "<p><strong>Price:</strong> {}</p>", item.price)?;
    writeln!(out, "<p><strong>Stock:</strong> {}</p>", item.stock)?;
    match &detail.vendor {
        Some(vendor) => writeln!(out, "<p><strong>Vendor:</strong> {}</p>", vendor_link(vendor))?,
        None => writeln!(out, "<p><strong>Vendor:</strong> unknown</p>")?,
    }
    let categories: Vec<_> = detail.categories.iter().map(category_link).collect();
    writeln!(out, "<p><strong>Categories:</strong> {}</p>", categories.join(", "))
}

fn item_detail(detail: &ItemDetail) -> Html {
    let mut out = String::new();
    item_summary(&mut out, detail)?;
    writeln!(out, "<p><a href=\"{}/update\">Update item</a></p>", detail.item.url())?;
    writeln!(out, "<p><a href=\"{}/delete\">Delete item</a></p>", detail.item.url())?;
    Ok(out)
}

fn item_form(
    mode: FormMode,
    item: &ItemForm,
    vendors: &[VendorOption],
    categories: &[CategoryOption],
    errors: &[FieldError],
) -> Html {
    let mut out = String::new();
    writeln!(out, "<form method=\"POST\" action=\"{}\">", mode.action(Collection::Items))?;
    text_input(&mut out, "Name:", "name", &item.name, "text")?;
    textarea(&mut out, "Description:", "description", &item.description)?;
    text_input(&mut out, "Price:", "price", &item.price, "number")?;
    text_input(&mut out, "Stock:", "stock", &item.stock, "number")?;
    text_input(&mut out, "Picture URL:", "pic_url", &item.pic_url, "url")?;

    writeln!(out, "<div><label for=\"vendor\">Vendor:</label> <select id=\"vendor\" name=\"vendor\">")?;
    writeln!(out, "<option value=\"\">Select vendor</option>")?;
    for option in vendors {
        writeln!(
            out,
            "<option value=\"{}\"{}>{}</option>",
            option.vendor.id,
            if option.selected { " selected" } else { "" },
            option.vendor.company_name
        )?;
    }
    writeln!(out, "</select></div>")?;

    writeln!(out, "<fieldset><legend>Category:</legend>")?;
    for option in categories {
        let id = option.category.id;
        writeln!(
            out,
            "<label><input type=\"checkbox\" name=\"category\" value=\"{}\"{}> {}</label>",
            id,
            if option.checked { " checked" } else { "" },
            option.category.category_name
        )?;
    }
    writeln!(out, "</fieldset>")?;

    writeln!(out, "<button type=\"submit\">Submit</button>")?;
    writeln!(out, "</form>")?;
    field_errors(&mut out, errors)?;
    Ok(out)
}

fn item_delete(detail: &ItemDetail) -> Html {
    let mut out = String::new();
    item_summary(&mut out, detail)?;
    delete_confirmation(&mut out, &format!("{}/delete", detail.item.url()), "item", &[])?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn vendor(name: &str) -> Record<Vendor> {
        Record::new(Uuid::new_v4(), Vendor::new(name.into(), "desc".into()))
    }

    #[test]
    fn test_layout_has_title_and_navigation() {
        let html = HtmlRenderer::new()
            .render(&View::VendorList { vendors: vec![vendor("Piaget")] })
            .unwrap();
        assert!(html.contains("<title>Vendor List</title>"));
        assert!(html.contains("href=\"/catalog/items\""));
        assert!(html.contains("href=\"/catalog/vendor/create\""));
        assert!(html.contains(">Piaget</a>"));
    }

    #[test]
    fn test_stored_text_is_not_escaped_twice() {
        let html = HtmlRenderer::new()
            .render(&View::VendorList {
                vendors: vec![vendor("Audemars &amp; Piguet")],
            })
            .unwrap();
        assert!(html.contains("Audemars &amp; Piguet"));
        assert!(!html.contains("&amp;amp;"));
    }

    #[test]
    fn test_dashboard_errors_are_escaped() {
        let view = View::Index {
            dashboard: Dashboard {
                vendor_count: Some(6),
                category_count: None,
                item_count: Some(3),
            },
            errors: vec!["<script>".into()],
        };
        let html = HtmlRenderer::new().render(&view).unwrap();
        assert!(html.contains("<title>Local Watch Stock</title>"));
        assert!(html.contains("<strong>Vendors:</strong> 6"));
        assert!(html.contains("<strong>Categories:</strong> unavailable"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_item_form_marks_selection_and_errors() {
        let selected = vendor("Cartier");
        let other = vendor("Piaget");
        let dress = Record::new(Uuid::new_v4(), Category::new("Dress".into(), "d".into()));
        let view = View::ItemForm {
            mode: FormMode::Create,
            item: ItemForm {
                price: "-1".into(),
                ..ItemForm::default()
            },
            vendors: vec![
                VendorOption {
                    vendor: selected.clone(),
                    selected: true,
                },
                VendorOption {
                    vendor: other,
                    selected: false,
                },
            ],
            categories: vec![CategoryOption {
                category: dress.clone(),
                checked: true,
            }],
            errors: vec![FieldError::new("price", "Price minimum is 0")],
        };

        let html = HtmlRenderer::new().render(&view).unwrap();
        assert!(html.contains(&format!("<option value=\"{}\" selected>Cartier</option>", selected.id)));
        assert!(html.contains(&format!("value=\"{}\" checked> Dress", dress.id)));
        assert!(html.contains("name=\"price\" value=\"-1\""));
        assert!(html.contains("<li data-field=\"price\">Price minimum is 0</li>"));
        assert!(html.contains("action=\"/catalog/item/create\""));
    }

    #[test]
    fn test_delete_page_lists_blocking_items() {
        let v = vendor("Cartier");
        let item = Record::new(Uuid::new_v4(), Item::new("Tank".into(), "d".into(), v.id, 1.0, 1.0));

        let blocked = HtmlRenderer::new()
            .render(&View::VendorDelete {
                vendor: v.clone(),
                items: vec![item.clone()],
            })
            .unwrap();
        assert!(blocked.contains("Delete the following items"));
        assert!(blocked.contains(&item.url()));
        assert!(!blocked.contains("<form"));

        let free = HtmlRenderer::new()
            .render(&View::VendorDelete { vendor: v, items: vec![] })
            .unwrap();
        assert!(free.contains("<form method=\"POST\""));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = error_page(404, "Vendor not found: <x>");
        assert!(html.contains("<h1>404</h1>"));
        assert!(html.contains("Vendor not found: &lt;x&gt;"));
    }
}
