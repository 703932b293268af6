//! Sample dataset for a fresh store
//!
//! Records are built through the same validation pipeline as form input so
//! seeded text is escaped exactly like user-entered text. Vendors and
//! categories are inserted one after another; items reference them by
//! position and are inserted concurrently once both lists exist.

use anyhow::{anyhow, Context};
use tokio::task::JoinSet;
use tracing::info;
use uuid::Uuid;

use crate::models::{Category, Item, Vendor};
use crate::repository::Catalog;
use crate::validation::{CategoryForm, EntityForm, FormData, ItemForm, VendorForm};

/// (company name, description, register date)
const VENDORS: [(&str, &str, &str); 6] = [
    (
        "Jaeger-LeCoultre",
        "Established in 1833 in the Swiss Jura Mountains, Jaeger-LeCoultre is known for its clever designs. \
         One of its most notable and coveted styles, the Reverso, features a face that flips over to protect \
         itself within the watch casing.",
        "1833-06-06",
    ),
    (
        "Audemars Piguet",
        "Founded by childhood friends Jules-Louis Audemars and Edward-Auguste Piguet in 1875, Audemars Piguet \
         is perhaps most famous for its Royal Oak collection, which, since its debut in 1972, has become an \
         obligatory status symbol for every A-lister from hip hop legends to elite athletes. Now it has some \
         competition: In 2019, the brand released a new collection, Code 11.59.",
        "1875-11-8",
    ),
    (
        "Frédérique Constant",
        "Founded in 1988 by Dutch couple Peter Stas and Aletta Stas-Bax, Frédérique Constant's mission \
         statement is to craft fine luxury watches using Swiss techniques but sold at a relatively accessible \
         price point.",
        "1988-01-02",
    ),
    (
        "Piaget",
        "Georges-Édouard Piaget set up his first workshop on his family farm in the village of La Côte-aux-Fées \
         in the Swiss mountains in 1874, launching the brand that is now famous for offering the thinnest \
         automatic watch in the world.",
        "1874-01-01",
    ),
    (
        "Cartier",
        "Louis-François Cartier founded the jewelry brand in Paris in 1847. Seventy years later, his grandson \
         Louis Cartier invented the famous Tank Watch, which was modeled after a military tank. Several iconic \
         watch models have followed since, including this Baignoire Allongée.",
        "1847-12-16",
    ),
    (
        "Blancpain",
        "Founded in 1735, Blancpain enjoys the esteemed distinction of being the oldest surviving watch brand \
         in the world. In the 1950s, it introduced the Fifty Fathoms diving watches, which were crafted in \
         collaboration with the French Navy's combat swimmers and soon became the standard issue of the US \
         Navy SEALs.",
        "1735-5-18",
    ),
];

/// (category name, description)
const CATEGORIES: [(&str, &str); 3] = [
    (
        "Chronograph",
        "Using a chronograph is easy. You just press the start/stop button on the side of the watch to start \
         or stop the stopwatch; push the bottom button to reset back to zero.",
    ),
    (
        "Pilot",
        "Gracing the wrist of pilots, these aviation timepieces have reached the apex of the ideal fusion of \
         style and durability. From the Fortis Aviatis collection to squadron watches, pilot watches are tough \
         and ready for anything.",
    ),
    (
        "Dress",
        "A dress watch is the most elegant of watches. It has one purpose and that is to tell time. It need not \
         have complications.",
    ),
];

struct SeedItem {
    name: &'static str,
    description: &'static str,
    price: &'static str,
    stock: &'static str,
    /// Position in `VENDORS`
    vendor: usize,
    /// Positions in `CATEGORIES`
    categories: &'static [usize],
}

const ITEMS: [SeedItem; 3] = [
    SeedItem {
        name: "Harry Winston Premier Precious Kaleidoscope Automatic 36mm",
        description: "Bold colors and geometric shapes, accented with the famous diamonds and precious stones of \
                      Harry Winston enliven the Premier Precious Kaleidoscope Automatic 36mm, an hypnotizing \
                      timepiece inspired by its magical namesake.",
        price: "485000",
        stock: "30",
        vendor: 0,
        categories: &[0],
    },
    SeedItem {
        name: "ROYAL OAK",
        description: "This 37 mm timepiece benefits from the new Royal Oak design evolution. Its two-tone case \
                      marrying stainless steel with 18-carat pink gold is embellished with a silver-toned \
                      \"Grande Tapisserie\" dial. It houses the new selfwinding Calibre 5900, fitted with the \
                      \"50-years\" oscillating weight in rhodium-toned pink gold.",
        price: "1285000",
        stock: "20",
        vendor: 1,
        categories: &[0],
    },
    SeedItem {
        name: "Art Deco FC-200MPW2AR6B",
        description: "Perfectly reflects the luxury taste with Watches from FREDERIQUE CONSTANT Stainless Steel \
                      Silver white dial case 30mm.sapphire crystal water - resistant 3 atm strap stainless \
                      steel silver bracelet",
        price: "18000",
        stock: "5",
        vendor: 3,
        categories: &[0],
    },
];

/// Identifiers created by a seeding run, in dataset order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub vendors: Vec<Uuid>,
    pub categories: Vec<Uuid>,
    pub items: Vec<Uuid>,
}

impl SeedSummary {
    pub fn total(&self) -> usize {
        self.vendors.len() + self.categories.len() + self.items.len()
    }
}

/// Runs a form through its validator, failing on any rule violation
fn build<F: EntityForm>(input: &FormData, label: &str) -> anyhow::Result<F::Entity> {
    let validated = F::validate(input);
    validated.entity().ok_or_else(|| {
        let problems: Vec<_> = validated
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        anyhow!("Invalid seed record '{}': {}", label, problems.join("; "))
    })
}

fn vendor(name: &str, description: &str, register_date: &str) -> anyhow::Result<Vendor> {
    let input = FormData::new()
        .with("company_name", name)
        .with("description", description)
        .with("register_date", register_date);
    build::<VendorForm>(&input, name)
}

fn category(name: &str, description: &str) -> anyhow::Result<Category> {
    let input = FormData::new()
        .with("category_name", name)
        .with("description", description);
    build::<CategoryForm>(&input, name)
}

fn item(seed: &SeedItem, vendors: &[Uuid], categories: &[Uuid]) -> anyhow::Result<Item> {
    let vendor = vendors
        .get(seed.vendor)
        .with_context(|| format!("Seed item '{}' references missing vendor {}", seed.name, seed.vendor))?;
    let categories = seed
        .categories
        .iter()
        .map(|&i| {
            categories
                .get(i)
                .map(Uuid::to_string)
                .with_context(|| format!("Seed item '{}' references missing category {}", seed.name, i))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let input = FormData::new()
        .with("name", seed.name)
        .with("description", seed.description)
        .with("price", seed.price)
        .with("stock", seed.stock)
        .with("vendor", vendor.to_string())
        .with_many("category", categories);
    build::<ItemForm>(&input, seed.name)
}

/// Populates the catalog with the sample dataset
pub async fn populate(catalog: &Catalog) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (name, description, register_date) in VENDORS {
        let record = catalog.vendors.create(vendor(name, description, register_date)?).await?;
        info!(id = %record.id, name = %record.company_name, "New vendor");
        summary.vendors.push(record.id);
    }

    for (name, description) in CATEGORIES {
        let record = catalog.categories.create(category(name, description)?).await?;
        info!(id = %record.id, name = %record.category_name, "New category");
        summary.categories.push(record.id);
    }

    let mut tasks = JoinSet::new();
    for (position, seed) in ITEMS.iter().enumerate() {
        let entity = item(seed, &summary.vendors, &summary.categories)?;
        let catalog = catalog.clone();
        tasks.spawn(async move { (position, catalog.items.create(entity).await) });
    }

    let mut created = Vec::with_capacity(ITEMS.len());
    while let Some(joined) = tasks.join_next().await {
        let (position, result) = joined.context("Seed task failed")?;
        let record = result?;
        info!(id = %record.id, name = %record.name, vendor = %record.vendor, "New item");
        created.push((position, record.id));
    }
    created.sort_by_key(|(position, _)| *position);
    summary.items = created.into_iter().map(|(_, id)| id).collect();

    info!(
        vendors = summary.vendors.len(),
        categories = summary.categories.len(),
        items = summary.items.len(),
        "Seeding complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_populate_empty_store() {
        let catalog = Catalog::in_memory();
        let summary = populate(&catalog).await.unwrap();

        assert_eq!(summary.vendors.len(), 6);
        assert_eq!(summary.categories.len(), 3);
        assert_eq!(summary.items.len(), 3);
        assert_eq!(summary.total(), 12);

        assert_eq!(catalog.vendors.count().await.unwrap(), 6);
        assert_eq!(catalog.categories.count().await.unwrap(), 3);
        assert_eq!(catalog.items.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_seeded_items_reference_seeded_records() {
        let catalog = Catalog::in_memory();
        let summary = populate(&catalog).await.unwrap();

        for (position, id) in summary.items.iter().enumerate() {
            let item = catalog.items.find_by_id(*id).await.unwrap().unwrap();
            assert_eq!(item.vendor, summary.vendors[ITEMS[position].vendor]);
            assert_eq!(item.category, vec![summary.categories[0]]);
            assert!(catalog.vendors.find_by_id(item.vendor).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_seeded_text_is_sanitized() {
        let catalog = Catalog::in_memory();
        let summary = populate(&catalog).await.unwrap();

        let frederique = catalog.vendors.find_by_id(summary.vendors[2]).await.unwrap().unwrap();
        assert_eq!(frederique.company_name, "Frédérique Constant");
        assert!(frederique.description.contains("Constant&#x27;s mission"));

        let audemars = catalog.vendors.find_by_id(summary.vendors[1]).await.unwrap().unwrap();
        assert_eq!(audemars.register_date_only(), "1875-11-08");

        let chronograph = catalog.categories.find_by_id(summary.categories[0]).await.unwrap().unwrap();
        assert!(chronograph.description.contains("start&#x2F;stop"));
    }

    #[test]
    fn test_dataset_passes_validation() {
        for (name, description, date) in VENDORS {
            assert!(vendor(name, description, date).is_ok(), "{name}");
        }
        for (name, description) in CATEGORIES {
            assert!(category(name, description).is_ok(), "{name}");
        }
        let vendors: Vec<_> = (0..VENDORS.len()).map(|_| Uuid::new_v4()).collect();
        let categories: Vec<_> = (0..CATEGORIES.len()).map(|_| Uuid::new_v4()).collect();
        for seed in &ITEMS {
            assert!(item(seed, &vendors, &categories).is_ok(), "{}", seed.name);
        }
        assert!(item(&ITEMS[0], &[], &categories).is_err());
    }
}
