mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchstock_core::views::Dashboard;
use watchstock_core::{controllers, populate, Catalog, Collection, Settings, View};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Seed { database } => seed(database).await,
        Command::Stats => {
            let catalog = open_catalog(cli.db.as_deref())?;
            show_stats(&catalog).await
        }
        Command::List { collection } => {
            let catalog = open_catalog(cli.db.as_deref())?;
            list_collection(&catalog, (*collection).into()).await
        }
    }
}

/// Opens the store from the flag, or from the resolved settings
fn open_catalog(db: Option<&str>) -> Result<Catalog> {
    let database = match db {
        Some(db) => db.to_string(),
        None => Settings::resolve()?.database,
    };
    Catalog::open(&database).with_context(|| format!("Failed to open database '{}'", database))
}

async fn seed(database: &str) -> Result<()> {
    info!(%database, "Seeding database");
    let catalog = Catalog::open(database).with_context(|| format!("Failed to open database '{}'", database))?;

    let result = populate(&catalog).await;

    // Release the store before reporting, whether or not seeding succeeded
    let location = catalog.backend().location();
    drop(catalog);
    info!(%location, "Disconnected from database");

    match result {
        Ok(summary) => {
            println!(
                "{} {} vendors, {} categories, {} items",
                "Seeded".green(),
                summary.vendors.len(),
                summary.categories.len(),
                summary.items.len()
            );
            Ok(())
        }
        Err(err) => {
            error!(error = %format!("{:#}", err), "Seeding failed");
            Err(err.context("Seeding failed"))
        }
    }
}

fn count_cell(count: Option<usize>) -> String {
    count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "error".red().to_string())
}

async fn show_stats(catalog: &Catalog) -> Result<()> {
    let outcome = controllers::index(catalog).await;
    let Some(View::Index { dashboard, errors }) = outcome.view() else {
        anyhow::bail!("Dashboard did not produce a summary");
    };
    let Dashboard {
        vendor_count,
        category_count,
        item_count,
    } = dashboard;

    println!("{}: {}", "Database".blue(), catalog.backend().location());
    println!("{}: {}", "Backend".blue(), catalog.backend().backend_type());
    println!("{}: {}", "Vendors".blue(), count_cell(*vendor_count));
    println!("{}: {}", "Categories".blue(), count_cell(*category_count));
    println!("{}: {}", "Items".blue(), count_cell(*item_count));

    for message in errors {
        println!("{}", message.red());
    }
    Ok(())
}

async fn list_collection(catalog: &Catalog, collection: Collection) -> Result<()> {
    let rows: Vec<(String, String)> = match collection {
        Collection::Vendors => catalog
            .vendors
            .find_all()
            .await?
            .into_iter()
            .map(|v| (v.id.to_string(), format!("{} {}", v.company_name, v.register_date_formatted().dimmed())))
            .collect(),
        Collection::Categories => catalog
            .categories
            .find_all()
            .await?
            .into_iter()
            .map(|c| (c.id.to_string(), c.category_name.clone()))
            .collect(),
        Collection::Items => catalog
            .items
            .find_all()
            .await?
            .into_iter()
            .map(|i| (i.id.to_string(), format!("{} ({} in stock @ {})", i.name, i.stock, i.price)))
            .collect(),
    };

    if rows.is_empty() {
        println!("{}", format!("No {} found.", collection).yellow());
        return Ok(());
    }

    println!("{:<36} | {}", "ID", collection.kind());
    println!("{}", "-".repeat(80));
    for (id, label) in rows {
        println!("{:<36} | {}", id, label);
    }

    Ok(())
}
