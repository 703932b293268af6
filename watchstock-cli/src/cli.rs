use clap::{Parser, Subcommand, ValueEnum};

use watchstock_core::Collection;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Administration tool for the watchstock inventory catalog")]
pub struct Cli {
    /// Database connection string (sqlite://, yaml://, memory:// or a file path)
    #[clap(long, global = true)]
    pub db: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Populate a store with the sample vendors, categories and items
    Seed {
        /// Connection string of the store to populate
        database: String,
    },

    /// Show record counts for every collection
    Stats,

    /// List the records of one collection
    List {
        /// Which collection to list
        #[clap(value_enum)]
        collection: CollectionArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionArg {
    Vendors,
    Categories,
    Items,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Vendors => Collection::Vendors,
            CollectionArg::Categories => Collection::Categories,
            CollectionArg::Items => Collection::Items,
        }
    }
}
