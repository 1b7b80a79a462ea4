use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;

use crate::models::user::Role;

#[derive(Parser)]
#[command(name = "retailx")]
#[command(about = "RetailX storefront client: browse, cart, bundles and seller inventory")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Account login, registration and session status
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Shopping preferences
    Preferences {
        #[command(subcommand)]
        command: PreferencesCommands,
    },
    /// Seller inventory management
    Seller {
        #[command(subcommand)]
        command: SellerCommands,
    },
    /// Interactive shopping session with a cart and live recommendations
    Shop,
    /// Ask the shopping assistant; opens a conversation without a message
    Chat { message: Option<String> },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login to an existing account
    Login {
        #[arg(short, long, default_value = "customer")]
        role: RoleArg,
    },
    /// Register a new account
    Register {
        #[arg(short, long, default_value = "customer")]
        role: RoleArg,
    },
    /// Clear the stored session
    Logout {
        #[arg(short, long, default_value = "customer")]
        role: RoleArg,
    },
    /// Show current authentication status
    Status {
        #[arg(short, long, default_value = "customer")]
        role: RoleArg,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List products in a category
    List {
        #[arg(short, long)]
        category: String,
        #[arg(short, long, default_value_t = 24)]
        limit: usize,
    },
    /// Search products by name, brand or tag
    Search { query: String },
    /// Show a product page
    Show { id: String },
}

#[derive(Subcommand)]
pub enum PreferencesCommands {
    /// Save at least three favourite categories (comma separated)
    Set {
        #[arg(value_delimiter = ',', required = true)]
        categories: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum SellerCommands {
    /// List your products
    Inventory,
    /// Add a product interactively
    Add,
    /// Edit a product interactively, starting from its current values
    Edit { id: String },
    /// Set the stock level of a product
    Stock { id: String, stock: i64 },
    /// Delete a product
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show your store profile
    Profile,
    /// Update store profile fields; omitted fields stay unchanged
    ProfileUpdate {
        #[arg(long)]
        store_name: Option<String>,
        #[arg(long)]
        business_address: Option<String>,
        #[arg(long)]
        contact_number: Option<String>,
        #[arg(long)]
        gstin: Option<String>,
        #[arg(long)]
        business_type: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Customer,
    Seller,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Customer => Role::Customer,
            RoleArg::Seller => Role::Seller,
            RoleArg::Admin => Role::Admin,
        }
    }
}

impl fmt::Display for RoleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Role::from(*self), f)
    }
}
