use chrono::{DateTime, Local, Utc};
use console::style;
use tabled::{
    settings::{Alignment, Style},
    Table, Tabled,
};

use crate::{
    models::{
        cart::{CartLineItem, CartTotals},
        chat::{ChatMessage, Speaker},
        product::{Product, ProductDetail},
        user::{SellerProfile, Session},
    },
    services::{BundleBuilder, ProductPage},
};

#[derive(Tabled)]
struct ProductTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Brand")]
    brand: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Off")]
    off: String,
    #[tabled(rename = "Rating")]
    rating: String,
}

#[derive(Tabled)]
struct CartTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

#[derive(Tabled)]
struct InventoryTableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Stock")]
    stock: String,
}

pub fn format_product_table(products: &[Product]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let rows: Vec<ProductTableRow> = products
        .iter()
        .enumerate()
        .map(|(i, product)| ProductTableRow {
            index: i + 1,
            id: product.id.to_string(),
            name: truncate(&product.name, 36),
            brand: product.brand.clone(),
            price: format_price(product.final_price),
            off: match product.discount_percent() {
                0 => "-".to_string(),
                percent => format!("{}%", percent),
            },
            rating: if product.rating > 0.0 {
                format!("{:.1} ({})", product.rating, product.reviews_count)
            } else {
                "-".to_string()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded()).with(Alignment::left());
    table.to_string()
}

pub fn format_cart_table(items: &[CartLineItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let rows: Vec<CartTableRow> = items
        .iter()
        .enumerate()
        .map(|(i, item)| CartTableRow {
            index: i + 1,
            name: truncate(&item.name, 36),
            unit: if item.unit_final_price < item.unit_list_price {
                format!(
                    "{} (was {})",
                    format_price(item.unit_final_price),
                    format_price(item.unit_list_price)
                )
            } else {
                format_price(item.unit_final_price)
            },
            quantity: item.quantity,
            subtotal: format_price(item.final_total()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded()).with(Alignment::left());
    table.to_string()
}

pub fn format_inventory_table(products: &[Product]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let rows: Vec<InventoryTableRow> = products
        .iter()
        .map(|product| InventoryTableRow {
            id: product.id.to_string(),
            name: truncate(&product.name, 36),
            category: product.category.clone(),
            price: format_price(product.final_price),
            stock: if product.stock > 0 {
                product.stock.to_string()
            } else {
                style("out").red().to_string()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded()).with(Alignment::left());
    table.to_string()
}

pub fn format_totals(totals: &CartTotals) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{}: {}\n",
        style("Price").bold(),
        style(format_price(totals.original_total)).dim()
    ));
    if totals.savings > 0.0 {
        output.push_str(&format!(
            "{}: {}\n",
            style("Discount").bold(),
            style(format!("-{}", format_price(totals.savings))).green()
        ));
    }
    output.push_str(&format!(
        "{}: {}\n",
        style("Total").bold(),
        style(format_price(totals.discounted_total)).cyan().bold()
    ));
    if totals.savings > 0.0 {
        output.push_str(&format!(
            "{}\n",
            style(format!("You will save {} on this order", format_price(totals.savings))).green()
        ));
    }
    output
}

pub fn format_product_detail(detail: &ProductDetail) -> String {
    let product = &detail.product;
    let mut output = String::new();

    output.push_str(&format!("{}: {}\n", style("ID").bold(), style(&product.id).cyan()));
    output.push_str(&format!("{}: {}\n", style("Name").bold(), style(&product.name).green()));
    if !product.brand.is_empty() {
        output.push_str(&format!("{}: {}\n", style("Brand").bold(), product.brand));
    }
    output.push_str(&format!("{}: {}\n", style("Category").bold(), product.category));

    let percent = product.discount_percent();
    if percent > 0 {
        output.push_str(&format!(
            "{}: {} {} {}\n",
            style("Price").bold(),
            style(format_price(product.final_price)).cyan().bold(),
            style(format_price(product.list_price)).dim(),
            style(format!("{}% off", percent)).green()
        ));
    } else {
        output.push_str(&format!(
            "{}: {}\n",
            style("Price").bold(),
            style(format_price(product.final_price)).cyan().bold()
        ));
    }

    if product.rating > 0.0 {
        output.push_str(&format!(
            "{}: {:.1} ({} ratings)\n",
            style("Rating").bold(),
            product.rating,
            product.reviews_count
        ));
    }

    if !detail.description.is_empty() {
        output.push_str(&format!("\n{}\n", style(&detail.description).dim()));
    }

    if !detail.highlights.is_empty() {
        output.push_str(&format!("\n{}\n", style("Highlights").bold()));
        for highlight in &detail.highlights {
            output.push_str(&format!("  • {}\n", highlight));
        }
    }

    if !detail.specs.is_empty() {
        output.push_str(&format!("\n{}\n", style("Specifications").bold()));
        for (label, value) in &detail.specs {
            output.push_str(&format!("  {}: {}\n", style(label).dim(), value));
        }
    }

    output
}

pub fn format_product_page(page: &ProductPage) -> String {
    let mut output = format_product_detail(&page.detail);

    if !page.similar.is_empty() {
        output.push_str(&format!("\n{}\n", style("Similar products").bold().cyan()));
        output.push_str(&format_product_table(&page.similar));
        output.push('\n');
    }

    if !page.interest.is_empty() {
        output.push_str(&format!("\n{}\n", style("You might be interested in").bold().cyan()));
        output.push_str(&format_product_table(&page.interest));
        output.push('\n');
    }

    output
}

/// Primary plus addon checkboxes and the running bundle total.
pub fn format_bundle(bundle: &BundleBuilder) -> String {
    let mut output = format!("{}\n", style("Frequently bought together").bold().cyan());
    output.push_str(&format!(
        "  [x] {} {}\n",
        bundle.primary().name,
        style(format_price(bundle.primary().final_price)).dim()
    ));
    for (i, addon) in bundle.addons().iter().enumerate() {
        let mark = if bundle.is_selected(&addon.id) { "x" } else { " " };
        output.push_str(&format!(
            "  [{}] {}. {} {}\n",
            mark,
            i + 1,
            addon.name,
            style(format_price(addon.final_price)).dim()
        ));
    }
    output.push_str(&format!(
        "{}: {}  ({} items)\n",
        style("Bundle total").bold(),
        style(format_price(bundle.compute_total())).cyan().bold(),
        bundle.item_count()
    ));
    output
}

pub fn format_session(session: &Session) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}: {}\n", style("Role").bold(), style(session.role).cyan()));
    output.push_str(&format!("{}: {}\n", style("Email").bold(), style(&session.email).green()));
    output.push_str(&format!(
        "{}: {}\n",
        style("Logged in").bold(),
        style(format_date(&session.created_at)).dim()
    ));
    match session.expires_at {
        Some(expires_at) => output.push_str(&format!(
            "{}: {}\n",
            style("Expires").bold(),
            style(format_date(&expires_at)).yellow()
        )),
        None => output.push_str(&format!("{}: {}\n", style("Expires").bold(), style("unknown").dim())),
    }
    output
}

pub fn format_seller_profile(profile: &SellerProfile) -> String {
    let or_unset = |value: &str| {
        if value.trim().is_empty() {
            style("not set".to_string()).dim()
        } else {
            style(value.to_string())
        }
    };

    let mut output = String::new();
    output.push_str(&format!("{}\n", style(&profile.store_name).bold().cyan()));
    output.push_str(&format!("{}: {}\n", style("Email").bold(), style(&profile.email).green()));
    output.push_str(&format!("{}: {}\n", style("Registration").bold(), or_unset(&profile.registration_id)));
    output.push_str(&format!("{}: {}\n", style("Business type").bold(), or_unset(&profile.business_type)));
    output.push_str(&format!("{}: {}\n", style("Address").bold(), or_unset(&profile.business_address)));
    output.push_str(&format!("{}: {}\n", style("Contact").bold(), or_unset(&profile.contact_number)));
    output.push_str(&format!("{}: {}\n", style("GSTIN").bold(), or_unset(&profile.gstin)));
    output
}

pub fn format_chat_message(message: &ChatMessage) -> String {
    let speaker = match message.speaker {
        Speaker::User => style(message.speaker).green().bold(),
        Speaker::Assistant => style(message.speaker).cyan().bold(),
    };
    format!("{}: {}", speaker, message.text)
}

/// Prices are shown in rupees with two decimals.
pub fn format_price(amount: f64) -> String {
    format!("₹{:.2}", amount)
}

pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
