use std::sync::Arc;

use anyhow::{Context, Result};
use console::{style, Emoji};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Password};
use tracing::{debug, error, info, warn};

use crate::{
    api::{
        repositories::{
            AssistantRepository, HttpAccountRepository, HttpAssistantRepository, HttpCatalogRepository,
            HttpInventoryRepository,
        },
        ApiClient,
    },
    cli::args::*,
    models::{
        product::{Product, ProductDraft, ProductId},
        user::{RegisterRequest, Role, SellerProfileUpdate},
    },
    services::{
        AuthService, AuthServiceError, CartStore, CatalogService, ChatService, RecommendationService,
        SellerService,
    },
    utils::{
        formatting::{
            format_bundle, format_cart_table, format_chat_message, format_inventory_table,
            format_price, format_product_page, format_product_table, format_seller_profile,
            format_session, format_totals,
        },
        Config,
    },
};

static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️ ", "");
static CART: Emoji<'_, '_> = Emoji("🛒 ", "");

const BROWSE_LIMIT: usize = 24;

pub struct CliApp {
    config: Config,
    client: ApiClient,
    auth_service: Arc<AuthService>,
    catalog_service: Arc<CatalogService>,
    seller_service: Arc<SellerService>,
    assistant_repository: Arc<dyn AssistantRepository>,
}

impl CliApp {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::from_config(&config).context("Failed to build API client")?;

        let catalog_repo = Arc::new(HttpCatalogRepository::new(client.clone()));
        let account_repo = Arc::new(HttpAccountRepository::new(client.clone()));
        let inventory_repo = Arc::new(HttpInventoryRepository::new(client.clone()));
        let assistant_repository: Arc<dyn AssistantRepository> =
            Arc::new(HttpAssistantRepository::new(client.clone()));

        let auth_service = Arc::new(AuthService::new(account_repo, config.session_dir.clone())?);
        let catalog_service = Arc::new(CatalogService::new(catalog_repo));
        let seller_service = Arc::new(SellerService::new(inventory_repo, auth_service.clone()));

        Ok(Self {
            config,
            client,
            auth_service,
            catalog_service,
            seller_service,
            assistant_repository,
        })
    }

    pub async fn run(&self, args: Args) -> Result<()> {
        match args.command {
            Commands::Auth { command } => self.handle_auth_command(command).await,
            Commands::Catalog { command } => self.handle_catalog_command(command).await,
            Commands::Preferences { command } => self.handle_preferences_command(command).await,
            Commands::Seller { command } => self.handle_seller_command(command).await,
            Commands::Shop => self.handle_shop().await,
            Commands::Chat { message } => self.handle_chat(message).await,
        }
    }

    // Authentication Commands
    async fn handle_auth_command(&self, command: AuthCommands) -> Result<()> {
        match command {
            AuthCommands::Login { role } => self.handle_login(role.into()).await,
            AuthCommands::Register { role } => self.handle_register(role.into()).await,
            AuthCommands::Logout { role } => self.handle_logout(role.into()).await,
            AuthCommands::Status { role } => self.handle_auth_status(role.into()).await,
        }
    }

    async fn handle_login(&self, role: Role) -> Result<()> {
        println!("{} {}", INFO, style(format!("{} login", role)).bold().cyan());
        let theme = ColorfulTheme::default();

        let email: String = Input::with_theme(&theme).with_prompt("Email").interact_text()?;
        let password: String = Password::with_theme(&theme).with_prompt("Password").interact()?;

        match self.auth_service.login(role, &email, &password).await {
            Ok(session) => {
                println!("{} Login successful!", CHECKMARK);
                println!("{}", format_session(&session));
            }
            Err(AuthServiceError::AuthenticationFailed) => {
                println!("{} Invalid email or password", CROSS);
            }
            Err(e) => {
                println!("{} Login failed: {}", CROSS, style(&e).red());
                error!("Login failed: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_register(&self, role: Role) -> Result<()> {
        println!("{} {}", INFO, style(format!("{} registration", role)).bold().cyan());
        let theme = ColorfulTheme::default();

        let email: String = Input::with_theme(&theme)
            .with_prompt("Email")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("Please enter a valid email address")
                }
            })
            .interact_text()?;

        let password: String = Password::with_theme(&theme)
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?;

        let request = match role {
            Role::Customer => RegisterRequest::customer(email, password),
            Role::Seller => {
                let store_name: String =
                    Input::with_theme(&theme).with_prompt("Store name").interact_text()?;
                let registration_id: String = Input::with_theme(&theme)
                    .with_prompt("Business registration id")
                    .interact_text()?;
                RegisterRequest::seller(email, password, store_name, registration_id)
            }
            Role::Admin => {
                let admin_key: String =
                    Password::with_theme(&theme).with_prompt("Admin secret key").interact()?;
                RegisterRequest::admin(email, password, admin_key)
            }
        };

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                println!("{} {}", CROSS, style(format!("Invalid registration: {}", e)).red());
                return Ok(());
            }
        };

        match self.auth_service.register(request).await {
            Ok(session) => {
                println!("{} Registered and logged in!", CHECKMARK);
                println!("{}", format_session(&session));
            }
            Err(AuthServiceError::AlreadyExists) => {
                println!("{} An account with this email already exists", CROSS);
            }
            Err(e) => {
                println!("{} Registration failed: {}", CROSS, style(&e).red());
                error!("Registration failed: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_logout(&self, role: Role) -> Result<()> {
        match self.auth_service.logout(role).await {
            Ok(true) => println!("{} Logged out of {} account", CHECKMARK, role),
            Ok(false) => println!("{} No {} session to clear", INFO, role),
            Err(e) => {
                println!("{} Logout failed: {}", CROSS, style(&e).red());
                error!("Logout failed: {}", e);
            }
        }
        Ok(())
    }

    async fn handle_auth_status(&self, role: Role) -> Result<()> {
        match self.auth_service.current_session(role).await {
            Ok(Some(session)) => {
                println!("{} {}", INFO, style("Authentication Status").bold().cyan());
                println!("Status: {}", style("Authenticated").green());
                println!("{}", format_session(&session));
            }
            Ok(None) => {
                println!("{} {}", WARNING, style(format!("Not logged in as {}", role)).yellow());
                println!(
                    "Use {} to login",
                    style(format!("retailx auth login --role {}", role)).cyan()
                );
            }
            Err(e) => {
                println!("{} Failed to check authentication status: {}", CROSS, style(&e).red());
                error!("Failed to check auth status: {}", e);
            }
        }
        Ok(())
    }

    // Catalog Commands
    async fn handle_catalog_command(&self, command: CatalogCommands) -> Result<()> {
        match command {
            CatalogCommands::List { category, limit } => {
                match self.catalog_service.list_by_category(&category, limit).await {
                    Ok(products) => print_products(&products),
                    Err(e) => println!("{} Failed to list products: {}", CROSS, style(&e).red()),
                }
            }
            CatalogCommands::Search { query } => match self.catalog_service.search(&query).await {
                Ok(products) => print_products(&products),
                Err(e) => println!("{} Search failed: {}", CROSS, style(&e).red()),
            },
            CatalogCommands::Show { id } => {
                match self.catalog_service.product_page(&ProductId::new(id)).await {
                    Ok(page) => {
                        println!("{}", format_product_page(&page));
                        if !page.frequently_bought.is_empty() {
                            println!("{}", format_bundle(&page.bundle()));
                            println!(
                                "{} Use {} to build this bundle into a cart",
                                INFO,
                                style("retailx shop").cyan()
                            );
                        }
                    }
                    Err(e) => println!("{} Failed to load product: {}", CROSS, style(&e).red()),
                }
            }
        }
        Ok(())
    }

    // Preferences Commands
    async fn handle_preferences_command(&self, command: PreferencesCommands) -> Result<()> {
        match command {
            PreferencesCommands::Set { categories } => {
                match self.auth_service.save_preferences(categories).await {
                    Ok(saved) => {
                        println!("{} Preferences saved: {}", CHECKMARK, style(saved.join(", ")).green());
                    }
                    Err(e @ AuthServiceError::SessionNotFound(_)) | Err(e @ AuthServiceError::SessionExpired(_)) => {
                        println!("{} {}", WARNING, e);
                        println!("Use {} to login", style("retailx auth login").cyan());
                    }
                    Err(e) => {
                        println!("{} Failed to save preferences: {}", CROSS, style(&e).red());
                        error!("Failed to save preferences: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    // Seller Commands
    async fn handle_seller_command(&self, command: SellerCommands) -> Result<()> {
        if self.auth_service.current_session(Role::Seller).await?.is_none() {
            println!(
                "{} Please login first: {}",
                WARNING,
                style("retailx auth login --role seller").cyan()
            );
            return Ok(());
        }

        match command {
            SellerCommands::Inventory => match self.seller_service.inventory().await {
                Ok(products) if products.is_empty() => println!("{} No products listed yet", INFO),
                Ok(products) => {
                    println!("{} {}", INFO, style(format!("{} products", products.len())).bold());
                    println!("{}", format_inventory_table(&products));
                }
                Err(e) => {
                    println!("{} Failed to load inventory: {}", CROSS, style(&e).red());
                    error!("Failed to load inventory: {}", e);
                }
            },
            SellerCommands::Add => self.handle_add_product().await?,
            SellerCommands::Edit { id } => self.handle_edit_product(ProductId::new(id)).await?,
            SellerCommands::Stock { id, stock } => {
                match self.seller_service.update_stock(&ProductId::new(id), stock).await {
                    Ok(()) => println!("{} Stock updated to {}", CHECKMARK, stock),
                    Err(e) => println!("{} Failed to update stock: {}", CROSS, style(&e).red()),
                }
            }
            SellerCommands::Delete { id, force } => {
                if !force {
                    let confirm = Confirm::with_theme(&ColorfulTheme::default())
                        .with_prompt("Are you sure you want to delete this product?")
                        .default(false)
                        .interact()?;
                    if !confirm {
                        println!("Product deletion cancelled");
                        return Ok(());
                    }
                }

                match self.seller_service.delete_product(&ProductId::new(id)).await {
                    Ok(()) => println!("{} Product deleted", CHECKMARK),
                    Err(e) => println!("{} Failed to delete product: {}", CROSS, style(&e).red()),
                }
            }
            SellerCommands::Profile => match self.seller_service.profile().await {
                Ok(profile) => println!("{}", format_seller_profile(&profile)),
                Err(e) => {
                    println!("{} Failed to load profile: {}", CROSS, style(&e).red());
                    error!("Failed to load seller profile: {}", e);
                }
            },
            SellerCommands::ProfileUpdate {
                store_name,
                business_address,
                contact_number,
                gstin,
                business_type,
            } => {
                let update = SellerProfileUpdate {
                    store_name,
                    business_address,
                    contact_number,
                    gstin,
                    business_type,
                };
                match self.seller_service.update_profile(update).await {
                    Ok(profile) => {
                        println!("{} Profile updated", CHECKMARK);
                        println!("{}", format_seller_profile(&profile));
                    }
                    Err(e) => println!("{} Failed to update profile: {}", CROSS, style(&e).red()),
                }
            }
        }
        Ok(())
    }

    async fn handle_add_product(&self) -> Result<()> {
        let draft = prompt_product_draft(None)?;

        match self.seller_service.add_product(draft).await {
            Ok(Some(id)) => println!("{} Product added with ID {}", CHECKMARK, style(id).cyan()),
            Ok(None) => println!("{} Product added", CHECKMARK),
            Err(e) => {
                println!("{} Failed to add product: {}", CROSS, style(&e).red());
                error!("Failed to add product: {}", e);
            }
        }
        Ok(())
    }

    async fn handle_edit_product(&self, id: ProductId) -> Result<()> {
        let current = match self.catalog_service.product(&id).await {
            Ok(detail) => ProductDraft::from_detail(&detail),
            Err(e) => {
                println!("{} Failed to load product: {}", CROSS, style(&e).red());
                return Ok(());
            }
        };

        let draft = prompt_product_draft(Some(current))?;
        match self.seller_service.update_product(&id, draft).await {
            Ok(()) => println!("{} Product {} updated", CHECKMARK, style(&id).cyan()),
            Err(e) => {
                println!("{} Failed to update product: {}", CROSS, style(&e).red());
                error!("Failed to update product {}: {}", id, e);
            }
        }
        Ok(())
    }

    // Shopping assistant
    async fn handle_chat(&self, message: Option<String>) -> Result<()> {
        let mut chat = ChatService::new(Arc::clone(&self.assistant_repository));

        if let Some(message) = message {
            match chat.send(&message).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => println!("{} {}", CROSS, style(&e).red()),
            }
            return Ok(());
        }

        for line in chat.transcript() {
            println!("{}", format_chat_message(line));
        }
        println!("{}", style("Empty line or 'quit' ends the conversation").dim());

        let theme = ColorfulTheme::default();
        loop {
            let input: String = Input::with_theme(&theme)
                .with_prompt("you")
                .allow_empty(true)
                .interact_text()?;
            let input = input.trim();
            if input.is_empty() || input == "quit" {
                break;
            }

            if let Err(e) = chat.send(input).await {
                debug!("Chat turn failed: {}", e);
            }
            if let Some(last) = chat.transcript().last() {
                println!("{}", format_chat_message(last));
            }
        }
        Ok(())
    }

    // Interactive shopping session
    async fn handle_shop(&self) -> Result<()> {
        println!("{} {}", CART, style("RetailX shop").bold().cyan());
        println!("{}", style(SHOP_HELP).dim());

        match self.client.health_check().await {
            Ok(true) => debug!("API reachable at {}", self.client.base_url()),
            Ok(false) | Err(_) => println!(
                "{} The store API at {} is not responding; browsing may fail",
                WARNING,
                self.client.base_url()
            ),
        }

        let theme = ColorfulTheme::default();
        let mut cart = CartStore::new();
        let recommendations = Arc::new(RecommendationService::new(
            self.catalog_service.repository(),
            self.config.recommendation_limit,
        ));
        let listener = Arc::clone(&recommendations).spawn_listener(cart.subscribe());
        let mut listing: Vec<Product> = Vec::new();

        loop {
            let line: String = Input::with_theme(&theme)
                .with_prompt(format!("shop [{} items]", cart.item_count()))
                .allow_empty(true)
                .interact_text()?;

            let line = line.trim();
            let (command, arg) = match line.split_once(char::is_whitespace) {
                Some((command, arg)) => (command, arg.trim()),
                None => (line, ""),
            };
            debug!("Shop command '{}' arg '{}'", command, arg);

            match command {
                "" => continue,
                "quit" | "exit" => break,
                "help" => println!("{}", SHOP_HELP),
                "browse" => match self.catalog_service.list_by_category(arg, BROWSE_LIMIT).await {
                    Ok(products) => {
                        print_products(&products);
                        listing = products;
                    }
                    Err(e) => println!("{} {}", CROSS, style(&e).red()),
                },
                "search" => match self.catalog_service.search(arg).await {
                    Ok(products) => {
                        print_products(&products);
                        listing = products;
                    }
                    Err(e) => println!("{} {}", CROSS, style(&e).red()),
                },
                "view" => {
                    if let Some(id) = resolve_listing(&listing, arg) {
                        self.view_product(&id, &mut cart).await?;
                    } else {
                        println!("{} Usage: view <# from list | product id>", WARNING);
                    }
                }
                "add" => match resolve_listing(&listing, arg) {
                    Some(id) => match self.find_product(&listing, &id).await {
                        Some(product) => {
                            let quantity = cart.add(&product);
                            println!("{} {} (x{}) in cart", CHECKMARK, product.name, quantity);
                        }
                        None => println!("{} Product {} not found", CROSS, id),
                    },
                    None => println!("{} Usage: add <# from list | product id>", WARNING),
                },
                "inc" | "dec" => {
                    let delta = if command == "inc" { 1 } else { -1 };
                    match resolve_cart_line(&cart, arg) {
                        Some(id) => {
                            if let Some(quantity) = cart.set_quantity(&id, delta) {
                                println!("{} quantity now {}", id, quantity);
                            }
                        }
                        None => println!("{} Usage: {} <# from cart>", WARNING, command),
                    }
                }
                "rm" => match resolve_cart_line(&cart, arg) {
                    Some(id) => {
                        cart.remove(&id);
                        println!("{} Removed", CHECKMARK);
                    }
                    None => println!("{} Usage: rm <# from cart>", WARNING),
                },
                "cart" => print_cart(&cart),
                "recs" => {
                    let current = recommendations.current().await;
                    if current.loading {
                        println!("{} Loading recommendations...", INFO);
                    }
                    if current.items.is_empty() {
                        println!("{} No recommendations yet, add something to the cart", INFO);
                    } else {
                        println!("{}", style("You might be interested in").bold().cyan());
                        println!("{}", format_product_table(&current.items));
                        listing = current.items;
                    }
                }
                "clear" => {
                    cart.clear();
                    println!("{} Cart cleared", CHECKMARK);
                }
                other => println!("{} Unknown command '{}', try 'help'", WARNING, other),
            }
        }

        // Closing the cart's channel stops the listener.
        drop(cart);
        if let Err(e) = listener.await {
            warn!("Recommendation listener ended abnormally: {}", e);
        }
        info!("Shopping session closed");
        Ok(())
    }

    async fn view_product(&self, id: &ProductId, cart: &mut CartStore) -> Result<()> {
        let page = match self.catalog_service.product_page(id).await {
            Ok(page) => page,
            Err(e) => {
                println!("{} Failed to load product: {}", CROSS, style(&e).red());
                return Ok(());
            }
        };
        println!("{}", format_product_page(&page));

        let mut bundle = page.bundle();
        if bundle.addons().is_empty() {
            if Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Add to cart?")
                .default(true)
                .interact()?
            {
                cart.add(bundle.primary());
                print_cart(cart);
            }
            return Ok(());
        }

        println!("{}", format_bundle(&bundle));
        let labels: Vec<String> = bundle
            .addons()
            .iter()
            .map(|addon| format!("{} ({})", addon.name, format_price(addon.final_price)))
            .collect();
        let picked = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Add with this product (space to toggle)")
            .items(&labels)
            .interact()?;

        let addon_ids: Vec<ProductId> = picked
            .iter()
            .filter_map(|&i| bundle.addons().get(i).map(|addon| addon.id.clone()))
            .collect();
        for addon_id in &addon_ids {
            bundle.toggle(addon_id);
        }
        println!("{}", format_bundle(&bundle));

        let confirm = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Add {} items to cart?", bundle.item_count()))
            .default(true)
            .interact()?;
        if !confirm {
            return Ok(());
        }

        let receipt = bundle.commit(cart);
        println!(
            "{} Added {} items ({} already in cart)",
            CHECKMARK,
            receipt.added.len(),
            receipt.skipped.len()
        );
        print_cart(cart);
        Ok(())
    }

    /// Prefer the product already on screen; fall back to fetching it.
    async fn find_product(&self, listing: &[Product], id: &ProductId) -> Option<Product> {
        if let Some(product) = listing.iter().find(|p| &p.id == id) {
            return Some(product.clone());
        }
        match self.catalog_service.product(id).await {
            Ok(detail) => Some(detail.product),
            Err(e) => {
                debug!("Lookup of {} failed: {}", id, e);
                None
            }
        }
    }
}

const SHOP_HELP: &str = "browse <category> | search <query> | view <#|id> | add <#|id> \
| inc <#> | dec <#> | rm <#> | cart | recs | clear | quit";

/// Ask for every listing field, defaulting to `current` when editing.
fn prompt_product_draft(current: Option<ProductDraft>) -> Result<ProductDraft> {
    let theme = ColorfulTheme::default();

    let mut name_input = Input::<String>::with_theme(&theme).with_prompt("Product name");
    let mut price_input = Input::<f64>::with_theme(&theme).with_prompt("Price");
    if let Some(current) = &current {
        name_input = name_input.default(current.name.clone());
        price_input = price_input.default(current.price);
    }
    let name = name_input.interact_text()?;
    let price = price_input.interact_text()?;

    let mut draft = match current {
        Some(mut current) => {
            current.name = name;
            current.price = price;
            current
        }
        None => ProductDraft::new(name, price),
    };

    draft.brand = Input::with_theme(&theme)
        .with_prompt("Brand")
        .default(draft.brand.clone())
        .interact_text()?;
    draft.discount = Input::with_theme(&theme)
        .with_prompt("Discount %")
        .default(draft.discount)
        .interact_text()?;
    draft.stock = Input::with_theme(&theme)
        .with_prompt("Stock")
        .default(draft.stock)
        .interact_text()?;
    draft.category = Input::with_theme(&theme)
        .with_prompt("Category")
        .default(draft.category.clone())
        .interact_text()?;
    draft.description = Input::with_theme(&theme)
        .with_prompt("Description")
        .default(draft.description.clone())
        .allow_empty(true)
        .interact_text()?;
    draft.image_url = Input::with_theme(&theme)
        .with_prompt("Image URL")
        .default(draft.image_url.clone())
        .allow_empty(true)
        .interact_text()?;
    let tags: String = Input::with_theme(&theme)
        .with_prompt("Tags (comma separated)")
        .default(draft.tags.join(", "))
        .allow_empty(true)
        .interact_text()?;
    Ok(draft.with_tags(&tags))
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("{} No products found", INFO);
    } else {
        println!("{} {}", INFO, style(format!("Found {} products", products.len())).bold());
        println!("{}", format_product_table(products));
    }
}

fn print_cart(cart: &CartStore) {
    if cart.is_empty() {
        println!("{} Your cart is empty", CART);
        return;
    }
    println!("{} {}", CART, style(format!("{} items", cart.item_count())).bold());
    println!("{}", format_cart_table(cart.items()));
    println!("{}", format_totals(&cart.totals()));
}

/// A 1-based row number from the last list shown, or a raw product id.
fn resolve_listing(listing: &[Product], arg: &str) -> Option<ProductId> {
    if arg.is_empty() {
        return None;
    }
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 && n <= listing.len() => Some(listing[n - 1].id.clone()),
        _ => Some(ProductId::from(arg)),
    }
}

fn resolve_cart_line(cart: &CartStore, arg: &str) -> Option<ProductId> {
    let n = arg.parse::<usize>().ok()?;
    cart.items().get(n.checked_sub(1)?).map(|item| item.identity.clone())
}
