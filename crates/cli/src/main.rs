//! Aries Mall CLI - drive the storefront and the admin panel from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Render storefront pages
//! aries shop browse "#/" "#/category/electric-scooters"
//!
//! # Sign in as a shopper and manage the cart
//! aries shop login -e asha@example.com
//! aries shop cart add 42 --quantity 2
//!
//! # Administrator tasks
//! aries admin login -e admin@ariesmall.com
//! aries admin upload ./hero.png --name summer-hero
//! aries admin upscale https://example.com/bike.jpg --scale 4
//! aries admin history --clear
//! ```
//!
//! # Logging
//!
//! Logs go to stderr. `RUST_LOG` sets the filter (default `info`);
//! `ARIES_LOG_FORMAT=json` switches to JSON lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "aries")]
#[command(author, version, about = "Aries Mall storefront and admin shell")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Storefront commands
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Admin panel commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// Render one or more pages, e.g. `#/search?q=helmet`
    Browse {
        #[arg(required = true)]
        fragments: Vec<String>,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product from its detail page
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set { product_id: String, quantity: i64 },
    /// Remove a line
    Remove { product_id: String },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Add or remove a product
    Toggle { product_id: String },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Sign in as the administrator
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show catalog statistics
    Dashboard,
    /// Optimize and upload an image file or URL to Cloudinary
    Upload {
        source: String,

        /// Public id for the uploaded asset
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Upscale an image file or URL with Replicate
    Upscale {
        source: String,

        /// 2 or 4
        #[arg(short, long, default_value_t = 2)]
        scale: u8,
    },
    /// Show recent media history
    History {
        /// Delete every history entry (asks first)
        #[arg(long)]
        clear: bool,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let json = std::env::var("ARIES_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Shop { action } => {
            let shop = commands::shop::open().await?;
            let outcome = match action {
                ShopAction::Browse { fragments } => commands::shop::browse(&shop, &fragments).await,
                ShopAction::Login { email, password } => {
                    commands::shop::login(&shop, &email, password).await
                }
                ShopAction::Logout => commands::shop::logout(&shop).await,
                ShopAction::Cart { action } => match action {
                    None => commands::shop::browse(&shop, &["#/cart".to_owned()]).await,
                    Some(CartAction::Add {
                        product_id,
                        quantity,
                    }) => commands::shop::add_to_cart(&shop, &product_id, quantity).await,
                    Some(CartAction::Set {
                        product_id,
                        quantity,
                    }) => commands::shop::set_quantity(&shop, &product_id, quantity).await,
                    Some(CartAction::Remove { product_id }) => {
                        commands::shop::remove(&shop, &product_id).await
                    }
                },
                ShopAction::Wishlist {
                    action: WishlistAction::Toggle { product_id },
                } => commands::shop::toggle_wishlist(&shop, &product_id).await,
            };
            commands::shop::close(shop);
            outcome?;
        }
        Commands::Admin { action } => {
            let panel = commands::admin::open()?;
            let outcome = match action {
                AdminAction::Login { email, password } => {
                    commands::admin::login(&panel, &email, password).await
                }
                AdminAction::Logout => commands::admin::logout(&panel).await,
                AdminAction::Dashboard => commands::admin::dashboard(&panel).await,
                AdminAction::Upload { source, name } => {
                    commands::admin::upload(&panel, &source, name.as_deref()).await
                }
                AdminAction::Upscale { source, scale } => {
                    commands::admin::upscale(&panel, &source, scale).await
                }
                AdminAction::History { clear } => commands::admin::history(&panel, clear).await,
            };
            panel.shutdown();
            outcome?;
        }
    }
    Ok(())
}
