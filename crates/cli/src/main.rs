//! Tableside CLI - Order food and run the back office from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password read from stdin when --password is omitted)
//! ts-cli login -e anna@example.com
//!
//! # Browse the menu and fill the cart
//! ts-cli menu
//! ts-cli cart add 3 --quantity 2
//! ts-cli cart show
//!
//! # Place the order
//! ts-cli checkout --name "Anna" --phone 0630000000 --address "Fő utca 1" --city Budapest --zip 1011
//!
//! # Back office
//! ts-cli admin orders
//! ts-cli admin status 12 preparing --note "10 minutes"
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` / `register` / `forgot-password` / `reset-password`
//! - `menu` / `variants` - Browse dishes
//! - `cart` - Show and edit the cart
//! - `checkout` - Place an order from the cart
//! - `orders` - Your orders
//! - `admin` - Order queue, users, statistics, contact messages
//! - `coupons` - Coupon types and issued coupons
//! - `contact` - Send a message to the restaurant
//!
//! State lives in `TABLESIDE_STATE_DIR`: `credentials.json` (tokens) and
//! `session.json` (cart, wiped on logout).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tableside_client::ClientConfig;
use tableside_core::{DiscountTypeId, DishId, OrderId, OrderStatus, VariantId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "Tableside restaurant ordering CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and empty the cart
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account
    Register(RegisterArgs),
    /// Request a password reset link
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        /// Token from the reset link
        #[arg(short, long)]
        token: String,

        /// New password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List dishes
    Menu {
        /// Only dishes in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List variants of a dish
    Variants {
        /// Dish id
        dish: DishId,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the cart
    Checkout(CheckoutArgs),
    /// Your orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Back-office operations
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Coupon types and coupons
    Coupons {
        #[command(subcommand)]
        action: CouponsAction,
    },
    /// Send a message to the restaurant
    Contact {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        subject: String,

        /// Message body
        message: String,
    },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(short, long)]
    email: String,

    /// Password (read from stdin if omitted)
    #[arg(short, long)]
    password: Option<String>,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    phone: String,

    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    birth_date: chrono::NaiveDate,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Add a dish
    Add {
        dish: DishId,

        /// Variant of the dish
        #[arg(short, long)]
        variant: Option<VariantId>,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        dish: DishId,
        quantity: u32,

        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Add one to a line
    Inc {
        dish: DishId,

        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Take one from a line
    Dec {
        dish: DishId,

        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Remove a line
    Remove {
        dish: DishId,

        #[arg(short, long)]
        variant: Option<VariantId>,
    },
    /// Empty the cart
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    phone: String,

    #[arg(long, default_value = "")]
    address: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long, default_value = "")]
    zip: String,

    /// Collect the order instead of having it delivered
    #[arg(long)]
    pickup: bool,

    /// Pay by card instead of cash on delivery
    #[arg(long)]
    card: bool,

    #[arg(long)]
    coupon: Option<String>,

    #[arg(long)]
    comment: Option<String>,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Orders you placed
    Mine,
    /// One order in detail
    Show { id: OrderId },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Every order, optionally only those in one status
    Orders {
        /// e.g. `pending`, `in-delivery`
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Pending order count
    Pending,
    /// Move an order to a new status
    Status {
        id: OrderId,
        status: OrderStatus,

        #[arg(short, long)]
        note: Option<String>,
    },
    /// Accept a pending order
    Accept { id: OrderId },
    /// Cancel an order
    Cancel {
        id: OrderId,

        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Mark an order as seen
    View { id: OrderId },
    /// List users
    Users,
    /// Dashboard statistics
    Stats,
    /// Contact messages
    Contacts,
}

#[derive(Subcommand)]
enum CouponsAction {
    /// List coupon types
    Types {
        /// Only types in this discount category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one coupon type
    Type { id: DiscountTypeId },
    /// Create a coupon type
    Create(CouponTypeArgs),
    /// Replace a coupon type
    Update {
        id: DiscountTypeId,

        #[command(flatten)]
        fields: CouponTypeArgs,
    },
    /// Delete a coupon type
    Delete { id: DiscountTypeId },
    /// List issued coupons
    List,
}

#[derive(Args)]
struct CouponTypeArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    category: String,

    #[arg(long)]
    value: Decimal,

    #[arg(long)]
    description: Option<String>,

    /// Image file to upload
    #[arg(long)]
    image: Option<std::path::PathBuf>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tableside_cli=info,tableside_client=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", e.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), commands::CliError> {
    let ctx = commands::Context::open(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::session::login(&ctx, &email, password).await?;
        }
        Commands::Logout => commands::session::logout(&ctx),
        Commands::Whoami => commands::session::whoami(&ctx).await?,
        Commands::Register(args) => {
            let request = commands::session::RegisterInput {
                email: args.email,
                password: args.password,
                first_name: args.first_name,
                last_name: args.last_name,
                phone: args.phone,
                birth_date: args.birth_date,
            };
            commands::session::register(&ctx, request).await?;
        }
        Commands::ForgotPassword { email } => {
            commands::session::forgot_password(&ctx, &email).await?;
        }
        Commands::ResetPassword { token, password } => {
            commands::session::reset_password(&ctx, &token, password).await?;
        }
        Commands::Menu { category } => commands::menu::list(&ctx, category.as_deref()).await?,
        Commands::Variants { dish } => commands::menu::variants(&ctx, dish).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await,
            CartAction::Add {
                dish,
                variant,
                quantity,
            } => commands::cart::add(&ctx, dish, variant, quantity).await?,
            CartAction::Set {
                dish,
                quantity,
                variant,
            } => commands::cart::set_quantity(&ctx, dish, variant, quantity)?,
            CartAction::Inc { dish, variant } => commands::cart::increment(&ctx, dish, variant)?,
            CartAction::Dec { dish, variant } => commands::cart::decrement(&ctx, dish, variant)?,
            CartAction::Remove { dish, variant } => commands::cart::remove(&ctx, dish, variant)?,
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Checkout(args) => {
            let details = tableside_client::api::types::CheckoutDetails {
                delivery_type: if args.pickup {
                    tableside_core::DeliveryType::Pickup
                } else {
                    tableside_core::DeliveryType::Delivery
                },
                delivery_name: args.name,
                delivery_phone: args.phone,
                delivery_address: args.address,
                delivery_city: args.city,
                delivery_zip: args.zip,
                payment_method: if args.card {
                    tableside_core::PaymentMethod::Card
                } else {
                    tableside_core::PaymentMethod::CashOnDelivery
                },
                coupon_code: args.coupon,
                comment: args.comment,
            };
            commands::cart::checkout(&ctx, details).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::Mine => commands::orders::mine(&ctx).await?,
            OrdersAction::Show { id } => commands::orders::show(&ctx, id).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Orders { status } => commands::backoffice::orders(&ctx, status).await?,
            AdminAction::Pending => commands::backoffice::pending(&ctx).await?,
            AdminAction::Status { id, status, note } => {
                commands::backoffice::set_status(&ctx, id, status, note.as_deref()).await?;
            }
            AdminAction::Accept { id } => commands::backoffice::accept(&ctx, id).await?,
            AdminAction::Cancel { id, reason } => {
                commands::backoffice::cancel(&ctx, id, reason.as_deref()).await?;
            }
            AdminAction::View { id } => commands::backoffice::mark_viewed(&ctx, id).await?,
            AdminAction::Users => commands::backoffice::users(&ctx).await?,
            AdminAction::Stats => commands::backoffice::stats(&ctx).await?,
            AdminAction::Contacts => commands::backoffice::contacts(&ctx).await?,
        },
        Commands::Coupons { action } => match action {
            CouponsAction::Types { category } => {
                commands::coupons::list_types(&ctx, category.as_deref()).await?;
            }
            CouponsAction::Type { id } => commands::coupons::show_type(&ctx, id).await?,
            CouponsAction::Create(fields) => {
                commands::coupons::create_type(&ctx, fields.into_input()).await?;
            }
            CouponsAction::Update { id, fields } => {
                commands::coupons::update_type(&ctx, id, fields.into_input()).await?;
            }
            CouponsAction::Delete { id } => commands::coupons::delete_type(&ctx, id).await?,
            CouponsAction::List => commands::coupons::list_coupons(&ctx).await?,
        },
        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => commands::session::contact(&ctx, &name, &email, &subject, &message).await?,
    }
    Ok(())
}

impl CouponTypeArgs {
    fn into_input(self) -> commands::coupons::CouponTypeInput {
        commands::coupons::CouponTypeInput {
            name: self.name,
            category: self.category,
            value: self.value,
            description: self.description,
            image: self.image,
        }
    }
}
