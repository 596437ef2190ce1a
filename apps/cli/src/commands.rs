//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shopline_api::{
    CustomersListOptions, OrdersListOptions, OrdersSearchOptions, ProductsListOptions, ShoplineApi,
    ShoplineClient,
};
use shopline_core::{
    EnrichProgress, ExpandOptions, SilentProgress, list_customers, list_orders, list_products,
    order_enricher, search_orders,
};
use shopline_shared::{AppConfig, Order, init_config, load_config, resolve_access_token};

use crate::output::{footer, format_time, print_json, render_table};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// spl: list and inspect a Shopline store from the terminal.
#[derive(Parser)]
#[command(
    name = "spl",
    version,
    about = "List and inspect Shopline orders, products, and customers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Output format (defaults to `defaults.output` from the config file).
    #[arg(short, long, global = true)]
    pub output: Option<OutputFormat>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Command output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Orders.
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },

    /// Products.
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },

    /// Customers.
    Customers {
        #[command(subcommand)]
        action: CustomersAction,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Paging and sorting flags shared by list commands.
#[derive(Args, Debug, Clone)]
pub(crate) struct PageArgs {
    /// Page to start from.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Results per page (defaults to `defaults.page_size`).
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Collect up to this many results across pages (0 = single page).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub limit: i64,

    /// Field to sort by.
    #[arg(long, default_value = "")]
    pub sort_by: String,

    /// Sort descending (with --sort-by).
    #[arg(long)]
    pub desc: bool,
}

#[derive(Subcommand)]
pub(crate) enum OrdersAction {
    /// List orders.
    List {
        #[command(flatten)]
        paging: PageArgs,

        /// Filter by order status.
        #[arg(long, default_value = "")]
        status: String,

        /// Search orders by keyword (order number, email, ...) instead of listing.
        #[arg(short, long, default_value = "")]
        query: String,

        /// Created at or after (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Created at or before (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Fetch full details (JSON output only): details, customer, products.
        #[arg(long, value_delimiter = ',')]
        expand: Vec<String>,

        /// Concurrent detail lookups (defaults to `defaults.jobs`).
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Show one order.
    Get {
        /// Order id.
        id: String,

        /// Attach related records: customer, products.
        #[arg(long, value_delimiter = ',')]
        expand: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ProductsAction {
    /// List products.
    List {
        #[command(flatten)]
        paging: PageArgs,

        #[arg(long, default_value = "")]
        status: String,

        #[arg(long, default_value = "")]
        vendor: String,

        #[arg(long, default_value = "")]
        product_type: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum CustomersAction {
    /// List customers.
    List {
        #[command(flatten)]
        paging: PageArgs,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        state: String,

        #[arg(long, default_value = "")]
        tags: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "spl=info,shopline=info",
        1 => "spl=debug,shopline=debug",
        _ => "spl=trace,shopline=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
        Command::Orders { action } => {
            let session = Session::open(cli.output)?;
            match action {
                OrdersAction::List {
                    paging,
                    status,
                    query,
                    from,
                    to,
                    expand,
                    jobs,
                } => {
                    let filters = OrderFilters {
                        status,
                        query,
                        from,
                        to,
                    };
                    cmd_orders_list(&session, &paging, &filters, &expand, jobs).await
                }
                OrdersAction::Get { id, expand } => cmd_orders_get(&session, &id, &expand).await,
            }
        }
        Command::Products { action } => {
            let session = Session::open(cli.output)?;
            match action {
                ProductsAction::List {
                    paging,
                    status,
                    vendor,
                    product_type,
                } => {
                    let opts = ProductsListOptions {
                        status,
                        vendor,
                        product_type,
                        ..ProductsListOptions::default()
                    };
                    cmd_products_list(&session, &paging, opts).await
                }
            }
        }
        Command::Customers { action } => {
            let session = Session::open(cli.output)?;
            match action {
                CustomersAction::List {
                    paging,
                    email,
                    state,
                    tags,
                } => {
                    let opts = CustomersListOptions {
                        email,
                        state,
                        tags,
                        ..CustomersListOptions::default()
                    };
                    cmd_customers_list(&session, &paging, opts).await
                }
            }
        }
    }
}

/// Loaded config, API client, and resolved output format for one invocation.
struct Session {
    config: AppConfig,
    api: Arc<dyn ShoplineApi>,
    output: OutputFormat,
}

impl Session {
    fn open(output: Option<OutputFormat>) -> Result<Self> {
        let config = load_config()?;
        let token = resolve_access_token(&config)?;
        let client = ShoplineClient::from_config(&config.api, token)?;
        let output = output.unwrap_or_else(|| configured_output(&config));
        debug!(base_url = %config.api.base_url, ?output, "session ready");
        Ok(Self {
            config,
            api: Arc::new(client),
            output,
        })
    }

    fn page_size(&self, paging: &PageArgs) -> u32 {
        paging.page_size.unwrap_or(self.config.defaults.page_size)
    }
}

fn configured_output(config: &AppConfig) -> OutputFormat {
    if config.defaults.output.eq_ignore_ascii_case("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

struct OrderFilters {
    status: String,
    query: String,
    from: Option<String>,
    to: Option<String>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

async fn cmd_orders_list(
    session: &Session,
    paging: &PageArgs,
    filters: &OrderFilters,
    expand: &[String],
    jobs: Option<usize>,
) -> Result<()> {
    let limit = checked_limit(paging.limit)?;
    let expand = ExpandOptions::parse(expand)?;
    let since = parse_time_flag(filters.from.as_deref(), "--from")?;
    let until = parse_time_flag(filters.to.as_deref(), "--to")?;
    let page_size = session.page_size(paging);

    let query = filters.query.trim();
    let page = if query.is_empty() {
        let opts = OrdersListOptions {
            page: paging.page,
            page_size,
            status: filters.status.clone(),
            since,
            until,
            sort_by: paging.sort_by.clone(),
            sort_order: sort_order(&paging.sort_by, paging.desc).to_string(),
        };
        info!(page = opts.page, page_size, limit, "listing orders");
        list_orders(session.api.as_ref(), &opts, limit).await?
    } else {
        let opts = OrdersSearchOptions {
            query: query.to_string(),
            status: filters.status.clone(),
            since,
            until,
            page: paging.page,
            page_size,
        };
        info!(query, page = opts.page, page_size, limit, "searching orders");
        search_orders(session.api.as_ref(), &opts, limit).await?
    };

    if session.output == OutputFormat::Json {
        if expand.any() {
            let jobs = jobs.unwrap_or(session.config.defaults.jobs as usize);
            let enricher = order_enricher(Arc::clone(&session.api), &expand, jobs);
            let cancel = cancel_on_ctrl_c();
            let details = if page.items.len() > 1 {
                let progress = CliProgress::new("Expanding orders");
                let result = enricher.enrich(&page.items, &cancel, &progress).await;
                progress.finish();
                result?
            } else {
                enricher
                    .enrich(&page.items, &cancel, &SilentProgress)
                    .await?
            };
            return print_json(&page.with_items(details));
        }
        return print_json(&page);
    }

    if expand.any() {
        warn!("--expand only applies to JSON output; showing summaries");
    }

    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|o| {
            vec![
                o.id.clone(),
                o.order_number.clone(),
                o.status.clone(),
                format!("{} {}", o.total_price, o.currency).trim().to_string(),
                o.customer_email.clone(),
                format_time(o.created_at),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(
            &["ORDER", "NUMBER", "STATUS", "TOTAL", "CUSTOMER", "CREATED"],
            &rows
        )
    );
    println!("\n{}", footer(page.items.len(), page.total_count, "orders"));
    Ok(())
}

async fn cmd_orders_get(session: &Session, id: &str, expand: &[String]) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(eyre!("order id is required"));
    }
    let expand = ExpandOptions::parse(expand)?;
    let cancel = cancel_on_ctrl_c();

    let order = if expand.customer || expand.products {
        let enricher = order_enricher(Arc::clone(&session.api), &expand, 1);
        let mut orders = enricher
            .enrich(&[id.to_string()], &cancel, &SilentProgress)
            .await?;
        orders
            .pop()
            .ok_or_else(|| eyre!("order {id} was not returned"))?
    } else {
        session.api.get_order(&cancel, id).await?
    };

    match session.output {
        OutputFormat::Json => print_json(&order),
        OutputFormat::Text => {
            print_order(&order);
            Ok(())
        }
    }
}

fn print_order(order: &Order) {
    println!("Order:     {}", order.id);
    println!("Number:    {}", order.order_number);
    println!("Status:    {}", order.status);
    println!("Payment:   {}", order.payment_status);
    println!("Fulfill:   {}", order.fulfill_status);
    println!("Total:     {} {}", order.total_price, order.currency);
    match &order.customer {
        Some(c) => println!("Customer:  {} <{}>", c.full_name(), c.email),
        None => println!("Customer:  {}", order.customer_email),
    }
    println!("Created:   {}", format_time(order.created_at));
    if !order.note.is_empty() {
        println!("Note:      {}", order.note);
    }

    if order.line_items.is_empty() {
        return;
    }
    println!();
    let rows: Vec<Vec<String>> = order
        .line_items
        .iter()
        .map(|li| {
            let title = li
                .product
                .as_ref()
                .map(|p| p.display_title().to_string())
                .unwrap_or_else(|| li.title.clone());
            vec![
                li.product_id.clone(),
                li.sku.clone(),
                title,
                li.quantity.to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(&["PRODUCT", "SKU", "TITLE", "QTY"], &rows)
    );
}

// ---------------------------------------------------------------------------
// Products and customers
// ---------------------------------------------------------------------------

async fn cmd_products_list(
    session: &Session,
    paging: &PageArgs,
    mut opts: ProductsListOptions,
) -> Result<()> {
    let limit = checked_limit(paging.limit)?;
    opts.page = paging.page;
    opts.page_size = session.page_size(paging);
    opts.sort_by = paging.sort_by.clone();
    opts.sort_order = sort_order(&paging.sort_by, paging.desc).to_string();

    info!(page = opts.page, page_size = opts.page_size, limit, "listing products");
    let page = list_products(session.api.as_ref(), &opts, limit).await?;

    if session.output == OutputFormat::Json {
        return print_json(&page);
    }

    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.display_title().to_string(),
                p.status.clone(),
                p.price.as_ref().map(|pr| pr.label.clone()).unwrap_or_default(),
                format_time(p.created_at),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(&["PRODUCT", "TITLE", "STATUS", "PRICE", "CREATED"], &rows)
    );
    println!("\n{}", footer(page.items.len(), page.total_count, "products"));
    Ok(())
}

async fn cmd_customers_list(
    session: &Session,
    paging: &PageArgs,
    mut opts: CustomersListOptions,
) -> Result<()> {
    let limit = checked_limit(paging.limit)?;
    opts.page = paging.page;
    opts.page_size = session.page_size(paging);
    opts.sort_by = paging.sort_by.clone();
    opts.sort_order = sort_order(&paging.sort_by, paging.desc).to_string();

    info!(page = opts.page, page_size = opts.page_size, limit, "listing customers");
    let page = list_customers(session.api.as_ref(), &opts, limit).await?;

    if session.output == OutputFormat::Json {
        return print_json(&page);
    }

    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.full_name(),
                c.email.clone(),
                c.orders_count.to_string(),
                format_time(c.created_at),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(&["CUSTOMER", "NAME", "EMAIL", "ORDERS", "CREATED"], &rows)
    );
    println!("\n{}", footer(page.items.len(), page.total_count, "customers"));
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Flag helpers
// ---------------------------------------------------------------------------

fn checked_limit(limit: i64) -> Result<usize> {
    usize::try_from(limit).map_err(|_| eyre!("--limit must be >= 0"))
}

/// Empty without a sort field; otherwise `asc` unless `--desc`.
fn sort_order(sort_by: &str, desc: bool) -> &'static str {
    match (sort_by.trim().is_empty(), desc) {
        (true, _) => "",
        (false, true) => "desc",
        (false, false) => "asc",
    }
}

/// Parse `--from`/`--to`: RFC 3339, or a bare date taken as midnight UTC.
fn parse_time_flag(value: Option<&str>, label: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(t.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        eyre!("invalid {label} date format, use RFC 3339 or YYYY-MM-DD: {e}")
    })?;
    Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
}

/// Token cancelled on Ctrl-C so in-flight lookups stop promptly.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling outstanding requests");
            on_signal.cancel();
        }
    });
    token
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Enrichment progress as an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
    label: &'static str,
}

impl CliProgress {
    fn new(label: &'static str) -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.set_message(label);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner, label }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichProgress for CliProgress {
    fn item_enriched(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("{} [{current}/{total}]", self.label));
    }
}
