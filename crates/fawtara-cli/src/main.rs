use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use fawtara::PortalClient;
use fawtara::types::{BillingItem, Session};

#[derive(Parser)]
#[command(name = "fawtara")]
#[command(about = "A my.syriatel.sy bill fetcher", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the device number registered on the account
    Login {
        #[arg(short, long, help = "Portal account username")]
        username: String,

        #[arg(short, long, help = "Portal account password")]
        password: String,
    },
    /// Log in and fetch the bills for one or more billing numbers
    Bills {
        #[arg(short, long, help = "Portal account username")]
        username: String,

        #[arg(short, long, help = "Portal account password")]
        password: String,

        #[arg(short, long, help = "City prefix used to build billing keys")]
        city: String,

        #[arg(
            required = true,
            value_parser = parse_item,
            value_name = "BILLING:SUBSCRIPTION",
            help = "Billing and subscription number pairs"
        )]
        items: Vec<BillingItem>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_item(s: &str) -> Result<BillingItem, String> {
    let (billing_no, subscription_no) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected BILLING:SUBSCRIPTION, got '{}'", s))?;

    if billing_no.is_empty() || subscription_no.is_empty() {
        return Err(format!("Expected BILLING:SUBSCRIPTION, got '{}'", s));
    }

    Ok(BillingItem {
        billing_no: billing_no.to_string(),
        subscription_no: subscription_no.to_string(),
    })
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

async fn login(portal: &PortalClient, username: &str, password: &str) -> Session {
    log::info!("Logging in to the portal as {}...", username);

    portal.login(username, password).await.unwrap_or_else(|e| {
        log::error!("Login failed: {}", e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let portal = PortalClient::new().unwrap_or_else(|e| {
        log::error!("Error creating portal client: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Login { username, password } => {
            let session = login(&portal, &username, &password).await;
            println!("{}", session.device_no);
        }

        Commands::Bills {
            username,
            password,
            city,
            items,
            format,
        } => {
            let session = login(&portal, &username, &password).await;

            log::info!("Fetching {} bills...", items.len());

            let bills = portal
                .fetch_bills(&session, &items, &city)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error fetching bills: {}", e);
                    process::exit(1);
                });

            match format {
                OutputFormat::Json => serialize_json(&bills),
                OutputFormat::Text => {
                    if bills.is_empty() {
                        println!("No bills to display.");
                    } else {
                        for (i, bill) in bills.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, bill);
                        }
                    }
                }
            }
        }
    }
}
