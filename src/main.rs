use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use log::debug;
use metasync::config::{
    ACCESS_TOKEN_VAR, API_VERSION_VAR, DEFAULT_API_VERSION, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT,
    SHOP_VAR,
};
use metasync::{Config, ShopifyClient, handle_customer_webhook, plan, set_up_logger};
use std::io::Read;

#[derive(Debug)]
struct Args {
    verbose: bool,
    dry_run: bool,
    file: Option<String>,
    shop: Option<String>,
    access_token: Option<String>,
    api_version: String,
}

fn parse_args() -> Args {
    let matches = Command::new("Metasync")
        .version("0.1")
        .author("Jacob Luszcz")
        .about("Applies a customer webhook payload to Shopify customer metafields.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print the metafield updates instead of writing them."),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .help("Webhook payload JSON file. Reads stdin if absent or '-'."),
        )
        .arg(
            Arg::new("shop")
                .short('s')
                .long("shop")
                .env(SHOP_VAR)
                .required_unless_present("dry-run")
                .help("Shopify store handle or domain."),
        )
        .arg(
            Arg::new("access-token")
                .short('t')
                .long("access-token")
                .env(ACCESS_TOKEN_VAR)
                .hide_env_values(true)
                .required_unless_present("dry-run")
                .help("Admin API access token."),
        )
        .arg(
            Arg::new("api-version")
                .long("api-version")
                .env(API_VERSION_VAR)
                .default_value(DEFAULT_API_VERSION)
                .help("Admin API version."),
        )
        .get_matches();

    let string = |id: &str| matches.get_one::<String>(id).cloned();

    Args {
        verbose: matches.get_flag("verbose"),
        dry_run: matches.get_flag("dry-run"),
        file: string("file"),
        shop: string("shop"),
        access_token: string("access-token"),
        api_version: string("api-version").unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
    }
}

fn read_body(file: Option<&str>) -> Result<Vec<u8>> {
    match file {
        Some(path) if path != "-" => {
            std::fs::read(path).with_context(|| format!("Failed to read payload file: {path}"))
        }
        _ => {
            let mut body = Vec::new();
            std::io::stdin()
                .read_to_end(&mut body)
                .context("Failed to read payload from stdin")?;
            Ok(body)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    set_up_logger(module_path!(), args.verbose)?;
    debug!("Args: {:?}", args);

    let body = read_body(args.file.as_deref())?;

    if args.dry_run {
        let reconciled = plan(None, &body, None)?;
        println!("{}", serde_json::to_string_pretty(&reconciled.operations)?);
        return Ok(());
    }

    let config = Config {
        shop: args.shop.context("Shop is required")?,
        access_token: args.access_token.context("Access token is required")?,
        api_version: args.api_version,
        webhook_secret: None,
        port: DEFAULT_PORT,
        request_timeout: DEFAULT_REQUEST_TIMEOUT,
    };
    let client = ShopifyClient::new(&config)?;

    let response = handle_customer_webhook(&client, None, &body, None).await;
    println!("{}", serde_json::to_string_pretty(&response.to_json())?);

    Ok(())
}
