use anyhow::{Context, Result, anyhow};
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2024-01";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const SHOP_VAR: &str = "SHOPIFY_STORE";
pub const ACCESS_TOKEN_VAR: &str = "SHOPIFY_ACCESS_TOKEN";
pub const API_VERSION_VAR: &str = "SHOPIFY_API_VERSION";
pub const WEBHOOK_SECRET_VAR: &str = "SHOPIFY_WEBHOOK_SECRET";
pub const PORT_VAR: &str = "PORT";

/// Process-wide settings, resolved once at startup and shared read-only afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Store handle (`acme`) or full domain (`acme.myshopify.com`).
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
    /// When set, inbound webhooks must carry a valid `X-Shopify-Hmac-Sha256` header.
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let shop = var(SHOP_VAR).ok_or_else(|| anyhow!("{SHOP_VAR} is not set"))?;
        let access_token =
            var(ACCESS_TOKEN_VAR).ok_or_else(|| anyhow!("{ACCESS_TOKEN_VAR} is not set"))?;

        let port = match var(PORT_VAR) {
            Some(port) => port
                .parse()
                .with_context(|| format!("Invalid {PORT_VAR}: {port}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            shop,
            access_token,
            api_version: var(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            webhook_secret: var(WEBHOOK_SECRET_VAR),
            port,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Host name of the Admin API for this store.
    pub fn shop_domain(&self) -> String {
        if self.shop.contains('.') {
            self.shop.clone()
        } else {
            format!("{}.myshopify.com", self.shop)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = config(&[(SHOP_VAR, "acme"), (ACCESS_TOKEN_VAR, "shpat_x")])?;

        assert_eq!("acme", config.shop);
        assert_eq!("shpat_x", config.access_token);
        assert_eq!(DEFAULT_API_VERSION, config.api_version);
        assert_eq!(DEFAULT_PORT, config.port);
        assert!(config.webhook_secret.is_none());

        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = config(&[
            (SHOP_VAR, "acme.myshopify.com"),
            (ACCESS_TOKEN_VAR, "shpat_x"),
            (API_VERSION_VAR, "2025-04"),
            (WEBHOOK_SECRET_VAR, "s3cret"),
            (PORT_VAR, "8080"),
        ])?;

        assert_eq!("2025-04", config.api_version);
        assert_eq!(Some("s3cret"), config.webhook_secret.as_deref());
        assert_eq!(8080, config.port);
        assert_eq!("acme.myshopify.com", config.shop_domain());

        Ok(())
    }

    #[test]
    fn test_missing_shop() {
        let res = config(&[(ACCESS_TOKEN_VAR, "shpat_x")]);
        assert!(res.is_err());
        if let Err(e) = res {
            assert!(e.to_string().contains(SHOP_VAR));
        }
    }

    #[test]
    fn test_blank_token() {
        let res = config(&[(SHOP_VAR, "acme"), (ACCESS_TOKEN_VAR, "  ")]);
        assert!(res.is_err());
        if let Err(e) = res {
            assert!(e.to_string().contains(ACCESS_TOKEN_VAR));
        }
    }

    #[test]
    fn test_invalid_port() {
        let res = config(&[
            (SHOP_VAR, "acme"),
            (ACCESS_TOKEN_VAR, "shpat_x"),
            (PORT_VAR, "http"),
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_shop_domain() -> Result<()> {
        let config = config(&[(SHOP_VAR, "acme"), (ACCESS_TOKEN_VAR, "shpat_x")])?;
        assert_eq!("acme.myshopify.com", config.shop_domain());
        Ok(())
    }
}
