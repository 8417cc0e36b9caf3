use {std::time::Duration, thiserror::Error};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub method: String,
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Minor-unit exponent the gateway expects for every currency. Unset means
    /// each currency's own.
    pub amount_exponent: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Without a database the service falls back to the in-memory store.
    pub database_url: Option<String>,
    pub gateway: GatewayConfig,
    pub mock_gateway: bool,
    pub webhook_secret: String,
    pub webhook_tolerance: Duration,
    /// Base for redirect and callback URLs handed to the gateway.
    pub public_base_url: String,
    pub gateway_timeout: Duration,
    pub store_timeout: Duration,
    pub max_creation_retries: u32,
    pub retry_backoff: Duration,
    pub order_service_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let parsed = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name, value }),
            }
        };

        let amount_exponent = lookup("GATEWAY_AMOUNT_EXPONENT")
            .map(|value| match value.trim().parse::<u32>() {
                Ok(exponent) if exponent <= 4 => Ok(exponent),
                _ => Err(ConfigError::Invalid {
                    name: "GATEWAY_AMOUNT_EXPONENT",
                    value,
                }),
            })
            .transpose()?;

        let public_base_url = required("PUBLIC_BASE_URL")?;
        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "PUBLIC_BASE_URL",
                value: public_base_url,
            });
        }

        let max_creation_retries = parsed("MAX_CREATION_RETRIES", 3)?;
        let max_creation_retries =
            u32::try_from(max_creation_retries).map_err(|_| ConfigError::Invalid {
                name: "MAX_CREATION_RETRIES",
                value: max_creation_retries.to_string(),
            })?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            gateway: GatewayConfig {
                method: lookup("GATEWAY_METHOD").unwrap_or_else(|| "hosted".to_string()),
                base_url: required("GATEWAY_BASE_URL")?
                    .trim_end_matches('/')
                    .to_string(),
                key_id: required("GATEWAY_KEY_ID")?,
                key_secret: required("GATEWAY_KEY_SECRET")?,
                amount_exponent,
            },
            mock_gateway: lookup("MOCK_GATEWAY").is_some_and(|v| v == "1" || v == "true"),
            webhook_secret: required("WEBHOOK_SECRET")?,
            webhook_tolerance: Duration::from_secs(parsed("WEBHOOK_TOLERANCE_SECS", 300)?),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            gateway_timeout: Duration::from_millis(parsed("GATEWAY_TIMEOUT_MS", 10_000)?),
            store_timeout: Duration::from_millis(parsed("STORE_TIMEOUT_MS", 5_000)?),
            max_creation_retries,
            retry_backoff: Duration::from_millis(parsed("RETRY_BACKOFF_MS", 500)?),
            order_service_url: lookup("ORDER_SERVICE_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string()),
        })
    }
}
