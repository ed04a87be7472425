//! Environment-driven settings. Loaded once at startup; `.env` is read by the binary.

use crate::error::ConfigError;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const API_V1_STR: &str = "/api/v1";

#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: String,
    pub testing: bool,
    pub app: AppSettings,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub http: HttpSettings,
    pub log: LogSettings,
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Contact entries from `APP_CONTACT` as (key, value) pairs.
    pub contact: Vec<(String, String)>,
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub test_token: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub schema: String,
    pub max_pool_size: u32,
    pub acquire_timeout: Duration,
    /// Tables table maintenance must never touch.
    pub exclude_tables: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub time_sleep: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LogSettings {
    pub format: LogFormat,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let in_docker = Path::new("/.dockerenv").exists();
        Self::from_lookup(|key| std::env::var(key).ok(), in_docker)
    }

    /// Read settings through `lookup`. Outside docker the bind host and the database
    /// host are forced to `localhost`; an explicit `PG_URL` / `DATABASE_URL` is kept as is.
    pub fn from_lookup<F>(lookup: F, in_docker: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let contact = parse_contact(get("APP_CONTACT").as_deref().unwrap_or(""))?;
        let host = if in_docker {
            get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into())
        } else {
            "localhost".into()
        };
        let app = AppSettings {
            name: get("APP_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").into()),
            version: get("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            description: get("APP_DESCRIPTION").unwrap_or_else(|| env!("CARGO_PKG_DESCRIPTION").into()),
            contact,
            host,
            port: parse_or(&get, "APP_PORT", 8000)?,
        };

        let db_host = if in_docker {
            get("POSTGRES_SERVER").unwrap_or_else(|| "localhost".into())
        } else {
            "localhost".into()
        };
        let url = match get("PG_URL").or_else(|| get("DATABASE_URL")) {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                get("POSTGRES_USER").unwrap_or_else(|| "postgres".into()),
                get("POSTGRES_PASSWORD").unwrap_or_else(|| "postgres".into()),
                db_host,
                parse_or::<u16, _>(&get, "POSTGRES_PORT", 9002)?,
                get("POSTGRES_DB").unwrap_or_else(|| "app".into()),
            ),
        };
        let pool_key = if get("POSTGRES_MAX_POOL_SIZE").is_some() {
            "POSTGRES_MAX_POOL_SIZE"
        } else {
            "POSTGREES_MAX_POOL_SIZE"
        };
        let database = DatabaseSettings {
            url,
            schema: get("POSTGRES_SCHEMA").unwrap_or_else(|| "template_core".into()),
            max_pool_size: parse_or(&get, pool_key, default_pool_size())?.max(1),
            acquire_timeout: Duration::from_secs(parse_or(&get, "POSTGRES_ACQUIRE_TIMEOUT", 30)?),
            exclude_tables: split_list(get("DB_EXCLUDE_TABLES").as_deref().unwrap_or("")),
        };

        let http = HttpSettings {
            timeout: positive_secs(&get, "HTTP_TIMEOUT", 30.0)?,
            max_attempts: parse_or(&get, "HTTP_MAX_ATTEMPTS", 3u32)?,
            time_sleep: positive_secs(&get, "HTTP_TIME_SLEEP", 0.3)?,
        };
        if http.max_attempts == 0 {
            return Err(ConfigError::Validation("HTTP_MAX_ATTEMPTS must be greater than 0".into()));
        }

        let format = match get("LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Settings {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            testing: parse_bool(&get, "TESTING")?,
            app,
            auth: AuthSettings {
                test_token: get("TEST_TOKEN").unwrap_or_else(|| "frankjony17".into()),
            },
            database,
            http,
            log: LogSettings { format },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn default_pool_size() -> u32 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    (1000 / cpus).max(1)
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

fn positive_secs<G>(get: &G, key: &'static str, default: f64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(get, key, default)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::Validation(format!("{} must be greater than 0", key)));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_contact(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let items = split_list(raw);
    if items.len() % 2 != 0 {
        return Err(ConfigError::Validation(
            "APP_CONTACT must hold key,value pairs".into(),
        ));
    }
    Ok(items
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}
