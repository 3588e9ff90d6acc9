//! Connection settings.
//!
//! Settings come either from the environment ([`DbConfig::from_env`]) or from
//! a TOML file with a `[database]` table ([`ConfigFile::load`]):
//!
//! ```toml
//! [database]
//! host = "localhost"
//! user = "app"
//! password = "${DB_PASSWORD}"
//! dbname = "demo"
//! ```
//!
//! `${VAR}` references in string values are replaced by the environment
//! variable's value when the file is loaded.

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Host, port, credentials and database name of the server to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub application_name: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: String::new(),
            application_name: None,
            connect_timeout_secs: None,
        }
    }
}

impl DbConfig {
    pub fn new(dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            ..Self::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Read `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD` and `DB_NAME`.
    ///
    /// Only `DB_NAME` is required; the others fall back to the defaults.
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| OrmError::config(format!("DB_PORT is not a port number: {port}")))?;
        }
        if let Some(user) = lookup("DB_USER") {
            config.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.password = password;
        }
        config.dbname = lookup("DB_NAME").ok_or_else(|| OrmError::config("DB_NAME is not set"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.host.trim().is_empty() {
            return Err(OrmError::config("database host is empty"));
        }
        if self.dbname.trim().is_empty() {
            return Err(OrmError::config("database name is empty"));
        }
        Ok(())
    }

    /// Driver configuration. The session always uses UTF-8.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname)
            .options("-c client_encoding=UTF8");
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        if let Some(name) = &self.application_name {
            pg.application_name(name);
        }
        if let Some(secs) = self.connect_timeout_secs {
            pg.connect_timeout(Duration::from_secs(secs));
        }
        pg
    }
}

/// Contents of a configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub database: DbConfig,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OrmError::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| OrmError::config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> OrmResult<Self> {
        let mut file: ConfigFile =
            toml::from_str(text).map_err(|e| OrmError::config(format!("invalid TOML: {e}")))?;
        file.expand_env()?;
        file.database.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self) -> OrmResult<()> {
        let db = &mut self.database;
        db.host = expand_env_vars(&db.host)?;
        db.user = expand_env_vars(&db.user)?;
        db.password = expand_env_vars(&db.password)?;
        db.dbname = expand_env_vars(&db.dbname)?;
        if let Some(name) = &mut db.application_name {
            *name = expand_env_vars(name)?;
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> OrmResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            out.push(c);
            continue;
        }
        chars.next();

        let mut key = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '}' {
                closed = true;
                break;
            }
            key.push(ch);
        }

        if !closed {
            return Err(OrmError::config(format!("unterminated reference ${{{key}")));
        }
        if key.is_empty() {
            return Err(OrmError::config("empty reference ${}"));
        }
        let value = std::env::var(&key)
            .map_err(|_| OrmError::config(format!("environment variable {key} is not set")))?;
        out.push_str(&value);
    }

    Ok(out)
}
