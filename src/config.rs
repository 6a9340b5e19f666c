use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: String,
    pub server_addr: String,
    /// Session token lifetime in seconds.
    pub access_token_ttl: i64,
    pub email_domain: String,

    // Rate limiting, 0 disables
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr: or_default("SERVER_ADDR", "127.0.0.1:8080"),
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", "28800") // 8 hours
                .parse()
                .context("ACCESS_TOKEN_TTL must be a number of seconds")?,
            email_domain: or_default("EMAIL_DOMAIN", "gasc.edu"),

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", "60")
                .parse()
                .context("RATE_LOGIN_PER_MIN must be a number")?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", "1000")
                .parse()
                .context("RATE_PROTECTED_PER_MIN must be a number")?,

            api_prefix: or_default("API_PREFIX", "/api"),
            log_dir: or_default("LOG_DIR", "logs"),
        })
    }

    /// Backend login email for a username.
    pub fn email_for(&self, username: &str) -> String {
        format!("{}@{}", username.trim(), self.email_domain)
    }
}
