use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of a login session token, in days.
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

fn default_token_ttl_days() -> i64 {
    7
}

/// Listing behaviour for post pages.
#[derive(Debug, Deserialize, Clone)]
pub struct PostsConfig {
    /// Posts per page on every paginated listing.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// How long a rendered index page stays in the cache.
    #[serde(default = "default_index_cache_seconds")]
    pub index_cache_seconds: u64,
    /// Key prefix for cached index pages.
    #[serde(default = "default_index_cache_prefix")]
    pub index_cache_prefix: String,
}

fn default_per_page() -> u64 {
    10
}
fn default_index_cache_seconds() -> u64 {
    20
}
fn default_index_cache_prefix() -> String {
    "index_page".into()
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            index_cache_seconds: default_index_cache_seconds(),
            index_cache_prefix: default_index_cache_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Directory that uploaded images are written under.
    pub root: PathBuf,
    /// Maximum accepted image size in bytes.
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
}

fn default_max_image_size() -> u64 {
    5 * 1024 * 1024
}

/// A group created on startup if its slug does not exist yet.
#[derive(Debug, Deserialize, Clone)]
pub struct SeedGroup {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub groups: Vec<SeedGroup>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("database.url", "sqlite://yatube.sqlite3?mode=rwc")?
            .set_default("media.root", "./media")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., YATUBE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("YATUBE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
