use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub user: String,
    pub email: Option<String>,
    pub credentials_path: Option<String>,
    pub delete_by_default: bool,
    pub prompt_for_delete: bool,
    pub prompt_for_tags: bool,
    pub store_directory: String,
    pub max_upload_bytes: u64,
    pub download_directory: String,
    pub allowed_extensions: HashSet<String>,
    pub list_style: String,
    pub delimiter: String,
    pub use_regex: bool,
}

impl AppConfig {
    pub fn new(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("log_level", "info")?
            .set_default("user", "default")?
            .set_default("delete_by_default", false)?
            .set_default("prompt_for_delete", true)?
            .set_default("prompt_for_tags", false)?
            .set_default("store_directory", "store")?
            .set_default("max_upload_bytes", 20_i64 * 1024 * 1024)?
            .set_default("download_directory", ".")?
            .set_default("allowed_extensions", vec!["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff"])?
            .set_default("list_style", "title,start,end,where")?
            .set_default("delimiter", ",")?
            .set_default("use_regex", false)?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(
                Environment::with_prefix("GOOGLECL")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_extensions"),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn list_style(&self) -> Vec<String> {
        self.list_style
            .split(',')
            .map(|field| field.trim().to_owned())
            .filter(|field| !field.is_empty())
            .collect()
    }
}
