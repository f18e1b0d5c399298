use crate::archive::{ArchiveOptions, ArchiveStrategy, DEFAULT_COMPRESSION_LEVEL};
use crate::batch::BatchOptions;
use crate::resolver::DEFAULT_COUNTER_PADDING;
use crate::DEFAULT_TEMPLATE;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub template: String,
    pub counter_padding: usize,
    pub start_counter: u64,
    pub custom_text: String,
    pub preserve_extension: bool,
    pub compression_level: u32,
    pub include_manifest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_prefix: Option<String>,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            counter_padding: DEFAULT_COUNTER_PADDING,
            start_counter: 1,
            custom_text: String::new(),
            preserve_extension: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            include_manifest: true,
            folder_prefix: None,
            recursive_default: false,
            include_hidden_default: false,
        }
    }
}

impl AppConfig {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            start_counter: self.start_counter,
            counter_padding: self.counter_padding,
            custom_text: self.custom_text.clone(),
            fallback_date: None,
            preserve_extension: self.preserve_extension,
        }
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            compression_level: self.compression_level,
            include_manifest: self.include_manifest,
            folder_prefix: self.folder_prefix.clone(),
            strategy: ArchiveStrategy::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "photo-renamer", "photo-renamer")
        .context("could not resolve the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&app_paths()?.config_path)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&app_paths()?.config_path, config)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("could not serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("could not write config file: {}", path.display()))?;
    Ok(())
}
