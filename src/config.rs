use crate::slots::id::HolderId;
use std::path::{Path, PathBuf};

const DEFAULT_CACHE_HOLDERS: usize = 64;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub root: PathBuf,
    pub holders: Vec<HolderId>,
    pub cache_holders: usize,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        Self::from_args_with_env(args, |key| std::env::var(key).ok())
    }

    pub fn from_args_with_env(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: slotkeeper <store-root> [holder ...]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let holders = args[2..]
            .iter()
            .map(|arg| arg.parse::<HolderId>())
            .collect::<Result<Vec<_>, _>>()?;
        let cache_holders = match non_empty(env("SLOTKEEPER_CACHE_HOLDERS")) {
            Some(value) => match value.parse::<usize>() {
                Ok(parsed) if parsed > 0 => parsed,
                _ => {
                    eprintln!(
                        "slotkeeper: invalid SLOTKEEPER_CACHE_HOLDERS '{}', using {}",
                        value, DEFAULT_CACHE_HOLDERS
                    );
                    DEFAULT_CACHE_HOLDERS
                }
            },
            None => DEFAULT_CACHE_HOLDERS,
        };
        let log_level = non_empty(env("SLOTKEEPER_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        Ok(Self {
            root,
            holders,
            cache_holders,
            log_level,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
