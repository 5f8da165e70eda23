//! Configuration module for newsreact.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: model artifacts, market data, and the explainer.

mod explainer_env_config;
mod market_data_env_config;
mod model_env_config;

pub use explainer_env_config::ExplainerEnvConfig;
pub use market_data_env_config::MarketDataEnvConfig;
pub use model_env_config::ModelEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Market data provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Yahoo,
    Csv,
    Mock,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(Mode::Yahoo),
            "csv" => Ok(Mode::Csv),
            "mock" => Ok(Mode::Mock),
            _ => anyhow::bail!(
                "Invalid MARKET_DATA_MODE: {}. Must be 'yahoo', 'csv', or 'mock'",
                s
            ),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Yahoo => write!(f, "yahoo"),
            Mode::Csv => write!(f, "csv"),
            Mode::Mock => write!(f, "mock"),
        }
    }
}

/// Key/value source the sub-configs read from.
pub(crate) type VarSource<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn var_or(source: VarSource<'_>, key: &str, default: &str) -> String {
    source(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_var<T>(source: VarSource<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(source, key, &default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelEnvConfig,
    pub market_data: MarketDataEnvConfig,
    pub explainer: ExplainerEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_source(source: VarSource<'_>) -> Result<Self> {
        Ok(Self {
            model: ModelEnvConfig::from_source(source),
            market_data: MarketDataEnvConfig::from_source(source)
                .context("Failed to load market data config")?,
            explainer: ExplainerEnvConfig::from_source(source)
                .context("Failed to load explainer config")?,
        })
    }
}
