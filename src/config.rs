use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use clap::Parser;
use serde::Deserialize;

use crate::admin::AdminCommand;
use crate::error::AppError;
use crate::helpers::{parse_checkpoints, parse_duration};

pub(crate) const DEFAULT_WEATHER_PHRASE: &str = "какая погода";
pub(crate) const DEFAULT_CONTENT_PHRASE: &str = "хочу анекдот";
pub(crate) const DEFAULT_WEATHER_FAILURE_REPLY: &str =
    "Извините, не удалось получить данные о погоде. Попробуйте позже.";

#[derive(Parser)]
#[command(name = "jokebot", about = "Keyword-triggered Signal bot with scheduled broadcasts")]
pub(crate) struct Args {
    /// signal-cli-api base URL
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "JOKEBOT_API_URL")]
    pub(crate) api_url: String,

    /// Signal account number the bot runs as (e.g., +7...)
    #[arg(long, env = "JOKEBOT_ACCOUNT")]
    pub(crate) account: Option<String>,

    /// SQLite database with triggers, responses and jokes
    #[arg(long, env = "JOKEBOT_DB_PATH")]
    pub(crate) db_path: Option<PathBuf>,

    /// weatherapi.com API key
    #[arg(long, env = "JOKEBOT_WEATHER_API_KEY")]
    pub(crate) weather_api_key: Option<String>,

    /// Weather API base URL
    #[arg(long, default_value = crate::weather::DEFAULT_WEATHER_URL, env = "JOKEBOT_WEATHER_URL")]
    pub(crate) weather_url: String,

    /// City used for weather lookups
    #[arg(long, default_value = "Krasnodar", env = "JOKEBOT_CITY")]
    pub(crate) city: String,

    /// Language of weather descriptions
    #[arg(long, default_value = "ru", env = "JOKEBOT_WEATHER_LANG")]
    pub(crate) weather_lang: String,

    /// Comma-separated daily weather broadcast times (HH:MM, local time)
    #[arg(long, default_value = "09:00,14:00,19:00", env = "JOKEBOT_CHECKPOINTS")]
    pub(crate) checkpoints: String,

    /// Period between joke broadcasts (e.g., 30m, 3h, 1d)
    #[arg(long, default_value = "3h", env = "JOKEBOT_BROADCAST_INTERVAL")]
    pub(crate) broadcast_interval: String,

    /// Fixed seed for response selection (random if unset)
    #[arg(long, env = "JOKEBOT_SEED")]
    pub(crate) seed: Option<u64>,

    /// Optional JSON/YAML file with reserved phrases and checkpoints
    #[arg(long, env = "JOKEBOT_CONFIG")]
    pub(crate) config: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Option<AdminCommand>,
}

/// What a reserved phrase does instead of generic trigger matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReservedAction {
    Weather,
    RandomContent,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReservedPhrase {
    /// Lower-cased at load time.
    pub(crate) phrase: String,
    pub(crate) action: ReservedAction,
}

/// Optional overrides loaded from `--config`.
#[derive(Deserialize, Default, Debug)]
pub(crate) struct FileConfig {
    #[serde(default)]
    pub(crate) weather_phrases: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) random_content_phrases: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) weather_failure_reply: Option<String>,
    #[serde(default)]
    pub(crate) checkpoints: Option<Vec<String>>,
}

/// Immutable configuration set at startup from CLI args and the config file.
#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) api_url: String,
    pub(crate) account: String,
    pub(crate) db_path: PathBuf,
    pub(crate) weather_api_key: Option<String>,
    pub(crate) weather_url: String,
    pub(crate) city: String,
    pub(crate) weather_lang: String,
    pub(crate) checkpoints: Vec<NaiveTime>,
    pub(crate) broadcast_interval: Duration,
    pub(crate) seed: Option<u64>,
    /// Checked in order before trigger matching.
    pub(crate) reserved_phrases: Vec<ReservedPhrase>,
    pub(crate) weather_failure_reply: String,
}

pub(crate) fn config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("jokebot")
}

pub(crate) fn default_db_path() -> PathBuf {
    config_dir().join("jokebot.db")
}

pub(crate) fn load_config_file(path: &str) -> Result<FileConfig, AppError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config file {path}: {e}")))?;
    let parsed = if path.ends_with(".yaml") || path.ends_with(".yml") {
        serde_yaml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {path}: {e}")))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {path}: {e}")))?
    };
    Ok(parsed)
}

fn phrases(
    list: Option<Vec<String>>,
    default: &str,
    action: ReservedAction,
) -> Vec<ReservedPhrase> {
    list.unwrap_or_else(|| vec![default.to_string()])
        .into_iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .map(|phrase| ReservedPhrase { phrase, action })
        .collect()
}

impl Config {
    pub(crate) fn from_args(args: &Args) -> Result<Self, AppError> {
        let file = match args.config.as_deref() {
            Some(path) => load_config_file(path)?,
            None => FileConfig::default(),
        };
        Self::build(args, file)
    }

    pub(crate) fn build(args: &Args, file: FileConfig) -> Result<Self, AppError> {
        let account = args
            .account
            .clone()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| AppError::Config("--account (JOKEBOT_ACCOUNT) is required".to_string()))?;

        let checkpoints_raw = match file.checkpoints {
            Some(list) => list.join(","),
            None => args.checkpoints.clone(),
        };
        let checkpoints = parse_checkpoints(&checkpoints_raw).ok_or_else(|| {
            AppError::Config(format!("invalid checkpoints {checkpoints_raw:?}, expected HH:MM,..."))
        })?;

        let broadcast_interval = parse_duration(&args.broadcast_interval).ok_or_else(|| {
            AppError::Config(format!(
                "invalid broadcast interval {:?}, expected e.g. 30m, 3h, 1d",
                args.broadcast_interval
            ))
        })?;

        let mut reserved_phrases = phrases(
            file.weather_phrases,
            DEFAULT_WEATHER_PHRASE,
            ReservedAction::Weather,
        );
        reserved_phrases.extend(phrases(
            file.random_content_phrases,
            DEFAULT_CONTENT_PHRASE,
            ReservedAction::RandomContent,
        ));

        Ok(Self {
            api_url: args.api_url.trim_end_matches('/').to_string(),
            account,
            db_path: args.db_path.clone().unwrap_or_else(default_db_path),
            weather_api_key: args.weather_api_key.clone().filter(|k| !k.is_empty()),
            weather_url: args.weather_url.clone(),
            city: args.city.clone(),
            weather_lang: args.weather_lang.clone(),
            checkpoints,
            broadcast_interval,
            seed: args.seed,
            reserved_phrases,
            weather_failure_reply: file
                .weather_failure_reply
                .unwrap_or_else(|| DEFAULT_WEATHER_FAILURE_REPLY.to_string()),
        })
    }
}
