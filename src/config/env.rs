//! Environment overrides for `SearchConfig`
//!
//! Every setting can be replaced by a `SEARCHD_*` variable. Durations given as
//! a bare integer are seconds; otherwise a unit suffix (`ms`, `s`, `m`, `h`) is
//! required. String values prefixed with `secret:` name a file, relative to
//! `SEARCHD_SECRETS_DIR`, whose content is used instead.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tantivy::tokenizer::Language;

use super::builder::SearchConfigBuilder;
use super::types::{DEFAULT_SECRETS_DIR, SearchConfig};
use crate::search::errors::{SearchError, SearchResult};

const ENV_PREFIX: &str = "SEARCHD_";
const SECRET_PREFIX: &str = "secret:";

/// Parse a duration: bare integers are seconds, otherwise `<n>ms|s|m|h`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("invalid duration {value:?}"))?;
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("invalid duration {value:?}: missing amount"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        "h" => Ok(Duration::from_secs(amount * 3600)),
        other => Err(format!("invalid duration {value:?}: unknown unit {other:?}")),
    }
}

/// Parse an analyzer language by English name or ISO 639-1 code
pub fn parse_language(value: &str) -> Result<Language, String> {
    let language = match value.trim().to_ascii_lowercase().as_str() {
        "ar" | "arabic" => Language::Arabic,
        "da" | "danish" => Language::Danish,
        "nl" | "dutch" => Language::Dutch,
        "en" | "english" => Language::English,
        "fi" | "finnish" => Language::Finnish,
        "fr" | "french" => Language::French,
        "de" | "german" => Language::German,
        "el" | "greek" => Language::Greek,
        "hu" | "hungarian" => Language::Hungarian,
        "it" | "italian" => Language::Italian,
        "no" | "norwegian" => Language::Norwegian,
        "pt" | "portuguese" => Language::Portuguese,
        "ro" | "romanian" => Language::Romanian,
        "ru" | "russian" => Language::Russian,
        "es" | "spanish" => Language::Spanish,
        "sv" | "swedish" => Language::Swedish,
        "ta" | "tamil" => Language::Tamil,
        "tr" | "turkish" => Language::Turkish,
        other => return Err(format!("unsupported language {other:?}")),
    };
    Ok(language)
}

/// Resolve a `secret:<file>` value to the content of that file
fn resolve_secret(value: String, secrets_dir: &Path) -> Result<String, String> {
    let Some(file) = value.strip_prefix(SECRET_PREFIX) else {
        return Ok(value);
    };
    let path = secrets_dir.join(file);
    std::fs::read_to_string(&path)
        .map(|content| content.trim_end_matches(['\r', '\n']).to_string())
        .map_err(|e| format!("reading secret {}: {e}", path.display()))
}

/// Looks up `SEARCHD_<name>` and wraps parse failures with the variable name
struct EnvReader<F> {
    lookup: F,
    secrets_dir: PathBuf,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<(String, String)> {
        let key = format!("{ENV_PREFIX}{name}");
        (self.lookup)(&key).map(|value| (key, value))
    }

    fn parsed<T>(
        &self,
        name: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> SearchResult<Option<T>> {
        let Some((key, value)) = self.raw(name) else {
            return Ok(None);
        };
        parse(&value)
            .map(Some)
            .map_err(|e| SearchError::Config(format!("parsing env var {key:?} failed: {e}")))
    }

    fn number<T>(&self, name: &str) -> SearchResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parsed(name, |v| v.trim().parse::<T>().map_err(|e| e.to_string()))
    }

    fn string(&self, name: &str) -> SearchResult<Option<String>> {
        self.parsed(name, |v| resolve_secret(v.to_string(), &self.secrets_dir))
    }
}

impl SearchConfig {
    /// Default configuration overridden by the process environment
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Config` naming the first variable that fails to
    /// parse, or when the resulting configuration does not validate.
    pub fn from_env() -> SearchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Default configuration overridden by the variables `lookup` returns
    ///
    /// # Errors
    ///
    /// See [`SearchConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> SearchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets_dir = lookup(&format!("{ENV_PREFIX}SECRETS_DIR"))
            .map_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR), PathBuf::from);
        let env = EnvReader {
            lookup,
            secrets_dir,
        };

        let mut builder = SearchConfig::builder();
        builder = apply(builder, env.number("MAX_QUEUED")?, SearchConfigBuilder::max_queued);
        builder = apply(builder, env.parsed("INDEX_AGE", parse_duration)?, SearchConfigBuilder::min_sync_age);
        builder = apply(builder, env.string("INDEX_PATH")?, SearchConfigBuilder::index_path);
        builder = apply(builder, env.number("INDEX_BATCH")?, SearchConfigBuilder::batch_size);
        builder = apply(
            builder,
            env.parsed("INDEX_UPDATE_INTERVAL", parse_duration)?,
            SearchConfigBuilder::refresh_interval,
        );
        builder = apply(builder, env.number("MAX_RESULTS")?, SearchConfigBuilder::max_results);
        builder = apply(builder, env.parsed("LANGUAGE", parse_language)?, SearchConfigBuilder::language);
        builder = apply(builder, env.number("WRITER_MEMORY")?, SearchConfigBuilder::writer_memory);
        builder = apply(builder, env.string("SCHEMA_FILE")?, SearchConfigBuilder::schema_file);
        builder = apply(builder, env.string("DB")?, SearchConfigBuilder::db_name);
        builder = apply(builder, env.string("DB_USER")?, SearchConfigBuilder::db_user);
        builder = apply(builder, env.string("DB_PASSWORD")?, SearchConfigBuilder::db_password);
        builder = apply(builder, env.string("DB_HOST")?, SearchConfigBuilder::db_host);
        builder = apply(builder, env.number("DB_PORT")?, SearchConfigBuilder::db_port);

        builder.build()
    }
}

fn apply<T>(
    builder: SearchConfigBuilder,
    value: Option<T>,
    set: impl FnOnce(SearchConfigBuilder, T) -> SearchConfigBuilder,
) -> SearchConfigBuilder {
    match value {
        Some(value) => set(builder, value),
        None => builder,
    }
}
