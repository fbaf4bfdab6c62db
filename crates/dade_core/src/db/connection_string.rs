//! Connection string parsing and validation.
//!
//! # Responsibility
//! - Turn an ADO-style `key=value;...` string into typed settings.
//! - Reject invalid configuration before any connection is attempted.
//!
//! # Invariants
//! - A parsed `ConnectionSettings` always carries a non-empty data source.
//! - Parsing is pure: no file-system or database access.

use rusqlite::OpenFlags;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration error raised while validating a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Empty,
    MissingDataSource,
    MalformedSegment(String),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "connection string cannot be empty"),
            Self::MissingDataSource => write!(f, "connection string has no `Data Source`"),
            Self::MalformedSegment(segment) => {
                write!(f, "malformed connection string segment `{segment}`")
            }
            Self::UnknownKey(key) => write!(f, "unknown connection string key `{key}`"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for connection string key `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// How the database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    ReadWriteCreate,
    ReadWrite,
    ReadOnly,
}

/// Locking behavior used when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeginMode {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl BeginMode {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED;",
            Self::Immediate => "BEGIN IMMEDIATE;",
            Self::Exclusive => "BEGIN EXCLUSIVE;",
        }
    }
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    data_source: String,
    mode: OpenMode,
    busy_timeout: Duration,
    foreign_keys: bool,
    begin_mode: BeginMode,
}

impl ConnectionSettings {
    /// Parses and validates a connection string.
    ///
    /// A string without any `=` is taken as a bare data source, so
    /// `"app.db"` and `"Data Source=app.db"` are equivalent.
    ///
    /// # Errors
    /// - `ConfigError::Empty` for empty or whitespace-only input.
    /// - `ConfigError::MissingDataSource` when no data source is named.
    /// - `ConfigError::UnknownKey`, `MalformedSegment` or `InvalidValue` for
    ///   anything that cannot be interpreted.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Empty);
        }

        if !trimmed.contains('=') && !trimmed.contains(';') {
            return Ok(Self::with_data_source(trimmed));
        }

        let mut data_source = None;
        let mut settings = Self::with_data_source("");

        for segment in split_segments(trimmed) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (raw_key, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedSegment(segment.to_string()))?;
            let key = normalize_key(raw_key);
            let value = unquote(raw_value.trim());

            match key.as_str() {
                "datasource" | "filename" => {
                    if value.is_empty() {
                        return Err(ConfigError::MissingDataSource);
                    }
                    data_source = Some(value.to_string());
                }
                "mode" => settings.mode = parse_mode(raw_key, value)?,
                "busytimeout" => {
                    let millis = value.parse::<u64>().map_err(|_| invalid(raw_key, value))?;
                    settings.busy_timeout = Duration::from_millis(millis);
                }
                "foreignkeys" => settings.foreign_keys = parse_bool(raw_key, value)?,
                "transactionbehavior" => settings.begin_mode = parse_begin_mode(raw_key, value)?,
                _ => return Err(ConfigError::UnknownKey(raw_key.trim().to_string())),
            }
        }

        settings.data_source = data_source.ok_or(ConfigError::MissingDataSource)?;
        Ok(settings)
    }

    fn with_data_source(data_source: &str) -> Self {
        Self {
            data_source: data_source.to_string(),
            mode: OpenMode::default(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            foreign_keys: true,
            begin_mode: BeginMode::default(),
        }
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys
    }

    pub fn begin_mode(&self) -> BeginMode {
        self.begin_mode
    }

    /// SQLite open flags matching the configured mode.
    pub fn open_flags(&self) -> OpenFlags {
        let access = match self.mode {
            OpenMode::ReadWriteCreate => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        };
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }

    /// Short label for log events; never includes the data source path.
    pub(crate) fn mode_label(&self) -> &'static str {
        if self.data_source == ":memory:" {
            return "memory";
        }
        match self.mode {
            OpenMode::ReadWriteCreate => "file",
            OpenMode::ReadWrite => "file_rw",
            OpenMode::ReadOnly => "file_ro",
        }
    }
}

impl FromStr for ConnectionSettings {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Splits on `;` outside double quotes.
fn split_segments(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (index, ch) in input.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                segments.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.trim().to_string(),
        value: value.to_string(),
    }
}

fn parse_mode(key: &str, value: &str) -> Result<OpenMode, ConfigError> {
    match normalize_key(value).as_str() {
        "readwritecreate" => Ok(OpenMode::ReadWriteCreate),
        "readwrite" => Ok(OpenMode::ReadWrite),
        "readonly" => Ok(OpenMode::ReadOnly),
        _ => Err(invalid(key, value)),
    }
}

fn parse_begin_mode(key: &str, value: &str) -> Result<BeginMode, ConfigError> {
    match normalize_key(value).as_str() {
        "deferred" => Ok(BeginMode::Deferred),
        "immediate" => Ok(BeginMode::Immediate),
        "exclusive" => Ok(BeginMode::Exclusive),
        _ => Err(invalid(key, value)),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
