use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_URL: &str = "sqlite://drill.sqlite3";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidPort { raw: String },
    InvalidHost { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidHost { raw } => write!(f, "invalid --host value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    /// Apply schema migrations and exit.
    Migrate,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "migrate" => Some(Self::Migrate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    /// Reads `DRILL_DB_URL`, `HOST`, `PORT` and `RUST_LOG`. Unparseable values fall back
    /// to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_url = lookup("DRILL_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| normalize_sqlite_url(DEFAULT_DB_URL), |v| normalize_sqlite_url(&v));

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let host = lookup("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            db_url,
            host,
            port,
            log_level,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Applies the subcommand and flags on top of `self`.
    pub fn apply_args(
        mut self,
        args: impl IntoIterator<Item = String>,
    ) -> Result<(Command, Self), ArgsError> {
        let mut args = args.into_iter().peekable();

        let command = match args.peek().map(String::as_str) {
            None => Command::Serve,
            Some(first) if first.starts_with('-') => Command::Serve,
            Some(first) => {
                let command = Command::from_arg(first)
                    .ok_or_else(|| ArgsError::UnknownCommand(first.to_string()))?;
                args.next();
                command
            }
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    self.db_url = normalize_sqlite_url(&value);
                }
                "--host" => {
                    let value = require_value(&mut args, "--host")?;
                    self.host = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidHost { raw: value.clone() })?;
                }
                "--port" => {
                    let value = require_value(&mut args, "--port")?;
                    self.port = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
                }
                "--help" | "-h" => return Ok((Command::Help, self)),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok((command, self))
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  drill [serve]  [--db <sqlite_url>] [--host <ip>] [--port <port>]");
    eprintln!("  drill migrate  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --host 0.0.0.0");
    eprintln!("  --port {DEFAULT_PORT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRILL_DB_URL, HOST, PORT, RUST_LOG, ENABLE_FILE_LOGS, LOG_DIR");
}

/// Turns relative file URLs into absolute `sqlite://` URLs. In-memory URLs pass through.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:") || trimmed.contains("mode=memory") {
        return trimmed.to_string();
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directory so the first connect succeeds.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn base() -> Config {
        Config::from_lookup(|_| None)
    }

    #[test]
    fn env_defaults() {
        let config = base();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
        assert!(config.db_url.starts_with("sqlite:///"));
        assert!(config.db_url.ends_with("drill.sqlite3"));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("8080".into()),
            "HOST" => Some("127.0.0.1".into()),
            "DRILL_DB_URL" => Some("sqlite::memory:".into()),
            "RUST_LOG" => Some("debug".into()),
            _ => None,
        });
        assert_eq!(config.bind_addr(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_env_port_falls_back() {
        let config = Config::from_lookup(|key| (key == "PORT").then(|| "nope".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn flags_override_env() {
        let (command, config) = base()
            .apply_args(args(&["--port", "4000", "--db", "sqlite::memory:"]))
            .unwrap();
        assert_eq!(command, Command::Serve);
        assert_eq!(config.port, 4000);
        assert_eq!(config.db_url, "sqlite::memory:");
    }

    #[test]
    fn subcommands_are_recognized() {
        let (command, _) = base().apply_args(args(&["migrate"])).unwrap();
        assert_eq!(command, Command::Migrate);
        let (command, _) = base().apply_args(args(&["serve", "--help"])).unwrap();
        assert_eq!(command, Command::Help);
        assert_eq!(
            base().apply_args(args(&["seed"])).unwrap_err(),
            ArgsError::UnknownCommand("seed".into())
        );
    }

    #[test]
    fn malformed_flags_are_errors() {
        assert_eq!(
            base().apply_args(args(&["--port"])).unwrap_err(),
            ArgsError::MissingValue { flag: "--port" }
        );
        assert!(matches!(
            base().apply_args(args(&["--port", "99999"])),
            Err(ArgsError::InvalidPort { .. })
        ));
        assert!(matches!(
            base().apply_args(args(&["--verbose"])),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn relative_urls_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/drill.db");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/drill.db"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }
}
