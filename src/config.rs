use crate::aggregate::DEFAULT_REPORT_YEAR;
use crate::error::{Error, Result};
use std::time::Duration;

/// Runtime settings of the dashboard server
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Year BULAN labels are placed in on the growth chart
    pub report_year: i32,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    /// Directory served under `/static`
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            report_year: DEFAULT_REPORT_YEAR,
            max_upload_bytes: 20 * 1024 * 1024,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            static_dir: "static".to_string(),
        }
    }
}

impl Config {
    /// Parses `--flag value` pairs, starting from the defaults
    ///
    /// The first item is the program name and is skipped.
    ///
    /// # Examples
    /// ```
    /// use asset_dashboard::config::Config;
    ///
    /// let args = ["asset-dashboard", "--port", "8080"].map(String::from);
    /// let config = Config::from_args(args).unwrap();
    /// assert_eq!(config.port, 8080);
    /// assert_eq!(config.host, "127.0.0.1");
    /// ```
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config = Config::default();
        let mut args = args.into_iter().skip(1);

        while let Some(flag) = args.next() {
            let value = args
                .next()
                .ok_or_else(|| Error::InvalidInput(format!("Missing value for {}", flag)))?;

            match flag.as_str() {
                "--host" => config.host = value,
                "--port" => config.port = parse(&flag, &value)?,
                "--year" => config.report_year = parse(&flag, &value)?,
                "--max-upload-mb" => {
                    config.max_upload_bytes = parse::<usize>(&flag, &value)?
                        .checked_mul(1024 * 1024)
                        .ok_or_else(|| too_large(&flag, &value))?
                }
                "--session-ttl-mins" => {
                    let secs = parse::<u64>(&flag, &value)?
                        .checked_mul(60)
                        .ok_or_else(|| too_large(&flag, &value))?;
                    config.session_ttl = Duration::from_secs(secs)
                }
                "--static-dir" => config.static_dir = value,
                _ => return Err(Error::InvalidInput(format!("Unknown option: {}", flag))),
            }
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Invalid value for {}: {}", flag, value)))
}

fn too_large(flag: &str, value: &str) -> Error {
    Error::InvalidInput(format!("Value for {} is too large: {}", flag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        std::iter::once("asset-dashboard")
            .chain(items.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_flags() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn every_flag_is_applied() {
        let config = Config::from_args(args(&[
            "--host",
            "0.0.0.0",
            "--port",
            "8501",
            "--year",
            "2025",
            "--max-upload-mb",
            "5",
            "--session-ttl-mins",
            "30",
            "--static-dir",
            "public",
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8501");
        assert_eq!(config.report_year, 2025);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.static_dir, "public");
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(Config::from_args(args(&["--port", "http"])).is_err());
        assert!(Config::from_args(args(&["--port"])).is_err());
        assert!(Config::from_args(args(&["--verbose", "1"])).is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let max = u64::MAX.to_string();
        let err = Config::from_args(args(&["--session-ttl-mins", max.as_str()])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("too large")));

        let max = usize::MAX.to_string();
        let err = Config::from_args(args(&["--max-upload-mb", max.as_str()])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("too large")));
    }
}
