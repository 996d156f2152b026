//! Configuration for the feditil CLI
//!
//! Settings are read from `$XDG_CONFIG_HOME/feditil/config.toml` (or the file
//! given with `--config`) and then overridden by command-line flags.

use feditil::{ClientConfig, ResolverConfig};
use miette::{Context, IntoDiagnostic, Result, miette};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeditilConfig {
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent sent with actor requests
    pub user_agent: String,
    /// Run WebFinger discovery over plain http
    pub insecure_http: bool,
    /// How many identifiers are resolved at the same time
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            insecure_http: false,
            concurrency: 4,
        }
    }
}

/// Values given on the command line; `None`/`false` leaves the file's setting alone
#[derive(Debug, Default)]
pub struct Overrides {
    pub user_agent: Option<String>,
    pub insecure_http: bool,
    pub concurrency: Option<usize>,
}

impl FeditilConfig {
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(user_agent) = overrides.user_agent {
            self.http.user_agent = user_agent;
        }
        self.http.insecure_http |= overrides.insecure_http;
        if let Some(concurrency) = overrides.concurrency {
            self.http.concurrency = concurrency;
        }
        self
    }

    pub fn concurrency(&self) -> usize {
        self.http.concurrency.max(1)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            client: ClientConfig {
                user_agent: self.http.user_agent.clone(),
                ..ClientConfig::default()
            },
            insecure_http: self.http.insecure_http,
        }
    }
}

/// Returns the path to the default config file: `$XDG_CONFIG_HOME/feditil/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("feditil").join("config.toml"))
}

/// Load the configuration.
///
/// An explicitly given file must exist. The default file is optional and
/// defaults are used when it is missing.
pub fn load_config(explicit: Option<&Path>) -> Result<FeditilConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(miette!(
                    help = "Pass an existing file to --config or unset FEDITIL_CONFIG",
                    "Config file {} does not exist",
                    path.display()
                ));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FeditilConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read config file at {}", path.display()))?;
    parse_config(&contents)
        .wrap_err_with(|| format!("Failed to parse config file at {}", path.display()))
}

fn parse_config(contents: &str) -> Result<FeditilConfig> {
    toml::from_str(contents).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, FeditilConfig::default());
        assert_eq!(config.http.user_agent, "");
        assert_eq!(config.concurrency(), 4);
    }

    #[test]
    fn test_partial_http_table() {
        let config = parse_config("[http]\ninsecure_http = true\n").unwrap();
        assert!(config.http.insecure_http);
        assert_eq!(config.http.concurrency, 4);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(parse_config("[http]\nconcurrency = \"many\"\n").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let config = parse_config("[http]\nuser_agent = \"from-file\"\nconcurrency = 8\n")
            .unwrap()
            .apply(Overrides {
                user_agent: Some("from-flag".to_string()),
                insecure_http: true,
                concurrency: None,
            });

        assert_eq!(config.http.user_agent, "from-flag");
        assert!(config.http.insecure_http);
        assert_eq!(config.concurrency(), 8);

        let resolver = config.resolver_config();
        assert_eq!(resolver.client.user_agent, "from-flag");
        assert_eq!(resolver.client.accept, feditil::ACTIVITYPUB_CONTENT_TYPE);
        assert!(resolver.insecure_http);
    }

    #[test]
    fn test_zero_concurrency_still_makes_progress() {
        let config = FeditilConfig::default().apply(Overrides {
            concurrency: Some(0),
            ..Overrides::default()
        });
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_missing_explicit_file() {
        let missing = Path::new("/nonexistent/feditil/config.toml");
        assert!(load_config(Some(missing)).is_err());
    }
}
