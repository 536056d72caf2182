use crate::profile::{Profile, UnknownProfile};
use crate::t5::T5Options;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_DIR: &str = "models/t5-small";
pub const DEFAULT_PREFIX: &str = "summarize: ";

pub const ENV_HOST: &str = "SUMMARIZER_HOST";
pub const ENV_PORT: &str = "SUMMARIZER_PORT";
pub const ENV_MODE: &str = "SUMMARIZER_ENV";
pub const ENV_PROFILE: &str = "SUMMARIZER_PROFILE";
pub const ENV_MODEL_DIR: &str = "SUMMARIZER_MODEL_DIR";
pub const ENV_PREFIX: &str = "SUMMARIZER_PREFIX";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SUMMARIZER_PROFILE: {0}")]
    Profile(#[from] UnknownProfile),
}

/// Values given on the command line. Each one that is set wins over its
/// environment variable, which is then not read at all.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub profile: Option<Profile>,
    pub model_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub cpu: bool,
    pub debug: bool,
}

/// Process-level settings, resolved from command-line flags first, then the
/// environment, then fixed fallbacks.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub profile: Profile,
    pub model: T5Options,
}

/// Whether verbose logging is on. Needs no other configuration, so the
/// logger can be set up before the rest is resolved.
pub fn debug_enabled<F>(cli_debug: bool, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    cli_debug || lookup(ENV_MODE).is_some_and(|mode| mode == "development")
}

impl ServerConfig {
    pub fn resolve(cli: CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(cli: CliOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match (cli.port, lookup(ENV_PORT)) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid {}={:?}, using {}", ENV_PORT, raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            (None, None) => DEFAULT_PORT,
        };
        let profile = match (cli.profile, lookup(ENV_PROFILE)) {
            (Some(profile), _) => profile,
            (None, Some(raw)) => raw.parse()?,
            (None, None) => Profile::default(),
        };

        Ok(Self {
            host: cli
                .host
                .or_else(|| lookup(ENV_HOST))
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            debug: debug_enabled(cli.debug, &lookup),
            profile,
            model: T5Options {
                model_dir: cli
                    .model_dir
                    .or_else(|| lookup(ENV_MODEL_DIR).map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
                prefix: cli
                    .prefix
                    .or_else(|| lookup(ENV_PREFIX))
                    .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
                cpu: cli.cpu,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn env_only(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        ServerConfig::resolve_with(CliOverrides::default(), lookup(vars))
    }

    #[test]
    fn defaults_without_environment() {
        let config = env_only(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:5000");
        assert!(!config.debug);
        assert_eq!(config.profile, Profile::Quality);
        assert_eq!(config.model.model_dir, PathBuf::from("models/t5-small"));
        assert_eq!(config.model.prefix, "summarize: ");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = env_only(&[
            (ENV_HOST, "127.0.0.1"),
            (ENV_PORT, "8080"),
            (ENV_MODE, "development"),
            (ENV_PROFILE, "fast"),
            (ENV_MODEL_DIR, "/models/flan-t5"),
            (ENV_PREFIX, ""),
        ])
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert!(config.debug);
        assert_eq!(config.profile, Profile::Fast);
        assert_eq!(config.model.model_dir, PathBuf::from("/models/flan-t5"));
        assert_eq!(config.model.prefix, "");
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config = env_only(&[(ENV_PORT, "http")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn only_development_mode_enables_debug() {
        let config = env_only(&[(ENV_MODE, "production")]).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = env_only(&[(ENV_PROFILE, "turbo")]).unwrap_err();
        assert!(err.to_string().contains("unknown profile 'turbo'"));
    }

    #[test]
    fn command_line_wins_over_environment() {
        let cli = CliOverrides {
            host: Some("localhost".to_string()),
            port: Some(9000),
            profile: Some(Profile::Fast),
            prefix: Some("tl;dr: ".to_string()),
            cpu: true,
            ..Default::default()
        };
        let config = ServerConfig::resolve_with(
            cli,
            lookup(&[
                (ENV_HOST, "127.0.0.1"),
                (ENV_PORT, "8080"),
                (ENV_PREFIX, "summarize: "),
                (ENV_MODEL_DIR, "/models/flan-t5"),
            ]),
        )
        .unwrap();
        assert_eq!(config.addr(), "localhost:9000");
        assert_eq!(config.profile, Profile::Fast);
        assert_eq!(config.model.prefix, "tl;dr: ");
        assert_eq!(config.model.model_dir, PathBuf::from("/models/flan-t5"));
        assert!(config.model.cpu);
    }

    #[test]
    fn profile_flag_skips_an_invalid_environment_profile() {
        let cli = CliOverrides {
            profile: Some(Profile::Fast),
            ..Default::default()
        };
        let config = ServerConfig::resolve_with(cli, lookup(&[(ENV_PROFILE, "turbo")])).unwrap();
        assert_eq!(config.profile, Profile::Fast);
    }

    #[test]
    fn debug_is_known_before_the_rest_of_the_config() {
        let env = lookup(&[(ENV_MODE, "development"), (ENV_PORT, "http")]);
        assert!(debug_enabled(false, &env));
        assert!(debug_enabled(true, lookup(&[])));
        assert!(!debug_enabled(false, lookup(&[(ENV_MODE, "production")])));
    }
}
