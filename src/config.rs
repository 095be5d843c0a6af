use std::{fmt, fs, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use clap::ValueEnum;
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8050;

/// Settings recognized by [`crate::viz::run`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VizConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub theme: String,
    pub title: Option<String>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            theme: Theme::Bootstrap.as_str().to_string(),
            title: None,
        }
    }
}

impl VizConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file at {}", path_ref.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid configuration in {}", path_ref.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).context("Unable to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.host.trim().is_empty(), "host must not be blank");
        if let Some(title) = &self.title {
            ensure!(!title.trim().is_empty(), "title must not be blank when set");
        }
        Ok(())
    }

    /// The configured theme, falling back to `bootstrap` for unknown names.
    pub fn resolved_theme(&self) -> Theme {
        match self.theme.parse::<Theme>() {
            Ok(theme) => theme,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to the bootstrap theme");
                Theme::Bootstrap
            }
        }
    }
}

impl FromStr for VizConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml_str(s)
    }
}

/// Bootstrap and the Bootswatch themes built on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Bootstrap,
    Cerulean,
    Cosmo,
    Cyborg,
    Darkly,
    Flatly,
    Journal,
    Litera,
    Lumen,
    Lux,
    Materia,
    Minty,
    Pulse,
    Sandstone,
    Simplex,
    Sketchy,
    Slate,
    Solar,
    Spacelab,
    Superhero,
    United,
    Yeti,
}

const BOOTSTRAP_VERSION: &str = "5.3.3";

impl Theme {
    pub const ALL: [Theme; 22] = [
        Theme::Bootstrap,
        Theme::Cerulean,
        Theme::Cosmo,
        Theme::Cyborg,
        Theme::Darkly,
        Theme::Flatly,
        Theme::Journal,
        Theme::Litera,
        Theme::Lumen,
        Theme::Lux,
        Theme::Materia,
        Theme::Minty,
        Theme::Pulse,
        Theme::Sandstone,
        Theme::Simplex,
        Theme::Sketchy,
        Theme::Slate,
        Theme::Solar,
        Theme::Spacelab,
        Theme::Superhero,
        Theme::United,
        Theme::Yeti,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Bootstrap => "bootstrap",
            Theme::Cerulean => "cerulean",
            Theme::Cosmo => "cosmo",
            Theme::Cyborg => "cyborg",
            Theme::Darkly => "darkly",
            Theme::Flatly => "flatly",
            Theme::Journal => "journal",
            Theme::Litera => "litera",
            Theme::Lumen => "lumen",
            Theme::Lux => "lux",
            Theme::Materia => "materia",
            Theme::Minty => "minty",
            Theme::Pulse => "pulse",
            Theme::Sandstone => "sandstone",
            Theme::Simplex => "simplex",
            Theme::Sketchy => "sketchy",
            Theme::Slate => "slate",
            Theme::Solar => "solar",
            Theme::Spacelab => "spacelab",
            Theme::Superhero => "superhero",
            Theme::United => "united",
            Theme::Yeti => "yeti",
        }
    }

    pub fn stylesheet_url(self) -> String {
        match self {
            Theme::Bootstrap => format!(
                "https://cdn.jsdelivr.net/npm/bootstrap@{BOOTSTRAP_VERSION}/dist/css/bootstrap.min.css"
            ),
            other => format!(
                "https://cdn.jsdelivr.net/npm/bootswatch@{BOOTSTRAP_VERSION}/dist/{}/bootstrap.min.css",
                other.as_str()
            ),
        }
    }

    /// Closest known theme name, for typo hints.
    pub fn suggest(name: &str) -> Option<Theme> {
        let needle = name.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .map(|theme| (theme, strsim::jaro_winkler(&needle, theme.as_str())))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(theme, _)| theme)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Some(theme) = Theme::ALL.into_iter().find(|t| t.as_str() == wanted) {
            return Ok(theme);
        }
        match Theme::suggest(&wanted) {
            Some(close) => Err(anyhow!("unknown theme '{s}' (did you mean '{close}'?)")),
            None => Err(anyhow!("unknown theme '{s}'")),
        }
    }
}

/// Backend for the completion demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    Openai,
    Anthropic,
    Gemini,
    Grok,
}

impl LlmProvider {
    pub fn env_var(self) -> &'static str {
        match self {
            LlmProvider::Openai => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::Openai => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Gemini => "gemini",
            LlmProvider::Grok => "grok",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Openai => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
            LlmProvider::Gemini => "gemini-2.0-flash",
            LlmProvider::Grok => "grok-3-mini",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_config_from_str() {
        let yaml = r#"
        host: 0.0.0.0
        port: 9000
        debug: true
        theme: darkly
        title: Image drawer
        "#;

        let config = VizConfig::from_yaml_str(yaml).expect("valid config");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert!(config.debug);
        assert_eq!(config.resolved_theme(), Theme::Darkly);
        assert_eq!(config.title.as_deref(), Some("Image drawer"));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = VizConfig::from_yaml_str("debug: true").unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(VizConfig::from_yaml_str("").unwrap(), VizConfig::default());
    }

    #[test]
    fn rejects_unknown_keys_and_blank_host() {
        assert!(VizConfig::from_yaml_str("prot: 80").is_err());
        let err = VizConfig::from_yaml_str("host: '  '").unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn from_path_reports_the_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("viz.yaml");
        fs::write(&path, "port: not-a-number").unwrap();
        let err = VizConfig::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("viz.yaml"));
    }

    #[test]
    fn unknown_theme_falls_back_with_suggestion() {
        let err = "darkyl".parse::<Theme>().unwrap_err();
        assert!(err.to_string().contains("did you mean 'darkly'"), "{err}");

        let config = VizConfig {
            theme: "nope".into(),
            ..VizConfig::default()
        };
        assert_eq!(config.resolved_theme(), Theme::Bootstrap);
    }

    #[test]
    fn theme_names_are_case_insensitive() {
        assert_eq!("Superhero".parse::<Theme>().unwrap(), Theme::Superhero);
        assert!(Theme::Bootstrap.stylesheet_url().contains("/bootstrap@"));
        assert!(Theme::Yeti.stylesheet_url().ends_with("/yeti/bootstrap.min.css"));
    }
}
