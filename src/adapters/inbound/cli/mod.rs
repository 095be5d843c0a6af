//! Command-line surface of the `flowviz` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

pub use crate::config::{LlmProvider, VizConfig};
pub use crate::demos::DemoKind;

#[derive(Debug, Parser)]
#[command(name = "flowviz")]
#[command(about = "Serve a generated web form for an event-driven workflow", version)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(
        long,
        global = true,
        help = "Also write JSON debug logs under the data directory"
    )]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the generated page for a bundled workflow.
    Serve(ServeArgs),
    /// Print the introspected schema of a bundled workflow as JSON.
    Schema(SchemaArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[arg(long, value_enum, default_value_t = DemoKind::Analysis, help = "Bundled workflow to host")]
    pub demo: DemoKind,

    #[arg(long, help = "LLM provider API key (can also come from env vars)")]
    pub api_key: Option<String>,

    #[arg(
        long,
        default_value_t = LlmProvider::Openai,
        value_enum,
        help = "LLM provider backend for the completion demo"
    )]
    pub llm_provider: LlmProvider,

    #[arg(long, help = "Model identifier (defaults per provider)")]
    pub llm_model: Option<String>,
}

impl DemoArgs {
    pub fn model(&self) -> String {
        self.llm_model
            .clone()
            .unwrap_or_else(|| self.llm_provider.default_model().to_string())
    }
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub demo: DemoArgs,

    #[arg(long, help = "YAML file with host/port/debug/theme/title")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Interface to bind")]
    pub host: Option<String>,

    #[arg(long, help = "Port to bind")]
    pub port: Option<u16>,

    #[arg(long, help = "Show error chains and run timings on the page")]
    pub debug: bool,

    #[arg(long, help = "Bootstrap or Bootswatch theme name")]
    pub theme: Option<String>,

    #[arg(long, help = "Page title (defaults to the workflow name)")]
    pub title: Option<String>,
}

impl ServeArgs {
    /// Loads `--config` when given and layers the flags over it.
    pub fn resolve_config(&self) -> Result<VizConfig> {
        let base = match &self.config {
            Some(path) => VizConfig::from_path(path)?,
            None => VizConfig::default(),
        };
        Ok(self.apply_to(base))
    }

    /// Layers the flags over a loaded (or default) config.
    pub fn apply_to(&self, mut config: VizConfig) -> VizConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if let Some(title) = &self.title {
            config.title = Some(title.clone());
        }
        config
    }
}

#[derive(Debug, Args, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub demo: DemoArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_serve_command() {
        let cli = Cli::parse_from([
            "flowviz",
            "serve",
            "--demo",
            "image",
            "--port",
            "9000",
            "--theme",
            "darkly",
            "--debug",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.demo.demo, DemoKind::Image);
                assert_eq!(args.port, Some(9000));
                let config = args.apply_to(VizConfig::default());
                assert_eq!(config.port, 9000);
                assert_eq!(config.theme, "darkly");
                assert!(config.debug);
                assert_eq!(config.host, crate::config::DEFAULT_HOST);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_file_values_only_when_given() {
        let cli = Cli::parse_from(["flowviz", "serve", "--title", "Dogs"]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let from_file = VizConfig {
            port: 7000,
            debug: true,
            ..VizConfig::default()
        };
        let config = args.apply_to(from_file);
        assert_eq!(config.port, 7000);
        assert!(config.debug, "absent --debug does not switch debug off");
        assert_eq!(config.title.as_deref(), Some("Dogs"));
    }

    #[test]
    fn parses_schema_command_with_provider() {
        let cli = Cli::parse_from([
            "flowviz",
            "schema",
            "--demo",
            "completion",
            "--llm-provider",
            "anthropic",
            "--log-json",
        ]);
        assert!(cli.log_json);
        let Commands::Schema(args) = cli.command else {
            panic!("expected schema");
        };
        assert_eq!(args.demo.demo, DemoKind::Completion);
        assert_eq!(args.demo.llm_provider.env_var(), "ANTHROPIC_API_KEY");
        assert_eq!(args.demo.model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn debug_from_config_file_survives_resolution() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("viz.yaml");
        std::fs::write(&path, "debug: true\nport: 9100\n").unwrap();

        let cli = Cli::parse_from([
            "flowviz",
            "serve",
            "--config",
            path.to_str().unwrap(),
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert!(!args.debug);
        let config = args.resolve_config().unwrap();
        assert!(config.debug);
        assert_eq!(config.port, 9100);
        assert_eq!(args.demo.demo, DemoKind::Analysis);
    }
}
