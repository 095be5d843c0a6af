mod tracing_setup;

use std::{fs, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use flowviz::{
    adapters::{
        inbound::cli::{Cli, Commands, DemoArgs, DemoKind, LlmProvider, SchemaArgs, ServeArgs},
        outbound::llm::RigLlmClient,
    },
    config::VizConfig,
    core::{introspect::introspect, ports::LlmClient},
    demos,
    paths::home_env_path,
    viz::Viz,
};

static HOME_ENV_ONCE: OnceLock<()> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.resolve_config();
            let verbose = verbose_logging(cli.verbose, &config);
            let _guard = tracing_setup::init(verbose, cli.log_json, cli.log_file);
            serve_command(args, config?).await
        }
        Commands::Schema(args) => {
            let _guard = tracing_setup::init(cli.verbose, cli.log_json, cli.log_file);
            schema_command(args)
        }
    }
}

/// Debug mode from either the flags or the config file raises the log level.
fn verbose_logging(cli_verbose: bool, config: &Result<VizConfig>) -> bool {
    cli_verbose || config.as_ref().is_ok_and(|config| config.debug)
}

async fn serve_command(args: ServeArgs, config: VizConfig) -> Result<()> {
    let llm = match args.demo.demo {
        DemoKind::Completion => Some(create_llm_client(&args.demo)?),
        _ => None,
    };
    let workflow = demos::build(args.demo.demo, llm);

    let viz = Viz::new(workflow, config.clone())?;
    println!(
        "Serving {} on http://{}:{} (theme: {})",
        viz.runner().schema().workflow,
        config.host,
        config.port,
        viz.chrome().theme
    );
    viz.serve().await
}

fn schema_command(args: SchemaArgs) -> Result<()> {
    let workflow = demos::build(args.demo.demo, None);
    let schema = introspect(workflow.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn create_llm_client(args: &DemoArgs) -> Result<Arc<dyn LlmClient>> {
    let api_key = resolve_api_key(args.api_key.clone(), args.llm_provider)?;
    let client = RigLlmClient::new(args.llm_provider, api_key, args.model())
        .context("Failed to configure the completion demo")?;
    Ok(Arc::new(client))
}

fn resolve_api_key(cli_value: Option<String>, provider: LlmProvider) -> Result<String> {
    ensure_home_env_loaded();
    let env_var = provider.env_var();
    let env_value = std::env::var(env_var).ok();
    pick_api_key(cli_value, env_value)
        .map_err(|_| anyhow!("Missing API key: pass --api-key or set {env_var}"))
}

fn pick_api_key(cli_value: Option<String>, env_value: Option<String>) -> Result<String> {
    if let Some(key) = normalize_key(cli_value) {
        return Ok(key);
    }
    if let Some(key) = normalize_key(env_value) {
        return Ok(key);
    }

    Err(anyhow!("Missing API key"))
}

fn normalize_key(value: Option<String>) -> Option<String> {
    value.and_then(|candidate| {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn ensure_home_env_loaded() {
    HOME_ENV_ONCE.get_or_init(|| {
        if let Some(path) = home_env_path()
            && let Ok(contents) = fs::read_to_string(&path)
        {
            apply_env_contents(&contents);
        }
    });
}

fn apply_env_contents(contents: &str) {
    for line in contents.lines() {
        if let Some((key, value)) = parse_env_assignment(line)
            && std::env::var_os(&key).is_none()
        {
            unsafe {
                std::env::set_var(&key, &value);
            }
        }
    }
}

fn parse_env_assignment(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed).trim();

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key.to_string(), normalize_env_value(value)))
}

fn normalize_env_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        return trimmed[1..trimmed.len() - 1].to_string();
    }
    trimmed.to_string()
}
