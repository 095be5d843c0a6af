//! Entry point for hosting a workflow behind the generated page.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::{
    adapters::{inbound::server::ServerAdapter, outbound::templating::HandlebarsRenderer},
    application::{PageChrome, SessionRunner},
    config::VizConfig,
    core::ports::Workflow,
};

/// A workflow plus everything needed to serve it, validated before binding.
pub struct Viz {
    runner: Arc<SessionRunner>,
    renderer: Arc<HandlebarsRenderer>,
    chrome: PageChrome,
    config: VizConfig,
}

impl Viz {
    /// Introspects the workflow; unsupported declarations fail here.
    pub fn new(workflow: Arc<dyn Workflow>, config: VizConfig) -> Result<Self> {
        config.validate()?;
        let title = config
            .title
            .clone()
            .unwrap_or_else(|| workflow.name().to_string());
        let runner = SessionRunner::new(workflow, config.debug)
            .context("workflow cannot be served")?;
        let renderer = HandlebarsRenderer::new().context("page template failed to load")?;
        let chrome = PageChrome {
            title,
            theme: config.resolved_theme(),
            debug: config.debug,
        };
        Ok(Self {
            runner: Arc::new(runner),
            renderer: Arc::new(renderer),
            chrome,
            config,
        })
    }

    pub fn runner(&self) -> &SessionRunner {
        &self.runner
    }

    pub fn chrome(&self) -> &PageChrome {
        &self.chrome
    }

    fn into_adapter(self) -> (ServerAdapter, VizConfig) {
        (
            ServerAdapter::new(self.runner, self.renderer, self.chrome),
            self.config,
        )
    }

    /// Binds the configured host and port and serves until the process stops.
    pub async fn serve(self) -> Result<()> {
        let (adapter, config) = self.into_adapter();
        adapter.run(&config.host, config.port).await
    }

    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<()> {
        let (adapter, _) = self.into_adapter();
        adapter.run_with_listener(listener).await
    }
}

/// Serves `workflow` with `config`; configuration errors abort before binding.
pub async fn run(workflow: Arc<dyn Workflow>, config: VizConfig) -> Result<()> {
    Viz::new(workflow, config)?.serve().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Theme,
        core::{
            Error,
            domain::{DeclaredType, EventDecl, FieldDecl, StartEvent, StopEvent},
            ports::ProgressSink,
        },
        demos::ImageDrawWorkflow,
    };
    use async_trait::async_trait;

    struct Charting;

    #[async_trait]
    impl Workflow for Charting {
        fn name(&self) -> &str {
            "Charting"
        }

        fn start_event(&self) -> EventDecl {
            EventDecl::new("Start").field(FieldDecl::new("rows", DeclaredType::Integer))
        }

        fn stop_event(&self) -> EventDecl {
            EventDecl::new("Done").field(FieldDecl::new("chart", DeclaredType::other("Figure")))
        }

        async fn run(&self, _: StartEvent, _: ProgressSink) -> anyhow::Result<StopEvent> {
            unreachable!("never served")
        }
    }

    #[tokio::test]
    async fn unsupported_field_aborts_before_binding() {
        let config = VizConfig {
            port: 1,
            ..VizConfig::default()
        };
        let err = run(Arc::new(Charting), config).await.unwrap_err();
        let core = err.downcast_ref::<Error>().expect("core error in chain");
        assert!(matches!(core, Error::Config { field: Some(f), .. } if f == "chart"));
        assert!(format!("{err:#}").contains("Figure"));
    }

    #[test]
    fn title_and_theme_come_from_config() {
        let viz = Viz::new(
            Arc::new(ImageDrawWorkflow::default()),
            VizConfig {
                theme: "Minty".into(),
                ..VizConfig::default()
            },
        )
        .unwrap();
        assert_eq!(viz.chrome().title, "ImageDrawWorkflow");
        assert_eq!(viz.chrome().theme, Theme::Minty);
        assert_eq!(viz.runner().schema().inputs[0].name, "query");

        let titled = Viz::new(
            Arc::new(ImageDrawWorkflow::default()),
            VizConfig {
                title: Some("Draw".into()),
                ..VizConfig::default()
            },
        )
        .unwrap();
        assert_eq!(titled.chrome().title, "Draw");
    }

    #[test]
    fn blank_host_is_rejected() {
        let err = Viz::new(
            Arc::new(ImageDrawWorkflow::default()),
            VizConfig {
                host: " ".into(),
                ..VizConfig::default()
            },
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("host"));
    }
}
