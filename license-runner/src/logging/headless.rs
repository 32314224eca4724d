use super::Frontend;
use anyhow::Result;
use tracing_subscriber::{
    filter::LevelFilter, fmt::Layer as FmtLayer, layer::SubscriberExt as _, Layer as _, Registry,
};

/// Plain log lines on stderr, so that stdout only carries command output.
pub(crate) struct HeadlessLogger {}

impl Frontend for HeadlessLogger {
    fn set_up(&mut self, options: &super::Options) -> Result<()> {
        let filter = if options.verbose {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        };

        let fmt_layer = FmtLayer::new()
            .with_writer(std::io::stderr)
            .with_target(options.verbose)
            .with_ansi(options.color)
            .with_filter(filter);
        let subscriber = Registry::default().with(fmt_layer);

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))?;

        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        Ok(())
    }
}
