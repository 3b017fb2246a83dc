use parley_config::Config;

/// Strategy for initializing the configuration.
///
/// Writes the default configuration to `~/parley/config.json`; an existing
/// file is left alone.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        Config::create_config()
    }
}
