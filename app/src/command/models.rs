use parley_config::Config;

use super::openai_provider;

/// Strategy for listing the models the configured endpoint offers.
#[derive(Debug, Clone, Copy)]
pub struct ModelsStrategy;

impl super::CommandStrategy for ModelsStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let provider = openai_provider(&config)?;

        for model in provider.list_models().await? {
            println!("{model}");
        }
        Ok(())
    }
}
