use orcbot_config::Config;

/// Strategy for initializing the configuration.
///
/// Writes the default configuration file to `~/orcbot/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config()?;
        println!("Created config at {}", path.display());
        println!("Fill in the Slack token and knowledge base settings, then run 'orcbot serve'.");
        Ok(())
    }
}
