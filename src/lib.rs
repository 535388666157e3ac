use anyhow::Result;
use parser::{Cli, Commands};

#[macro_use]
extern crate log;

/// Dispatch the parsed command line to the matching subcommand runner.
///
/// # Errors
/// Forwards any fatal error raised by the runners; per-column events never
/// surface here.
pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        Commands::Call { call } => {
            let stats = snv_from_stdin::run(&call)?;
            debug!("Run statistics: {stats:?}");
        }

        Commands::DetectionLimits { scan } => {
            snv_from_stdin::sensitivity::run(&scan)?;
        }

        Commands::FromYaml { yaml } => {
            info!("Re-running from serialized arguments in '{}'", yaml.display());
            let cli = Cli::deserialize(&yaml)?;
            self::run(cli)?;
        }
    };
    Ok(())
}
