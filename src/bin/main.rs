use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Parse command line arguments and run the requested subcommand.
fn main() {
    // ----------------------------- Run CLI Parser
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    logger::Logger::init(cli.verbose + u8::from(!cli.quiet));

    // ----------------------------- Keep a re-runnable record of the arguments.
    if let Err(e) = cli.serialize() {
        warn!("{e}");
    }

    // ----------------------------- Run.
    match lowvar_rs::run(cli) {
        Ok(()) => (),
        Err(e) => {
            error!("{e:?}");
            process::exit(1);
        }
    };
}
