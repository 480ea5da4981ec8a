// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments and hand them to the command layer.
// - Failures are printed once and mapped to a per-class exit code.

use clap::Parser;
use dcron_cli::{cli::Cli, commands, Error};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = commands::run(cli) {
        eprintln!("{}", err);
        let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
        std::process::exit(code);
    }
}
