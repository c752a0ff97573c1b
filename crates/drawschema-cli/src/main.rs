//! Drawschema CLI - Turn draw.io ER diagrams into table schemas

mod cli;
mod report;

use clap::Parser;

fn main() {
    // Logging is initialized by the app once the flags are known
    let cli_args = cli::Cli::parse();

    let app = cli::DrawschemaApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
