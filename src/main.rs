use clap::Parser;
use dualmom::cli::{init_tracing, run, Cli};

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}
