use clap::Parser;
use fmriprep_confounds::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();
    cli::run(args)
}
