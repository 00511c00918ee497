use clap::Parser;
use color_eyre::Result;
use research_monitor::{
    init_errors,
    init_logging,
    App,
    Args,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_errors()?;
    let args = Args::parse();
    let app = App::new(args.clone())?;
    init_logging(&app.config().logs_dir(), args.verbose)?;

    app.run().await
}
