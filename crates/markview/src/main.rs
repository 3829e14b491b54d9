mod app;
mod logging;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = app::Args::parse();

    let Some(file) = args.target_file().map(ToOwned::to_owned) else {
        return Ok(());
    };

    app::run(&file, args).await
}
