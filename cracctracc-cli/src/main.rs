use clap::Parser;

use cracctracc::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    let track = cracctracc::run(&cli)?;
    log::info!(
        "{}: {} rows, {} manoeuvres",
        track.id,
        track.rows.len(),
        track.manoeuvres.len()
    );
    Ok(())
}
