//! `cwop-relay`: one run relays the latest observation of one station.
//! Meant to be invoked by a scheduler; every run is independent.

mod cli;
mod logging;
mod notify;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use relay_engine::{
    AprsIsUploader, FetchSettings, Relay, ReqwestFetcher, RunOutcome, UploadSettings,
};
use relay_logging::{relay_error, relay_info};

use cli::Cli;
use notify::ErrorMailer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(relay_logging::level_for(cli.verbose), cli.log_file.as_deref());

    let mailer = cli.errors.as_deref().and_then(|address| {
        ErrorMailer::new(address)
            .map_err(|err| relay_error!("Ignoring error address {:?}: {:#}", address, err))
            .ok()
    });

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            relay_error!("{:#}", err);
            if let Some(mailer) = &mailer {
                mailer.report(&format!("{:#}", err)).await;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.station_config()?;
    let options = cli.run_options();
    relay_info!(
        "Relaying {} ({}) to {} via {}",
        config.pws_id,
        options.mode,
        config.cwop_id,
        config.work_directory.display()
    );

    let relay = Relay::new(
        ReqwestFetcher::new(FetchSettings::default()),
        AprsIsUploader::new(UploadSettings::default()),
    );
    let outcome = relay
        .run(&config, &options)
        .await
        .with_context(|| format!("relay run for {} failed", config.pws_id))?;

    match outcome {
        RunOutcome::NoNewData { .. } | RunOutcome::NoChange { .. } => Ok(()),
        RunOutcome::Transmitted { delivery, .. } => {
            let written = delivery
                .with_context(|| format!("packet for {} not delivered", config.cwop_id))?;
            relay_info!("Sent {} bytes", written);
            Ok(())
        }
    }
}
