use arpspoof_cli::{Cli, Commands};
use arpspoof_core::{DatalinkLink, Error, Interface, Result};
use arpspoof_session::{expand_networks, SpoofSession};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_filter())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "arpspoof failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.command == Some(Commands::Interfaces) {
        return list_interfaces();
    }

    let interface = cli
        .interface
        .as_deref()
        .ok_or_else(|| Error::invalid_parameter("interface", "no interface given"))?;
    let config = cli.config();
    config.validate()?;

    let link = Arc::new(DatalinkLink::open(interface)?);
    let victims = expand_networks(&cli.victims);
    let targets = expand_networks(&cli.targets);
    info!(
        interface,
        victims = victims.len(),
        targets = targets.len(),
        "Resolving victim and target networks"
    );

    let mut session = SpoofSession::launch(link, victims, targets, &config).await?;

    let stop = session.stop_handle()?;
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, stopping"),
            Err(e) => error!(error = %e, "Cannot listen for Ctrl-C, stopping"),
        }
        stop.stop();
    });

    if let Err(e) = session.block().await {
        println!("{}", session.stats());
        return Err(e);
    }

    let result = session.terminate().await;
    println!("{}", session.stats());
    result
}

fn list_interfaces() -> Result<()> {
    for iface in Interface::list_all()? {
        match iface.get_ipv4() {
            Some(ip) => println!("{} {}", iface, ip),
            None => println!("{}", iface),
        }
    }

    Ok(())
}
