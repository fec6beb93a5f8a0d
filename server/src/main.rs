use clap::Parser;
use log::info;
use server::dispatcher::{Dispatcher, DispatcherConfig};
use server::network::Transport;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative Pong match server")]
struct Args {
    /// Address to bind the UDP socket to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value = "6000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let transport = Transport::bind(&format!("{}:{}", args.host, args.port)).await?;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    transport.spawn_receiver(inbound_tx);
    transport.spawn_sender(outbound_rx);

    let dispatcher = Dispatcher::new(DispatcherConfig::default(), inbound_rx, outbound_tx);
    let shutdown = dispatcher.shutdown_flag();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    dispatcher.run().await;
    info!("Server stopped");
    Ok(())
}
