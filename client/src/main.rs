use clap::Parser;
use client::network::Connection;
use client::session::{Session, SessionConfig, SessionState};
use log::info;
use shared::paddle::PaddleDirection;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[clap(author, version, about = "Headless Pong match client")]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:6000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let connection = Connection::connect(&args.server).await?;
    info!("Connecting to {}", connection.server_addr());

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    connection.spawn_receiver(inbound_tx);
    connection.spawn_sender(outbound_rx);

    let mut session = Session::new(SessionConfig::default(), outbound_tx);
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    let mut last_frame = Instant::now();
    let mut last_report = Instant::now();

    loop {
        tokio::select! {
            _ = frames.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, leaving the match");
                let goodbye = session.quit();
                connection.shutdown(Some(goodbye)).await;
                break;
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        let inbound = inbound_rx.try_recv().ok();
        session.drive(inbound, PaddleDirection::Still, dt, now)?;

        for cue in session.take_sound_cues() {
            info!("Sound cue: {}", cue);
        }

        if now.duration_since(last_report) >= REPORT_INTERVAL {
            last_report = now;
            let snapshot = session.snapshot();
            info!(
                "{:?} score {}:{} ball ({:.0}, {:.0})",
                snapshot.state,
                snapshot.left_score,
                snapshot.right_score,
                snapshot.ball_x,
                snapshot.ball_y
            );
        }

        if session.state() == SessionState::GameOver {
            info!("Session over");
            connection.shutdown(None).await;
            break;
        }
    }

    Ok(())
}
