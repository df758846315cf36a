//! RigLink remote operator console
//!
//! Interactive terminal front end for the session engine: keys the
//! transmitter, tunes the dial, and prints status as the gateway reports
//! it. All the real work happens in [`riglink_client::session`]; this
//! binary is a thin keyboard-and-print loop around it.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use riglink_client::args::Args;
use riglink_client::session::{SessionEvent, SessionHandle};
use riglink_common::telemetry::{PttPhase, TelemetrySnapshot};

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    println!("RigLink operator console v{}", env!("CARGO_PKG_VERSION"));

    let config = args.into_config();
    println!(
        "Gateway {} at {} Hz",
        config.gateway_url, config.sample_rate
    );

    let (mut session, mut events) = match SessionHandle::start(config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    // Latest snapshot, written by the printer thread and read by the `s`
    // command below
    let latest_snapshot: Arc<Mutex<Option<TelemetrySnapshot>>> = Arc::new(Mutex::new(None));
    let snapshot_writer = latest_snapshot.clone();

    // Print session events from their own thread so the stdin loop stays
    // a plain blocking read
    std::thread::spawn(move || {
        while let Some(event) = events.blocking_recv() {
            match event {
                SessionEvent::Ptt(phase) => match phase {
                    PttPhase::TransmitRequested => println!("* keying..."),
                    PttPhase::TransmitConfirmed => println!("* transmitting"),
                    PttPhase::ReceiveRequested => println!("* unkeying..."),
                    PttPhase::ReceiveConfirmed => println!("* receiving"),
                    PttPhase::Idle => {}
                },
                SessionEvent::FrequencyReported(hz) => println!("* frequency {} Hz", hz),
                SessionEvent::ModeReported(mode) => println!("* mode {}", mode),
                SessionEvent::SignalReported(level) => println!("* signal {:.1}", level),
                SessionEvent::RateConfirmed(hz) => println!("* audio rate {} Hz confirmed", hz),
                SessionEvent::Channel { kind, state } => {
                    println!("* {} channel {:?}", kind, state);
                }
                SessionEvent::Telemetry(snapshot) => {
                    if let Ok(mut slot) = snapshot_writer.lock() {
                        *slot = Some(snapshot);
                    }
                }
                SessionEvent::Fatal(e) => {
                    eprintln!("Session failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    });

    print_help();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut transmitting = false;

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("stdin error: {}", e);
                break;
            }
        }

        let line = line.trim();
        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "" => {}
            "t" => {
                transmitting = !transmitting;
                session.set_ptt(transmitting);
            }
            "f" => match rest.parse::<u64>() {
                Ok(hz) => session.set_frequency(hz),
                Err(_) => println!("usage: f <hertz>"),
            },
            "m" if !rest.is_empty() => session.set_mode(rest),
            "m" => println!("usage: m <mode>"),
            "g" => session.get_frequency(),
            "s" => print_status(&latest_snapshot),
            "q" => break,
            _ => print_help(),
        }
    }

    session.shutdown();
}

/// Initialize logging, honoring RUST_LOG over the --debug flag
fn init_logging(debug: bool) {
    let default_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(default_level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_help() {
    println!("Commands:");
    println!("  t          toggle PTT");
    println!("  f <hertz>  tune to a frequency");
    println!("  m <mode>   switch mode (USB, LSB, CW, ...)");
    println!("  g          ask for the current frequency");
    println!("  s          show the latest status snapshot");
    println!("  q          quit");
}

fn print_status(latest: &Arc<Mutex<Option<TelemetrySnapshot>>>) {
    let Ok(slot) = latest.lock() else {
        return;
    };
    match slot.as_ref() {
        Some(s) => {
            let rtt = match s.ping_rtt_ms {
                Some(ms) => format!("{} ms", ms),
                None => "-".to_string(),
            };
            println!(
                "rx {} bps | tx {} bps | buffer {} frames | dropped {} | ptt {:?} | ctl {:?} rx {:?} tx {:?} | rtt {}",
                s.rx_bps,
                s.tx_bps,
                s.buffer_depth,
                s.frames_dropped,
                s.ptt_phase,
                s.control,
                s.audio_rx,
                s.audio_tx,
                rtt
            );
        }
        None => println!("no telemetry yet"),
    }
}
