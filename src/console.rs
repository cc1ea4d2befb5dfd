use crate::error::Result;
use crate::parse::parse_labelled_line;
use crate::serial_data_provider::open_lines;
use crate::settings::Settings;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Interrupted,
    /// The port went away or reported an error.
    StreamEnded,
}

/// Prints roll and pitch from labelled lines until Ctrl+C.
pub async fn run(port_name: &str, settings: &Settings) -> Result<ConsoleExit> {
    let reader = open_lines(port_name, settings.baud_rate)?;

    // the board resets when the port opens
    tokio::time::sleep(settings.settle_delay()).await;

    println!("Reading roll and pitch from {port_name}... Press Ctrl+C to stop.\n");

    let exit = print_readings(reader, tokio::signal::ctrl_c(), &mut std::io::stdout()).await?;
    if exit == ConsoleExit::Interrupted {
        println!("\nStopped by user.");
    }
    log::info!("serial port {port_name} closed");

    Ok(exit)
}

/// Writes one line per labelled reading; other lines are ignored.
pub async fn print_readings<S, F, W>(lines: S, stop: F, out: &mut W) -> Result<ConsoleExit>
where
    S: Stream<Item = std::io::Result<String>>,
    F: Future,
    W: Write,
{
    tokio::pin!(lines);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => return Ok(ConsoleExit::Interrupted),
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if let Some(reading) = parse_labelled_line(&line) {
                        writeln!(
                            out,
                            "Roll: {:.2}°, Pitch: {:.2}°",
                            reading.roll, reading.pitch
                        )?;
                        out.flush()?;
                    }
                }
                Some(Err(e)) => {
                    log::warn!("serial read failed: {e}");
                    return Ok(ConsoleExit::StreamEnded);
                }
                None => return Ok(ConsoleExit::StreamEnded),
            },
        }
    }
}
