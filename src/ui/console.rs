//! Line-based console front-end
//!
//! Reads [`UiCommand`]s from the input and writes the panel texts whenever
//! the session view changes. The elapsed time ticks every second, so it is
//! only printed on `status` to keep the prompt usable.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::command::{UiCommand, HELP};
use crate::emdr::{Notification, SessionError, SessionHandle, SessionView};

/// Runs the console until `quit`, end of input, or the session going away
pub async fn run_console<R, W>(
    handle: SessionHandle,
    mut notifications: mpsc::Receiver<Notification>,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut view_rx = handle.subscribe();
    let mut shown = view_rx.borrow_and_update().clone();

    write_line(&mut output, HELP).await?;
    render_full(&shown, &mut output).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Console input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<UiCommand>() {
                    Ok(UiCommand::Quit) => break,
                    Ok(UiCommand::Help) => write_line(&mut output, HELP).await?,
                    Ok(UiCommand::Status) => render_full(&handle.view(), &mut output).await?,
                    Ok(command) => {
                        if !execute(&handle, command).await {
                            break;
                        }
                    }
                    Err(e) => write_line(&mut output, &e.to_string()).await?,
                }
            }

            changed = view_rx.changed() => {
                if changed.is_err() {
                    debug!("Session view closed");
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                render_changes(&shown, &view, &mut output).await?;
                shown = view;
            }

            Some(notification) = notifications.recv() => {
                let text = format!(
                    "[{}] {}",
                    notification.raised_at.format("%H:%M:%S"),
                    notification.message
                );
                write_line(&mut output, &text).await?;
            }
        }
    }

    output.flush().await
}

// Returns false once the session is gone. Other failures reach the user as
// notifications already.
async fn execute(handle: &SessionHandle, command: UiCommand) -> bool {
    let result = match command {
        UiCommand::Toggle => handle.toggle().await.map(|_| ()),
        UiCommand::Timing {
            duration_ms,
            gap_ms,
        } => handle.update_timing(duration_ms, gap_ms).await.map(|_| ()),
        UiCommand::Intensity(percent) => handle.set_intensity(percent).await.map(|_| ()),
        UiCommand::Status | UiCommand::Help | UiCommand::Quit => Ok(()),
    };

    match result {
        Err(SessionError::Closed) => false,
        Err(e) => {
            debug!("Command {:?} failed: {}", command, e);
            true
        }
        Ok(()) => true,
    }
}

async fn render_full<W: AsyncWrite + Unpin>(
    view: &SessionView,
    output: &mut W,
) -> std::io::Result<()> {
    let text = [
        view.elapsed_text(),
        view.controller_count_text(),
        view.status_text(),
        view.config.duration_label(),
        view.config.gap_label(),
        view.config.intensity_label(),
    ]
    .join("\n");
    write_line(output, &text).await
}

async fn render_changes<W: AsyncWrite + Unpin>(
    old: &SessionView,
    new: &SessionView,
    output: &mut W,
) -> std::io::Result<()> {
    let mut changed = Vec::new();
    if old.controller_count != new.controller_count {
        changed.push(new.controller_count_text());
    }
    if old.status != new.status {
        changed.push(new.status_text());
    }
    if old.config.duration_ms != new.config.duration_ms {
        changed.push(new.config.duration_label());
    }
    if old.config.gap_ms != new.config.gap_ms {
        changed.push(new.config.gap_label());
    }
    if old.config.intensity != new.config.intensity {
        changed.push(new.config.intensity_label());
    }

    if changed.is_empty() {
        return Ok(());
    }
    write_line(output, &changed.join("\n")).await
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
