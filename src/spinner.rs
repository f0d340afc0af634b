//! A terminal spinner shown while a search is loading.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INTERVAL: Duration = Duration::from_millis(80);

/// Renders `label` plus elapsed time on stderr until stopped or dropped.
pub struct Spinner {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let label = label.to_string();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            for frame in FRAMES.iter().cycle() {
                eprint!("\x1b[2K\r{frame} {label} {}", elapsed(started.elapsed()));
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = stopped.changed() => break,
                }
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self { handle, stop }
    }

    /// Stop and wait for the line to be cleared.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

/// `1.2s` style elapsed time.
fn elapsed(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}
