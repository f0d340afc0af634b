use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use quarry::banner::{BannerInfo, print_banner};
use quarry::boundary::ConsoleBoundary;
use quarry::client::ApiClient;
use quarry::commands::{CommandRegistry, CommandResult, SessionInfo, StateChange};
use quarry::config::{Backend, ClientConfig, MockSettings};
use quarry::consts::DEFAULT_BASE_URL;
use quarry::engine::{ExecutionState, Status};
use quarry::request::ErrorMode;
use quarry::search::{SearchClient, SearchEngine, search_by_name};
use quarry::spinner::Spinner;
use quarry::telemetry;

#[derive(Parser)]
#[command(name = "quarry", version, about = "Search names, one cancellable request at a time.")]
struct Cli {
    /// Backend base URL
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Answer from the in-process mock backend instead of HTTP
    #[arg(long, default_value_t = false)]
    mock: bool,

    /// Mock backend: delay every answer by this many milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Mock backend: answer every search with a 501
    #[arg(long, default_value_t = false)]
    fail: bool,

    /// Keep errors in the result instead of handing them to the error boundary
    #[arg(long, default_value_t = false)]
    local_errors: bool,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// HTTP timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Debug-level engine logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Search for NAME and exit (non-interactive, repeatable)
    #[arg(short, long, value_name = "NAME")]
    run: Vec<String>,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            mock: self.mock.then_some(MockSettings {
                delay: Duration::from_millis(self.delay_ms),
                fail: self.fail,
            }),
            error_mode: if self.local_errors {
                ErrorMode::Local
            } else {
                ErrorMode::Propagate
            },
            headers: self.headers.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        telemetry::VERBOSE_FILTER
    } else {
        telemetry::DEFAULT_FILTER
    };
    telemetry::init_subscriber(telemetry::get_subscriber(filter))?;

    let config = cli.config();
    let backend = config.backend()?;
    let context = Arc::new(config.context()?);

    // One-shot mode: the caller awaits each outcome directly
    if !cli.run.is_empty() {
        let search = SearchClient::new(ApiClient::new(backend.transport(), context));
        let mut failed = 0;
        for (name, result) in search.search_many(&cli.run).await {
            if cli.run.len() > 1 {
                println!("\n{name}:");
            }
            match result {
                Ok(names) => print_names(&names),
                Err(err) => {
                    eprintln!("Error: {err}");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} searches failed", cli.run.len());
        }
        return Ok(());
    }

    print_banner(&BannerInfo {
        backend: &backend.label(),
        error_mode: mode_name(config.error_mode),
        faults: &fault_summary(&backend),
        headers: config.headers.len(),
    });

    let engine = SearchEngine::with_boundary(backend.transport(), context, Arc::new(ConsoleBoundary));
    let renderer = spawn_renderer(engine.subscribe());
    let registry = CommandRegistry::new();
    let mut error_mode = config.error_mode;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nsearch> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let info = SessionInfo {
            backend: &backend,
            error_mode,
        };
        match registry.dispatch(input, &info).await {
            CommandResult::NotACommand => {
                // Supersedes whatever search is still running
                engine.trigger(search_by_name(input).with_error_mode(error_mode));
            }
            CommandResult::Handled => {}
            CommandResult::StateChanged(StateChange::ErrorMode(mode)) => {
                error_mode = mode;
                println!("errors: {}", mode_name(mode));
            }
            CommandResult::Quit => break,
        }
    }

    engine.teardown();
    renderer.abort();
    println!("goodbye.");
    Ok(())
}

/// Follow the engine's state and draw each transition.
fn spawn_renderer(mut rx: watch::Receiver<ExecutionState<Vec<String>>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut spinner: Option<Spinner> = None;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();

            if state.status() == Status::Loading {
                if spinner.is_none() {
                    spinner = Some(Spinner::start("searching"));
                }
                continue;
            }
            if let Some(spinner) = spinner.take() {
                spinner.stop().await;
            }

            match state.status() {
                Status::Succeeded => print_names(state.data().map(Vec::as_slice).unwrap_or_default()),
                // Without a local error the boundary has already reported it
                Status::Failed => {
                    if let Some(err) = state.error() {
                        println!("\nError: {err}");
                    }
                }
                Status::Idle | Status::Loading => {}
            }
        }
    })
}

fn print_names(names: &[String]) {
    if names.is_empty() {
        println!("\n(no matches)");
        return;
    }
    println!();
    for name in names {
        println!("  {name}");
    }
}

fn mode_name(mode: ErrorMode) -> &'static str {
    match mode {
        ErrorMode::Local => "local",
        ErrorMode::Propagate => "propagate (error boundary)",
    }
}

fn fault_summary(backend: &Backend) -> String {
    match backend.mock() {
        Some(mock) => format!(
            "delay {}ms, fail {}",
            mock.delay().as_millis(),
            if mock.fails() { "on" } else { "off" }
        ),
        None => "n/a".to_string(),
    }
}
