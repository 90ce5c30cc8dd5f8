//! ipguard binary: logging bootstrap and runtime startup.

use dotenvy::dotenv;
use ipguard_core::config::Settings;
use ipguard_transport_telegram::config::BotSettings;
use ipguard_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Masks secrets in log output before they reach the sink.
///
/// The bot token shows up in teloxide request URLs; the panel password
/// can surface when config contents are logged at debug level.
struct Redactor {
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    /// Compile the redaction rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is invalid.
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            rules: vec![
                (
                    Regex::new(r"(https?://[^/]+/bot)[0-9]+:[A-Za-z0-9_-]+")?,
                    "$1[TELEGRAM_TOKEN]",
                ),
                (
                    Regex::new(r"[0-9]{8,10}:[A-Za-z0-9_-]{35}")?,
                    "[TELEGRAM_TOKEN]",
                ),
                (
                    Regex::new(r#""PANEL_PASSWORD"\s*:\s*"[^"]*""#)?,
                    r#""PANEL_PASSWORD": "[MASKED]""#,
                ),
            ],
        })
    }

    fn redact(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |acc, (pattern, replacement)| {
                pattern.replace_all(&acc, *replacement).to_string()
            })
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    redactor: Arc<Redactor>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let raw = String::from_utf8_lossy(buf);
        self.inner.write_all(self.redactor.redact(&raw).as_bytes())?;
        // Report the original length to satisfy the contract, even
        // though the redacted output may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter {
    redactor: Arc<Redactor>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            redactor: self.redactor.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let redactor = Arc::new(Redactor::new().map_err(|e| {
        eprintln!("Failed to compile redaction patterns: {e}");
        e
    })?);
    init_logging(redactor);

    info!("Starting ipguard bot...");

    let settings = init_settings().await;
    run_bot(settings).await;

    Ok(())
}

fn init_logging(redactor: Arc<Redactor>) {
    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "ipguard_core=info,ipguard_transport_telegram=info,ipguard_telegram_bot=info,hyper=warn,reqwest=warn,teloxide=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(RedactingMakeWriter { redactor }))
        .init();
}

async fn init_settings() -> Arc<BotSettings> {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };
    match BotSettings::new(settings).await {
        Ok(settings) => {
            info!("Configuration loaded successfully.");
            Arc::new(settings)
        }
        Err(e) => {
            error!("Failed to load bot configuration: {e}");
            std::process::exit(1);
        }
    }
}
