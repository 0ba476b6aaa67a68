//! Tracing subscriber set-up for the `colorit` binary
//!
//! The library only emits `log` records and `tracing` spans; installing a
//! subscriber is left to applications. This module is what the CLI uses.

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Line format of emitted events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Coloured single-line events
    Console,
    /// Plain single-line events without timestamps, for CI logs
    Compact,
    /// One JSON object per event, with the active span chain
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Where events are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// stderr, leaving stdout for the saved path
    Console,
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only when the program exits
#[must_use]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl TracingGuard {
    fn none() -> Self {
        Self {
            #[cfg(feature = "tracing-files")]
            _file_guard: None,
        }
    }
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// `EnvFilter` directives; replaces the verbosity mapping when set
    pub env_filter: Option<String>,
    /// Logged once at start-up to correlate runs
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directives for the verbosity level
    ///
    /// The inference runtimes are noisy at debug level, so they stay one
    /// step quieter than colorit until full tracing is requested.
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info,ort=warn,tract_onnx=warn,tract_core=warn",
            1 => "debug,ort=info,tract_onnx=info,tract_core=info",
            _ => "trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let filter = EnvFilter::try_new(
            self.env_filter
                .as_deref()
                .unwrap_or_else(|| self.verbosity_to_filter()),
        )?;
        let (writer, ansi, guard) = self.make_writer();

        tracing_subscriber::registry()
            .with(filter)
            .with(self.format_layer(writer, ansi))
            .try_init()?;

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "🚀 Colorization session started");
        }
        Ok(guard)
    }

    fn make_writer(&self) -> (BoxMakeWriter, bool, TracingGuard) {
        match &self.output {
            TracingOutput::Console => (
                BoxMakeWriter::new(std::io::stderr),
                self.format == TracingFormat::Console,
                TracingGuard::none(),
            ),
            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
                let file_name = path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("colorit.log"));
                let (writer, guard) = tracing_appender::non_blocking(
                    tracing_appender::rolling::never(directory, file_name),
                );
                (
                    BoxMakeWriter::new(writer),
                    false,
                    TracingGuard {
                        _file_guard: Some(guard),
                    },
                )
            },
        }
    }

    fn format_layer<S>(
        &self,
        writer: BoxMakeWriter,
        ansi: bool,
    ) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        match self.format {
            TracingFormat::Console => fmt::layer()
                .with_ansi(ansi)
                .with_target(false)
                .with_writer(writer)
                .compact()
                .boxed(),
            TracingFormat::Compact => fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .without_time()
                .with_writer(writer)
                .compact()
                .boxed(),
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(writer)
                .boxed(),
        }
    }
}

/// Initialize tracing with CLI defaults and a fresh session id
///
/// `RUST_LOG`, when set, takes precedence over the verbosity level.
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<TracingGuard> {
    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_session_id(uuid::Uuid::new_v4().to_string());
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_env_filter(filter);
    }
    config.init()
}

/// Spans the CLI opens around its two slow steps
pub mod spans {
    use std::path::Path;
    use tracing::{Level, Span};

    pub fn model_loading(model_path: &Path, provider: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "model_loading",
            model = %model_path.display(),
            provider = %provider
        )
    }

    /// Covers one input file from decode to save
    pub fn file_processing(file_path: &Path, format: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            file_path = %file_path.display(),
            format = %format
        )
    }
}
