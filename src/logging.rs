use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info,snippetbox=info,tower_http=info";

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output with source locations.
    Pretty,
    /// One JSON object per event, including the current span.
    Json,
}

impl LogFormat {
    /// Read the `LOG_JSON` switch; only a case-insensitive `true` selects JSON.
    pub fn from_env() -> Self {
        Self::from_switch(env::var("LOG_JSON").ok().as_deref())
    }

    fn from_switch(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("true") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_needs_an_explicit_true() {
        assert_eq!(LogFormat::from_switch(Some("true")), LogFormat::Json);
        assert_eq!(LogFormat::from_switch(Some(" TRUE ")), LogFormat::Json);
        assert_eq!(LogFormat::from_switch(Some("1")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_switch(Some("")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_switch(None), LogFormat::Pretty);
    }

    #[test]
    fn default_filter_parses() {
        EnvFilter::try_new(DEFAULT_FILTER).unwrap();
    }
}
