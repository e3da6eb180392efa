//! Format layer construction

use tracing_subscriber::fmt;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

use crate::config::{Config, Format};

/// Boxed formatting layer writing to stderr, shaped by `config`.
pub(super) fn make_fmt_layer<S>(config: &Config) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target)
        .with_file(config.source)
        .with_line_number(config.source);

    match config.format {
        Format::Pretty => layer.pretty().with_ansi(config.ansi).boxed(),
        Format::Compact => layer.compact().with_ansi(config.ansi).boxed(),
        Format::Json => layer
            .json()
            .with_ansi(false)
            .with_current_span(true)
            .flatten_event(true)
            .boxed(),
    }
}
