//! Compact log lines for the frontend: no timestamps, and the target is shortened to the module
//! path below the crate, so `rhojni::registry` is printed as `registry`.

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
};

/// Formats events as `LEVEL module: {span fields}:: message`.
/// The module is the target with the crate name removed, since everything logged is ours.
pub(crate) struct Formatter;
impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        writer: &mut dyn std::fmt::Write,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let target = metadata
            .target()
            .split_once("::")
            .map_or(metadata.target(), |(_, module)| module);
        write!(writer, "{} {}: ", metadata.level(), target)?;

        ctx.visit_spans(|span| {
            let ext = span.extensions();

            if let Some(fields) = ext.get::<FormattedFields<N>>() {
                if !fields.is_empty() {
                    write!(writer, "{{{}}}:: ", fields)?;
                }
            }

            Ok(())
        })?;

        ctx.field_format().format_fields(writer, event)?;

        writeln!(writer)
    }
}
