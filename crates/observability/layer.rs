use super::config::ServiceIdentity;
use super::notifier::{AlertDispatcher, AlertEvent, SpanFields};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

const REDACTED: &str = "[REDACTED]";

/// Field names whose values never leave the process: gateway credentials,
/// order tokens, callback checksums and webhook URLs.
const SENSITIVE_MARKERS: [&str; 8] = [
    "password",
    "secret",
    "token",
    "checksum",
    "webhook",
    "authorization",
    "username",
    "login",
];

/// Turns events at or above the configured level into alerts.
#[derive(Clone)]
pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    identity: ServiceIdentity,
}

impl AlertLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, identity: ServiceIdentity) -> Self {
        Self {
            dispatcher,
            identity,
        }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    values: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn put(&mut self, field: &Field, value: String) {
        let name = field.name();
        let value = if is_sensitive(name) {
            REDACTED.to_string()
        } else {
            value
        };
        self.values.insert(name.to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

struct StoredSpanFields(BTreeMap<String, String>);

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        let mut visitor = RedactingVisitor::default();
        attrs.record(&mut visitor);
        if visitor.values.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut()
                .insert(StoredSpanFields(visitor.values));
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = RedactingVisitor::default();
        values.record(&mut visitor);
        if visitor.values.is_empty() {
            return;
        }

        let mut extensions = span.extensions_mut();
        if let Some(stored) = extensions.get_mut::<StoredSpanFields>() {
            stored.0.extend(visitor.values);
        } else {
            extensions.insert(StoredSpanFields(visitor.values));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);
        let message = visitor
            .values
            .remove("message")
            .map(|raw| strip_debug_quotes(&raw));

        let spans = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| SpanFields {
                        name: s.metadata().name().to_string(),
                        fields: s
                            .extensions()
                            .get::<StoredSpanFields>()
                            .map(|stored| stored.0.clone())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let metadata = event.metadata();
        self.dispatcher.dispatch(AlertEvent {
            level: *metadata.level(),
            at: Utc::now(),
            service: self.identity.service.clone(),
            stage: self.identity.stage.clone(),
            component: self.identity.component.clone(),
            target: metadata.target().to_string(),
            location: metadata
                .file()
                .zip(metadata.line())
                .map(|(file, line)| format!("{file}:{line}")),
            message,
            fields: visitor.values,
            spans,
        });
    }
}

fn strip_debug_quotes(input: &str) -> String {
    let trimmed = input.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

pub(crate) fn is_sensitive(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| field.contains(marker))
}
