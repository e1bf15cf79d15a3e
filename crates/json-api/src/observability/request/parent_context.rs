//! Upstream trace context for integration requests.
//!
//! Integrations may forward W3C trace headers so their own spans and ours join
//! one trace. The propagator only ever sees trace headers: bearer tokens and
//! request signatures stay out of its reach.

use opentelemetry::{Context, global, propagation::Extractor, trace::TraceContextExt as _};
use salvo::http::HeaderMap;

/// Headers the propagator may read.
const TRACE_HEADERS: [&str; 3] = ["traceparent", "tracestate", "baggage"];

pub(super) fn extract_parent_context(headers: &HeaderMap) -> Option<Context> {
    let carrier = TraceHeaders { headers };

    global::get_text_map_propagator(|propagator| {
        // A fresh base keeps requests without trace headers off the in-process span chain.
        let context = propagator.extract_with_context(&Context::new(), &carrier);

        let valid = context.span().span_context().is_valid();

        valid.then_some(context)
    })
}

#[derive(Debug)]
struct TraceHeaders<'a> {
    headers: &'a HeaderMap,
}

impl Extractor for TraceHeaders<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        let key = TRACE_HEADERS
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(key))?;

        self.headers.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        TRACE_HEADERS
            .into_iter()
            .filter(|name| self.headers.contains_key(*name))
            .collect()
    }
}
