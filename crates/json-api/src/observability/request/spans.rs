//! HTTP span helpers.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub(super) struct RequestSpanName {
    pub(super) otel_path: String,
    pub(super) otel_span_name: String,
}

pub(super) fn request_span_name(method: &str, path: &str) -> RequestSpanName {
    let otel_path = normalise_path_for_span_name(path);
    let otel_span_name = format!("{method} {otel_path}");

    RequestSpanName {
        otel_path,
        otel_span_name,
    }
}

/// Replace identifier segments so spans and metric labels stay low-cardinality.
fn normalise_path_for_span_name(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{uuid}"
            } else if segment.bytes().all(|byte| byte.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_replaced_with_placeholders() {
        let names = request_span_name("GET", "/sync/history/123456789");

        assert_eq!(names.otel_path, "/sync/history/{id}");
        assert_eq!(names.otel_span_name, "GET /sync/history/{id}");

        assert_eq!(
            normalise_path_for_span_name("/templates/0190f2a8-c3a9-7c3b-8f1e-2d4c5b6a7980"),
            "/templates/{uuid}"
        );
    }

    #[test]
    fn root_and_static_paths_are_kept() {
        assert_eq!(normalise_path_for_span_name("/"), "/");
        assert_eq!(normalise_path_for_span_name("/sync/queue"), "/sync/queue");
    }
}
