//! Mapping from raw Spring metric keys to Prometheus metric names.

/// Sanitize a raw payload key to be usable inside a Prometheus metric name.
///
/// Every character outside `[a-zA-Z0-9:_]` is replaced by its own
/// underscore. Runs are not collapsed, so `"a..b"` becomes `"a__b"`.
/// The function is total and idempotent; the empty string maps to itself.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect()
}

/// Build a fully qualified metric name from a namespace and a name.
///
/// Non-empty parts are joined with `_`. An empty name yields an empty
/// string regardless of the namespace.
pub fn build_metric_name(namespace: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}

/// Check whether a name matches `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {
            chars.all(is_name_char)
        }
        _ => false,
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Value kind announced on the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Used for the `up` and `response_duration` meta-measurements.
    Gauge,
    /// Used for every payload value; no counter/gauge semantics are asserted.
    Untyped,
}

impl ValueKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Untyped => "untyped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_valid_unchanged() {
        assert_eq!(sanitize_key("heap_used"), "heap_used");
        assert_eq!(sanitize_key("foo:bar:baz"), "foo:bar:baz");
        assert_eq!(sanitize_key("Mem123"), "Mem123");
    }

    #[test]
    fn test_sanitize_key_dots_and_spaces() {
        assert_eq!(sanitize_key("jvm.memory.used"), "jvm_memory_used");
        assert_eq!(sanitize_key("disk free"), "disk_free");
        assert_eq!(sanitize_key("gauge.response.api-v1"), "gauge_response_api_v1");
    }

    #[test]
    fn test_sanitize_key_one_underscore_per_character() {
        assert_eq!(sanitize_key("a..b"), "a__b");
        assert_eq!(sanitize_key("///"), "___");
        assert_eq!(sanitize_key("counter.status.200.[id]"), "counter_status_200__id_");
    }

    #[test]
    fn test_sanitize_key_non_ascii() {
        assert_eq!(sanitize_key("température"), "temp_rature");
        assert_eq!(sanitize_key("日本"), "__");
    }

    #[test]
    fn test_sanitize_key_empty() {
        assert_eq!(sanitize_key(""), "");
    }

    #[test]
    fn test_sanitize_key_idempotent_and_total() {
        let inputs = [
            "",
            "simple",
            "jvm.memory.used",
            "a b\tc\nd",
            "ünïcödé",
            "x:y/z-w",
            "0leading.digit",
            "__already__",
        ];

        for input in inputs {
            let once = sanitize_key(input);
            assert_eq!(sanitize_key(&once), once, "not idempotent for {:?}", input);
            assert!(
                once.chars().all(is_name_char),
                "{:?} produced invalid characters: {:?}",
                input,
                once
            );
        }
    }

    #[test]
    fn test_build_metric_name() {
        assert_eq!(build_metric_name("spring", "up"), "spring_up");
        assert_eq!(
            build_metric_name("spring", "jvm_memory_used"),
            "spring_jvm_memory_used"
        );
        assert_eq!(build_metric_name("", "heap"), "heap");
        assert_eq!(build_metric_name("spring", ""), "");
    }

    #[test]
    fn test_is_valid_metric_name() {
        assert!(is_valid_metric_name("spring_up"));
        assert!(is_valid_metric_name("_private"));
        assert!(is_valid_metric_name(":recording:rule"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("1abc"));
        assert!(!is_valid_metric_name("has space"));
    }

    #[test]
    fn test_value_kind_as_str() {
        assert_eq!(ValueKind::Gauge.as_str(), "gauge");
        assert_eq!(ValueKind::Untyped.as_str(), "untyped");
    }
}
