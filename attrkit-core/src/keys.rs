/// Key stored in place of an empty attribute key.
/// Keep this stable; exporters and dashboards may look for it.
pub const FALLBACK_KEY: &str = "null";

/// Environment variables that override configured attribute limits.
pub const ENV_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
pub const ENV_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT";
