//! Display attribute normalization.

/// Normalize an optional display attribute (logo, icon, color, image).
///
/// Blank strings are treated as absent so callers can pass form values
/// through unchanged.
pub fn normalize_attr(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
