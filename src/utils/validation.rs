//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters a role slug may keep before whitespace is collapsed
static SLUG_STRIP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static HYPHEN_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Regex for a well-formed role slug
static ROLE_SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

/// Maximum length of a role name or module id
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Derive a role slug from a display name
///
/// Lowercases and trims the input, drops everything outside `[a-z0-9\s-]`,
/// turns whitespace runs into a single hyphen, collapses repeated hyphens and
/// strips leading/trailing hyphens. The result may be empty.
pub fn slugify(display_name: &str) -> String {
    let lowered = display_name.trim().to_lowercase();
    let stripped = SLUG_STRIP_REGEX.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_REGEX.replace_all(stripped.trim(), "-");
    let collapsed = HYPHEN_RUN_REGEX.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Validate a role slug (`[a-z0-9]` words joined by single hyphens)
pub fn validate_role_slug(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_IDENTIFIER_LEN && ROLE_SLUG_REGEX.is_match(name)
}

/// Validate a module id from the navigation tree
pub fn validate_module_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_IDENTIFIER_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
}
