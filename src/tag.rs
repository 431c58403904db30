//! Tag names and the `tag:` boundary
//!
//! The Tailscale API spells every tag with a `tag:` prefix. Inside this crate
//! tags are always stored without it, so that set comparisons never have to
//! care how the user typed a tag. Conversion happens in exactly two places:
//! [`normalize_tag`] / [`from_api_tags`] on the way in and [`to_api_tags`] on
//! the way out.

use std::collections::BTreeSet;

use crate::error::AdminError;

/// Prefix the service uses for tag names
pub const TAG_PREFIX: &str = "tag:";

/// A device's tags, prefix-free. Ordered so display is stable.
pub type TagSet = BTreeSet<String>;

/// Checks tag names typed by a user
pub struct TagValidator;

impl TagValidator {
    pub fn new() -> Self {
        Self {}
    }

    /// Validates a prefix-free tag name
    ///
    /// A tag name is rejected when it:
    /// - is empty
    /// - contains whitespace
    /// - contains a `:`, which means a second prefix or a malformed tag
    ///
    /// Anything else the service may already carry (`web.v2`, `1st-floor`)
    /// stays addressable.
    ///
    /// # Examples
    ///
    /// ```
    /// use tailnet_admin::tag::TagValidator;
    ///
    /// let validator = TagValidator::new();
    /// assert!(validator.validate("web.v2").is_ok());
    /// assert!(validator.validate("web server").is_err());
    /// ```
    pub fn validate(&self, name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("tag name is empty".to_string());
        }

        if name.chars().any(char::is_whitespace) {
            return Err("tag name contains whitespace".to_string());
        }

        if name.contains(':') {
            return Err("tag name contains ':'".to_string());
        }

        Ok(())
    }
}

impl Default for TagValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a single leading `tag:` if present
pub fn strip_prefix(raw: &str) -> &str {
    raw.strip_prefix(TAG_PREFIX).unwrap_or(raw)
}

/// Turns a user-supplied tag (`prod` or `tag:prod`) into its internal form
pub fn normalize_tag(raw: &str) -> Result<String, AdminError> {
    let name = strip_prefix(raw.trim());

    TagValidator::new()
        .validate(name)
        .map_err(|reason| AdminError::InvalidTag {
            tag: raw.to_string(),
            reason,
        })?;

    Ok(name.to_string())
}

/// Normalizes a list of user-supplied tags, splitting comma-separated values
pub fn parse_tag_list<S: AsRef<str>>(raw: &[S]) -> Result<TagSet, AdminError> {
    raw.iter()
        .flat_map(|item| item.as_ref().split(','))
        .filter(|part| !part.trim().is_empty())
        .map(normalize_tag)
        .collect()
}

/// Builds a tag set from tags reported by the service
///
/// Service data is trusted as-is apart from the prefix; no validation is
/// applied so that unusual existing tags are still carried through writes.
pub fn from_api_tags<I, S>(tags: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| strip_prefix(t.as_ref()).to_string())
        .collect()
}

/// Renders a tag set the way the service expects it in a write
pub fn to_api_tags(tags: &TagSet) -> Vec<String> {
    tags.iter().map(|t| format!("{}{}", TAG_PREFIX, t)).collect()
}

/// Comma-separated display form, `none` for an empty set
pub fn format_tags(tags: &TagSet) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}
