//! Resource path template grammar
//!
//! A template is a run of literal segments followed by exactly one
//! identifier segment, e.g. `/location/category/{category-id}`. Both `{name}`
//! and `<name>` delimit an identifier.
//!
//! Templates are checked once, while routes are registered. A template that
//! does not fit the grammar is a [`ConfigurationError`] and the server never
//! starts.

use cda_common::{ConfigResult, ConfigurationError};

const DELIMITERS: [(char, char); 2] = [('{', '}'), ('<', '>')];

/// Characters the HTTP router gives meaning to inside a segment
const ROUTER_SPECIAL: [char; 6] = [':', '*', '{', '}', '<', '>'];

/// A validated resource path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    template: String,
    collection: String,
    identifier_segment: String,
    identifier_name: String,
}

impl ResourcePath {
    /// The template as registered
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The template with the identifier segment removed
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The identifier segment including its delimiters, e.g. `{category-id}`
    pub fn identifier_segment(&self) -> &str {
        &self.identifier_segment
    }

    /// The identifier name without delimiters, e.g. `category-id`
    pub fn identifier_name(&self) -> &str {
        &self.identifier_name
    }

    /// Non-empty segments of the full template
    pub fn segments(&self) -> Vec<&str> {
        split_segments(&self.template)
    }

    /// Normalized item path, e.g. `/location/category/{category-id}`
    pub fn item_path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// Normalized collection path with its trailing separator, e.g.
    /// `/location/category/`
    pub fn collection_path(&self) -> String {
        format!("{}/", self.route_collection())
    }

    /// Route path for the HTTP layer: `/literal/.../:name`
    pub fn route_item(&self) -> String {
        let mut segments: Vec<String> = split_segments(&self.template)
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(last) = segments.last_mut() {
            *last = format!(":{}", self.identifier_name);
        }
        format!("/{}", segments.join("/"))
    }

    /// Route path for the HTTP layer without trailing separator: `/literal/...`
    pub fn route_collection(&self) -> String {
        format!("/{}", split_segments(&self.collection).join("/"))
    }
}

fn split_segments(template: &str) -> Vec<&str> {
    template.split('/').filter(|s| !s.is_empty()).collect()
}

/// Returns the name inside a delimited segment, if the segment is delimited
fn delimited_name(segment: &str) -> Option<&str> {
    DELIMITERS.iter().find_map(|&(open, close)| {
        segment
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
    })
}

fn is_delimited(segment: &str) -> bool {
    delimited_name(segment).is_some()
}

/// Whether the router would read `segment` as anything but literal text
fn is_router_special(segment: &str) -> bool {
    segment.contains(ROUTER_SPECIAL)
}

/// Validate a resource path template
///
/// Empty segments are ignored, so leading, trailing and doubled separators
/// are all accepted.
pub fn validate(template: &str) -> ConfigResult<ResourcePath> {
    let segments = split_segments(template);

    if segments.len() < 2 {
        return Err(ConfigurationError::TooFewSegments {
            template: template.to_string(),
        });
    }

    let last = segments[segments.len() - 1];
    let name = match delimited_name(last) {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(ConfigurationError::MissingIdentifier {
                template: template.to_string(),
            })
        },
    };

    let base = segments[segments.len() - 2];
    if is_delimited(base) || is_router_special(base) {
        return Err(ConfigurationError::BaseSegmentParameterized {
            template: template.to_string(),
        });
    }

    if let Some(segment) = segments[..segments.len() - 2]
        .iter()
        .find(|segment| is_router_special(segment))
    {
        return Err(ConfigurationError::InvalidLiteralSegment {
            template: template.to_string(),
            segment: segment.to_string(),
        });
    }

    // The identifier is the last non-empty segment, so its last occurrence
    // in the raw template is the segment itself.
    let cut = template.rfind(last).unwrap_or(template.len());

    Ok(ResourcePath {
        template: template.to_string(),
        collection: template[..cut].to_string(),
        identifier_segment: last.to_string(),
        identifier_name: name.to_string(),
    })
}
