//! Path template matching.
//!
//! A template is a `/`-delimited pattern where a segment wrapped in `{}` is a named capture,
//! for example `/users/{id}/posts`. Matching is a linear, per-segment comparison:
//!
//! - a template equal to the path always matches, whatever characters it contains
//! - a template without `{` only matches itself
//! - otherwise template and path must have the same number of segments, captures match any
//!   segment, literals must be equal byte-for-byte (case sensitive)
//! - empty segments (leading, trailing or doubled slashes) are skipped on either side
//!
//! There is no optional or variadic segment and no trailing-slash normalization, so
//! `/users/{id}` never matches `/users/1/`.

use crate::PathParams;
use thiserror::Error;

const SEPARATOR: char = '/';

/// Returned by [`extract_params`] when the template cannot describe the path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateMismatchError {
    #[error("template '{template}' has {template_segments} segments but path '{path}' has {path_segments}")]
    SegmentCount { template: String, path: String, template_segments: usize, path_segments: usize },

    #[error("template segment '{expected}' does not match path segment '{actual}'")]
    LiteralMismatch { expected: String, actual: String },
}

/// Returns the capture name if `segment` is a `{name}` capture.
#[inline]
fn capture_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
}

/// Decides whether `template` can describe the concrete request `path`.
pub fn is_compatible(template: &str, path: &str) -> bool {
    if template == path {
        return true;
    }

    if !template.contains('{') {
        return false;
    }

    if template.split(SEPARATOR).count() != path.split(SEPARATOR).count() {
        return false;
    }

    template.split(SEPARATOR).zip(path.split(SEPARATOR)).all(|(template_segment, path_segment)| {
        if template_segment.is_empty() || path_segment.is_empty() {
            return true;
        }
        capture_name(template_segment).is_some() || template_segment == path_segment
    })
}

/// Binds every capture of `template` to the path segment at the same position.
///
/// Safe to call without checking [`is_compatible`] first: a template that cannot describe the
/// path yields an error instead of a partial result.
pub fn extract_params(template: &str, path: &str) -> Result<PathParams, TemplateMismatchError> {
    let template_segments = template.split(SEPARATOR).count();
    let path_segments = path.split(SEPARATOR).count();
    if template_segments != path_segments {
        return Err(TemplateMismatchError::SegmentCount {
            template: template.to_owned(),
            path: path.to_owned(),
            template_segments,
            path_segments,
        });
    }

    let mut params = PathParams::empty();
    for (template_segment, path_segment) in template.split(SEPARATOR).zip(path.split(SEPARATOR)) {
        if template_segment.is_empty() || path_segment.is_empty() {
            continue;
        }

        match capture_name(template_segment) {
            Some(name) => params.insert(name, path_segment),
            None if template_segment == path_segment => {}
            None => {
                return Err(TemplateMismatchError::LiteralMismatch {
                    expected: template_segment.to_owned(),
                    actual: path_segment.to_owned(),
                });
            }
        }
    }

    Ok(params)
}

/// Shape of a template, summarized once at registration time for route ranking.
///
/// Summarizing never fails: a malformed template (for example `/users/{id`) simply counts the
/// bad segment as a literal and will not match anything but itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Template {
    literals: usize,
    captures: usize,
}

impl Template {
    pub fn parse(template: &str) -> Self {
        template.split(SEPARATOR).filter(|segment| !segment.is_empty()).fold(Self::default(), |mut shape, segment| {
            if capture_name(segment).is_some() {
                shape.captures += 1;
            } else {
                shape.literals += 1;
            }
            shape
        })
    }

    /// Number of non-empty literal segments.
    #[inline]
    pub fn literals(&self) -> usize {
        self.literals
    }

    /// Number of `{name}` capture segments.
    #[inline]
    pub fn captures(&self) -> usize {
        self.captures
    }
}
