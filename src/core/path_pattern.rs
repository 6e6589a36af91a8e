//! Listening path patterns.
//!
//! A listening path from the manifest is split once, at compile time, into
//! segments tagged as literal, named parameter (`{id}`) or greedy capture
//! (a trailing segment containing `+`, e.g. `{account+}`). Request dispatch
//! only ever calls [`PathPattern::captures`]; no pattern strings are
//! re-derived per request.
//!
//! Greediness is decided by the trailing segment alone. A `+` earlier in the
//! path is not special and such a segment is treated like any other.
use std::cmp::Reverse;

/// A single segment of a listening path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Greedy(String),
}

/// Values captured from a request path by a matching pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// Named parameters in declaration order.
    pub params: Vec<(String, String)>,
    /// Remaining path for greedy patterns, without a leading slash.
    pub suffix: Option<String>,
}

impl Captures {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Compiled form of a listening path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(listening_path: &str) -> Self {
        let normalized = normalize_path(listening_path);
        let raw = split_segments(&normalized);
        let last = raw.len().saturating_sub(1);

        let segments = raw
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                if index == last && segment.contains('+') {
                    Segment::Greedy(strip_sentinels(segment))
                } else if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal((*segment).to_string())
                }
            })
            .collect();

        Self {
            source: listening_path.to_string(),
            segments,
        }
    }

    /// The listening path exactly as declared in the manifest.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_greedy(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Greedy(_)))
    }

    /// Render the matchable form of the pattern.
    ///
    /// Non-greedy paths are returned unchanged. A greedy path becomes
    /// `<prefix>/<name>/{*name}` where `{*name}` captures everything after
    /// it, slashes included.
    pub fn matchable(&self) -> String {
        match self.segments.last() {
            Some(Segment::Greedy(name)) => {
                let prefix: String = self.segments[..self.segments.len() - 1]
                    .iter()
                    .map(|segment| match segment {
                        Segment::Literal(literal) => format!("/{literal}"),
                        Segment::Param(param) | Segment::Greedy(param) => format!("/{{{param}}}"),
                    })
                    .collect();
                format!("{prefix}/{name}/{{*{name}}}")
            }
            _ => self.source.clone(),
        }
    }

    /// Match a request path, returning the captured values on success.
    pub fn captures(&self, request_path: &str) -> Option<Captures> {
        let normalized = normalize_path(request_path);
        self.captures_segments(&split_segments(&normalized))
    }

    /// Match an already normalized and split request path.
    pub(crate) fn captures_segments(&self, parts: &[&str]) -> Option<Captures> {
        let (fixed, greedy) = match self.segments.split_last() {
            Some((Segment::Greedy(name), prefix)) => (prefix, Some(name.as_str())),
            _ => (self.segments.as_slice(), None),
        };

        if parts.len() < fixed.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in fixed.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push((name.clone(), (*part).to_string()));
                }
                _ => return None,
            }
        }

        let rest = &parts[fixed.len()..];
        match greedy {
            None => rest.is_empty().then_some(Captures {
                params,
                suffix: None,
            }),
            Some(name) => {
                // The base-name marker segment is optional: `/github/{account+}`
                // accepts both `/github/account/<s>` and `/github/<s>`.
                // A lone marker segment is the marker with an empty suffix.
                let rest = match rest.split_first() {
                    Some((first, tail)) if !name.is_empty() && *first == name => tail,
                    _ => rest,
                };
                if rest.is_empty() {
                    return None;
                }
                Some(Captures {
                    params,
                    suffix: Some(rest.join("/")),
                })
            }
        }
    }

    /// Sort key used to order competing patterns, most specific first.
    pub fn specificity(&self) -> (bool, usize, Reverse<usize>) {
        let params = self
            .segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Param(_)))
            .count();
        (self.is_greedy(), params, Reverse(self.segments.len()))
    }
}

/// Split a listening path into `(is_greedy, matchable_pattern)`.
pub fn transform(listening_path: &str) -> (bool, String) {
    let pattern = PathPattern::parse(listening_path);
    (pattern.is_greedy(), pattern.matchable())
}

/// Normalize a request path: collapse double slashes, strip the trailing
/// slash, keep the root.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    let mut prev_slash = false;

    if !path.starts_with('/') {
        normalized.push('/');
        prev_slash = true;
    }

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Split a normalized path into its segments. The root has none.
pub(crate) fn split_segments(normalized: &str) -> Vec<&str> {
    let trimmed = normalized.trim_start_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

fn strip_sentinels(segment: &str) -> String {
    segment
        .chars()
        .filter(|ch| !matches!(ch, '{' | '+' | '}'))
        .collect()
}
