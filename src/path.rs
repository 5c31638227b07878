//! Source path analysis.
//!
//! Parses mapping source paths into segments, detects the flattening markers
//! that force a lateral view, and provides the ordering and grouping helpers
//! the generator builds columns from.
//!
//! # Path grammar
//!
//! ```text
//! $.contacts[*].phone
//! ─┬ ───┬──── ┬  ──┬──
//!  │    │     │    └── remainder, addressed on each exploded element
//!  │    │     └── flattening marker ([*] array, [mk]/[mv] map key/value)
//!  │    └── base segment, the collection being exploded
//!  └── optional JSONPath root, stripped on analysis
//! ```
//!
//! A literal subscript (`[0]`) is plain field access and never explodes.
//! Only one flattening marker per path is supported; nested multi-level
//! flattening is rejected up front rather than mis-grouped.

use std::cmp::Ordering;

use indexmap::IndexMap;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
};

use crate::error::{HivemapError, HivemapResult};
use crate::mapping::MappingRule;

/// Which side of a map entry a path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAccess {
    Key,
    Value,
}

/// Result of analyzing a source path for flattening markers.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSplit {
    /// True when the path contains an array or map flattening marker.
    pub index_operator_found: bool,
    /// Everything addressed up to and including the collection segment.
    /// When no marker is present this is the whole (root-stripped) path.
    pub left_path: String,
    /// The struct-field path addressed on each exploded element; empty when
    /// the rule consumes the element itself.
    pub right_path: String,
    /// Set when the marker denotes map key/value iteration.
    pub map_access: Option<MapAccess>,
}

impl PathSplit {
    pub fn is_map_path(&self) -> bool {
        self.map_access.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bracket {
    Star,
    MapKey,
    MapValue,
    Index(String),
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_bracket(input: &str) -> IResult<&str, Bracket> {
    delimited(
        char('['),
        alt((
            value(Bracket::Star, char('*')),
            value(Bracket::MapKey, tag("mk")),
            value(Bracket::MapValue, tag("mv")),
            map(digit1, |d: &str| Bracket::Index(d.to_string())),
        )),
        char(']'),
    )(input)
}

fn parse_segment(input: &str) -> IResult<&str, (&str, Vec<Bracket>)> {
    pair(parse_identifier, many0(parse_bracket))(input)
}

/// Parse a full path: optional `$.`/`$` root, then dot-separated segments.
fn parse_path(input: &str) -> IResult<&str, Vec<(&str, Vec<Bracket>)>> {
    all_consuming(preceded(
        opt(preceded(char('$'), opt(char('.')))),
        separated_list1(char('.'), parse_segment),
    ))(input)
}

/// A parsed segment: rendered name (subscripts folded in) plus an optional
/// flattening marker.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    name: String,
    marker: Option<MapAccess>,
    is_array_marker: bool,
}

fn build_segments(path: &str) -> HivemapResult<Vec<Segment>> {
    let (_, raw) = parse_path(path)
        .map_err(|_| HivemapError::malformed(path, "not a valid source path"))?;

    let mut segments = Vec::with_capacity(raw.len());
    for (ident, brackets) in raw {
        let mut name = ident.to_string();
        let mut marker = None;
        let mut is_array_marker = false;
        for bracket in brackets {
            if marker.is_some() || is_array_marker {
                return Err(HivemapError::malformed(
                    path,
                    "subscript or marker after a flattening marker",
                ));
            }
            match bracket {
                Bracket::Index(n) => {
                    name.push('[');
                    name.push_str(&n);
                    name.push(']');
                }
                Bracket::Star => is_array_marker = true,
                Bracket::MapKey => marker = Some(MapAccess::Key),
                Bracket::MapValue => marker = Some(MapAccess::Value),
            }
        }
        segments.push(Segment {
            name,
            marker,
            is_array_marker,
        });
    }
    Ok(segments)
}

/// Analyze a source path for flattening markers.
///
/// Detects at most one array/map marker and splits the path there. Paths with
/// more than one marker, or a map-key marker followed by a remainder, are
/// rejected: their behavior is undefined and must not be guessed at.
pub fn analyze(path: &str) -> HivemapResult<PathSplit> {
    let segments = build_segments(path)?;

    let marker_count = segments
        .iter()
        .filter(|s| s.marker.is_some() || s.is_array_marker)
        .count();
    if marker_count > 1 {
        return Err(HivemapError::malformed(
            path,
            "more than one flattening marker; only one level of flattening is supported",
        ));
    }

    let names = |range: &[Segment]| {
        range
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    };

    match segments
        .iter()
        .position(|s| s.marker.is_some() || s.is_array_marker)
    {
        None => Ok(PathSplit {
            index_operator_found: false,
            left_path: names(&segments),
            right_path: String::new(),
            map_access: None,
        }),
        Some(at) => {
            let map_access = segments[at].marker;
            let left_path = names(&segments[..=at]);
            let right_path = names(&segments[at + 1..]);
            if map_access == Some(MapAccess::Key) && !right_path.is_empty() {
                return Err(HivemapError::malformed(
                    path,
                    "map key marker cannot address a remainder; keys are scalar",
                ));
            }
            Ok(PathSplit {
                index_operator_found: true,
                left_path,
                right_path,
                map_access,
            })
        }
    }
}

/// Strip the optional JSONPath root prefix.
pub fn strip_root(path: &str) -> &str {
    path.strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path)
}

/// Number of dot-separated segments in a path.
pub fn segment_count(path: &str) -> usize {
    let stripped = strip_root(path);
    if stripped.is_empty() {
        0
    } else {
        stripped.split('.').count()
    }
}

/// The remainder of `path` beyond the first `skip` segments, dot-joined.
pub fn sub_path(path: &str, skip: usize) -> String {
    strip_root(path)
        .split('.')
        .skip(skip)
        .collect::<Vec<_>>()
        .join(".")
}

/// Order paths by descending specificity: more segments first, lexical
/// tiebreak for determinism. Within a same-source subgroup the shortest
/// ("super") path therefore sorts last and becomes the base object for
/// nested extraction.
pub fn compare_paths_desc(a: &str, b: &str) -> Ordering {
    segment_count(b)
        .cmp(&segment_count(a))
        .then_with(|| strip_root(a).cmp(strip_root(b)))
}

/// Group rules by the root segment of their source path, preserving
/// encounter order. Rules that extract different sub-keys of one JSON blob
/// column land in one group and are coalesced together.
pub fn group_by_source_path<'a>(
    rules: impl IntoIterator<Item = &'a MappingRule>,
) -> IndexMap<&'a str, Vec<&'a MappingRule>> {
    let mut groups: IndexMap<&str, Vec<&MappingRule>> = IndexMap::new();
    for rule in rules {
        let stripped = strip_root(&rule.json_path);
        let root = stripped.split('.').next().unwrap_or(stripped);
        groups.entry(root).or_default().push(rule);
    }
    groups
}

/// Normalize a name into an identifier safe for backtick quoting and alias
/// derivation: lowercased, with anything outside `[a-z0-9_]` mapped to `_`.
pub fn normalize_object_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
