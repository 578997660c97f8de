//! # Maven Version Ordering and Ranges
//!
//! Artifact versions are not semver, so this module carries its own ordering
//! for answering version-range queries against a local repository.
//!
//! ## Ordering
//!
//! A version is split into items on `.`, `-`, and digit/letter transitions
//! (`1.0-beta2` becomes `1`, `0`, `beta`, `2`). Numeric items compare
//! numerically. Qualifiers rank as
//! `alpha < beta < milestone < rc < snapshot < (release) < sp`, with unknown
//! qualifiers after `sp` in lexical order. Trailing zero and empty items are
//! ignored, so `1.0` equals `1`.
//!
//! ## Ranges
//!
//! `[1.0,2.0)`, `(,1.0]`, `[1.5]`, `[1.0,)` and comma-separated unions of
//! those are supported. A bare version such as `1.2` is treated as the exact
//! range `[1.2]`.

use std::cmp::Ordering;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

impl Item {
    fn qualifier_rank(q: &str) -> (u8, &str) {
        match q {
            "alpha" | "a" => (0, ""),
            "beta" | "b" => (1, ""),
            "milestone" | "m" => (2, ""),
            "rc" | "cr" => (3, ""),
            "snapshot" => (4, ""),
            "" | "ga" | "final" | "release" => (5, ""),
            "sp" => (6, ""),
            other => (7, other),
        }
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Item::Number(a), Item::Number(b)) => a.cmp(b),
            (Item::Number(_), Item::Qualifier(_)) => Ordering::Greater,
            (Item::Qualifier(_), Item::Number(_)) => Ordering::Less,
            (Item::Qualifier(a), Item::Qualifier(b)) => {
                Item::qualifier_rank(a).cmp(&Item::qualifier_rank(b))
            }
        }
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed, comparable artifact version.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<Item>,
}

impl MavenVersion {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        let mut items = Vec::new();
        let mut current = String::new();
        let mut digits = false;

        let flush = |current: &mut String, digits: bool, items: &mut Vec<Item>| {
            if current.is_empty() {
                return;
            }
            let item = if digits {
                current
                    .parse()
                    .map(Item::Number)
                    .unwrap_or_else(|_| Item::Qualifier(current.clone()))
            } else {
                Item::Qualifier(current.clone())
            };
            items.push(item);
            current.clear();
        };

        for ch in lower.chars() {
            if ch == '.' || ch == '-' || ch == '_' {
                flush(&mut current, digits, &mut items);
                continue;
            }
            let is_digit = ch.is_ascii_digit();
            if !current.is_empty() && is_digit != digits {
                flush(&mut current, digits, &mut items);
            }
            digits = is_digit;
            current.push(ch);
        }
        flush(&mut current, digits, &mut items);

        while matches!(items.last(), Some(Item::Number(0)))
            || matches!(items.last(), Some(Item::Qualifier(q)) if Item::qualifier_rank(q).0 == 5)
        {
            items.pop();
        }

        Self {
            raw: raw.trim().to_string(),
            items,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ordering = match (self.items.get(i), other.items.get(i)) {
                (Some(a), Some(b)) => a.cmp(b),
                // A missing item is 0 against numbers and "release" against qualifiers.
                (Some(Item::Number(n)), None) => n.cmp(&0),
                (None, Some(Item::Number(n))) => 0.cmp(n),
                (Some(Item::Qualifier(q)), None) => Item::qualifier_rank(q).cmp(&(5, "")),
                (None, Some(Item::Qualifier(q))) => (5, "").cmp(&Item::qualifier_rank(q)),
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

#[derive(Debug, Clone)]
struct Bound {
    version: MavenVersion,
    inclusive: bool,
}

#[derive(Debug, Clone)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Interval {
    fn contains(&self, version: &MavenVersion) -> bool {
        let above = match &self.lower {
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
            None => true,
        };
        let below = match &self.upper {
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
            None => true,
        };
        above && below
    }
}

/// A union of version intervals.
#[derive(Debug, Clone)]
pub struct VersionRange {
    intervals: Vec<Interval>,
}

impl VersionRange {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidVersionRange {
            range: text.to_string(),
            message: message.to_string(),
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty range"));
        }
        if !trimmed.starts_with('[') && !trimmed.starts_with('(') {
            let exact = MavenVersion::parse(trimmed);
            return Ok(Self {
                intervals: vec![Interval {
                    lower: Some(Bound {
                        version: exact.clone(),
                        inclusive: true,
                    }),
                    upper: Some(Bound {
                        version: exact,
                        inclusive: true,
                    }),
                }],
            });
        }

        let mut intervals = Vec::new();
        let mut rest = trimmed;
        while !rest.is_empty() {
            let open = rest.chars().next().ok_or_else(|| invalid("truncated range"))?;
            if open != '[' && open != '(' {
                return Err(invalid("expected '[' or '('"));
            }
            let close_at = rest
                .find([']', ')'])
                .ok_or_else(|| invalid("missing closing bracket"))?;
            let close = rest.as_bytes()[close_at] as char;
            let body = &rest[1..close_at];

            let interval = match body.split_once(',') {
                None => {
                    if open != '[' || close != ']' || body.trim().is_empty() {
                        return Err(invalid("single-version range must be [v]"));
                    }
                    let v = MavenVersion::parse(body);
                    Interval {
                        lower: Some(Bound {
                            version: v.clone(),
                            inclusive: true,
                        }),
                        upper: Some(Bound {
                            version: v,
                            inclusive: true,
                        }),
                    }
                }
                Some((low, high)) => Interval {
                    lower: (!low.trim().is_empty()).then(|| Bound {
                        version: MavenVersion::parse(low),
                        inclusive: open == '[',
                    }),
                    upper: (!high.trim().is_empty()).then(|| Bound {
                        version: MavenVersion::parse(high),
                        inclusive: close == ']',
                    }),
                },
            };
            intervals.push(interval);

            rest = rest[close_at + 1..].trim_start();
            if let Some(stripped) = rest.strip_prefix(',') {
                rest = stripped.trim_start();
            }
        }

        Ok(Self { intervals })
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        self.intervals.iter().any(|i| i.contains(version))
    }

    /// Matching candidates, sorted oldest first.
    pub fn select<'a, I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut matching: Vec<MavenVersion> = candidates
            .into_iter()
            .map(MavenVersion::parse)
            .filter(|v| self.contains(v))
            .collect();
        matching.sort();
        matching.into_iter().map(|v| v.raw).collect()
    }
}
