use crate::table::{Record, normalize_name};
use crate::value::TaggedValue;

/// How a constraint value is compared with a record's scalar text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Byte-for-byte equality. Used by filtered reads.
    Exact,
    /// Equality after lower-casing both sides. Used to locate rows for update.
    CaseInsensitive,
}

impl MatchPolicy {
    fn eq(self, actual: &str, expected: &str) -> bool {
        match self {
            MatchPolicy::Exact => actual == expected,
            MatchPolicy::CaseInsensitive => actual.to_lowercase() == expected.to_lowercase(),
        }
    }
}

/// Column → required value pairs, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints(Vec<(String, String)>);

impl Constraints {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.push((column.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Constraints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Field lookup by column name, ignoring case and surrounding whitespace.
/// With several candidates the last one wins.
pub fn field<'a>(record: &'a Record, column: &str) -> Option<&'a TaggedValue> {
    let wanted = normalize_name(column);
    record
        .iter()
        .rev()
        .find(|(name, _)| normalize_name(name) == wanted)
        .map(|(_, value)| value)
}

/// True when every constraint names a scalar field whose text matches.
/// Lists, structs and unknown columns never match.
pub fn matches(record: &Record, constraints: &Constraints, policy: MatchPolicy) -> bool {
    constraints.iter().all(|(column, expected)| {
        field(record, column)
            .and_then(TaggedValue::as_scalar)
            .is_some_and(|actual| policy.eq(actual, expected))
    })
}

/// Keep the records satisfying all constraints. Empty constraints keep all.
pub fn filter_records(
    records: Vec<Record>,
    constraints: &Constraints,
    policy: MatchPolicy,
) -> Vec<Record> {
    if constraints.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| matches(record, constraints, policy))
        .collect()
}

/// Position of the first record satisfying all constraints.
pub fn find_first(records: &[Record], constraints: &Constraints, policy: MatchPolicy) -> Option<usize> {
    records
        .iter()
        .position(|record| matches(record, constraints, policy))
}
