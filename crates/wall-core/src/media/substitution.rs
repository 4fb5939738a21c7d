//! Literal placeholder replacement.

/// Ordered literal → replacement pairs.
///
/// [`apply`](Self::apply) scans the input once, left to right. At each
/// position the first pair whose literal matches wins, and scanning resumes
/// after it, so replacements are never rescanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    pairs: Vec<(String, String)>,
}

impl SubstitutionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Empty literals are ignored.
    pub fn push(&mut self, literal: impl Into<String>, replacement: impl Into<String>) {
        let literal = literal.into();
        if !literal.is_empty() {
            self.pairs.push((literal, replacement.into()));
        }
    }

    /// Returns `true` if the table has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// The pairs in priority order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Replaces every non-overlapping occurrence of each literal.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        if self.pairs.is_empty() {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        'scan: while let Some(c) = rest.chars().next() {
            for (literal, replacement) in &self.pairs {
                if let Some(after) = rest.strip_prefix(literal.as_str()) {
                    out.push_str(replacement);
                    rest = after;
                    continue 'scan;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }

        out
    }
}
