//! Ordered query parameters for API operations.
//!
//! The service takes every operation input as flattened query parameters.
//! Scalar fields map to a single pair; list fields flatten to 1-based
//! `Prefix.member.N` keys, with nested fields appended as
//! `Prefix.member.N.Field`.

/// An insertion-ordered collection of query parameter pairs.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Appends a pair only when the value is present.
    pub fn push_opt(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value {
            self.pairs.push((key.into(), value.to_owned()));
        }
    }

    /// Appends one member of a flattened list. Indices are 1-based on the
    /// wire; pass an empty `field` for scalar members.
    pub fn push_member(&mut self, prefix: &str, index: usize, field: &str, value: impl Into<String>) {
        let key = if field.is_empty() {
            format!("{prefix}.member.{index}")
        } else {
            format!("{prefix}.member.{index}.{field}")
        };
        self.pairs.push((key, value.into()));
    }

    /// Flattens an entire list of scalar members.
    pub fn push_member_list<I, S>(&mut self, prefix: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.push_member(prefix, i + 1, "", value);
        }
    }

    /// The pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Encodes the pairs as a query string, preserving insertion order.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(&percent_encode(key));
            out.push('=');
            out.push_str(&percent_encode(value));
        }
        out
    }
}

/// Percent-encodes a string per RFC 3986. Only unreserved characters
/// (ALPHA, DIGIT, `-`, `_`, `.`, `~`) pass through; spaces become `%20`,
/// never `+`, because the signature is computed over this exact form.
pub(crate) fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
