use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// A class label as supplied in `y_train` and returned by a classifier.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub String);

impl Label {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Label {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The value of the partition key column shared by every row of one partition.
///
/// Numeric key cells are rendered with `ryu` so that equal floats always map to
/// the same key text; `-0.0` renders as `0.0`. NaN never equals itself, so the
/// partitioner rejects it before any key is built.
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey(pub String);

impl PartitionKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_numeric(value: f64) -> Self {
        let mut buffer = ryu::Buffer::new();
        // Adding positive zero turns -0.0 into 0.0 and leaves every other value alone.
        Self(buffer.format(value + 0.0).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies the partition key column, either by header name or by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyColumn {
    Name(String),
    Index(usize),
}

impl KeyColumn {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for KeyColumn {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<usize> for KeyColumn {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Convenience for building label vectors in tests and drivers.
pub fn labels<I, S>(values: I) -> Vec<Label>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(|value| Label(value.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_render_stably() {
        assert_eq!(PartitionKey::from_numeric(3.0).as_str(), "3.0");
        assert_eq!(
            PartitionKey::from_numeric(0.1 + 0.2),
            PartitionKey::from_numeric(0.1 + 0.2)
        );
        assert_ne!(PartitionKey::from_numeric(1.0), PartitionKey::from_numeric(2.0));
    }

    #[test]
    fn signed_zeros_share_one_key() {
        assert_eq!(PartitionKey::from_numeric(-0.0), PartitionKey::from_numeric(0.0));
        assert_eq!(PartitionKey::from_numeric(-0.0).as_str(), "0.0");
        assert_eq!(PartitionKey::from_numeric(-2.5).as_str(), "-2.5");
    }

    #[test]
    fn labels_order_lexicographically() {
        let mut values = labels(["WARRANTS", "ARSON", "FRAUD"]);
        values.sort();
        assert_eq!(values, labels(["ARSON", "FRAUD", "WARRANTS"]));
    }

    #[test]
    fn key_column_display_distinguishes_name_and_index() {
        assert_eq!(KeyColumn::from("PdDistrict").to_string(), "'PdDistrict'");
        assert_eq!(KeyColumn::from(2).to_string(), "#2");
    }
}
