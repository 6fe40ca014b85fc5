//! Request parameters and their canonical form.

use std::collections::BTreeMap;
use std::fmt;

/// Scalar value of a request parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    /// Empty strings and nulls never reach the wire. Zero and `false` do.
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Str(value) => value.is_empty(),
            ParamValue::Null => true,
            _ => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(value) => f.write_str(value),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Null => Ok(()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

/// Mapping of parameter name to value.
///
/// Iteration is always in byte-wise key order, so the canonical ordering
/// falls out of the storage itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    /// Overwrites same-key entries with `other`'s values.
    pub fn extend(&mut self, other: &ParameterSet) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Sorted copy of `params` without empty-string or null entries.
pub fn canonicalize(params: &ParameterSet) -> ParameterSet {
    ParameterSet {
        entries: params
            .entries
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParameterSet {
        ParameterSet::new()
            .with("z", 0)
            .with("y", "")
            .with("x", "2")
            .with("w", Option::<String>::None)
            .with("Apple", false)
    }

    #[test]
    fn keys_come_out_sorted() {
        let params = ParameterSet::new().with("z", 0).with("y", 1).with("x", 2);
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn canonicalize_drops_empty_and_null_only() {
        let canonical = canonicalize(&sample());
        let keys: Vec<&str> = canonical.keys().collect();
        // Uppercase sorts before lowercase byte-wise.
        assert_eq!(keys, vec!["Apple", "x", "z"]);
        assert_eq!(canonical.get("z"), Some(&ParamValue::Int(0)));
        assert_eq!(canonical.get("Apple"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let once = canonicalize(&sample());
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn canonicalize_leaves_input_untouched() {
        let params = sample();
        let before = params.clone();
        let _ = canonicalize(&params);
        assert_eq!(params, before);
    }

    #[test]
    fn extend_overwrites_existing_keys() {
        let mut params = ParameterSet::new().with("x", 1).with("y", 2);
        params.extend(&ParameterSet::new().with("x", 3).with("z", 4));
        assert_eq!(params.get("x"), Some(&ParamValue::Int(3)));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn values_render_as_plain_strings() {
        assert_eq!(ParamValue::from(3).to_string(), "3");
        assert_eq!(ParamValue::from(true).to_string(), "true");
        assert_eq!(ParamValue::from(0.5).to_string(), "0.5");
        assert_eq!(ParamValue::Null.to_string(), "");
    }
}
