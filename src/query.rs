//! Ordered query-string parameters.
//!
//! Query parameters are decoded with `application/x-www-form-urlencoded` rules (`+` is a space) and
//! kept in their original order, duplicates included. Mutation follows URL search-params semantics:
//! [`QueryParams::set`] replaces the first occurrence of a name and drops the rest, or appends if the
//! name is absent.

use std::slice::Iter;

/// An ordered multimap of decoded query-string parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())).collect(),
        }
    }

    /// The first value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Indicates whether at least one parameter is named `name`.
    pub fn has(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    /// Replace the first parameter named `name` with `value` and remove any later ones. If there is
    /// none, append the parameter at the end.
    pub fn set<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();

        match self.pairs.iter().position(|(k, _)| *k == name) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || *k != name;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((name, value)),
        }
    }

    /// Append a parameter, keeping any existing ones with the same name.
    pub fn append<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.pairs.push((name.into(), value.into()));
    }

    /// Iterate over the parameters in order.
    pub fn iter(&self) -> Iter<'_, (String, String)> {
        self.pairs.iter()
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Indicates whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize as `application/x-www-form-urlencoded`, in order.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.pairs.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a QueryParams {
    type Item = &'a (String, String);
    type IntoIter = Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
