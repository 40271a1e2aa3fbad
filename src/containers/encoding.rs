use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Int, NULL_INT};

/// A dense bidirectional map from strings to `0..n_unique`.
///
/// Shared by the categories of a project, the composite join keys built
/// during staging and the seasonal components. The handle has interior
/// mutability: `insert` assigns the next free code when the string is new,
/// `get` never mutates and returns the null sentinel for unknown strings.
#[derive(Debug, Default)]
pub struct Encoding {
    inner: RwLock<EncodingInner>,
}

#[derive(Debug, Default)]
struct EncodingInner {
    to_int: HashMap<String, Int>,
    to_str: Vec<String>,
}

impl Encoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the code of `value`, assigning the next free one if needed.
    pub fn insert(&self, value: &str) -> Int {
        {
            let inner = self.inner.read();
            if let Some(&code) = inner.to_int.get(value) {
                return code;
            }
        }
        let mut inner = self.inner.write();
        if let Some(&code) = inner.to_int.get(value) {
            return code;
        }
        let code = inner.to_str.len() as Int;
        inner.to_str.push(value.to_string());
        inner.to_int.insert(value.to_string(), code);
        code
    }

    /// Returns the code of `value` or the null sentinel.
    pub fn get(&self, value: &str) -> Int {
        self.inner
            .read()
            .to_int
            .get(value)
            .copied()
            .unwrap_or(NULL_INT)
    }

    /// The string behind a code, if any.
    pub fn str_at(&self, code: Int) -> Option<String> {
        if code < 0 {
            return None;
        }
        self.inner.read().to_str.get(code as usize).cloned()
    }

    pub fn n_unique(&self) -> usize {
        self.inner.read().to_str.len()
    }
}

impl Clone for Encoding {
    fn clone(&self) -> Self {
        let inner = self.inner.read();
        Self {
            inner: RwLock::new(EncodingInner {
                to_int: inner.to_int.clone(),
                to_str: inner.to_str.clone(),
            }),
        }
    }
}

impl Serialize for Encoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.read().to_str.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let to_str = Vec::<String>::deserialize(deserializer)?;
        let to_int = to_str
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as Int))
            .collect();
        Ok(Self {
            inner: RwLock::new(EncodingInner { to_int, to_str }),
        })
    }
}

/// Maps the integer codes of one categorical column onto a dense
/// `0..n_unique` range as seen during fit.
///
/// Codes unseen at fit time transform to the null sentinel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnEncoding {
    map: BTreeMap<Int, Int>,
}

impl ColumnEncoding {
    pub fn fit(column: &[Int]) -> Self {
        let mut map = BTreeMap::new();
        let mut next = 0 as Int;
        for &code in column {
            if code < 0 {
                continue;
            }
            map.entry(code).or_insert_with(|| {
                let dense = next;
                next += 1;
                dense
            });
        }
        Self { map }
    }

    pub fn transform(&self, column: &[Int]) -> Vec<Int> {
        column
            .iter()
            .map(|code| self.map.get(code).copied().unwrap_or(NULL_INT))
            .collect()
    }

    pub fn n_unique(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_insert_and_get() {
        let encoding = Encoding::new();
        assert_eq!(encoding.insert("a"), 0);
        assert_eq!(encoding.insert("b"), 1);
        assert_eq!(encoding.insert("a"), 0);
        assert_eq!(encoding.get("b"), 1);
        assert_eq!(encoding.get("missing"), NULL_INT);
        assert_eq!(encoding.n_unique(), 2);
        assert_eq!(encoding.str_at(1).as_deref(), Some("b"));
    }

    #[test]
    fn test_encoding_serde_round_trip() {
        let encoding = Encoding::new();
        encoding.insert("x");
        encoding.insert("y");
        let json = serde_json::to_string(&encoding).unwrap();
        let restored: Encoding = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get("y"), 1);
        assert_eq!(restored.n_unique(), 2);
    }

    #[test]
    fn test_column_encoding_round_trip() {
        let fitted = ColumnEncoding::fit(&[10, 20, 10, 30, -1]);
        assert_eq!(fitted.n_unique(), 3);
        assert_eq!(fitted.transform(&[20, 10, 99]), vec![1, 0, NULL_INT]);
    }
}
