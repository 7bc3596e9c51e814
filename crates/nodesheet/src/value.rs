//! Input data model: nested per-node values and the data-source map.
//!
//! The collection layer hands the engine a [`DataSources`] map of
//! `source -> node -> NodeValue`. A [`NodeValue`] is a nested map, a
//! [`Scalar`], or an explicit [`NodeValue::Unavailable`] placeholder for a
//! node whose value could not be obtained.
//!
//! Projection collapses a nested value to a [`Datum`], which is what
//! converters, aggregators and renderers work with.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a cluster node, usually `host:port` or an IP.
pub type NodeId = String;

/// Values shared by every entry of one render call.
pub type CommonContext = BTreeMap<String, Scalar>;

/// A displayable leaf value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the scalar. Text is parsed; booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Bool(_) => None,
        }
    }

    /// True for `Int`/`Float`, and for text that parses as a number.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Coerces to a number, keeping integers integral.
    pub fn to_number(&self) -> Option<Scalar> {
        match self {
            Scalar::Int(_) | Scalar::Float(_) => Some(self.clone()),
            Scalar::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Scalar::Int)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(Scalar::Float))
            }
            Scalar::Bool(_) => None,
        }
    }

    /// Raw JSON form, used by the document renderer.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Value::from(*f),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Ordering used for group and order keys.
    ///
    /// Numbers compare numerically, everything else by its display text.
    pub fn sort_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Int(_) | Scalar::Float(_), Scalar::Int(_) | Scalar::Float(_)) => {
                let a = self.as_f64().unwrap_or_default();
                let b = other.as_f64().unwrap_or_default();
                a.total_cmp(&b)
            }
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i as i64)
    }
}

impl From<u64> for Scalar {
    fn from(u: u64) -> Self {
        i64::try_from(u)
            .map(Scalar::Int)
            .unwrap_or(Scalar::Float(u as f64))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

/// A per-node value as produced by the collection layer.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeValue {
    Map(BTreeMap<String, NodeValue>),
    Scalar(Scalar),
    /// The value could not be obtained from this node.
    Unavailable(String),
}

impl NodeValue {
    /// Creates an unavailable placeholder with the given reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        NodeValue::Unavailable(reason.into())
    }

    /// Builds a map value from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<NodeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        NodeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the nested map, if this value is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, NodeValue>> {
        match self {
            NodeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Walks `path` through nested maps.
    ///
    /// An unavailable value anywhere along the path makes the whole
    /// projection unavailable; a missing key makes it missing. A path that
    /// ends on a map is treated as missing, since a map has no display form.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Datum {
        let mut current = self;
        for key in path {
            match current {
                NodeValue::Map(m) => match m.get(key.as_ref()) {
                    Some(next) => current = next,
                    None => return Datum::Missing,
                },
                NodeValue::Unavailable(reason) => return Datum::Unavailable(reason.clone()),
                NodeValue::Scalar(_) => return Datum::Missing,
            }
        }
        match current {
            NodeValue::Scalar(s) => Datum::Value(s.clone()),
            NodeValue::Unavailable(reason) => Datum::Unavailable(reason.clone()),
            NodeValue::Map(_) => Datum::Missing,
        }
    }

    /// Like [`lookup`](Self::lookup) but stops on a map and returns it.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&NodeValue> {
        let mut current = self;
        for key in path {
            current = current.as_map()?.get(key.as_ref())?;
        }
        Some(current)
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for NodeValue {
                fn from(v: $ty) -> Self {
                    NodeValue::Scalar(v.into())
                }
            }

            impl From<$ty> for Datum {
                fn from(v: $ty) -> Self {
                    Datum::Value(v.into())
                }
            }
        )*
    };
}

scalar_conversions!(Scalar, bool, i64, i32, u64, f64, &str, String);

impl From<serde_json::Value> for NodeValue {
    /// Converts a JSON tree. `null` becomes unavailable and arrays are
    /// joined into a comma separated text value.
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => NodeValue::unavailable("null"),
            Value::Bool(b) => NodeValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => NodeValue::Scalar(Scalar::Int(i)),
                None => NodeValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => NodeValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                let joined: Vec<String> = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect();
                NodeValue::Scalar(Scalar::Text(joined.join(",")))
            }
            Value::Object(map) => {
                NodeValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// A projected value for one entry of one field.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Value(Scalar),
    /// No value exists at the projected path.
    Missing,
    /// The node could not provide the value.
    Unavailable(String),
}

impl Datum {
    pub fn as_value(&self) -> Option<&Scalar> {
        match self {
            Datum::Value(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Datum::Unavailable(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Datum::Missing)
    }

    /// Sort order for keys: values first in scalar order, then missing, then
    /// unavailable.
    pub fn sort_cmp(&self, other: &Datum) -> Ordering {
        fn rank(d: &Datum) -> u8 {
            match d {
                Datum::Value(_) => 0,
                Datum::Missing => 1,
                Datum::Unavailable(_) => 2,
            }
        }
        match (self, other) {
            (Datum::Value(a), Datum::Value(b)) => a.sort_cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

/// Named data sources: `source -> node -> value`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSources {
    sources: BTreeMap<String, BTreeMap<NodeId, NodeValue>>,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a whole source.
    pub fn with_source<N, V, I>(mut self, name: impl Into<String>, nodes: I) -> Self
    where
        N: Into<NodeId>,
        V: Into<NodeValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        self.sources.insert(
            name.into(),
            nodes
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets the value of one node within a source, creating the source.
    pub fn insert(
        &mut self,
        source: impl Into<String>,
        node: impl Into<NodeId>,
        value: impl Into<NodeValue>,
    ) {
        self.sources
            .entry(source.into())
            .or_default()
            .insert(node.into(), value.into());
    }

    pub fn contains(&self, source: &str) -> bool {
        self.sources.contains_key(source)
    }

    pub fn source(&self, source: &str) -> Option<&BTreeMap<NodeId, NodeValue>> {
        self.sources.get(source)
    }

    pub fn node(&self, source: &str, node: &str) -> Option<&NodeValue> {
        self.sources.get(source)?.get(node)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}
