use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::Deserializer;

use crate::{AmpErr, Result};

/// Reserved label holding the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Hash, Clone, Debug, PartialEq, Eq)]
pub struct Label {
    key: String,
    value: String,
}

impl Label {
    pub fn from(key: &str, value: &str) -> Label {
        Label { key: key.to_string(), value: value.to_string() }
    }

    pub fn new(key: String, value: String) -> Label {
        Label { key, value }
    }

    pub fn key(&self) -> &String {
        &self.key
    }

    pub fn value(&self) -> &String {
        &self.value
    }
}

/// Ordered label set. Insertion order is kept so that encoding is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new() -> Labels {
        Labels(Vec::new())
    }

    pub fn from_vec(labels: Vec<Label>) -> Labels {
        Labels(labels)
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Labels {
        Labels(pairs.iter().map(|(k, v)| Label::from(k, v)).collect())
    }

    /// Label set of a series: `__name__` first, then `labels` in their given order.
    pub fn with_metric_name(name: &str, labels: &Labels) -> Labels {
        let mut res = Vec::with_capacity(labels.len() + 1);
        res.push(Label::from(METRIC_NAME_LABEL, name));
        res.extend(labels.0.iter().cloned());
        Labels(res)
    }

    pub fn add(&mut self, label: Label) {
        self.0.push(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.iter().find(|l| l.key == key).map(|l| &l.value)
    }

    pub fn metric_name(&self) -> Option<&String> {
        self.get(METRIC_NAME_LABEL)
    }

    pub fn vec(&self) -> &Vec<Label> {
        &self.0
    }

    /// Names must be non-empty and unique within the set.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.0.len());
        for label in self.0.iter() {
            if label.key.is_empty() {
                return Err(AmpErr::EncodingErr("empty label name".to_string()));
            }
            if !seen.insert(label.key.as_str()) {
                return Err(AmpErr::EncodingErr(format!("duplicate label name {}", label.key)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", label.key, label.value)?;
        }
        write!(f, "}}")
    }
}

/// A mapping of label names to values, kept in the order it was written in.
pub fn deserialize_label_pairs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<(String, String)>, D::Error> {
    struct OrderedLabels;

    impl<'de> Visitor<'de> for OrderedLabels {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of label names to values")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Self::Value, M::Error> {
            let mut labels = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((k, v)) = access.next_entry::<String, String>()? {
                labels.push((k, v));
            }
            Ok(labels)
        }
    }

    deserializer.deserialize_map(OrderedLabels)
}

impl From<&Label> for crate::proto::Label {
    fn from(l: &Label) -> Self {
        crate::proto::Label { name: l.key.clone(), value: l.value.clone() }
    }
}

impl From<&crate::proto::Label> for Label {
    fn from(l: &crate::proto::Label) -> Self {
        Label { key: l.name.clone(), value: l.value.clone() }
    }
}
