//! Per-resource events and the assembler that merges aligned values into them.

use crate::cloudwatch::correlate::Alignment;
use crate::cloudwatch::query::Label;
use crate::cloudwatch::statistic;
use crate::cloudwatch::tags::{self, TagMap};
use crate::core::{dedot, AccountContext, Tag};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Field holding the namespace of the metrics in an event.
pub const NAMESPACE_FIELD: &str = "aws.cloudwatch.namespace";
const DIMENSIONS_PREFIX: &str = "aws.dimensions.";
const TAGS_PREFIX: &str = "aws.tags.";

/// Typed value of an event field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Metric value
    Number(f64),
    /// Metadata such as the namespace or region
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One output record per resource identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Key grouping values into this event
    pub identity: String,
    /// Alignment timestamp of the batch
    pub timestamp: DateTime<Utc>,
    /// Region the values were collected from
    pub region: String,
    /// Account the values belong to
    pub account: AccountContext,
    /// Namespace of the first value inserted
    pub namespace: String,
    fields: BTreeMap<String, FieldValue>,
    dimensions: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
}

impl Event {
    /// Creates an event seeded with cloud metadata.
    pub fn new(
        identity: String,
        region: &str,
        account: &AccountContext,
        namespace: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut event = Self {
            identity,
            timestamp,
            region: region.to_string(),
            account: account.clone(),
            namespace: namespace.to_string(),
            fields: BTreeMap::new(),
            dimensions: BTreeMap::new(),
            tags: BTreeMap::new(),
        };

        event.put("cloud.provider", "aws");
        if !region.is_empty() {
            event.put("cloud.region", region);
        }
        if !account.name.is_empty() {
            event.put("cloud.account.name", account.name.as_str());
        }
        if !account.id.is_empty() {
            event.put("cloud.account.id", account.id.as_str());
        }
        event.put(NAMESPACE_FIELD, namespace);
        event
    }

    /// Sets a field; the last write wins.
    pub fn put<V: Into<FieldValue>>(&mut self, path: &str, value: V) {
        self.fields.insert(path.to_string(), value.into());
    }

    /// Sets a dimension; the last write wins.
    pub fn put_dimension(&mut self, name: &str, value: &str) {
        self.dimensions.insert(name.to_string(), value.to_string());
    }

    /// Attaches a tag unless one with the same key is already present.
    ///
    /// Returns true if the tag was added.
    pub fn put_tag(&mut self, key: String, value: String) -> bool {
        match self.tags.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            },
            Entry::Occupied(_) => false,
        }
    }

    /// Field value by path
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.fields.get(path)
    }

    /// Numeric field value by path
    pub fn metric(&self, path: &str) -> Option<f64> {
        match self.fields.get(path) {
            Some(FieldValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    /// Dimension value by name
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions.get(name).map(String::as_str)
    }

    /// Tag value by dedotted key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Flat fields, metrics and metadata
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Dimension name to value
    pub fn dimensions(&self) -> &BTreeMap<String, String> {
        &self.dimensions
    }

    /// Tag key to value
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    #[cfg(test)]
    pub(crate) fn for_test(identity: &str) -> Self {
        use chrono::TimeZone;

        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let account = AccountContext::default();
        Self::new(identity.to_string(), "us-east-1", &account, "AWS/EC2", timestamp)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + self.fields.len() + self.dimensions.len() + self.tags.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("@timestamp", &self.timestamp)?;
        for (path, value) in &self.fields {
            map.serialize_entry(path, value)?;
        }
        for (name, value) in &self.dimensions {
            map.serialize_entry(&format!("{}{}", DIMENSIONS_PREFIX, name), value)?;
        }
        for (key, value) in &self.tags {
            map.serialize_entry(&format!("{}{}", TAGS_PREFIX, key), value)?;
        }
        map.end()
    }
}

/// Lowercased last path segment of a namespace, `AWS/EC2` becomes `ec2`.
pub fn strip_namespace(namespace: &str) -> String {
    namespace
        .rsplit('/')
        .next()
        .unwrap_or(namespace)
        .to_lowercase()
}

/// Field name of the value a label describes.
///
/// `aws.<namespace>.metrics.<metric name>.<statistic>`, with dots in the metric
/// name replaced by underscores.
pub fn generate_field_name(namespace: &str, label: &Label) -> String {
    format!(
        "aws.{}.metrics.{}.{}",
        strip_namespace(namespace),
        dedot(&label.metric_name),
        statistic::field_suffix(&label.statistic)
    )
}

/// Identity used when a label carries no dimension values.
pub fn fallback_identity(region: &str, account_id: &str, namespace: &str) -> String {
    format!("{}{}{}", region, account_id, namespace)
}

/// Merges aligned values into one event per identity for a single pass.
pub struct EventAssembler<'a> {
    region: &'a str,
    account: &'a AccountContext,
    timestamp: DateTime<Utc>,
    index: AHashMap<String, usize>,
    events: Vec<Event>,
}

impl<'a> EventAssembler<'a> {
    /// Creates an empty assembler for one region and alignment timestamp.
    pub fn new(region: &'a str, account: &'a AccountContext, timestamp: DateTime<Utc>) -> Self {
        Self {
            region,
            account,
            timestamp,
            index: AHashMap::new(),
            events: Vec::new(),
        }
    }

    /// Returns true if an event exists for `identity`
    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Number of events assembled so far
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no event has been created
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event for `identity`, if created
    pub fn get_mut(&mut self, identity: &str) -> Option<&mut Event> {
        let idx = *self.index.get(identity)?;
        self.events.get_mut(idx)
    }

    /// Inserts one value, creating the event on first reference.
    pub fn insert(&mut self, identity: &str, label: &Label, value: f64) -> &mut Event {
        let idx = match self.index.get(identity) {
            Some(idx) => *idx,
            None => {
                let event = Event::new(
                    identity.to_string(),
                    self.region,
                    self.account,
                    &label.namespace,
                    self.timestamp,
                );
                self.events.push(event);
                self.index.insert(identity.to_string(), self.events.len() - 1);
                self.events.len() - 1
            },
        };

        let event = &mut self.events[idx];
        event.put(&generate_field_name(&label.namespace, label), value);
        event.put(NAMESPACE_FIELD, label.namespace.as_str());
        for (name, dim_value) in label.dimension_pairs() {
            event.put_dimension(name, dim_value);
        }
        event
    }

    /// Adds every aligned value with no tag gating.
    pub fn add_untagged(&mut self, alignment: &Alignment<'_>) {
        for aligned in &alignment.values {
            let Some(label) = decode_label(aligned.label) else {
                continue;
            };
            let identity = self.identity_for(&label);
            self.insert(&identity, &label, aligned.value);
        }
    }

    /// Adds aligned values for one resource type and attaches its tags.
    ///
    /// With a non-empty `filter`, no event is created for a label without an
    /// identifier, nor for an identifier with no entry in `tag_map`.
    /// `tag_map` must already be reduced to resources matching `filter`.
    pub fn add_tagged(&mut self, alignment: &Alignment<'_>, filter: &[Tag], tag_map: &TagMap) {
        for aligned in &alignment.values {
            let Some(label) = decode_label(aligned.label) else {
                continue;
            };

            let Some(identifier) = label.identifier() else {
                if !filter.is_empty() {
                    continue;
                }
                let identity = self.identity_for(&label);
                self.insert(&identity, &label, aligned.value);
                continue;
            };

            if !self.contains(identifier)
                && !filter.is_empty()
                && tags::lookup_tags(identifier, tag_map).is_empty()
            {
                continue;
            }

            let identifier = identifier.to_string();
            let event = self.insert(&identifier, &label, aligned.value);
            tags::insert_tags(event, tag_map);
        }
    }

    /// Finished events in creation order
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    fn identity_for(&self, label: &Label) -> String {
        match label.identifier() {
            Some(identifier) => identifier.to_string(),
            None => fallback_identity(self.region, &self.account.id, &label.namespace),
        }
    }
}

fn decode_label(raw: &str) -> Option<Label> {
    match Label::decode(raw) {
        Ok(label) => Some(label),
        Err(e) => {
            tracing::error!(error = %e, category = e.category(), "Skipping result with malformed label");
            None
        },
    }
}
