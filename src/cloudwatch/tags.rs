//! Tag predicates, ARN short identifiers and tag lookups for assembled events.

use crate::cloudwatch::event::Event;
use crate::cloudwatch::query::DIMENSION_SEPARATOR;
use crate::core::{dedot, CollectorError, Result, Tag};
use ahash::AHashMap;

/// Tags per resource identifier for one resource type.
pub type TagMap = AHashMap<String, Vec<Tag>>;

const ARN_PREFIX: &str = "arn:";

/// Returns true if every filter tag is present in `tags` with the same value.
pub fn tags_match(filter: &[Tag], tags: &[Tag]) -> bool {
    filter.iter().all(|wanted| {
        tags.iter()
            .any(|tag| tag.key == wanted.key && tag.value == wanted.value)
    })
}

/// Drops resources whose tags fail `filter`.
pub fn retain_matching(tag_map: &mut TagMap, filter: &[Tag], region: &str) {
    tag_map.retain(|identifier, tags| {
        let keep = tags_match(filter, tags);
        if keep {
            tracing::debug!(region, identifier = %identifier, "Resource tags match tags_filter");
        } else {
            tracing::debug!(region, identifier = %identifier, "Resource tags do not match tags_filter");
        }
        keep
    });
}

/// Extracts the short resource id from an ARN.
///
/// `arn:aws:ec2:us-east-1:123456789012:instance/i-0abc` gives `i-0abc`,
/// `arn:aws:s3:::my-bucket` gives `my-bucket`.
pub fn short_identifier_from_arn(arn: &str) -> Result<String> {
    let sections: Vec<&str> = arn.splitn(6, ':').collect();
    if sections.len() != 6 || sections[0] != "arn" {
        return Err(CollectorError::InvalidArn(arn.to_string()));
    }

    let resource = sections[5];
    let parts: Vec<&str> = if resource.contains(':') {
        resource.split(':').collect()
    } else if resource.contains('/') {
        resource.split('/').collect()
    } else {
        vec![resource]
    };

    if parts.len() <= 1 {
        return Ok(resource.to_string());
    }
    Ok(parts[1..].join("/"))
}

/// Tags found for any sub-identifier of a composite event identity.
///
/// Each comma-separated part is looked up directly and, if it is an ARN with
/// no entry of its own, under its short identifier.
pub fn lookup_tags<'a>(identity: &str, tag_map: &'a TagMap) -> Vec<&'a Tag> {
    let mut found = Vec::new();
    for sub_identifier in identity.split(DIMENSION_SEPARATOR) {
        let mut tags = tag_map.get(sub_identifier).filter(|tags| !tags.is_empty());

        if tags.is_none() && sub_identifier.starts_with(ARN_PREFIX) {
            if let Ok(resource_id) = short_identifier_from_arn(sub_identifier) {
                tags = tag_map.get(&resource_id).filter(|tags| !tags.is_empty());
            }
        }

        if let Some(tags) = tags {
            found.extend(tags.iter());
        }
    }
    found
}

/// Attaches `aws.tags.*` fields to `event`; keys are dedotted, values are not.
///
/// Tags already present on the event are left alone.
pub fn insert_tags(event: &mut Event, tag_map: &TagMap) {
    let tags = lookup_tags(&event.identity, tag_map);
    for tag in tags {
        event.put_tag(dedot(&tag.key), tag.value.clone());
    }
}
