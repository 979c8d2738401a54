//! Group membership. Pure: no sample data is read or changed.

use std::collections::BTreeMap;

use ssa_model::{GroupName, Result, Sample, SampleGroup, SampleId};

/// Copy of `group` with `members` added.
pub fn assign(group: &SampleGroup, members: impl IntoIterator<Item = SampleId>) -> SampleGroup {
    let mut next = group.clone();
    next.members.extend(members);
    next
}

/// One group per distinct key, named `{prefix}{key}`. Samples without a key
/// are left out.
pub fn group_by<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
    prefix: &str,
    role: &str,
    key: impl Fn(&Sample) -> Option<String>,
) -> Result<Vec<SampleGroup>> {
    let mut groups: BTreeMap<String, SampleGroup> = BTreeMap::new();
    for sample in samples {
        let Some(value) = key(sample) else {
            continue;
        };
        if !groups.contains_key(&value) {
            let name = GroupName::new(format!("{prefix}{value}"))?;
            groups.insert(value.clone(), SampleGroup::new(name, role));
        }
        if let Some(group) = groups.get_mut(&value) {
            group.members.insert(sample.id());
        }
    }
    Ok(groups.into_values().collect())
}

/// Groups samples by the text or number of a metadata field. Groups are
/// named `{prefix}{field}={value}`.
pub fn group_by_field<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
    prefix: &str,
    field: &str,
    role: &str,
) -> Result<Vec<SampleGroup>> {
    group_by(samples, &format!("{prefix}{field}="), role, |sample| {
        sample.metadata().field(field).map(|value| match value.as_text() {
            Some(text) => text.to_string(),
            None => value.as_number().map(|n| n.to_string()).unwrap_or_default(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssa_model::{Dataset, FieldValue, SampleMetadata, StandardRef};

    fn sample(id: u64, shape: &str) -> Sample {
        Sample::raw(
            SampleId::new(id),
            SampleMetadata::new(format!("S{id}"), StandardRef::new("generic", "1"))
                .with_field("specimen_shape", FieldValue::Text(shape.to_string())),
            Dataset::from_triples([(0.0, 0.0, 0.1)]),
        )
    }

    #[test]
    fn groups_by_field_value() {
        let samples = [sample(1, "prism"), sample(2, "cylinder"), sample(3, "prism")];
        let groups = group_by_field(&samples, "", "specimen_shape", "shape").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name.as_str(), "specimen_shape=cylinder");
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[1].role, "shape");
    }

    #[test]
    fn samples_without_the_field_are_left_out() {
        let bare = Sample::raw(
            SampleId::new(4),
            SampleMetadata::new("S4", StandardRef::new("generic", "1")),
            Dataset::from_triples([(0.0, 0.0, 0.1)]),
        );
        let samples = [sample(1, "prism"), bare];
        let groups = group_by_field(&samples, "run-3/", "specimen_shape", "shape").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name.as_str(), "run-3/specimen_shape=prism");
        assert!(!groups[0].members.contains(&SampleId::new(4)));
    }

    #[test]
    fn assignment_does_not_touch_the_original() {
        let group = SampleGroup::new(GroupName::new("g").unwrap(), "");
        let next = assign(&group, [SampleId::new(1), SampleId::new(2)]);
        assert!(group.members.is_empty());
        assert_eq!(next.members.len(), 2);
    }
}
