use dc_types::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a dataset was picked from.
///
/// Declaration order is the priority order used to find the active dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetSource {
    /// A file the user just uploaded
    Upload,
    /// A file browsed in an object store
    Explorer,
    /// A file inside a public registry dataset
    PublicRegistry,
    /// A dataset found through the metadata search service
    MetadataSearch,
}

impl DatasetSource {
    pub const ALL: [DatasetSource; 4] = [
        DatasetSource::Upload,
        DatasetSource::Explorer,
        DatasetSource::PublicRegistry,
        DatasetSource::MetadataSearch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Explorer => "explorer",
            Self::PublicRegistry => "public-registry",
            Self::MetadataSearch => "metadata-search",
        }
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// At most one selected object per source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSelection {
    selected: BTreeMap<DatasetSource, ObjectId>,
}

impl DatasetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `object` for `source`, returning the previous selection.
    pub fn select(&mut self, source: DatasetSource, object: ObjectId) -> Option<ObjectId> {
        self.selected.insert(source, object)
    }

    pub fn clear(&mut self, source: DatasetSource) -> Option<ObjectId> {
        self.selected.remove(&source)
    }

    pub fn get(&self, source: DatasetSource) -> Option<&ObjectId> {
        self.selected.get(&source)
    }

    /// First selected object in source priority order.
    pub fn active(&self) -> Option<(DatasetSource, &ObjectId)> {
        self.selected.iter().next().map(|(source, object)| (*source, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_selected_has_no_active() {
        assert!(DatasetSelection::new().active().is_none());
    }

    #[test]
    fn active_follows_source_priority() {
        let mut selection = DatasetSelection::new();
        selection.select(DatasetSource::MetadataSearch, ObjectId::from("s3://meta/ds1"));
        selection.select(DatasetSource::Explorer, ObjectId::from("s3://bucket/a.csv"));

        let (source, object) = selection.active().unwrap();
        assert_eq!(source, DatasetSource::Explorer);
        assert_eq!(object.as_str(), "s3://bucket/a.csv");

        selection.select(DatasetSource::Upload, ObjectId::from("s3://uploads/b.csv"));
        assert_eq!(selection.active().unwrap().0, DatasetSource::Upload);

        selection.clear(DatasetSource::Upload);
        selection.clear(DatasetSource::Explorer);
        assert_eq!(selection.active().unwrap().0, DatasetSource::MetadataSearch);
    }

    #[test]
    fn reselecting_replaces_previous() {
        let mut selection = DatasetSelection::new();
        selection.select(DatasetSource::Explorer, ObjectId::from("first"));
        let previous = selection.select(DatasetSource::Explorer, ObjectId::from("second"));
        assert_eq!(previous, Some(ObjectId::from("first")));
        assert_eq!(selection.get(DatasetSource::Explorer), Some(&ObjectId::from("second")));
    }

    #[test]
    fn all_is_in_priority_order() {
        let mut sorted = DatasetSource::ALL;
        sorted.sort();
        assert_eq!(sorted, DatasetSource::ALL);
    }
}
