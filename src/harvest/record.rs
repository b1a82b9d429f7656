use crate::protocol::Element;

/// One harvested OAI-PMH record
///
/// Records are transient: the pager yields them one at a time and they are
/// dropped once filtered and mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Opaque OAI identifier from the record header
    pub identifier: String,
    pub datestamp: String,
    /// Header carried `status="deleted"`
    pub deleted: bool,
    /// Root of the metadata tree; absent for deleted records
    pub metadata: Option<Element>,
}

impl Record {
    pub fn new(identifier: impl Into<String>, metadata: Element) -> Self {
        Self {
            identifier: identifier.into(),
            metadata: Some(metadata),
            ..Self::default()
        }
    }

    /// All values under a tag path in the metadata tree
    pub fn values(&self, path: &str) -> Vec<&str> {
        self.metadata
            .as_ref()
            .map(|m| m.values(path))
            .unwrap_or_default()
    }
}

/// Builds an `oai_dc` record from `(tag, value)` pairs
///
/// Handy for profiles and tests that need a record without a server.
pub fn dublin_core_record(identifier: &str, fields: &[(&str, &str)]) -> Record {
    let root = fields.iter().fold(Element::new("oai_dc:dc"), |root, (tag, value)| {
        root.with_child(Element::new(format!("dc:{}", tag)).with_text(*value))
    });
    Record::new(identifier, root)
}
