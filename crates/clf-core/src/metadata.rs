//! Format metadata trees.
//!
//! The `Info` element of a process list, and arbitrary metadata nested
//! under it, is stored without interpretation as a recursive tree. Child
//! order is preserved so a read/write cycle keeps the document layout.

/// One node of a metadata tree: a named element with text, attributes and
/// ordered children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    /// Element name.
    pub name: String,
    /// Accumulated character data.
    pub value: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Metadata>,
}

impl Metadata {
    /// Creates an empty node with the given element name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Appends an attribute.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Appends a child node and returns a mutable reference to it.
    pub fn add_child(&mut self, child: Metadata) -> &mut Metadata {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Metadata> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First attribute value with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True when the node carries no text, attributes or children.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.attributes.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_building() {
        let mut info = Metadata::new("Info");
        info.add_attribute("app", "grader");
        let rel = info.add_child(Metadata::new("Release"));
        rel.value = "2026.1".into();
        info.add_child(Metadata::new("Release")).value = "legacy".into();

        assert_eq!(info.attribute("app"), Some("grader"));
        assert_eq!(info.child("Release").unwrap().value, "2026.1");
        assert_eq!(info.children.len(), 2);
        assert!(!info.is_empty());
        assert!(Metadata::new("Empty").is_empty());
    }
}
