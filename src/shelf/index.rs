//! The nested document index: ordered branches keyed by display segments,
//! with resolved references or placeholders at the leaves.

#[cfg(test)]
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEntry {
    Resolved(String),
    Placeholder,
}

impl DocumentEntry {
    pub fn is_resolved(&self) -> bool {
        matches!(self, DocumentEntry::Resolved(_))
    }

    pub fn render<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self {
            DocumentEntry::Resolved(location) => location,
            DocumentEntry::Placeholder => placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNode {
    Branch(Branch),
    Leaf(DocumentEntry),
}

/// Insertion-ordered mapping from segment to child node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Branch {
    entries: Vec<(String, IndexNode)>,
}

impl Branch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&IndexNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert `node` under `key` unless the key is taken. Returns whether
    /// the node was inserted.
    pub fn insert_if_absent(&mut self, key: &str, node: IndexNode) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.entries.push((key.to_string(), node));
        true
    }

    /// Child branch under `key`, created when missing. `None` when a leaf
    /// already occupies the key.
    pub fn branch_mut(&mut self, key: &str) -> Option<&mut Branch> {
        let pos = match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                self.entries
                    .push((key.to_string(), IndexNode::Branch(Branch::default())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[pos].1 {
            IndexNode::Branch(branch) => Some(branch),
            IndexNode::Leaf(_) => None,
        }
    }

    #[cfg(test)]
    fn collect_leaves<'a>(
        &'a self,
        prefix: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, &'a DocumentEntry)>,
    ) {
        for (key, node) in &self.entries {
            prefix.push(key.clone());
            match node {
                IndexNode::Leaf(entry) => out.push((prefix.clone(), entry)),
                IndexNode::Branch(branch) => branch.collect_leaves(prefix, out),
            }
            prefix.pop();
        }
    }

    #[cfg(test)]
    fn to_value(&self, placeholder: &str) -> Value {
        let mut map = Map::new();
        for (key, node) in &self.entries {
            let value = match node {
                IndexNode::Branch(branch) => branch.to_value(placeholder),
                IndexNode::Leaf(entry) => Value::String(entry.render(placeholder).to_string()),
            };
            map.insert(key.clone(), value);
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentIndex {
    root: Branch,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Branch {
        &self.root
    }

    /// Insert a leaf at `path`, creating intermediate branches. Never
    /// overwrites an existing node.
    pub fn insert_if_absent(&mut self, path: &[&str], entry: DocumentEntry) -> bool {
        let Some((leaf_key, parents)) = path.split_last() else {
            return false;
        };
        let mut cursor = &mut self.root;
        for segment in parents {
            match cursor.branch_mut(segment) {
                Some(next) => cursor = next,
                None => return false,
            }
        }
        cursor.insert_if_absent(leaf_key, IndexNode::Leaf(entry))
    }

    #[cfg(test)]
    pub fn get(&self, path: &[&str]) -> Option<&DocumentEntry> {
        let (leaf_key, parents) = path.split_last()?;
        let mut cursor = &self.root;
        for segment in parents {
            match cursor.get(segment)? {
                IndexNode::Branch(branch) => cursor = branch,
                IndexNode::Leaf(_) => return None,
            }
        }
        match cursor.get(leaf_key)? {
            IndexNode::Leaf(entry) => Some(entry),
            IndexNode::Branch(_) => None,
        }
    }

    /// Every leaf with its full key path, in document order.
    #[cfg(test)]
    pub fn leaves(&self) -> Vec<(Vec<String>, &DocumentEntry)> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    #[cfg(test)]
    pub fn to_value(&self, placeholder: &str) -> Value {
        self.root.to_value(placeholder)
    }
}
