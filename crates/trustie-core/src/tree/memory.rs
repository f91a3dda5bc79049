//! In-memory [`KeyTree`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Hive, KeyTree, TreeError, TreeResult, TreeValue};

/// Handle to a key in a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryKey(usize);

#[derive(Debug)]
struct Node {
    name: String,
    /// Lowercased name -> node index.
    children: BTreeMap<String, usize>,
    /// Lowercased name -> (original name, value).
    values: BTreeMap<String, (String, TreeValue)>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }
}

/// Arena-backed tree held entirely in memory.
///
/// Deleted keys leave a tombstone so stale handles report
/// [`TreeError::KeyNotFound`] instead of aliasing a new key.
#[derive(Debug)]
pub struct MemoryTree {
    nodes: Mutex<Vec<Option<Node>>>,
}

impl MemoryTree {
    /// Creates an empty tree with one root per [`Hive`].
    pub fn new() -> Self {
        let nodes = Hive::ALL
            .iter()
            .map(|hive| Some(Node::new(hive.name())))
            .collect();
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    fn lock(&self) -> TreeResult<MutexGuard<'_, Vec<Option<Node>>>> {
        self.nodes
            .lock()
            .map_err(|_| TreeError::Backend("memory tree lock poisoned".to_string()))
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

fn node(nodes: &[Option<Node>], key: MemoryKey) -> TreeResult<&Node> {
    nodes
        .get(key.0)
        .and_then(Option::as_ref)
        .ok_or_else(|| TreeError::KeyNotFound(format!("#{}", key.0)))
}

fn node_mut(nodes: &mut [Option<Node>], key: MemoryKey) -> TreeResult<&mut Node> {
    nodes
        .get_mut(key.0)
        .and_then(Option::as_mut)
        .ok_or_else(|| TreeError::KeyNotFound(format!("#{}", key.0)))
}

impl KeyTree for MemoryTree {
    type Key = MemoryKey;

    fn open_hive(&self, hive: Hive) -> TreeResult<MemoryKey> {
        let index = Hive::ALL
            .iter()
            .position(|h| *h == hive)
            .ok_or_else(|| TreeError::KeyNotFound(hive.name().to_string()))?;
        Ok(MemoryKey(index))
    }

    fn open_child(
        &self,
        parent: &MemoryKey,
        name: &str,
        _writable: bool,
    ) -> TreeResult<Option<MemoryKey>> {
        let nodes = self.lock()?;
        let parent = node(&nodes, *parent)?;
        Ok(parent.children.get(&name.to_lowercase()).map(|i| MemoryKey(*i)))
    }

    fn open_or_create_child(&self, parent: &MemoryKey, name: &str) -> TreeResult<MemoryKey> {
        let mut nodes = self.lock()?;
        let folded = name.to_lowercase();
        if let Some(index) = node(&nodes, *parent)?.children.get(&folded) {
            return Ok(MemoryKey(*index));
        }

        let index = nodes.len();
        nodes.push(Some(Node::new(name)));
        node_mut(&mut nodes, *parent)?.children.insert(folded, index);
        Ok(MemoryKey(index))
    }

    fn delete_child(&self, parent: &MemoryKey, name: &str) -> TreeResult<()> {
        let mut nodes = self.lock()?;
        let folded = name.to_lowercase();
        let index = *node(&nodes, *parent)?
            .children
            .get(&folded)
            .ok_or_else(|| TreeError::KeyNotFound(name.to_string()))?;

        if !node(&nodes, MemoryKey(index))?.children.is_empty() {
            return Err(TreeError::KeyHasChildren(name.to_string()));
        }

        node_mut(&mut nodes, *parent)?.children.remove(&folded);
        nodes[index] = None;
        Ok(())
    }

    fn get_value(&self, key: &MemoryKey, name: &str) -> TreeResult<Option<TreeValue>> {
        let nodes = self.lock()?;
        Ok(node(&nodes, *key)?
            .values
            .get(&name.to_lowercase())
            .map(|(_, value)| value.clone()))
    }

    fn set_value(&self, key: &MemoryKey, name: &str, value: &TreeValue) -> TreeResult<()> {
        let mut nodes = self.lock()?;
        node_mut(&mut nodes, *key)?
            .values
            .insert(name.to_lowercase(), (name.to_string(), value.clone()));
        Ok(())
    }

    fn delete_value(&self, key: &MemoryKey, name: &str) -> TreeResult<()> {
        let mut nodes = self.lock()?;
        node_mut(&mut nodes, *key)?
            .values
            .remove(&name.to_lowercase())
            .map(|_| ())
            .ok_or_else(|| TreeError::ValueNotFound(name.to_string()))
    }

    fn value_names(&self, key: &MemoryKey) -> TreeResult<Vec<String>> {
        let nodes = self.lock()?;
        Ok(node(&nodes, *key)?
            .values
            .values()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn child_names(&self, key: &MemoryKey) -> TreeResult<Vec<String>> {
        let nodes = self.lock()?;
        let parent = node(&nodes, *key)?;
        parent
            .children
            .values()
            .map(|index| node(&nodes, MemoryKey(*index)).map(|child| child.name.clone()))
            .collect()
    }
}
