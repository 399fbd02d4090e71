//! In-Memory Filesystem
//!
//! A fixed-capacity node arena forming a rooted tree of files and
//! directories. All state is volatile — the tree lives entirely in RAM
//! and vanishes on reboot. Slot 0 is permanently the root directory;
//! `parent` links are non-owning indices back into the arena, so the
//! table itself owns every node and there is no cyclic ownership to
//! untangle.
//!
//! Paths are `/`-delimited, absolute or relative-to-root ("`/`", the
//! empty path, and "`.`" all alias the root; there is no `..`).
//! Component names are bounded and silently truncated, matching the
//! bounded name field of the nodes themselves.

use crate::interrupt_lock::InterruptSafeLock;
use heapless::{String, Vec};

#[cfg(test)]
mod tests;

/// Fixed arena capacity, including the root.
pub const MAX_NODES: usize = 64;
/// Name field capacity; components keep at most `MAX_NAME - 1` bytes.
pub const MAX_NAME: usize = 32;
/// File content capacity; writes beyond this are truncated.
pub const MAX_CONTENT: usize = 4096;

/// Slot 0 is always the root directory.
const ROOT: usize = 0;

/// Filesystem operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Path does not resolve
    NotFound,
    /// Path (or a parent) resolves to a file where a directory is needed
    NotADirectory,
    /// Path resolves to a directory where a file is needed
    IsADirectory,
    /// Creation target already resolves
    AlreadyExists,
    /// Directory still has live children
    NotEmpty,
    /// Node table is full
    NoSpace,
    /// The root cannot be deleted
    PermissionDenied,
    /// Malformed path (empty, or no final component)
    InvalidPath,
}

impl core::fmt::Display for FsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FsError::NotFound => write!(f, "File or directory not found"),
            FsError::NotADirectory => write!(f, "Not a directory"),
            FsError::IsADirectory => write!(f, "Is a directory"),
            FsError::AlreadyExists => write!(f, "File or directory already exists"),
            FsError::NotEmpty => write!(f, "Directory not empty"),
            FsError::NoSpace => write!(f, "Filesystem out of space"),
            FsError::PermissionDenied => write!(f, "Permission denied"),
            FsError::InvalidPath => write!(f, "Invalid path"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Directory entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name (not full path)
    pub name: String<MAX_NAME>,
    /// Whether this entry is a directory
    pub is_dir: bool,
}

/// File metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Content size in bytes (zero for directories)
    pub size: usize,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// One arena slot.
///
/// Invariants: every used node except the root has a used directory as
/// its parent; names are unique among siblings (enforced by the
/// create paths, which refuse to create over a resolving path).
struct Node {
    used: bool,
    kind: NodeKind,
    parent: Option<usize>,
    name: String<MAX_NAME>,
    content: Vec<u8, MAX_CONTENT>,
}

impl Node {
    const fn free() -> Self {
        Node {
            used: false,
            kind: NodeKind::File,
            parent: None,
            name: String::new(),
            content: Vec::new(),
        }
    }

    fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Return the slot to the free pool, clearing its contents.
    fn clear(&mut self) {
        self.used = false;
        self.kind = NodeKind::File;
        self.parent = None;
        self.name.clear();
        self.content.clear();
    }
}

/// Truncate a path component to what a node's name field can hold,
/// respecting UTF-8 boundaries.
fn truncate_name(name: &str) -> &str {
    if name.len() < MAX_NAME {
        return name;
    }
    let mut end = MAX_NAME - 1;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

pub struct RamFs {
    nodes: [Node; MAX_NODES],
}

impl RamFs {
    /// An unformatted arena: every slot free, including the root.
    /// Call [`RamFs::format`] before use.
    pub const fn new() -> Self {
        const FREE: Node = Node::free();
        RamFs {
            nodes: [FREE; MAX_NODES],
        }
    }

    /// Reset the arena to a single empty root directory.
    pub fn format(&mut self) {
        for node in self.nodes.iter_mut() {
            node.clear();
        }
        let root = &mut self.nodes[ROOT];
        root.used = true;
        root.kind = NodeKind::Directory;
        root.parent = None;
        let _ = root.name.push('/');
    }

    /// Resolve a path to its slot index.
    ///
    /// Walks component by component from the root; at each step the
    /// whole table is scanned for a live child of the current node
    /// with the component's name, first match in table order winning.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        if path.is_empty() || path == "/" || path == "." {
            return Some(ROOT);
        }

        let mut current = ROOT;
        for part in path.split('/') {
            if part.is_empty() {
                continue;
            }
            current = self.child_named(current, truncate_name(part))?;
        }
        Some(current)
    }

    /// Resolution success as a boolean.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// Size and kind of whatever the path resolves to.
    pub fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let idx = self.resolve(path).ok_or(FsError::NotFound)?;
        let node = &self.nodes[idx];
        Ok(FileStat {
            size: node.content.len(),
            is_dir: node.is_dir(),
        })
    }

    /// List the immediate live children of a directory, in table
    /// order. An empty directory yields an empty list, distinct from
    /// any error.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry, MAX_NODES>, FsError> {
        let dir = self.resolve(path).ok_or(FsError::NotFound)?;
        if !self.nodes[dir].is_dir() {
            return Err(FsError::NotADirectory);
        }

        let mut entries = Vec::new();
        for node in self.nodes.iter() {
            if node.used && node.parent == Some(dir) {
                let _ = entries.push(DirEntry {
                    name: node.name.clone(),
                    is_dir: node.is_dir(),
                });
            }
        }
        Ok(entries)
    }

    /// Copy a file's content into `out`, truncated to `out`'s
    /// capacity. Returns the byte count copied.
    pub fn read(&self, path: &str, out: &mut [u8]) -> Result<usize, FsError> {
        let idx = self.resolve(path).ok_or(FsError::NotFound)?;
        let node = &self.nodes[idx];
        if node.is_dir() {
            return Err(FsError::IsADirectory);
        }

        let count = node.content.len().min(out.len());
        out[..count].copy_from_slice(&node.content[..count]);
        Ok(count)
    }

    /// Write a file: overwrite in place if the path resolves to one,
    /// otherwise create it under its parent directory. Content beyond
    /// the node capacity is truncated; size tracks the stored bytes.
    pub fn write(&mut self, path: &str, content: &[u8]) -> Result<(), FsError> {
        if let Some(idx) = self.resolve(path) {
            if self.nodes[idx].is_dir() {
                return Err(FsError::IsADirectory);
            }
            Self::store_content(&mut self.nodes[idx], content);
            return Ok(());
        }

        let (parent, name) = self.split_parent(path)?;
        self.create(parent, name, NodeKind::File, content)
    }

    /// Create a directory. Fails outright if the path already
    /// resolves to anything.
    pub fn create_dir(&mut self, path: &str) -> Result<(), FsError> {
        if self.resolve(path).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let (parent, name) = self.split_parent(path)?;
        self.create(parent, name, NodeKind::Directory, &[])
    }

    /// Delete a file or empty directory, freeing its slot for reuse.
    /// The root is never deletable.
    pub fn remove(&mut self, path: &str) -> Result<(), FsError> {
        let idx = self.resolve(path).ok_or(FsError::NotFound)?;
        if idx == ROOT {
            return Err(FsError::PermissionDenied);
        }

        if self.nodes[idx].is_dir() && self.has_children(idx) {
            return Err(FsError::NotEmpty);
        }

        self.nodes[idx].clear();
        Ok(())
    }

    fn child_named(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.used && n.parent == Some(parent) && n.name.as_str() == name)
    }

    fn has_children(&self, parent: usize) -> bool {
        self.nodes
            .iter()
            .any(|n| n.used && n.parent == Some(parent))
    }

    fn first_free_slot(&self) -> Option<usize> {
        // The root's slot is never in the free pool.
        (1..MAX_NODES).find(|&i| !self.nodes[i].used)
    }

    /// Derive the parent directory slot and final component of a
    /// creation target: split at the last `/`, root-relative if there
    /// is none. The parent must resolve and be a directory — one total
    /// precondition check covering both failure cases.
    fn split_parent<'a>(&self, path: &'a str) -> Result<(usize, &'a str), FsError> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let (parent, name) = match trimmed.rfind('/') {
            Some(pos) if pos > 0 => {
                let parent = self.resolve(&trimmed[..pos]).ok_or(FsError::NotFound)?;
                (parent, &trimmed[pos + 1..])
            }
            _ => (ROOT, trimmed.trim_start_matches('/')),
        };

        if name.is_empty() {
            return Err(FsError::InvalidPath);
        }
        if !self.nodes[parent].is_dir() {
            return Err(FsError::NotADirectory);
        }

        Ok((parent, truncate_name(name)))
    }

    fn create(
        &mut self,
        parent: usize,
        name: &str,
        kind: NodeKind,
        content: &[u8],
    ) -> Result<(), FsError> {
        let slot = self.first_free_slot().ok_or(FsError::NoSpace)?;

        let node = &mut self.nodes[slot];
        node.used = true;
        node.kind = kind;
        node.parent = Some(parent);
        node.name.clear();
        let _ = node.name.push_str(name);
        Self::store_content(node, content);
        Ok(())
    }

    fn store_content(node: &mut Node, content: &[u8]) {
        let take = content.len().min(MAX_CONTENT);
        node.content.clear();
        let _ = node.content.extend_from_slice(&content[..take]);
    }
}

/// The filesystem singleton, formatted once by [`init`] at boot and
/// accessed only from synchronous context thereafter. The interrupt-
/// masking lock keeps the discipline uniform should a future caller
/// ever reach it from interrupt context.
pub static RAMFS: InterruptSafeLock<RamFs> = InterruptSafeLock::new(RamFs::new(), "RAMFS");

/// Format the global filesystem: one empty root directory.
pub fn init() {
    RAMFS.lock().format();
}

/// Run `f` with the global filesystem locked.
pub fn with<R>(f: impl FnOnce(&mut RamFs) -> R) -> R {
    f(&mut RAMFS.lock())
}
