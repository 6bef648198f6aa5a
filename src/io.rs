//! Policy file I/O.
//!
//! Serializes a [`PolicyTrie`] to an opaque binary stream and back. The file
//! carries a magic header and a version byte; integers are little-endian.
//!
//! # Layout
//!
//! ```text
//! "WCPT"                          magic
//! u8                              version (currently 1)
//! u32                             node count
//! per node, in arena order:
//!   u32                           parent index (u32::MAX for the root)
//!   u8                            label flag (0 for the root)
//!   [u64 u32 u64]                 label: branch, choice, context (if flag 1)
//!   u32 {u32}*                    choice set: count, then values
//! u32 {u32 u64}*                  choice counters: count, then (choice, total)
//! ```
//!
//! Parent links give the full structure; the child maps and the terminal
//! index are rebuilt on load. Builders emit parents before children, so a
//! parent index always refers backward; anything else is a malformed file.

use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::decision::Decision;
use crate::trie::{NodeId, PolicyTrie};
use crate::types::{BranchId, ContextId};

const MAGIC: &[u8; 4] = b"WCPT";
const VERSION: u8 = 1;
const NO_PARENT: u32 = u32::MAX;

/// Error type for policy file operations.
#[derive(Debug)]
pub enum PolicyIoError {
    /// File I/O error.
    Io(io::Error),
    /// Malformed file contents.
    Format(String),
    /// The file's version byte is not one this build understands.
    Version(u8),
}

impl From<io::Error> for PolicyIoError {
    fn from(e: io::Error) -> Self {
        PolicyIoError::Io(e)
    }
}

impl std::fmt::Display for PolicyIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyIoError::Io(e) => write!(f, "I/O error: {}", e),
            PolicyIoError::Format(msg) => write!(f, "malformed policy file: {}", msg),
            PolicyIoError::Version(v) => write!(f, "unsupported policy file version: {}", v),
        }
    }
}

impl std::error::Error for PolicyIoError {}

fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_all(&[value])
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

impl PolicyTrie {
    /// Writes the trie to `path`, overwriting any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PolicyIoError> {
        let file = fs::File::create(path)?;
        let mut w = BufWriter::new(file);

        w.write_all(MAGIC)?;
        write_u8(&mut w, VERSION)?;

        write_u32(&mut w, self.nodes.len() as u32)?;
        for node in &self.nodes {
            match node.parent {
                Some(parent) => write_u32(&mut w, parent.index() as u32)?,
                None => write_u32(&mut w, NO_PARENT)?,
            }
            match node.label {
                Some(decision) => {
                    write_u8(&mut w, 1)?;
                    write_u64(&mut w, decision.branch.location())?;
                    write_u32(&mut w, decision.choice)?;
                    write_u64(&mut w, decision.context.frame())?;
                }
                None => write_u8(&mut w, 0)?,
            }
            write_u32(&mut w, node.choices.len() as u32)?;
            for &choice in &node.choices {
                write_u32(&mut w, choice)?;
            }
        }

        // Counters in choice order, for reproducible files.
        let mut counts: Vec<(u32, u64)> = self.choice_counts.iter().map(|(&c, &n)| (c, n)).collect();
        counts.sort_unstable();
        write_u32(&mut w, counts.len() as u32)?;
        for (choice, total) in counts {
            write_u32(&mut w, choice)?;
            write_u64(&mut w, total)?;
        }

        w.flush()?;
        Ok(())
    }

    /// Reads a trie previously written by [`save`][PolicyTrie::save].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PolicyIoError> {
        let file = fs::File::open(path)?;
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PolicyIoError::Format("bad magic header".to_string()));
        }
        let version = read_u8(&mut r)?;
        if version != VERSION {
            return Err(PolicyIoError::Version(version));
        }

        let node_count = read_u32(&mut r)? as usize;
        if node_count == 0 {
            return Err(PolicyIoError::Format("empty node table".to_string()));
        }

        let mut trie = PolicyTrie::empty();
        trie.nodes.clear();
        trie.end_index.clear();

        for index in 0..node_count {
            let parent_raw = read_u32(&mut r)?;
            let parent = if parent_raw == NO_PARENT {
                None
            } else {
                let parent = parent_raw as usize;
                if parent >= index {
                    return Err(PolicyIoError::Format(format!(
                        "node {} has forward parent {}",
                        index, parent
                    )));
                }
                Some(NodeId::new(parent))
            };

            let label = match read_u8(&mut r)? {
                0 => None,
                1 => {
                    let branch = BranchId::new(read_u64(&mut r)?);
                    let choice = read_u32(&mut r)?;
                    let context = ContextId::new(read_u64(&mut r)?);
                    Some(Decision::new(branch, choice, context))
                }
                flag => {
                    return Err(PolicyIoError::Format(format!("bad label flag {}", flag)));
                }
            };

            match (index, parent, label) {
                (0, None, None) => {}
                (0, _, _) => {
                    return Err(PolicyIoError::Format("root must be unlabelled".to_string()));
                }
                (_, Some(_), Some(_)) => {}
                _ => {
                    return Err(PolicyIoError::Format(format!(
                        "node {} lacks a parent or a label",
                        index
                    )));
                }
            }

            let choice_count = read_u32(&mut r)? as usize;
            let mut choices = std::collections::BTreeSet::new();
            for _ in 0..choice_count {
                choices.insert(read_u32(&mut r)?);
            }

            trie.nodes.push(crate::trie::Node {
                parent,
                label,
                edges: std::collections::HashMap::new(),
                choices,
            });
        }

        // Rebuild the child maps from the parent links.
        for index in 1..node_count {
            let (parent, label) = {
                let node = &trie.nodes[index];
                (node.parent.unwrap(), node.label.unwrap())
            };
            let child = NodeId::new(index);
            if trie.nodes[parent.index()].edges.insert(label, child).is_some() {
                return Err(PolicyIoError::Format(format!(
                    "node {} duplicates an edge of node {}",
                    index,
                    parent.index()
                )));
            }
        }

        // Rebuild the terminal index.
        for index in 0..node_count {
            if !trie.nodes[index].choices.is_empty() {
                let label = trie.nodes[index].label;
                trie.end_index.entry(label).or_default().push(NodeId::new(index));
            }
        }

        let count_entries = read_u32(&mut r)? as usize;
        for _ in 0..count_entries {
            let choice = read_u32(&mut r)?;
            let total = read_u64(&mut r)?;
            trie.choice_counts.insert(choice, total);
        }

        Ok(trie)
    }
}
