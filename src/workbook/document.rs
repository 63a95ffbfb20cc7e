//! # Cell List
//!
//! [`WorkbookDocument`] is the ordered, doubly linked list of cells that makes up a
//! page's contents.
//!
//! Cells live in an arena of slots owned by the document. Callers refer to them through
//! [`CellId`] handles, which carry the owning document's identity, the slot index and
//! the slot's generation. A handle therefore doubles as the cell's back-reference to
//! its document:
//!
//! - a handle from another document is rejected (`InvalidOperation`)
//! - a handle whose cell was removed is rejected, even if the slot has been reused,
//!   because removal bumps the slot generation
//!
//! Attaching a cell moves it into the document and removing it moves it back out, so
//! a cell can never be attached to two documents at once.
//!
//! The list carries no internal locking. Mutation requires `&mut self`, which also
//! rules out mutating while iterating.

use crate::cell::{Cell, CodeCell};
use crate::error::{Result, WorkbookError};
use std::fmt;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a cell attached to a [`WorkbookDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    document: DocumentId,
    slot: u32,
    generation: u32,
}

impl CellId {
    /// The document this cell belongs to.
    pub fn document(&self) -> DocumentId {
        self.document
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}.{}", self.slot, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Node {
    cell: Cell,
    previous: Option<CellId>,
    next: Option<CellId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

pub struct WorkbookDocument {
    id: DocumentId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    first: Option<CellId>,
    last: Option<CellId>,
    len: usize,
}

impl WorkbookDocument {
    pub fn new() -> Self {
        Self {
            id: DocumentId::next(),
            slots: Vec::new(),
            free: Vec::new(),
            first: None,
            last: None,
            len: 0,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first_cell(&self) -> Option<CellId> {
        self.first
    }

    pub fn last_cell(&self) -> Option<CellId> {
        self.last
    }

    /// True if `id` refers to a cell currently attached to this document.
    pub fn contains(&self, id: CellId) -> bool {
        self.node(id).is_ok()
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.node(id).ok().map(|node| &node.cell)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.node_mut(id).ok().map(|node| &mut node.cell)
    }

    pub fn previous_cell(&self, id: CellId) -> Option<CellId> {
        self.node(id).ok().and_then(|node| node.previous)
    }

    pub fn next_cell(&self, id: CellId) -> Option<CellId> {
        self.node(id).ok().and_then(|node| node.next)
    }

    /// Appends `cell` after the current last cell.
    pub fn append(&mut self, cell: impl Into<Cell>) -> CellId {
        let previous = self.last;
        let id = self.allocate(Node {
            cell: cell.into(),
            previous,
            next: None,
        });

        match previous {
            Some(previous) => self.link_next(previous, Some(id)),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        self.len += 1;
        id
    }

    pub fn insert_before(&mut self, anchor: CellId, cell: impl Into<Cell>) -> Result<CellId> {
        let previous = self.node(anchor)?.previous;
        let id = self.allocate(Node {
            cell: cell.into(),
            previous,
            next: Some(anchor),
        });

        match previous {
            Some(previous) => self.link_next(previous, Some(id)),
            None => self.first = Some(id),
        }
        self.link_previous(anchor, Some(id));
        self.len += 1;
        Ok(id)
    }

    pub fn insert_after(&mut self, anchor: CellId, cell: impl Into<Cell>) -> Result<CellId> {
        let next = self.node(anchor)?.next;
        let id = self.allocate(Node {
            cell: cell.into(),
            previous: Some(anchor),
            next,
        });

        match next {
            Some(next) => self.link_previous(next, Some(id)),
            None => self.last = Some(id),
        }
        self.link_next(anchor, Some(id));
        self.len += 1;
        Ok(id)
    }

    /// Detaches the cell and hands it back to the caller.
    pub fn remove(&mut self, id: CellId) -> Result<Cell> {
        self.node(id)?;

        let slot = &mut self.slots[id.slot as usize];
        let node = match slot.node.take() {
            Some(node) => node,
            None => return Err(stale_handle(id)),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);

        match node.previous {
            Some(previous) => self.link_next(previous, node.next),
            None => self.first = node.next,
        }
        match node.next {
            Some(next) => self.link_previous(next, node.previous),
            None => self.last = node.previous,
        }
        self.len -= 1;
        Ok(node.cell)
    }

    pub fn clear(&mut self) {
        while let Some(first) = self.first {
            if self.remove(first).is_err() {
                break;
            }
        }
    }

    /// Walks `index` steps from the first cell.
    pub fn id_at(&self, index: usize) -> Result<CellId> {
        if index >= self.len {
            return Err(WorkbookError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        if index == self.len - 1 {
            if let Some(last) = self.last {
                return Ok(last);
            }
        }
        self.ids()
            .nth(index)
            .ok_or(WorkbookError::IndexOutOfRange {
                index,
                len: self.len,
            })
    }

    pub fn cell_at(&self, index: usize) -> Result<&Cell> {
        let id = self.id_at(index)?;
        self.get(id).ok_or_else(|| stale_handle(id))
    }

    pub fn iter(&self) -> Cells<'_> {
        Cells {
            document: self,
            cursor: self.first,
            remaining: self.len,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.iter().map(|(_, cell)| cell)
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &CodeCell> + '_ {
        self.cells().filter_map(Cell::as_code)
    }

    pub fn first_code_cell(&self) -> Option<CellId> {
        self.iter()
            .find(|(_, cell)| cell.as_code().is_some())
            .map(|(id, _)| id)
    }

    fn allocate(&mut self, node: Node) -> CellId {
        match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.node = Some(node);
                CellId {
                    document: self.id,
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                CellId {
                    document: self.id,
                    slot,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: CellId) -> Result<&Node> {
        if id.document != self.id {
            return Err(WorkbookError::InvalidOperation(format!(
                "{} is not a child of this document",
                id
            )));
        }
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or_else(|| stale_handle(id))
    }

    fn node_mut(&mut self, id: CellId) -> Result<&mut Node> {
        self.node(id)?;
        self.slots[id.slot as usize]
            .node
            .as_mut()
            .ok_or_else(|| stale_handle(id))
    }

    fn link_next(&mut self, id: CellId, next: Option<CellId>) {
        if let Ok(node) = self.node_mut(id) {
            node.next = next;
        }
    }

    fn link_previous(&mut self, id: CellId, previous: Option<CellId>) {
        if let Ok(node) = self.node_mut(id) {
            node.previous = previous;
        }
    }
}

fn stale_handle(id: CellId) -> WorkbookError {
    WorkbookError::InvalidOperation(format!("{} has been removed from its document", id))
}

impl Default for WorkbookDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones get a fresh document identity; handles into the original do not resolve
/// against the copy.
impl Clone for WorkbookDocument {
    fn clone(&self) -> Self {
        self.cells().cloned().collect()
    }
}

impl PartialEq for WorkbookDocument {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.cells().eq(other.cells())
    }
}

impl fmt::Debug for WorkbookDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.cells()).finish()
    }
}

impl Index<usize> for WorkbookDocument {
    type Output = Cell;

    fn index(&self, index: usize) -> &Cell {
        match self.cell_at(index) {
            Ok(cell) => cell,
            Err(_) => panic!(
                "index {} out of range for document with {} cells",
                index, self.len
            ),
        }
    }
}

impl FromIterator<Cell> for WorkbookDocument {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        let mut document = WorkbookDocument::new();
        document.extend(iter);
        document
    }
}

impl Extend<Cell> for WorkbookDocument {
    fn extend<I: IntoIterator<Item = Cell>>(&mut self, iter: I) {
        for cell in iter {
            self.append(cell);
        }
    }
}

impl<'a> IntoIterator for &'a WorkbookDocument {
    type Item = (CellId, &'a Cell);
    type IntoIter = Cells<'a>;

    fn into_iter(self) -> Cells<'a> {
        self.iter()
    }
}

/// Forward iterator over a document, following `next` links from the first cell.
pub struct Cells<'a> {
    document: &'a WorkbookDocument,
    cursor: Option<CellId>,
    remaining: usize,
}

impl<'a> Iterator for Cells<'a> {
    type Item = (CellId, &'a Cell);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.document.node(id).ok()?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((id, &node.cell))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_linkage(
        doc: &WorkbookDocument,
        id: CellId,
        expected_len: usize,
        expected_first: CellId,
        expected_last: CellId,
        expected_previous: Option<CellId>,
        expected_next: Option<CellId>,
    ) {
        assert!(doc.contains(id));
        assert_eq!(id.document(), doc.id());
        assert_eq!(doc.len(), expected_len);
        assert_eq!(doc.first_cell(), Some(expected_first));
        assert_eq!(doc.last_cell(), Some(expected_last));
        assert_eq!(doc.previous_cell(id), expected_previous);
        assert_eq!(doc.next_cell(id), expected_next);
    }

    /// Walks the list both ways and checks it agrees with `len`.
    fn assert_invariants(doc: &WorkbookDocument) {
        let forward: Vec<CellId> = doc.ids().collect();
        assert_eq!(forward.len(), doc.len());

        let mut backward = Vec::new();
        let mut cursor = doc.last_cell();
        while let Some(id) = cursor {
            backward.push(id);
            cursor = doc.previous_cell(id);
        }
        backward.reverse();
        assert_eq!(forward, backward);

        assert_eq!(doc.first_cell(), forward.first().copied());
        assert_eq!(doc.last_cell(), forward.last().copied());
        if let Some(first) = doc.first_cell() {
            assert_eq!(doc.previous_cell(first), None);
        }
        if let Some(last) = doc.last_cell() {
            assert_eq!(doc.next_cell(last), None);
        }
    }

    #[test]
    fn test_append() {
        let mut doc = WorkbookDocument::new();
        assert_eq!(doc.len(), 0);

        let a = doc.append(Cell::markdown("a"));
        assert_linkage(&doc, a, 1, a, a, None, None);

        let b = doc.append(Cell::markdown("b"));
        assert_linkage(&doc, b, 2, a, b, Some(a), None);

        let c = doc.append(Cell::markdown("c"));
        assert_linkage(&doc, c, 3, a, c, Some(b), None);

        let d = doc.append(Cell::markdown("d"));
        assert_linkage(&doc, d, 4, a, d, Some(c), None);

        assert_linkage(&doc, a, 4, a, d, None, Some(b));
        assert_linkage(&doc, b, 4, a, d, Some(a), Some(c));
        assert_linkage(&doc, c, 4, a, d, Some(b), Some(d));
        assert_invariants(&doc);
    }

    #[test]
    fn test_remove() {
        let mut doc = WorkbookDocument::new();

        let a = doc.append(Cell::markdown("a"));
        let removed = doc.remove(a).unwrap();
        assert_eq!(removed, Cell::markdown("a"));
        assert_eq!(doc.len(), 0);
        assert_eq!(doc.first_cell(), None);
        assert_eq!(doc.last_cell(), None);
        assert!(!doc.contains(a));

        let a = doc.append(removed);
        let b = doc.append(Cell::markdown("b"));
        let c = doc.append(Cell::markdown("c"));

        doc.remove(b).unwrap();
        assert_eq!(doc.first_cell(), Some(a));
        assert_eq!(doc.last_cell(), Some(c));
        assert_eq!(doc.next_cell(a), Some(c));
        assert_eq!(doc.previous_cell(c), Some(a));
        assert_invariants(&doc);

        doc.remove(c).unwrap();
        assert_eq!(doc.last_cell(), Some(a));
        assert_eq!(doc.next_cell(a), None);

        doc.remove(a).unwrap();
        assert!(doc.is_empty());
        assert_invariants(&doc);
    }

    #[test]
    fn test_insert_after() {
        let mut doc = WorkbookDocument::new();

        // [a]
        let a = doc.append(Cell::markdown("a"));
        // [a, b]
        let b = doc.insert_after(a, Cell::markdown("b")).unwrap();
        assert_linkage(&doc, b, 2, a, b, Some(a), None);
        // [a, c, b]
        let c = doc.insert_after(a, Cell::markdown("c")).unwrap();
        assert_linkage(&doc, c, 3, a, b, Some(a), Some(b));
        // [a, c, d, b]
        let d = doc.insert_after(c, Cell::markdown("d")).unwrap();
        assert_linkage(&doc, d, 4, a, b, Some(c), Some(b));

        assert_linkage(&doc, a, 4, a, b, None, Some(c));
        assert_linkage(&doc, b, 4, a, b, Some(d), None);
        let buffers: Vec<&str> = doc.cells().map(Cell::buffer).collect();
        assert_eq!(buffers, ["a", "c", "d", "b"]);
    }

    #[test]
    fn test_insert_before() {
        let mut doc = WorkbookDocument::new();

        // [a]
        let a = doc.append(Cell::markdown("a"));
        // [b, a]
        let b = doc.insert_before(a, Cell::markdown("b")).unwrap();
        assert_linkage(&doc, b, 2, b, a, None, Some(a));
        // [b, c, a]
        let c = doc.insert_before(a, Cell::markdown("c")).unwrap();
        assert_linkage(&doc, c, 3, b, a, Some(b), Some(a));
        // [d, b, c, a]
        let d = doc.insert_before(b, Cell::markdown("d")).unwrap();
        assert_linkage(&doc, d, 4, d, a, None, Some(b));

        let buffers: Vec<&str> = doc.cells().map(Cell::buffer).collect();
        assert_eq!(buffers, ["d", "b", "c", "a"]);
        assert_invariants(&doc);
    }

    #[test]
    fn test_foreign_anchor_is_rejected() {
        let mut doc = WorkbookDocument::new();
        let mut other = WorkbookDocument::new();
        let foreign = other.append(Cell::markdown("x"));
        doc.append(Cell::markdown("a"));

        assert!(matches!(
            doc.insert_before(foreign, Cell::markdown("b")),
            Err(WorkbookError::InvalidOperation(_))
        ));
        assert!(matches!(
            doc.insert_after(foreign, Cell::markdown("b")),
            Err(WorkbookError::InvalidOperation(_))
        ));
        assert!(matches!(
            doc.remove(foreign),
            Err(WorkbookError::InvalidOperation(_))
        ));
        assert_eq!(doc.len(), 1);
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_stale_handle_is_rejected_after_slot_reuse() {
        let mut doc = WorkbookDocument::new();
        let a = doc.append(Cell::markdown("a"));
        doc.remove(a).unwrap();

        let b = doc.append(Cell::markdown("b"));
        assert_ne!(a, b);
        assert!(doc.get(a).is_none());
        assert!(matches!(
            doc.remove(a),
            Err(WorkbookError::InvalidOperation(_))
        ));
        assert_eq!(doc.get(b), Some(&Cell::markdown("b")));
    }

    #[test]
    fn test_indexing_matches_iteration() {
        let doc: WorkbookDocument = ["a", "b", "c", "d"]
            .into_iter()
            .map(Cell::markdown)
            .collect();

        for (i, (id, cell)) in doc.iter().enumerate() {
            assert_eq!(doc.id_at(i).unwrap(), id);
            assert_eq!(doc.cell_at(i).unwrap(), cell);
            assert_eq!(&doc[i], cell);
        }

        assert!(matches!(
            doc.cell_at(doc.len()),
            Err(WorkbookError::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert!(WorkbookDocument::new().cell_at(0).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_operator_panics_out_of_range() {
        let doc = WorkbookDocument::new();
        let _ = &doc[0];
    }

    #[test]
    fn test_iteration_is_restartable() {
        let doc: WorkbookDocument = ["a", "b"].into_iter().map(Cell::markdown).collect();
        assert_eq!(doc.iter().count(), 2);
        assert_eq!(doc.iter().count(), 2);
        assert_eq!(doc.iter().size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_invariants_hold_across_mixed_mutations() {
        let mut doc = WorkbookDocument::new();
        let mut live: Vec<CellId> = Vec::new();
        // Deterministic pseudo-random walk over append/insert/remove.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for step in 0..400 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let choice = seed % 4;
            let cell = Cell::markdown(format!("cell {}", step));

            if live.is_empty() || choice == 0 {
                live.push(doc.append(cell));
            } else {
                let anchor = live[(seed as usize / 4) % live.len()];
                match choice {
                    1 => live.push(doc.insert_before(anchor, cell).unwrap()),
                    2 => live.push(doc.insert_after(anchor, cell).unwrap()),
                    _ => {
                        doc.remove(anchor).unwrap();
                        live.retain(|id| *id != anchor);
                        assert!(!doc.contains(anchor));
                    }
                }
            }

            assert_eq!(doc.len(), live.len());
            assert_invariants(&doc);
        }

        for id in &live {
            assert_eq!(id.document(), doc.id());
        }
    }

    #[test]
    fn test_clone_is_a_separate_document() {
        let mut doc = WorkbookDocument::new();
        let a = doc.append(Cell::code("csharp", "1"));
        let copy = doc.clone();

        assert_eq!(copy, doc);
        assert_ne!(copy.id(), doc.id());
        assert!(!copy.contains(a));
    }

    #[test]
    fn test_clear() {
        let mut doc: WorkbookDocument = ["a", "b", "c"].into_iter().map(Cell::markdown).collect();
        doc.clear();
        assert!(doc.is_empty());
        assert_invariants(&doc);
    }

    #[test]
    fn test_get_mut_edits_in_place() {
        let mut doc = WorkbookDocument::new();
        let a = doc.append(Cell::code("csharp", "2 + 2"));
        doc.get_mut(a).unwrap().buffer_mut().push_str(";");
        assert_eq!(doc[0].buffer(), "2 + 2;");
        assert_eq!(doc.code_cells().count(), 1);
    }
}
