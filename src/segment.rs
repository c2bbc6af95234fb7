/// Segment table: the heap that pointer-shaped registers index into
///
/// Each live segment has an id (the `segment` half of a [`Reg`]), a kind,
/// and a vector of register cells addressed by the `offset` half. Ids are
/// handed out from 1 upward and the lowest freed id is reused first; 0 and
/// 0xFFFF are reserved for numbers and uninitialized values.
use crate::error::{HeapError, HeapResult};
use crate::reg::{Reg, NUMBER_SEGMENT, UNINIT_REG, UNINIT_SEGMENT};
use log::debug;
use std::fmt;

pub type SegmentId = u16;

/// Largest segment a 16-bit offset can address
pub const MAX_CELLS: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Script,
    Clones,
    Locals,
    Stack,
    Hunk,
    Lists,
    Nodes,
    DynMem,
    Array,
    String,
}

impl SegmentKind {
    pub fn from_name(name: &str) -> Option<SegmentKind> {
        match name {
            "script" => Some(SegmentKind::Script),
            "clones" => Some(SegmentKind::Clones),
            "locals" => Some(SegmentKind::Locals),
            "stack" => Some(SegmentKind::Stack),
            "hunk" => Some(SegmentKind::Hunk),
            "lists" => Some(SegmentKind::Lists),
            "nodes" => Some(SegmentKind::Nodes),
            "dynmem" => Some(SegmentKind::DynMem),
            "array" => Some(SegmentKind::Array),
            "string" => Some(SegmentKind::String),
            _ => None,
        }
    }

    /// Whether `pointer +/- number` is meaningful inside this kind of segment
    pub fn allows_pointer_arithmetic(self) -> bool {
        matches!(
            self,
            SegmentKind::Script | SegmentKind::Locals | SegmentKind::Stack | SegmentKind::DynMem
        )
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentKind::Script => "script",
            SegmentKind::Clones => "clones",
            SegmentKind::Locals => "locals",
            SegmentKind::Stack => "stack",
            SegmentKind::Hunk => "hunk",
            SegmentKind::Lists => "lists",
            SegmentKind::Nodes => "nodes",
            SegmentKind::DynMem => "dynmem",
            SegmentKind::Array => "array",
            SegmentKind::String => "string",
        };
        f.write_str(name)
    }
}

/// What a segment id currently names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub len: usize,
}

#[derive(Debug, Clone)]
struct Segment {
    kind: SegmentKind,
    cells: Vec<Reg>,
}

fn check_cell_count(cells: usize) -> HeapResult<()> {
    if cells > MAX_CELLS {
        return Err(HeapError::TooManyCells(cells));
    }
    Ok(())
}

/// Owner of all segments
#[derive(Debug, Clone)]
pub struct SegmentTable {
    /// Index 0 is the number segment and always stays empty
    slots: Vec<Option<Segment>>,
}

impl Default for SegmentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentTable {
    pub fn new() -> Self {
        SegmentTable { slots: vec![None] }
    }

    /// Create an empty segment of `kind`
    pub fn allocate(&mut self, kind: SegmentKind) -> HeapResult<SegmentId> {
        self.allocate_with(kind, 0)
    }

    /// Create a segment of `kind` with `cells` uninitialized cells
    pub fn allocate_with(&mut self, kind: SegmentKind, cells: usize) -> HeapResult<SegmentId> {
        check_cell_count(cells)?;
        let segment = Segment {
            kind,
            cells: vec![UNINIT_REG; cells],
        };

        let id = match self.slots.iter().skip(1).position(Option::is_none) {
            Some(free) => free + 1,
            None => {
                if self.slots.len() >= UNINIT_SEGMENT as usize {
                    return Err(HeapError::Exhausted);
                }
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[id] = Some(segment);

        let id = id as SegmentId;
        debug!("allocated {} segment {:04x} with {} cells", kind, id, cells);
        Ok(id)
    }

    /// Release a segment; its id becomes available again
    pub fn free(&mut self, id: SegmentId) -> HeapResult<()> {
        let slot = self
            .slot_mut(id)
            .ok_or(HeapError::InvalidSegment(id))?;
        *slot = None;
        debug!("freed segment {:04x}", id);
        Ok(())
    }

    pub fn resolve(&self, id: SegmentId) -> HeapResult<SegmentDescriptor> {
        let segment = self.get(id)?;
        Ok(SegmentDescriptor {
            id,
            kind: segment.kind,
            len: segment.cells.len(),
        })
    }

    pub fn is_valid(&self, id: SegmentId) -> bool {
        self.get(id).is_ok()
    }

    /// Number of live segments
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `pointer` addresses an existing cell
    pub fn contains(&self, pointer: Reg) -> bool {
        self.cell_index(pointer).is_ok()
    }

    pub fn read(&self, pointer: Reg) -> HeapResult<Reg> {
        let index = self.cell_index(pointer)?;
        Ok(self.get(pointer.segment)?.cells[index])
    }

    pub fn write(&mut self, pointer: Reg, value: Reg) -> HeapResult<()> {
        let index = self.cell_index(pointer)?;
        let segment = self.get_mut(pointer.segment)?;
        segment.cells[index] = value;
        Ok(())
    }

    /// Grow or shrink a segment; new cells are uninitialized
    pub fn resize(&mut self, id: SegmentId, cells: usize) -> HeapResult<()> {
        check_cell_count(cells)?;
        let segment = self.get_mut(id)?;
        segment.cells.resize(cells, UNINIT_REG);
        Ok(())
    }

    fn cell_index(&self, pointer: Reg) -> HeapResult<usize> {
        if !pointer.is_pointer() {
            return Err(HeapError::NotAPointer(pointer));
        }
        let segment = self.get(pointer.segment)?;
        let index = pointer.offset as usize;
        if index < segment.cells.len() {
            Ok(index)
        } else {
            Err(HeapError::OutOfBounds {
                segment: pointer.segment,
                offset: pointer.offset,
                len: segment.cells.len(),
            })
        }
    }

    fn slot_mut(&mut self, id: SegmentId) -> Option<&mut Option<Segment>> {
        if id == NUMBER_SEGMENT {
            return None;
        }
        self.slots
            .get_mut(id as usize)
            .filter(|slot| slot.is_some())
    }

    fn get(&self, id: SegmentId) -> HeapResult<&Segment> {
        if id == NUMBER_SEGMENT {
            return Err(HeapError::InvalidSegment(id));
        }
        self.slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(HeapError::InvalidSegment(id))
    }

    fn get_mut(&mut self, id: SegmentId) -> HeapResult<&mut Segment> {
        if id == NUMBER_SEGMENT {
            return Err(HeapError::InvalidSegment(id));
        }
        self.slots
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(HeapError::InvalidSegment(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::make_reg;
    use test_log::test;

    #[test]
    fn test_ids_start_at_one_and_are_reused() {
        let mut table = SegmentTable::new();
        assert!(table.is_empty());
        let a = table.allocate(SegmentKind::Script).unwrap();
        let b = table.allocate(SegmentKind::Locals).unwrap();
        let c = table.allocate(SegmentKind::Stack).unwrap();
        assert_eq!((a, b, c), (1, 2, 3));

        table.free(b).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.allocate(SegmentKind::Array).unwrap(), 2);
        assert_eq!(table.resolve(2).unwrap().kind, SegmentKind::Array);
    }

    #[test]
    fn test_read_write_cells() {
        let mut table = SegmentTable::new();
        let locals = table.allocate_with(SegmentKind::Locals, 4).unwrap();
        let cell = make_reg(locals, 2);

        assert_eq!(table.read(cell), Ok(UNINIT_REG));
        table.write(cell, make_reg(0, 99)).unwrap();
        assert_eq!(table.read(cell), Ok(make_reg(0, 99)));
        assert!(table.contains(cell));
        assert!(!table.contains(make_reg(locals, 4)));
    }

    #[test]
    fn test_invalid_addresses() {
        let mut table = SegmentTable::new();
        let id = table.allocate_with(SegmentKind::DynMem, 2).unwrap();

        assert_eq!(
            table.read(make_reg(0, 1)),
            Err(HeapError::NotAPointer(make_reg(0, 1)))
        );
        assert_eq!(
            table.read(UNINIT_REG),
            Err(HeapError::NotAPointer(UNINIT_REG))
        );
        assert_eq!(
            table.read(make_reg(9, 0)),
            Err(HeapError::InvalidSegment(9))
        );
        assert_eq!(
            table.write(make_reg(id, 2), make_reg(0, 1)),
            Err(HeapError::OutOfBounds { segment: id, offset: 2, len: 2 })
        );
        assert_eq!(table.free(0), Err(HeapError::InvalidSegment(0)));
        assert_eq!(table.free(7), Err(HeapError::InvalidSegment(7)));
    }

    #[test]
    fn test_resize() {
        let mut table = SegmentTable::new();
        let id = table.allocate(SegmentKind::Hunk).unwrap();
        assert_eq!(table.resolve(id).unwrap().len, 0);
        table.resize(id, 8).unwrap();
        assert_eq!(table.resolve(id).unwrap().len, 8);
        assert_eq!(table.read(make_reg(id, 7)), Ok(UNINIT_REG));
    }

    #[test]
    fn test_cell_count_limited_to_offset_range() {
        let mut table = SegmentTable::new();
        let id = table.allocate_with(SegmentKind::Array, MAX_CELLS).unwrap();
        assert!(table.contains(make_reg(id, 0xFFFF)));

        assert_eq!(
            table.allocate_with(SegmentKind::Script, MAX_CELLS + 1),
            Err(HeapError::TooManyCells(MAX_CELLS + 1))
        );
        assert_eq!(
            table.allocate_with(SegmentKind::Script, usize::MAX),
            Err(HeapError::TooManyCells(usize::MAX))
        );
        assert_eq!(table.len(), 1);

        assert_eq!(
            table.resize(id, MAX_CELLS + 1),
            Err(HeapError::TooManyCells(MAX_CELLS + 1))
        );
        assert_eq!(table.resolve(id).unwrap().len, MAX_CELLS);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [SegmentKind::Script, SegmentKind::DynMem, SegmentKind::String] {
            assert_eq!(SegmentKind::from_name(&kind.to_string()), Some(kind));
        }
        assert_eq!(SegmentKind::from_name("heap"), None);
    }

    #[test]
    fn test_pointer_arithmetic_kinds() {
        assert!(SegmentKind::Script.allows_pointer_arithmetic());
        assert!(SegmentKind::DynMem.allows_pointer_arithmetic());
        assert!(!SegmentKind::Clones.allows_pointer_arithmetic());
        assert!(!SegmentKind::Lists.allows_pointer_arithmetic());
    }
}
