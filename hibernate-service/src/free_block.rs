//! Free-block list
//!
//! Unused memory found while scanning the volatile memory owner. Blocks are kept sorted by start
//! address and touching blocks of the same kind are merged, so the list stays small enough to
//! build on the idle stack.
use heapless::Vec;

use crate::memory::Region;

/// Capacity of a [`FreeBlockList`]
pub const MAX_FREE_BLOCKS: usize = 16;

/// Free blocks smaller than this are saved anyway, describing the gap costs more than the data
pub const MIN_FREE_BLOCK: u32 = 16;

/// Where a free block came from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockKind {
    /// Unallocated heap
    Heap,
    /// Unused part of a task stack
    Stack,
}

/// Block of memory whose content need not survive hibernation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FreeBlock {
    /// Origin of the block
    pub kind: BlockKind,
    /// First address
    pub start: u32,
    /// Length in bytes
    pub size: u32,
}

impl FreeBlock {
    /// Create a block
    pub const fn new(kind: BlockKind, start: u32, size: u32) -> Self {
        Self { kind, start, size }
    }

    /// One past the last address
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.size)
    }

    fn touches(&self, later: &FreeBlock) -> bool {
        self.kind == later.kind && self.end() >= later.start
    }

    fn extend_to(&mut self, end: u32) {
        self.size = self.end().max(end) - self.start;
    }
}

/// Sorted, coalesced list of free blocks
#[derive(Clone, Debug, Default)]
pub struct FreeBlockList {
    blocks: Vec<FreeBlock, MAX_FREE_BLOCKS>,
}

impl FreeBlockList {
    /// Create an empty list
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Number of blocks after coalescing
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if no block was recorded
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = &FreeBlock> {
        self.blocks.iter()
    }

    /// Total free bytes
    pub fn free_bytes(&self) -> u32 {
        self.blocks.iter().fold(0u32, |acc, b| acc.saturating_add(b.size))
    }

    /// Record `block`, merging it with touching blocks of the same kind
    ///
    /// Returns the block back if it could not be merged and the list is full. Dropping it only
    /// costs image space.
    pub fn insert(&mut self, block: FreeBlock) -> Result<(), FreeBlock> {
        if block.size == 0 {
            return Ok(());
        }

        let pos = self
            .blocks
            .iter()
            .position(|b| b.start > block.start)
            .unwrap_or(self.blocks.len());
        let previous = pos.checked_sub(1);

        let index = if let Some(prev) = previous.filter(|&i| self.blocks.get(i).is_some_and(|p| p.touches(&block))) {
            if let Some(p) = self.blocks.get_mut(prev) {
                p.extend_to(block.end());
            }
            prev
        } else if let Some(next) = self.blocks.get_mut(pos).filter(|n| block.touches(n)) {
            let end = next.end().max(block.end());
            next.start = block.start;
            next.size = end - block.start;
            pos
        } else {
            self.blocks.insert(pos, block)?;
            pos
        };

        self.absorb_following(index);
        Ok(())
    }

    fn absorb_following(&mut self, index: usize) {
        while let (Some(current), Some(next)) = (self.blocks.get(index).copied(), self.blocks.get(index + 1).copied()) {
            if !current.touches(&next) {
                break;
            }
            if let Some(c) = self.blocks.get_mut(index) {
                c.extend_to(next.end());
            }
            self.blocks.remove(index + 1);
        }
    }

    /// Call `f` with `(start, len)` of every part of `region` not covered by a free block
    pub fn for_each_used<E>(&self, region: Region, mut f: impl FnMut(u32, u32) -> Result<(), E>) -> Result<(), E> {
        let end = region.end();
        let mut cursor = region.start;

        for block in self.blocks.iter().filter(|b| b.size >= MIN_FREE_BLOCK) {
            let start = block.start.max(cursor);
            let stop = block.end().min(end);
            if start >= stop {
                continue;
            }
            if start > cursor {
                f(cursor, start - cursor)?;
            }
            cursor = stop;
        }

        if end > cursor {
            f(cursor, end - cursor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn heap(start: u32, size: u32) -> FreeBlock {
        FreeBlock::new(BlockKind::Heap, start, size)
    }

    fn stack(start: u32, size: u32) -> FreeBlock {
        FreeBlock::new(BlockKind::Stack, start, size)
    }

    fn blocks(list: &FreeBlockList) -> heapless::Vec<(u32, u32), MAX_FREE_BLOCKS> {
        list.iter().map(|b| (b.start, b.size)).collect()
    }

    #[test]
    fn test_sorted_and_coalesced() {
        let mut list = FreeBlockList::new();
        list.insert(heap(300, 50)).unwrap();
        list.insert(heap(100, 50)).unwrap();
        list.insert(heap(150, 20)).unwrap();
        list.insert(heap(200, 0)).unwrap();

        assert_eq!(blocks(&list), [(100, 70), (300, 50)]);

        // Bridges the gap between both blocks
        list.insert(heap(170, 130)).unwrap();
        assert_eq!(blocks(&list), [(100, 250)]);
        assert_eq!(list.free_bytes(), 250);
    }

    #[test]
    fn test_kinds_not_merged() {
        let mut list = FreeBlockList::new();
        list.insert(heap(0, 64)).unwrap();
        list.insert(stack(64, 64)).unwrap();

        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_full_list() {
        let mut list = FreeBlockList::new();
        for i in 0..MAX_FREE_BLOCKS as u32 {
            list.insert(heap(i * 100, 10)).unwrap();
        }

        assert_eq!(list.insert(heap(5_000, 10)), Err(heap(5_000, 10)));
        // Merging needs no new slot
        assert_eq!(list.insert(heap(110, 20)), Ok(()));
        assert_eq!(list.insert(heap(195, 5)), Ok(()));
        assert_eq!(list.len(), MAX_FREE_BLOCKS);
        assert_eq!(list.iter().nth(1), Some(&heap(100, 30)));
        assert_eq!(list.iter().nth(2), Some(&heap(195, 15)));
    }

    #[rstest]
    #[case::no_free(&[], &[(0, 256)])]
    #[case::middle(&[(64, 64)], &[(0, 64), (128, 128)])]
    #[case::edges(&[(0, 32), (224, 32)], &[(32, 192)])]
    #[case::spans_region(&[(0, 1024)], &[])]
    #[case::outside(&[(512, 64)], &[(0, 256)])]
    #[case::too_small(&[(64, MIN_FREE_BLOCK - 1)], &[(0, 256)])]
    fn test_used_extents(#[case] free: &[(u32, u32)], #[case] expected: &[(u32, u32)]) {
        let mut list = FreeBlockList::new();
        for &(start, size) in free {
            list.insert(heap(start, size)).unwrap();
        }

        let mut used = heapless::Vec::<(u32, u32), 8>::new();
        list.for_each_used(Region::new(0, 256), |start, len| used.push((start, len)))
            .unwrap();
        assert_eq!(used.as_slice(), expected);
    }
}
