//! Scratch memory for the solver.
//!
//! The arena is a single `f64` buffer sized once from
//! `Settings::total_reserved_memory`. Everything an island solve needs is
//! carved out of it per island and handed back before the step ends: the
//! sparse Jacobian, the coupling lists, the effective mass and the dense
//! vectors (multipliers, right-hand sides, inverse masses, forces). The
//! arena capacity therefore bounds the largest island that can be solved.
//!
//! Free space is tracked as a list of spans sorted by offset:
//!
//! - `reserve` picks the smallest span that fits (best fit, lowest offset on
//!   ties) and splits off the remainder
//! - `free` re-inserts the block and coalesces it with its left and right
//!   neighbours, so adjacent free spans never coexist
//!
//! [`ScratchStack`] layers LIFO discipline on top: blocks pushed during one
//! island solve are released in reverse order with `release_to(mark)`.

use hashbrown::HashMap;
use sim2d_types::{Result, SimError};
use tracing::debug;

/// Handle to a reserved region of an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    offset: usize,
    len: usize,
}

impl Block {
    /// Offset in words from the start of the arena.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A free span of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    offset: usize,
    len: usize,
}

/// Fixed-capacity word arena with a best-fit free list.
#[derive(Debug, Clone)]
pub struct Arena {
    words: Vec<f64>,
    free: Vec<Span>,
    live: HashMap<usize, usize>,
}

impl Arena {
    /// Arena of `bytes / 8` words.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        let len = bytes / std::mem::size_of::<f64>();
        let mut arena = Self {
            words: vec![0.0; len],
            free: Vec::new(),
            live: HashMap::new(),
        };
        arena.clear();
        arena
    }

    /// Capacity in words.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Total free words.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.iter().map(|s| s.len).sum()
    }

    /// Largest free span in words.
    #[must_use]
    pub fn largest_free(&self) -> usize {
        self.free.iter().map(|s| s.len).max().unwrap_or(0)
    }

    /// Number of free spans.
    #[must_use]
    pub fn fragments(&self) -> usize {
        self.free.len()
    }

    /// Number of live blocks.
    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.live.len()
    }

    /// Reserve `len` zeroed words.
    pub fn reserve(&mut self, len: usize) -> Result<Block> {
        if len == 0 {
            return Ok(Block { offset: 0, len: 0 });
        }
        let best = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, s)| s.len >= len)
            .min_by_key(|(_, s)| (s.len, s.offset))
            .map(|(i, _)| i);
        let Some(index) = best else {
            return Err(SimError::OutOfScratchMemory {
                requested: len,
                available: self.largest_free(),
            });
        };

        let span = &mut self.free[index];
        let block = Block {
            offset: span.offset,
            len,
        };
        if span.len == len {
            self.free.remove(index);
        } else {
            span.offset += len;
            span.len -= len;
        }
        self.words[block.offset..block.end()].fill(0.0);
        self.live.insert(block.offset, block.len);
        Ok(block)
    }

    /// Return `block` to the free list, merging it with free neighbours.
    pub fn free(&mut self, block: Block) -> Result<()> {
        if block.len == 0 {
            return Ok(());
        }
        if self.live.get(&block.offset) != Some(&block.len) {
            return Err(SimError::InvalidArenaBlock {
                offset: block.offset,
                len: block.len,
            });
        }
        self.live.remove(&block.offset);

        let index = self.free.partition_point(|s| s.offset < block.offset);
        let merges_left = index > 0 && {
            let left = self.free[index - 1];
            left.offset + left.len == block.offset
        };
        let merges_right = self
            .free
            .get(index)
            .is_some_and(|right| block.end() == right.offset);

        match (merges_left, merges_right) {
            (true, true) => {
                let right = self.free.remove(index);
                self.free[index - 1].len += block.len + right.len;
            }
            (true, false) => self.free[index - 1].len += block.len,
            (false, true) => {
                let right = &mut self.free[index];
                right.offset = block.offset;
                right.len += block.len;
            }
            (false, false) => self.free.insert(
                index,
                Span {
                    offset: block.offset,
                    len: block.len,
                },
            ),
        }
        Ok(())
    }

    /// Drop every reservation: one free span covering the whole buffer.
    pub fn clear(&mut self) {
        self.live.clear();
        self.free.clear();
        if !self.words.is_empty() {
            self.free.push(Span {
                offset: 0,
                len: self.words.len(),
            });
        }
    }

    fn check(&self, block: &Block) -> Result<()> {
        let owned = block.len == 0 || self.live.get(&block.offset) == Some(&block.len);
        if owned && block.end() <= self.words.len() {
            Ok(())
        } else {
            Err(SimError::InvalidArenaBlock {
                offset: block.offset,
                len: block.len,
            })
        }
    }

    /// View of `block`.
    pub fn slice(&self, block: &Block) -> Result<&[f64]> {
        self.check(block)?;
        Ok(&self.words[block.offset..block.end()])
    }

    /// Mutable view of `block`.
    pub fn slice_mut(&mut self, block: &Block) -> Result<&mut [f64]> {
        self.check(block)?;
        Ok(&mut self.words[block.offset..block.end()])
    }

    /// Simultaneous mutable views of distinct blocks, in argument order.
    pub fn split_mut<const N: usize>(&mut self, blocks: [Block; N]) -> Result<[&mut [f64]; N]> {
        for block in &blocks {
            self.check(block)?;
        }
        let mut order: [usize; N] = std::array::from_fn(|i| i);
        order.sort_by_key(|&i| blocks[i].offset);

        let mut views: [Option<&mut [f64]>; N] = std::array::from_fn(|_| None);
        let mut rest: &mut [f64] = &mut self.words;
        let mut cursor = 0;
        for &i in &order {
            let block = blocks[i];
            if block.len == 0 {
                continue;
            }
            if block.offset < cursor {
                return Err(SimError::InvalidArenaBlock {
                    offset: block.offset,
                    len: block.len,
                });
            }
            let tail = std::mem::take(&mut rest);
            let (_, tail) = tail.split_at_mut(block.offset - cursor);
            let (view, tail) = tail.split_at_mut(block.len);
            views[i] = Some(view);
            rest = tail;
            cursor = block.end();
        }
        Ok(views.map(Option::unwrap_or_default))
    }
}

/// LIFO reservations over an [`Arena`].
///
/// Dropping the stack releases whatever is still on it.
#[derive(Debug)]
pub struct ScratchStack<'a> {
    arena: &'a mut Arena,
    blocks: Vec<Block>,
}

impl<'a> ScratchStack<'a> {
    /// Stack over `arena`.
    pub fn new(arena: &'a mut Arena) -> Self {
        Self {
            arena,
            blocks: Vec::new(),
        }
    }

    /// Reserve `len` zeroed words on top of the stack.
    pub fn push(&mut self, len: usize) -> Result<Block> {
        let block = self.arena.reserve(len)?;
        self.blocks.push(block);
        Ok(block)
    }

    /// Current depth, for a later [`release_to`](Self::release_to).
    #[must_use]
    pub fn mark(&self) -> usize {
        self.blocks.len()
    }

    /// Free blocks pushed after `mark`, newest first.
    pub fn release_to(&mut self, mark: usize) -> Result<()> {
        while self.blocks.len() > mark {
            if let Some(block) = self.blocks.pop() {
                self.arena.free(block)?;
            }
        }
        Ok(())
    }

    /// The underlying arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &*self.arena
    }

    /// The underlying arena, mutably (for views).
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut *self.arena
    }
}

impl Drop for ScratchStack<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release_to(0) {
            debug!(%err, "scratch stack release failed");
        }
    }
}
