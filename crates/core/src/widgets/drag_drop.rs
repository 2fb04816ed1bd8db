use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DragDropError {
    #[error("a code builder needs at least one block")]
    NoBlocks,

    #[error("block orders must be 0..{0} without gaps")]
    InvalidOrder(usize),

    #[error("block {0} does not exist")]
    UnknownBlock(u32),
}

/// One draggable line of code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: u32,
    /// Position of the block in the correct program, zero-based.
    pub order: u32,
    pub text: String,
}

/// Builds a program by dragging blocks from a source tray into a drop zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragDropExercise {
    blocks: Vec<CodeBlock>,
    source: Vec<u32>,
    zone: Vec<u32>,
}

impl DragDropExercise {
    /// # Errors
    ///
    /// Returns `DragDropError::NoBlocks` for an empty exercise and
    /// `DragDropError::InvalidOrder` when orders are not a permutation of `0..n`.
    pub fn new(blocks: Vec<CodeBlock>) -> Result<Self, DragDropError> {
        if blocks.is_empty() {
            return Err(DragDropError::NoBlocks);
        }
        let mut orders: Vec<u32> = blocks.iter().map(|b| b.order).collect();
        orders.sort_unstable();
        let contiguous = orders
            .iter()
            .enumerate()
            .all(|(i, order)| usize::try_from(*order).is_ok_and(|o| o == i));
        if !contiguous {
            return Err(DragDropError::InvalidOrder(blocks.len()));
        }
        let source = blocks.iter().map(|b| b.id).collect();
        Ok(Self {
            blocks,
            source,
            zone: Vec::new(),
        })
    }

    pub fn shuffle_source<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.source.shuffle(rng);
    }

    #[must_use]
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn source(&self) -> &[u32] {
        &self.source
    }

    #[must_use]
    pub fn zone(&self) -> &[u32] {
        &self.zone
    }

    /// Appends a block to the drop zone, taking it from wherever it was.
    ///
    /// # Errors
    ///
    /// Returns `DragDropError::UnknownBlock` for ids not in this exercise.
    pub fn place(&mut self, block: u32) -> Result<(), DragDropError> {
        self.ensure_known(block)?;
        self.source.retain(|id| *id != block);
        self.zone.retain(|id| *id != block);
        self.zone.push(block);
        Ok(())
    }

    /// Moves a block back to the source tray.
    ///
    /// # Errors
    ///
    /// Returns `DragDropError::UnknownBlock` for ids not in this exercise.
    pub fn return_block(&mut self, block: u32) -> Result<(), DragDropError> {
        self.ensure_known(block)?;
        if let Some(pos) = self.zone.iter().position(|id| *id == block) {
            self.zone.remove(pos);
            self.source.push(block);
        }
        Ok(())
    }

    /// Correct when every block sits in the zone in program order.
    #[must_use]
    pub fn check(&self) -> bool {
        self.zone.len() == self.blocks.len()
            && self.zone.iter().enumerate().all(|(index, id)| {
                self.block(*id)
                    .is_some_and(|b| usize::try_from(b.order).is_ok_and(|o| o == index))
            })
    }

    /// Returns every placed block to the source tray, in placement order.
    pub fn reset(&mut self) {
        let placed = std::mem::take(&mut self.zone);
        self.source.extend(placed);
    }

    fn block(&self, id: u32) -> Option<&CodeBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn ensure_known(&self, id: u32) -> Result<(), DragDropError> {
        self.block(id)
            .map(|_| ())
            .ok_or(DragDropError::UnknownBlock(id))
    }
}
