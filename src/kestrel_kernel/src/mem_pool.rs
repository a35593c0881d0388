//! The fixed-block memory pool backing asynchronous pipe sends.
//!
//! A sender that cannot or does not want to wait fills a pool block, hands
//! it to [`pipe_put_async`](crate::Kernel::pipe_put_async), and the kernel
//! returns the block to the pool when the request reaches a terminal state.
use core::fmt;

use crate::{
    cfg::{POOL_BLOCK_COUNT, POOL_BLOCK_LEN},
    error::{AllocBlockError, BadIdError, FreeBlockError},
    state::Kernel,
};

crate::define_id! {
    /// Identifies an allocated memory pool block.
    pub struct PoolBlockId
}

/// *Memory pool control block* - the pool's storage and free map.
pub(crate) struct MemPoolCb {
    blocks: [[u8; POOL_BLOCK_LEN]; POOL_BLOCK_COUNT],
    /// Bit set = block free.
    free_map: u32,
}

impl MemPoolCb {
    pub(crate) fn new() -> Self {
        Self {
            blocks: [[0; POOL_BLOCK_LEN]; POOL_BLOCK_COUNT],
            free_map: (1 << POOL_BLOCK_COUNT) - 1,
        }
    }

    pub(crate) fn alloc(&mut self) -> Option<PoolBlockId> {
        if self.free_map == 0 {
            return None;
        }
        let index = self.free_map.trailing_zeros() as usize;
        self.free_map &= !(1 << index);
        Some(PoolBlockId::from_index(index))
    }

    pub(crate) fn free(&mut self, block: PoolBlockId) -> Result<(), FreeBlockError> {
        let index = block.index();
        if index >= POOL_BLOCK_COUNT || self.free_map & (1 << index) != 0 {
            return Err(FreeBlockError::BadId);
        }
        self.free_map |= 1 << index;
        Ok(())
    }

    /// Borrow an allocated block's contents.
    pub(crate) fn block(&self, block: PoolBlockId) -> Result<&[u8], BadIdError> {
        let index = block.index();
        if index >= POOL_BLOCK_COUNT || self.free_map & (1 << index) != 0 {
            return Err(BadIdError::BadId);
        }
        Ok(&self.blocks[index])
    }

    pub(crate) fn block_mut(&mut self, block: PoolBlockId) -> Result<&mut [u8], BadIdError> {
        let index = block.index();
        if index >= POOL_BLOCK_COUNT || self.free_map & (1 << index) != 0 {
            return Err(BadIdError::BadId);
        }
        Ok(&mut self.blocks[index])
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free_map.count_ones() as usize
    }
}

impl fmt::Debug for MemPoolCb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemPoolCb")
            .field("free_map", &format_args!("{:#06x}", self.free_map))
            .finish()
    }
}

impl Kernel {
    /// Take a free block. Never waits.
    pub fn pool_alloc(&mut self) -> Result<PoolBlockId, AllocBlockError> {
        self.pool.alloc().ok_or(AllocBlockError::WouldBlock)
    }

    /// Return a block to the pool. Blocks given to
    /// [`pipe_put_async`](Self::pipe_put_async) are returned by the kernel
    /// instead.
    pub fn pool_free(&mut self, block: PoolBlockId) -> Result<(), FreeBlockError> {
        self.pool.free(block)
    }

    /// Borrow an allocated block to fill it in.
    pub fn pool_block_mut(&mut self, block: PoolBlockId) -> Result<&mut [u8], BadIdError> {
        self.pool.block_mut(block)
    }

    /// The number of blocks currently free.
    pub fn pool_blocks_free(&self) -> usize {
        self.pool.free_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_cycle() {
        let mut pool = MemPoolCb::new();
        assert_eq!(pool.free_count(), POOL_BLOCK_COUNT);
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.free_count(), POOL_BLOCK_COUNT - 2);
        pool.block_mut(a).unwrap()[0] = 0xAA;
        pool.free(a).unwrap();
        // double free is rejected
        assert_eq!(pool.free(a), Err(FreeBlockError::BadId));
        // freed blocks cannot be inspected
        assert!(pool.block(a).is_err());
        assert_eq!(pool.free_count(), POOL_BLOCK_COUNT - 1);
    }
}
