//! Lock-free block channel between the audio driver and the UI
//!
//! The capture callback runs on the driver's real-time thread, while the plot
//! lives on the GUI thread. Instead of letting the callback write into the
//! plot directly, each callback hands its sample block to a SPSC ring buffer
//! (`ringbuf`). The UI drains the ring once per frame and keeps only the
//! newest block.
//!
//! - Audio thread is the single producer (one `Vec<f32>` per callback)
//! - UI thread is the single consumer (the only owner of the plot data)
//!
//! When the UI falls behind and the ring is full, new blocks are dropped.
//! Only the most recent block is ever displayed, so nothing of value is lost.

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Producer half (owned by the audio callback)
pub struct BlockProducer {
    producer: ringbuf::HeapProd<Vec<f32>>,
    stats: Arc<BlockStats>,
}

impl BlockProducer {
    /// Publish one callback block. Empty blocks are ignored.
    ///
    /// Returns `false` if the block was dropped because the ring was full.
    #[inline]
    pub fn push(&mut self, block: Vec<f32>) -> bool {
        if block.is_empty() {
            return false;
        }
        match self.producer.try_push(block) {
            Ok(()) => {
                self.stats.pushed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer half (owned by the UI thread)
pub struct BlockConsumer {
    consumer: ringbuf::HeapCons<Vec<f32>>,
    stats: Arc<BlockStats>,
}

impl BlockConsumer {
    /// Drain every pending block and return the newest one, if any arrived
    /// since the last call.
    pub fn latest(&mut self) -> Option<Vec<f32>> {
        let mut newest = None;
        while let Some(block) = self.consumer.try_pop() {
            newest = Some(block);
        }
        newest
    }

    /// Blocks accepted by the producer so far
    pub fn blocks_pushed(&self) -> u64 {
        self.stats.pushed.load(Ordering::Relaxed)
    }

    /// Blocks the producer had to drop because the ring was full
    pub fn blocks_dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct BlockStats {
    pushed: AtomicU64,
    dropped: AtomicU64,
}

/// Create a block channel able to hold `capacity` undrained blocks
pub fn block_channel(capacity: usize) -> (BlockProducer, BlockConsumer) {
    let rb = HeapRb::<Vec<f32>>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    let stats = Arc::new(BlockStats::default());

    (
        BlockProducer {
            producer: prod,
            stats: Arc::clone(&stats),
        },
        BlockConsumer {
            consumer: cons,
            stats,
        },
    )
}
