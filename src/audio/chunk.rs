//! Chunk selection for file playback
//!
//! Every update tick takes the next contiguous slice of the decoded file.
//! The slice is sized relative to the plot width so that the whole file
//! spans roughly `2 * width` ticks.

use std::ops::Range;

/// Samples per chunk for a file of `total` samples and a plot `width`.
///
/// Integer division; a zero width yields an empty chunk.
pub fn chunk_size(total: usize, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    total / (2 * width)
}

/// Range of the chunk starting at `start`.
///
/// The end is clamped to `total - 1`, so the last sample of the file is never
/// part of a chunk. A start past the clamp yields an empty range.
pub fn chunk_range(start: usize, size: usize, total: usize) -> Range<usize> {
    let last = total.saturating_sub(1);
    let end = start.saturating_add(size).min(last);
    let start = start.min(end);
    start..end
}

/// Read position into a decoded sample buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackCursor {
    position: usize,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next sample to play
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Move to `fraction` (0.0 - 1.0) of a buffer of `total` samples
    pub fn seek(&mut self, fraction: f32, total: usize) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.position = ((total as f64 * fraction as f64) as usize).min(total);
    }

    /// Select the next chunk and advance past it.
    ///
    /// Returns `None` once the buffer is exhausted or the chunk size is zero.
    pub fn next_chunk(&mut self, size: usize, total: usize) -> Option<Range<usize>> {
        let range = chunk_range(self.position, size, total);
        if range.is_empty() {
            return None;
        }
        self.position = range.end;
        Some(range)
    }

    /// Position as a fraction of `total`
    pub fn fraction(&self, total: usize) -> f32 {
        if total == 0 {
            return 0.0;
        }
        self.position as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_is_integer_division() {
        assert_eq!(chunk_size(441_000, 800), 275);
        assert_eq!(chunk_size(1600, 800), 1);
        assert_eq!(chunk_size(1599, 800), 0);
        assert_eq!(chunk_size(0, 800), 0);

        for total in [1, 17, 1000, 65_536, 1_234_567] {
            for width in [1, 3, 400, 800, 1920] {
                assert_eq!(chunk_size(total, width), total / (2 * width));
            }
        }
    }

    #[test]
    fn test_chunk_size_zero_width() {
        assert_eq!(chunk_size(1000, 0), 0);
    }

    #[test]
    fn test_chunk_end_never_exceeds_last_index() {
        for total in [1, 2, 10, 1000] {
            for size in [0, 1, 7, 2000] {
                for start in 0..total {
                    let range = chunk_range(start, size, total);
                    assert!(range.end <= total - 1, "{total} {size} {start}");
                    assert!(range.start <= range.end);
                }
            }
        }
    }

    #[test]
    fn test_chunk_range_empty_buffer() {
        assert!(chunk_range(0, 10, 0).is_empty());
    }

    #[test]
    fn test_cursor_walks_whole_file() {
        let total = 100;
        let mut cursor = PlaybackCursor::new();
        let mut covered = 0;
        let mut ticks = 0;

        while let Some(range) = cursor.next_chunk(30, total) {
            assert_eq!(range.start, covered);
            covered = range.end;
            ticks += 1;
        }

        assert_eq!(ticks, 4);
        assert_eq!(covered, 99);
        assert_eq!(cursor.position(), 99);
        assert_eq!(cursor.next_chunk(30, total), None);
    }

    #[test]
    fn test_cursor_zero_size_never_advances() {
        let mut cursor = PlaybackCursor::new();
        assert_eq!(cursor.next_chunk(0, 100), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_cursor_seek_and_fraction() {
        let mut cursor = PlaybackCursor::new();
        cursor.seek(0.5, 200);
        assert_eq!(cursor.position(), 100);
        assert_eq!(cursor.fraction(200), 0.5);

        cursor.seek(2.0, 200);
        assert_eq!(cursor.position(), 200);

        cursor.reset();
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.fraction(0), 0.0);
    }
}
