//! Row-aligned parallel iteration over flat sample buffers.
//!
//! Grids are stored x-fastest, so a "row" is one run of `row_len` contiguous
//! samples. Chunks always hold whole rows and carry the index of their first
//! row, which lets per-cell kernels recover `(x, y, z)` without shared state.

use rayon::prelude::*;


/// Multiplier for number of chunks relative to CPU threads.
/// Using 3x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 3;

#[inline]
fn auto_chunk_size(len: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (len / num_chunks).max(1)
}

/// Extension trait for row-aligned mutable parallel chunks with automatic sizing.
pub trait ParRowsMutAuto<T: Send> {
    /// Split into mutable parallel chunks aligned to row boundaries.
    /// Yields `(first_row, chunk)` pairs where `chunk` contains complete rows.
    ///
    /// # Panics
    /// Panics if `row_len` is zero or does not divide the slice length.
    fn par_rows_mut_auto<'a>(
        &'a mut self,
        row_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a;
}

impl<T: Send> ParRowsMutAuto<T> for [T] {
    fn par_rows_mut_auto<'a>(
        &'a mut self,
        row_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a,
    {
        assert!(row_len > 0, "row_len must be > 0");
        assert_eq!(
            self.len() % row_len,
            0,
            "slice length {} is not a multiple of row length {}",
            self.len(),
            row_len
        );
        let rows = self.len() / row_len;
        let chunk_rows = auto_chunk_size(rows);
        self.par_chunks_mut(row_len * chunk_rows)
            .enumerate()
            .map(move |(chunk_idx, chunk)| (chunk_idx * chunk_rows, chunk))
    }
}

/// Fills `data` in parallel, calling `f(row, x)` for each cell where `row`
/// is the global row index and `x` the position inside the row.
pub fn fill_rows<T, F>(data: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync + Send,
{
    if data.is_empty() {
        return;
    }

    data.par_rows_mut_auto(row_len)
        .for_each(|(first_row, chunk)| {
            for (local_row, row) in chunk.chunks_mut(row_len).enumerate() {
                let y = first_row + local_row;
                for (x, value) in row.iter_mut().enumerate() {
                    *value = f(y, x);
                }
            }
        });
}

/// Extension trait for chaining `par_zip` calls on mutable slices.
pub trait ParZipMut<'a, T: Send + 'a> {
    /// Zip this slice with another for parallel row-based iteration.
    fn par_zip<U: Send + 'a>(self, other: &'a mut [U]) -> ZippedSlices2<'a, T, U>;
}

impl<'a, T: Send + 'a> ParZipMut<'a, T> for &'a mut [T] {
    fn par_zip<U: Send + 'a>(self, other: &'a mut [U]) -> ZippedSlices2<'a, T, U> {
        ZippedSlices2(self, other)
    }
}

/// Two zipped mutable slices ready for parallel row iteration.
pub struct ZippedSlices2<'a, A: Send, B: Send>(pub &'a mut [A], pub &'a mut [B]);

impl<'a, A: Send + 'a, B: Send + 'a> ZippedSlices2<'a, A, B> {
    /// Zip with a third slice.
    pub fn par_zip<C: Send + 'a>(self, other: &'a mut [C]) -> ZippedSlices3<'a, A, B, C> {
        ZippedSlices3(self.0, self.1, other)
    }

    /// Split into matching row-aligned chunks yielding `(first_row, (a, b))`.
    pub fn par_rows_mut_auto(
        self,
        row_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, (&'a mut [A], &'a mut [B]))> {
        assert_eq!(
            self.0.len(),
            self.1.len(),
            "Zipped slices must have equal length"
        );
        let chunk_size = zipped_chunk_size(self.0.len(), row_len);
        let chunk_rows = chunk_size / row_len;
        self.0
            .par_chunks_mut(chunk_size)
            .zip(self.1.par_chunks_mut(chunk_size))
            .enumerate()
            .map(move |(idx, chunks)| (idx * chunk_rows, chunks))
    }
}

/// Three zipped mutable slices ready for parallel row iteration.
pub struct ZippedSlices3<'a, A: Send, B: Send, C: Send>(
    pub &'a mut [A],
    pub &'a mut [B],
    pub &'a mut [C],
);

impl<'a, A: Send + 'a, B: Send + 'a, C: Send + 'a> ZippedSlices3<'a, A, B, C> {
    /// Split into matching row-aligned chunks yielding `(first_row, (a, b, c))`.
    pub fn par_rows_mut_auto(
        self,
        row_len: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, (&'a mut [A], &'a mut [B], &'a mut [C]))>
    {
        assert_eq!(
            self.0.len(),
            self.1.len(),
            "Zipped slices must have equal length"
        );
        assert_eq!(
            self.0.len(),
            self.2.len(),
            "Zipped slices must have equal length"
        );
        let chunk_size = zipped_chunk_size(self.0.len(), row_len);
        let chunk_rows = chunk_size / row_len;
        self.0
            .par_chunks_mut(chunk_size)
            .zip(self.1.par_chunks_mut(chunk_size))
            .zip(self.2.par_chunks_mut(chunk_size))
            .enumerate()
            .map(move |(idx, ((a, b), c))| (idx * chunk_rows, (a, b, c)))
    }
}

fn zipped_chunk_size(len: usize, row_len: usize) -> usize {
    assert!(row_len > 0, "row_len must be > 0");
    assert_eq!(
        len % row_len,
        0,
        "slice length {} is not a multiple of row length {}",
        len,
        row_len
    );
    row_len * auto_chunk_size(len / row_len)
}
