//! Horizontal band partitioning for multithreaded rendering.
//!
//! The image is split into contiguous row ranges, one per worker thread.
//! Each band is split off the frame buffers with `split_at_mut`, so every
//! thread writes a disjoint slice and no locking is needed.

/// A contiguous run of image rows rendered by one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// First row of the band
    pub y: u32,
    /// Number of rows in the band
    pub height: u32,
    /// Position of the band, top to bottom
    pub index: usize,
}

impl Band {
    pub fn new(y: u32, height: u32, index: usize) -> Self {
        Self { y, height, index }
    }

    /// Get the total number of pixels in this band.
    pub fn pixel_count(&self, width: u32) -> usize {
        self.height as usize * width as usize
    }
}

/// Rows per band so that `threads` bands cover `height` rows.
pub fn lines_per_band(height: u32, threads: usize) -> u32 {
    let threads = threads.max(1) as u32;
    height.div_ceil(threads).max(1)
}

/// Split `height` rows into at most `threads` bands. The last band may be short.
pub fn generate_bands(height: u32, threads: usize) -> Vec<Band> {
    let lines = lines_per_band(height, threads);

    (0..height)
        .step_by(lines as usize)
        .enumerate()
        .map(|(index, y)| Band::new(y, lines.min(height - y), index))
        .collect()
}
