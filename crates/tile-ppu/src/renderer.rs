//! Frame renderer: the boundary the host talks to.

use std::io;

use crate::color::ColorTable;
use crate::compose::compose_rows;
use crate::config::RenderConfig;
use crate::palette::{PaletteResolver, ResolverStrategy};
use crate::scene::Scene;
use crate::scheduler::{Task, WorkerPool, partition_rows};
use crate::sprite::SpriteScanlineIndex;
use crate::{SCREEN_HEIGHT, SCREEN_PIXELS, SCREEN_WIDTH};

/// Renders scenes into ARGB32 framebuffers on a fixed worker pool.
///
/// The renderer owns the per-frame scratch (colour-key samples and the
/// sprite scanline index) and reuses it across calls. No pixel state is
/// carried from one frame to the next.
#[derive(Debug)]
pub struct Renderer {
    pool: WorkerPool,
    resolver: PaletteResolver,
    samples: Vec<u8>,
    index: SpriteScanlineIndex,
    frames: u64,
}

impl Renderer {
    /// Spawn the worker pool and pick the resolver strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(config: &RenderConfig) -> io::Result<Self> {
        let resolver = PaletteResolver::new(config.strategy.resolve());
        let pool = WorkerPool::new(config.worker_count())?;
        log::debug!(
            "renderer ready: {} workers, {:?} resolver",
            pool.size(),
            resolver.strategy()
        );
        Ok(Self {
            pool,
            resolver,
            samples: vec![0; SCREEN_PIXELS],
            index: SpriteScanlineIndex::new(),
            frames: 0,
        })
    }

    /// Render one frame of `scene` into `framebuffer`.
    ///
    /// Every pixel is overwritten. Blocks until all workers have finished.
    ///
    /// # Panics
    ///
    /// Panics if `framebuffer` does not hold exactly
    /// `SCREEN_WIDTH * SCREEN_HEIGHT` pixels.
    pub fn render(&mut self, scene: &Scene, framebuffer: &mut [u32]) {
        assert_eq!(
            framebuffer.len(),
            SCREEN_PIXELS,
            "framebuffer must be {SCREEN_WIDTH}x{SCREEN_HEIGHT} pixels"
        );

        self.samples.fill(0);
        self.index.build(&scene.sprites);

        let colors = ColorTable::global();
        let resolver = self.resolver;
        let index = &self.index;
        let ranges = partition_rows(SCREEN_HEIGHT, self.pool.size());

        let mut samples = self.samples.as_mut_slice();
        let mut pixels = framebuffer;
        let mut tasks: Vec<Task<'_>> = Vec::with_capacity(ranges.len());
        for rows in ranges {
            let len = rows.len() * SCREEN_WIDTH;
            let (keys, rest) = std::mem::take(&mut samples).split_at_mut(len);
            samples = rest;
            let (out, rest) = std::mem::take(&mut pixels).split_at_mut(len);
            pixels = rest;

            tasks.push(Box::new(move || {
                compose_rows(scene, index, rows, keys);
                resolver.resolve(keys, &scene.palettes, colors, out);
            }));
        }

        self.pool.run_frame(tasks);
        self.frames += 1;
        log::trace!(
            "frame {} rendered ({} sprite rows)",
            self.frames,
            self.index.total()
        );
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Resolver path in use.
    #[must_use]
    pub fn strategy(&self) -> ResolverStrategy {
        self.resolver.strategy()
    }

    /// Worker threads in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Colour keys of the last rendered frame, row-major.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}
