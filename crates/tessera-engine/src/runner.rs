//! Frame driver: fixed-timestep passes plus one normal pass per frame.
//!
//! Each [`Runner::frame`] adds the frame's duration to an accumulator, runs
//! [`World::update_fixed`] once per whole `fixed_dt` in it (at most
//! `max_fixed_steps` times), then runs [`World::update_normal`] with the
//! frame's duration.
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let world = World::new(CatalogBuilder::new().build().unwrap(), &[]).unwrap();
//! let config = RunConfig { fixed_dt: 0.25, ..Default::default() };
//! let mut runner = Runner::new(world, config).unwrap();
//!
//! runner.frame(0.5);
//! assert_eq!(runner.tick_count(), 2);
//! ```

use std::time::{Duration, Instant};

use crate::config::RunConfig;
use crate::world::World;
use crate::EngineError;

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDiagnostics {
    /// Fixed passes executed this frame.
    pub fixed_steps: u32,
    /// Simulated time discarded because the step budget ran out.
    pub dropped_time: f64,
    /// Wall-clock time spent in fixed passes.
    pub fixed_time: Duration,
    /// Wall-clock time for the whole frame.
    pub total_time: Duration,
}

/// Owns a [`World`] and advances it frame by frame.
pub struct Runner {
    world: World,
    config: RunConfig,
    accumulator: f64,
    frame_counter: u64,
    tick_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("frame_count", &self.frame_counter)
            .field("tick_count", &self.tick_counter)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] if `config` fails validation.
    pub fn new(world: World, config: RunConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            world,
            config,
            accumulator: 0.0,
            frame_counter: 0,
            tick_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Advance by one frame of `frame_dt` seconds.
    ///
    /// Returns whether the world is still running. A stopped world is not
    /// advanced.
    pub fn frame(&mut self, frame_dt: f64) -> bool {
        if !self.world.is_running() {
            return false;
        }
        let frame_start = Instant::now();
        let fixed_dt = self.config.fixed_dt;

        // NaN and negative durations advance nothing.
        self.accumulator += frame_dt.max(0.0);

        let mut fixed_steps = 0;
        while self.accumulator >= fixed_dt && fixed_steps < self.config.max_fixed_steps {
            self.world.update_fixed(fixed_dt as f32);
            self.accumulator -= fixed_dt;
            self.tick_counter += 1;
            fixed_steps += 1;
        }
        let fixed_time = frame_start.elapsed();

        let mut dropped_time = 0.0;
        if self.accumulator >= fixed_dt {
            let kept = self.accumulator % fixed_dt;
            dropped_time = self.accumulator - kept;
            self.accumulator = kept;
            tracing::warn!(
                frame = self.frame_counter,
                max_fixed_steps = self.config.max_fixed_steps,
                dropped_time,
                "fixed step budget exhausted, dropping simulated time"
            );
        }

        let running = self.world.update_normal(frame_dt.max(0.0) as f32);
        self.frame_counter += 1;
        self.last_diagnostics = FrameDiagnostics {
            fixed_steps,
            dropped_time,
            fixed_time,
            total_time: frame_start.elapsed(),
        };
        running
    }

    /// Run up to `count` frames of `frame_dt` each, stopping early when the
    /// world stops. Returns the number of frames executed.
    pub fn run_frames(&mut self, count: u64, frame_dt: f64) -> u64 {
        let start = self.frame_counter;
        for _ in 0..count {
            if !self.frame(frame_dt) {
                break;
            }
        }
        self.frame_counter - start
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Fixed passes executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated fixed time in seconds.
    ///
    /// Computed as `tick_count * fixed_dt` to avoid drift from repeated
    /// addition.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
