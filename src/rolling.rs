// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, warn};
use std::collections::VecDeque;

use crate::measurement::{MassDensity, MeasurementFrame, ParticleCount, SectionValidity};

/// Rolling average over the last N accepted frames.
///
/// With N = 1 every frame passes straight through. Otherwise nothing
/// comes out until the window is full, then each push yields the mean
/// of the window.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window: usize,
    frames: VecDeque<MeasurementFrame>,
}

impl RollingAverage {
    pub fn new(window: usize) -> RollingAverage {
        let window = clamp(window);
        RollingAverage {
            window,
            frames: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Changes N. A different size drops everything buffered so far.
    pub fn set_window(&mut self, window: usize) {
        let window = clamp(window);
        if window == self.window {
            return;
        }
        debug!(
            "Rolling window {} -> {}, dropping {} frames",
            self.window,
            window,
            self.frames.len()
        );
        self.window = window;
        self.frames = VecDeque::with_capacity(window);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Adds an accepted frame and returns the averaged frame once the
    /// window is full.
    pub fn push(&mut self, frame: MeasurementFrame) -> Option<MeasurementFrame> {
        if self.window == 1 {
            return Some(frame);
        }
        if self.frames.len() == self.window {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        debug!(
            "[rolling] stored frame {}/{}, PM2.5 = {}, size = {}",
            self.frames.len(),
            self.window,
            frame.mass_density.pm2_5,
            frame.particle_size
        );
        if self.frames.len() < self.window {
            return None;
        }
        Some(self.mean())
    }

    fn mean(&self) -> MeasurementFrame {
        let n = self.frames.len() as f32;
        let (mass, count, size) = self.frames.iter().fold(
            (MassDensity::default(), ParticleCount::default(), 0.0),
            |(m, c, s), f| (m + f.mass_density, c + f.particle_count, s + f.particle_size),
        );
        MeasurementFrame {
            mass_density: mass / n,
            particle_count: count / n,
            particle_size: size / n,
            validity: SectionValidity::ALL,
        }
    }
}

fn clamp(window: usize) -> usize {
    if window < 1 {
        warn!("Rolling window {} is below 1, using 1", window);
        return 1;
    }
    window
}
