//! Elevation Profile Queue
//!
//! Terrain heights along the observer-target great circle, fetched one point
//! at a time from an [`ElevationSource`]. The queue can be driven step by step
//! or run to completion, and a [`CancelToken`] stops it between lookups when
//! the inputs change under it.
//!
//! This is a library utility driven by the caller. The crate ships no
//! elevation source and neither [`crate::engine::compute`] nor the binary
//! builds a profile; callers with a DEM or a height service plug it in here.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::geo::{GeoPoint, MEAN_EARTH_RADIUS};
use crate::geodesic::{central_angle_rad, great_circle_path};

/// Ground height lookup. `None` means the source has no data there.
pub trait ElevationSource {
    fn elevation(&self, lat_deg: f64, lon_deg: f64) -> Option<f64>;
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn elevation(&self, lat_deg: f64, lon_deg: f64) -> Option<f64> {
        self(lat_deg, lon_deg)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("elevation profile cancelled after {completed} of {total} points")]
    Cancelled { completed: usize, total: usize },
}

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSample {
    /// Great-circle distance from the start of the path
    pub distance_m: f64,
    pub point: GeoPoint,
    pub elevation_m: Option<f64>,
}

/// Pending elevation lookups along a path.
pub struct ProfileQueue<'a, S: ElevationSource + ?Sized> {
    source: &'a S,
    pending: VecDeque<(f64, GeoPoint)>,
    done: Vec<ProfileSample>,
    total: usize,
}

impl<'a, S: ElevationSource + ?Sized> ProfileQueue<'a, S> {
    /// Queue one lookup every `spacing_m` along the great circle `from` to `to`.
    pub fn along(source: &'a S, from: GeoPoint, to: GeoPoint, spacing_m: f64) -> Self {
        let pending: VecDeque<_> = great_circle_path(from, to, spacing_m)
            .into_iter()
            .map(|p| (MEAN_EARTH_RADIUS * central_angle_rad(&from, &p), p))
            .collect();
        let total = pending.len();
        Self { source, pending, done: Vec::with_capacity(total), total }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    /// Look up the next point. `None` once the queue is empty.
    pub fn step(&mut self) -> Option<&ProfileSample> {
        let (distance_m, point) = self.pending.pop_front()?;
        let elevation_m = self.source.elevation(point.lat_deg, point.lon_deg);
        self.done.push(ProfileSample { distance_m, point, elevation_m });
        self.done.last()
    }

    /// Process every remaining point unless `cancel` is set first.
    pub fn run(mut self, cancel: &CancelToken) -> Result<Vec<ProfileSample>, ProfileError> {
        while !self.is_finished() {
            if cancel.is_cancelled() {
                debug!("profile cancelled with {} points left", self.remaining());
                return Err(ProfileError::Cancelled { completed: self.done.len(), total: self.total });
            }
            self.step();
        }
        Ok(self.done)
    }

    /// Samples looked up so far.
    pub fn samples(&self) -> &[ProfileSample] {
        &self.done
    }
}

// ===================== TESTS =====================
