//! Minimal Barrier
//!
//! For collectors that never run concurrently with mutators and keep no
//! remembered set. Every access is the raw access; references compare by
//! bit pattern.

use super::{AccessBarrier, AccessKind, BarrierCore};
use crate::register::{RegSet, T0, T1};

pub struct MinimalBarrier {
    core: BarrierCore,
}

impl MinimalBarrier {
    pub fn new(core: BarrierCore) -> Self {
        Self { core }
    }
}

impl AccessBarrier for MinimalBarrier {
    fn core(&self) -> &BarrierCore {
        &self.core
    }

    fn clobbers(&self, kind: AccessKind) -> RegSet {
        match kind {
            AccessKind::Allocate => RegSet::of(&[T0, T1]),
            _ => RegSet::EMPTY,
        }
    }
}
