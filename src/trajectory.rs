use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::TrajectoryPoint;

/// Append-only store of estimated positions.
///
/// Clones share the same storage: the consumer thread appends, the renderer
/// takes snapshots. Each call holds the lock only for the push or the copy,
/// so readers always see whole points.
#[derive(Clone, Debug, Default)]
pub struct TrajectorySink {
    points: Arc<RwLock<Vec<TrajectoryPoint>>>,
}

impl TrajectorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TrajectoryPoint>> {
        self.points.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TrajectoryPoint>> {
        self.points.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, point: TrajectoryPoint) {
        self.write().push(point);
    }

    pub fn snapshot(&self) -> Vec<TrajectoryPoint> {
        self.read().clone()
    }

    /// The trailing `n` points, oldest first.
    pub fn window(&self, n: usize) -> Vec<TrajectoryPoint> {
        let points = self.read();
        let start = points.len().saturating_sub(n);
        points[start..].to_vec()
    }

    pub fn last(&self) -> Option<TrajectoryPoint> {
        self.read().last().copied()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.write().clear();
    }
}
