use std::path::Path;
use std::time::Duration;

/// One completion event, emitted in completion order.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// File whose extraction just finished.
    pub path: &'a Path,
}

impl Progress<'_> {
    /// Linear estimate from the average time per completed job.
    pub fn remaining(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let left = u32::try_from(self.total.saturating_sub(self.completed)).ok()?;
        let done = u32::try_from(self.completed).ok()?;
        Some(self.elapsed / done * left)
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}
