use std::time::{Duration, Instant};

struct PendingSave {
    project_id: String,
    deadline: Instant,
}

/// Coalesces bursts of edits into one durable write.
///
/// Each [`schedule`](Self::schedule) call re-arms a single deadline one quiet
/// period in the future. The owner polls [`take_due`](Self::take_due) from its
/// event loop and performs the write when it fires, reading the state as it is
/// at that moment.
pub struct SaveScheduler {
    quiet_period: Duration,
    pending: Option<PendingSave>,
}

impl SaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Arm (or re-arm) the timer for `project_id`.
    pub fn schedule(&mut self, project_id: &str, now: Instant) {
        if let Some(pending) = &self.pending {
            if pending.project_id != project_id {
                log::debug!(
                    "Save for project {} superseded by project {}",
                    pending.project_id,
                    project_id
                );
            }
        }
        self.pending = Some(PendingSave {
            project_id: project_id.to_string(),
            deadline: now + self.quiet_period,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_project(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.project_id.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Disarm and return the project to write if the quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.pending.take().map(|p| p.project_id),
            _ => None,
        }
    }

    /// Drop a pending write for `project_id`. Returns true if one was armed.
    pub fn cancel_for(&mut self, project_id: &str) -> bool {
        if self.pending_project() == Some(project_id) {
            self.pending = None;
            log::debug!("Cancelled pending save for project {}", project_id);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(1000));
        scheduler.schedule("p1", start);
        assert!(scheduler.take_due(start + Duration::from_millis(999)).is_none());
        assert_eq!(
            scheduler.take_due(start + Duration::from_millis(1000)),
            Some("p1".to_string())
        );
        assert!(!scheduler.is_pending());
        assert!(scheduler.take_due(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_rescheduling_pushes_deadline() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(1000));
        for i in 0..20 {
            scheduler.schedule("p1", start + Duration::from_millis(i * 10));
        }
        let last = start + Duration::from_millis(190);
        assert_eq!(scheduler.deadline(), Some(last + Duration::from_millis(1000)));
        assert!(scheduler.take_due(start + Duration::from_millis(1100)).is_none());
        assert!(scheduler.take_due(last + Duration::from_millis(1000)).is_some());
    }

    #[test]
    fn test_cancel_for_only_matching_project() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(1000));
        scheduler.schedule("p1", start);
        assert!(!scheduler.cancel_for("p2"));
        assert!(scheduler.is_pending());
        assert!(scheduler.cancel_for("p1"));
        assert!(scheduler.take_due(start + Duration::from_secs(10)).is_none());
    }
}
