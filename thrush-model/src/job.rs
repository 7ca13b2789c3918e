/// Ceiling of the job id range; ids live in `[1, MAX_JOB_ID]` and wrap back
/// to 1 on overflow (invariant 6 — zero is never reported to a caller).
pub const MAX_JOB_ID: u32 = 1 << 15;

/// Identifier of one `UpdateJob`, always in `[1, MAX_JOB_ID]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobId(u32);

impl JobId {
    /// `value` must already be in `[1, MAX_JOB_ID]`; use `next`/`advance` to
    /// move through the wrapping sequence instead of constructing out of
    /// range values directly.
    pub fn new(value: u32) -> Self {
        debug_assert!(value >= 1 && value <= MAX_JOB_ID, "job id out of range: {value}");
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id that follows this one in the wrapping sequence.
    pub fn next(self) -> Self {
        if self.0 >= MAX_JOB_ID {
            Self(1)
        } else {
            Self(self.0 + 1)
        }
    }

    /// The id `offset` steps ahead of this one, wrapping as `next()` does.
    pub fn advance(self, offset: u32) -> Self {
        let mut id = self;
        for _ in 0..offset {
            id = id.next();
        }
        id
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a completed `UpdateJob` hands back to the service thread: whether
/// any mutation occurred (gating persistence and idle notifications) keyed
/// by the id the job was spawned with.
///
/// `modified` is owned exclusively by the running job for its lifetime and
/// surfaces here only at completion, rather than as a flag two threads
/// poke at directly (see the open-question note in the design doc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub modified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_to_one_never_zero() {
        let max = JobId::new(MAX_JOB_ID);
        assert_eq!(max.next().get(), 1);
    }

    #[test]
    fn advance_wraps_across_the_boundary() {
        let near_max = JobId::new(MAX_JOB_ID - 1);
        assert_eq!(near_max.advance(3).get(), 2);
    }

    #[test]
    fn display_matches_numeric_value() {
        assert_eq!(JobId::new(7).to_string(), "7");
    }
}
