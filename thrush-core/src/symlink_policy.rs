use std::path::{Component, Path};

/// Classification of a symlink target relative to the music root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkTarget {
    Inside,
    Outside,
}

/// Decides whether a symlink encountered during traversal should be
/// followed, based on whether its target resolves inside or outside the
/// music root.
#[derive(Debug, Clone, Copy)]
pub struct SymlinkPolicy {
    allow_inside: bool,
    allow_outside: bool,
}

impl SymlinkPolicy {
    pub fn new(allow_inside: bool, allow_outside: bool) -> Self {
        Self { allow_inside, allow_outside }
    }

    /// Classifies `target` (the raw `readlink` result) relative to a
    /// traversal currently `depth` directories below the music root.
    ///
    /// An absolute target is always outside. A relative target ascends one
    /// level per leading `..` component; if the ascent count exceeds
    /// `depth` the target escapes the root and is classified outside.
    pub fn classify(target: &Path, depth: usize) -> SymlinkTarget {
        if target.is_absolute() {
            return SymlinkTarget::Outside;
        }

        let mut level = depth as isize;
        for component in target.components() {
            match component {
                Component::ParentDir => level -= 1,
                Component::CurDir => {}
                _ => break,
            }
            if level < 0 {
                return SymlinkTarget::Outside;
            }
        }
        SymlinkTarget::Inside
    }

    /// Whether an entry classified as `target` should be followed.
    pub fn allows(&self, target: SymlinkTarget) -> bool {
        match target {
            SymlinkTarget::Inside => self.allow_inside,
            SymlinkTarget::Outside => self.allow_outside,
        }
    }

    /// Resolves the policy decision for a `readlink` result, including the
    /// "not actually a symlink" failure mode: `EINVAL` is treated as
    /// "permitted, not a symlink", any other `readlink` error skips the
    /// entry.
    pub fn permits_readlink_result(
        &self,
        readlink_result: &std::io::Result<std::path::PathBuf>,
        depth: usize,
    ) -> bool {
        match readlink_result {
            Ok(target) => self.allows(Self::classify(target, depth)),
            Err(err) if err.raw_os_error() == Some(libc_einval()) => true,
            Err(_) => false,
        }
    }
}

/// `EINVAL`'s numeric value, hard-coded rather than pulled from a `libc`
/// dependency this crate otherwise has no use for.
const fn libc_einval() -> i32 {
    22
}
