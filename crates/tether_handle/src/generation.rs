//! Generation counters and shell identities.
//!
//! Every pooled shell carries a [`Generation`] that advances each time the
//! shell is pulled out of its pool for a new life. A [`HandleId`] pairs the
//! shell's [`ShellId`] with the generation of one life, so an id captured
//! under an older generation can never be mistaken for the current one.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter distinguishing successive lives of one pooled shell.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly allocated shell that has never been live.
    pub const UNUSED: Self = Self(0);

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Moves to the next generation.
    ///
    /// Saturates at `u64::MAX`. A shell whose generation is
    /// [exhausted](Self::is_exhausted) is retired instead of pooled, so a
    /// saturated generation is never issued twice.
    #[inline]
    pub(crate) fn advance(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Whether no later generation can be issued.
    #[inline]
    pub(crate) const fn is_exhausted(self) -> bool {
        self.0 == u64::MAX
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-unique identity of one allocated shell.
///
/// A shell keeps its id across pool round-trips; only its [`Generation`]
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShellId(u64);

impl ShellId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one handle life: a shell plus the generation it was live under.
///
/// Used as the resource identity in log output and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId {
    shell: ShellId,
    generation: Generation,
}

impl HandleId {
    pub(crate) const fn new(shell: ShellId, generation: Generation) -> Self {
        Self { shell, generation }
    }

    /// The shell this life runs on.
    #[must_use]
    pub const fn shell(self) -> ShellId {
        self.shell
    }

    /// The generation of this life.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shell#{}/gen{}", self.shell.0, self.generation.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_advances_monotonically() {
        let mut generation = Generation::UNUSED;
        assert_eq!(generation.get(), 0);

        generation.advance();
        generation.advance();
        assert_eq!(generation.get(), 2);
        assert!(generation > Generation::UNUSED);
    }

    #[test]
    fn generation_saturates_instead_of_wrapping() {
        let mut generation = Generation(u64::MAX);
        generation.advance();
        assert_eq!(generation.get(), u64::MAX);
        assert!(generation.is_exhausted());
        assert!(!Generation::UNUSED.is_exhausted());
    }

    #[test]
    fn shell_ids_are_unique() {
        let a = ShellId::next();
        let b = ShellId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn handle_id_distinguishes_generations() {
        let shell = ShellId::next();
        let first = HandleId::new(shell, Generation(1));
        let second = HandleId::new(shell, Generation(2));

        assert_ne!(first, second);
        assert_eq!(first.shell(), second.shell());
        assert_eq!(
            format!("{first}"),
            format!("shell#{}/gen1", shell.get())
        );
    }
}
