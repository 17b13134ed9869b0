//! Atom interning.
//!
//! Identifier text is interned once per process; the parser and binding
//! tables only ever compare `Atom` handles, which is an O(1) integer
//! comparison. The interner is thread-safe so independent parses on separate
//! threads can share it.

use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// An interned identifier or string. Lightweight (u32) and `Copy`; resolving
/// back to text requires the interner.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Atom(Spur);

impl Atom {
    #[inline]
    pub fn from_spur(spur: Spur) -> Self {
        Self(spur)
    }

    #[inline]
    pub fn as_spur(self) -> Spur {
        self.0
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.0)
    }
}

/// Thread-safe atom interner shared by all parses in a process.
#[derive(Clone)]
pub struct AtomInterner {
    rodeo: Arc<ThreadedRodeo>,
}

impl AtomInterner {
    pub fn new() -> Self {
        Self {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Intern a string, returning its atom. Re-interning returns the same
    /// atom.
    #[inline]
    pub fn intern(&self, s: &str) -> Atom {
        Atom::from_spur(self.rodeo.get_or_intern(s))
    }

    /// Intern a static string without copying it.
    #[inline]
    pub fn intern_static(&self, s: &'static str) -> Atom {
        Atom::from_spur(self.rodeo.get_or_intern_static(s))
    }

    /// Look up an atom without interning on a miss.
    #[inline]
    pub fn get(&self, s: &str) -> Option<Atom> {
        self.rodeo.get(s).map(Atom::from_spur)
    }

    /// Resolve an atom back to its text.
    #[inline]
    pub fn resolve(&self, atom: Atom) -> &str {
        self.rodeo.resolve(&atom.as_spur())
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for AtomInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AtomInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomInterner")
            .field("len", &self.len())
            .finish()
    }
}

/// Atoms the parser compares against by identity rather than text.
///
/// Interned eagerly so grammar code never pays a hash lookup to ask "is this
/// name `eval`?".
#[derive(Debug, Clone)]
pub struct CommonAtoms {
    pub arguments: Atom,
    pub eval: Atom,
    pub use_strict: Atom,
    pub use_asm: Atom,
    pub of: Atom,
    pub get: Atom,
    pub set: Atom,
    pub proto: Atom,
}

impl CommonAtoms {
    pub fn new(interner: &AtomInterner) -> Self {
        Self {
            arguments: interner.intern_static("arguments"),
            eval: interner.intern_static("eval"),
            use_strict: interner.intern_static("use strict"),
            use_asm: interner.intern_static("use asm"),
            of: interner.intern_static("of"),
            get: interner.intern_static("get"),
            set: interner.intern_static("set"),
            proto: interner.intern_static("__proto__"),
        }
    }
}
