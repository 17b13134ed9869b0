//! Definitions, uses, and the per-parse definition store.

use nightjar_core::intern::Atom;
use nightjar_core::text::SourceSpan;
use std::fmt;

/// Index of a `Definition` in the parse's `DefStore`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DefId(pub u32);

impl DefId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a name use in the parse's `DefStore`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UseId(pub u32);

impl UseId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of declaration introduced a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    /// Formal parameter.
    Arg,
    /// Function-scoped `var` (or hoisted function statement).
    Var,
    /// Block-scoped mutable binding.
    Let,
    /// Block-scoped immutable binding.
    Const,
    /// Catch-clause parameter.
    CatchParam,
    /// The self-name of a named function expression, visible only inside it.
    NamedLambda,
    /// A name used before (or without) any resolving declaration.
    Placeholder,
}

impl DefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefKind::Arg => "argument",
            DefKind::Var => "variable",
            DefKind::Let => "let",
            DefKind::Const => "const",
            DefKind::CatchParam => "catch parameter",
            DefKind::NamedLambda => "function name",
            DefKind::Placeholder => "placeholder",
        }
    }

    pub fn is_lexical(self) -> bool {
        matches!(self, DefKind::Let | DefKind::Const | DefKind::CatchParam)
    }
}

bitflags::bitflags! {
    /// Per-definition state accumulated during the parse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DefFlags: u8 {
        /// Not yet resolved to a real declaration.
        const PLACEHOLDER        = 1 << 0;
        /// Some use assigns to this binding.
        const ASSIGNED           = 1 << 1;
        /// Referenced from a nested function (or deoptimized by dynamic
        /// scope), so it cannot live in a stack slot.
        const CLOSED             = 1 << 2;
        /// Immutable binding.
        const CONST              = 1 << 3;
        /// The implicit `arguments` binding materialized on free use.
        const IMPLICIT_ARGUMENTS = 1 << 4;
    }
}

/// Lexical address of a binding: how many static scope levels up, and which
/// slot at that level. Assigned when the enclosing scope's shape is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalSlot {
    pub level: u16,
    pub slot: u16,
}

/// One binding (or placeholder) introduced by a name.
#[derive(Debug)]
pub struct Definition {
    pub name: Atom,
    /// Span of the introducing declaration (or first free use for
    /// placeholders).
    pub span: SourceSpan,
    pub kind: DefKind,
    pub flags: DefFlags,
    pub slot: Option<LexicalSlot>,
    /// Head of the singly-linked use list.
    uses_head: Option<UseId>,
}

impl Definition {
    pub fn is_placeholder(&self) -> bool {
        self.flags.contains(DefFlags::PLACEHOLDER)
    }

    pub fn is_assigned(&self) -> bool {
        self.flags.contains(DefFlags::ASSIGNED)
    }

    pub fn is_closed(&self) -> bool {
        self.flags.contains(DefFlags::CLOSED)
    }
}

/// One use of a name, linked onto its definition's use list.
///
/// `block_id` records the scope the use was noted in; block-scoped
/// declarations capture only the placeholder uses noted at or inside their
/// own block.
#[derive(Debug)]
struct Use {
    span: SourceSpan,
    def: DefId,
    next: Option<UseId>,
    block_id: u32,
}

/// Snapshot of the store, for transactional discard of speculative parses.
#[derive(Debug, Clone, Copy)]
pub struct StoreMark {
    defs: u32,
    uses: u32,
}

impl StoreMark {
    /// Whether a definition was created at or after this mark.
    pub fn covers_def(&self, def: DefId) -> bool {
        def.0 >= self.defs
    }
}

/// The per-parse store of definitions and uses.
///
/// Everything is index-addressed so that retargeting a placeholder's uses
/// onto a real definition is a list walk plus an O(1) splice, and the whole
/// store drops at end of parse without any lifetime bookkeeping.
#[derive(Debug, Default)]
pub struct DefStore {
    defs: Vec<Definition>,
    uses: Vec<Use>,
}

impl DefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_def(&mut self, name: Atom, span: SourceSpan, kind: DefKind) -> DefId {
        let mut flags = DefFlags::empty();
        if kind == DefKind::Placeholder {
            flags |= DefFlags::PLACEHOLDER;
        }
        if kind == DefKind::Const {
            flags |= DefFlags::CONST;
        }
        let id = DefId(self.defs.len() as u32);
        self.defs.push(Definition {
            name,
            span,
            kind,
            flags,
            slot: None,
            uses_head: None,
        });
        id
    }

    #[inline]
    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id.index()]
    }

    #[inline]
    pub fn def_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.defs[id.index()]
    }

    pub fn def_count(&self) -> usize {
        self.defs.len()
    }

    /// Iterate all definitions in creation order.
    pub fn iter_defs(&self) -> impl Iterator<Item = (DefId, &Definition)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, d)| (DefId(i as u32), d))
    }

    /// Record a use of `def` noted in the scope with `block_id`, pushed on
    /// the front of the definition's use list.
    pub fn note_use(&mut self, def: DefId, span: SourceSpan, block_id: u32) -> UseId {
        let id = UseId(self.uses.len() as u32);
        let head = self.defs[def.index()].uses_head;
        self.uses.push(Use {
            span,
            def,
            next: head,
            block_id,
        });
        self.defs[def.index()].uses_head = Some(id);
        id
    }

    /// The definition a use currently resolves to.
    #[inline]
    pub fn use_def(&self, use_id: UseId) -> DefId {
        self.uses[use_id.index()].def
    }

    #[inline]
    pub fn use_span(&self, use_id: UseId) -> SourceSpan {
        self.uses[use_id.index()].span
    }

    /// Iterate the uses of a definition (most recent first).
    pub fn uses_of(&self, def: DefId) -> UsesIter<'_> {
        UsesIter {
            store: self,
            next: self.defs[def.index()].uses_head,
        }
    }

    pub fn use_count_of(&self, def: DefId) -> usize {
        self.uses_of(def).count()
    }

    /// Mark the definition a use resolves to as assigned.
    pub fn mark_use_assigned(&mut self, use_id: UseId) {
        let def = self.use_def(use_id);
        self.defs[def.index()].flags |= DefFlags::ASSIGNED;
    }

    /// Retarget every use of `from` to `to`, then splice `from`'s whole use
    /// list onto the front of `to`'s. `from` keeps no uses. Carries over
    /// accumulated flags except placeholder-ness.
    pub fn retarget_and_splice_uses(&mut self, from: DefId, to: DefId) {
        assert_ne!(from, to);
        let Some(head) = self.defs[from.index()].uses_head else {
            let inherited = self.defs[from.index()].flags & !DefFlags::PLACEHOLDER;
            self.defs[to.index()].flags |= inherited;
            return;
        };
        let mut cursor = head;
        loop {
            self.uses[cursor.index()].def = to;
            match self.uses[cursor.index()].next {
                Some(next) => cursor = next,
                None => break,
            }
        }
        // cursor is now the tail; splice in one step.
        self.uses[cursor.index()].next = self.defs[to.index()].uses_head;
        self.defs[to.index()].uses_head = Some(head);
        self.defs[from.index()].uses_head = None;

        let inherited = self.defs[from.index()].flags & !DefFlags::PLACEHOLDER;
        self.defs[to.index()].flags |= inherited;
    }

    /// Move the uses of placeholder `from` that were noted in block
    /// `min_block_id` or any block opened after it onto `to`; earlier uses
    /// stay on the placeholder. Used when a block-scoped declaration
    /// captures forward references: uses of the name from outside its block
    /// must not be captured. Returns true when the placeholder has no uses
    /// left.
    pub fn capture_uses_from(&mut self, from: DefId, to: DefId, min_block_id: u32) -> bool {
        assert_ne!(from, to);
        let mut captured = Vec::new();
        let mut kept_head: Option<UseId> = None;
        let mut kept_tail: Option<UseId> = None;
        let mut cursor = self.defs[from.index()].uses_head;
        while let Some(id) = cursor {
            cursor = self.uses[id.index()].next;
            if self.uses[id.index()].block_id >= min_block_id {
                captured.push(id);
            } else {
                match kept_tail {
                    Some(tail) => self.uses[tail.index()].next = Some(id),
                    None => kept_head = Some(id),
                }
                self.uses[id.index()].next = None;
                kept_tail = Some(id);
            }
        }
        self.defs[from.index()].uses_head = kept_head;
        for id in captured {
            self.uses[id.index()].def = to;
            self.uses[id.index()].next = self.defs[to.index()].uses_head;
            self.defs[to.index()].uses_head = Some(id);
        }
        kept_head.is_none()
    }

    /// Snapshot for speculative parsing.
    pub fn mark(&self) -> StoreMark {
        StoreMark {
            defs: self.defs.len() as u32,
            uses: self.uses.len() as u32,
        }
    }

    /// Discard all definitions and uses created since `mark`. Surviving
    /// definitions whose use lists gained uses after the mark have those
    /// uses unlinked.
    pub fn rollback(&mut self, mark: StoreMark) {
        self.defs.truncate(mark.defs as usize);
        // Unlink discarded uses from surviving definitions. A discarded use
        // is always at the front of a chain whose older entries survive, so
        // walking from each head until a surviving use suffices.
        for def in &mut self.defs {
            while let Some(head) = def.uses_head {
                if head.0 < mark.uses {
                    break;
                }
                def.uses_head = self.uses[head.index()].next;
            }
        }
        self.uses.truncate(mark.uses as usize);
    }
}

/// Iterator over a definition's use list.
pub struct UsesIter<'a> {
    store: &'a DefStore,
    next: Option<UseId>,
}

impl<'a> Iterator for UsesIter<'a> {
    type Item = (UseId, SourceSpan);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.store.uses[id.index()].next;
        Some((id, self.store.uses[id.index()].span))
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightjar_core::intern::AtomInterner;

    fn span(n: u32) -> SourceSpan {
        SourceSpan::new(n, n + 1)
    }

    #[test]
    fn use_list_links_front() {
        let interner = AtomInterner::new();
        let x = interner.intern("x");
        let mut store = DefStore::new();
        let def = store.add_def(x, span(0), DefKind::Var);
        store.note_use(def, span(10), 0);
        store.note_use(def, span(20), 0);
        let spans: Vec<_> = store.uses_of(def).map(|(_, s)| s.begin).collect();
        assert_eq!(spans, [20, 10]);
    }

    #[test]
    fn retarget_moves_all_uses() {
        let interner = AtomInterner::new();
        let x = interner.intern("x");
        let mut store = DefStore::new();
        let placeholder = store.add_def(x, span(0), DefKind::Placeholder);
        let u1 = store.note_use(placeholder, span(5), 0);
        let u2 = store.note_use(placeholder, span(8), 0);
        let real = store.add_def(x, span(1), DefKind::Let);
        let u3 = store.note_use(real, span(12), 0);

        store.retarget_and_splice_uses(placeholder, real);

        assert_eq!(store.use_def(u1), real);
        assert_eq!(store.use_def(u2), real);
        assert_eq!(store.use_def(u3), real);
        assert_eq!(store.use_count_of(real), 3);
        assert_eq!(store.use_count_of(placeholder), 0);
    }

    #[test]
    fn retarget_carries_assigned_flag() {
        let interner = AtomInterner::new();
        let x = interner.intern("x");
        let mut store = DefStore::new();
        let placeholder = store.add_def(x, span(0), DefKind::Placeholder);
        let u = store.note_use(placeholder, span(5), 0);
        store.mark_use_assigned(u);
        let real = store.add_def(x, span(1), DefKind::Var);
        store.retarget_and_splice_uses(placeholder, real);
        assert!(store.def(real).is_assigned());
        assert!(!store.def(real).is_placeholder());
    }

    #[test]
    fn capture_splits_on_block_id() {
        let interner = AtomInterner::new();
        let x = interner.intern("x");
        let mut store = DefStore::new();
        let placeholder = store.add_def(x, span(0), DefKind::Placeholder);
        let outer_use = store.note_use(placeholder, span(2), 1);
        let inner_use = store.note_use(placeholder, span(9), 3);
        let letdef = store.add_def(x, span(20), DefKind::Let);

        let emptied = store.capture_uses_from(placeholder, letdef, 2);
        assert!(!emptied);
        assert_eq!(store.use_def(inner_use), letdef);
        assert_eq!(store.use_def(outer_use), placeholder);
        assert_eq!(store.use_count_of(placeholder), 1);
        assert_eq!(store.use_count_of(letdef), 1);
    }

    #[test]
    fn rollback_discards_speculative_work() {
        let interner = AtomInterner::new();
        let x = interner.intern("x");
        let mut store = DefStore::new();
        let def = store.add_def(x, span(0), DefKind::Var);
        store.note_use(def, span(4), 0);

        let mark = store.mark();
        let spec = store.add_def(x, span(9), DefKind::Placeholder);
        store.note_use(spec, span(10), 0);
        store.note_use(def, span(11), 0);
        store.rollback(mark);

        assert_eq!(store.def_count(), 1);
        assert_eq!(store.use_count_of(def), 1);
        let spans: Vec<_> = store.uses_of(def).map(|(_, s)| s.begin).collect();
        assert_eq!(spans, [4]);
    }
}
