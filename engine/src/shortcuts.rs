//! Static text expansion.

use scribe_types::ShortcutDefinition;

/// First shortcut, in declared order, whose trigger ends `text`.
#[derive(Debug, Clone, Copy)]
pub struct ShortcutExpander<'a> {
    shortcuts: &'a [ShortcutDefinition],
}

/// A matched shortcut and the text it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<'a> {
    pub shortcut: &'a ShortcutDefinition,
    pub text: String,
}

impl<'a> ShortcutExpander<'a> {
    #[must_use]
    pub fn new(shortcuts: &'a [ShortcutDefinition]) -> Self {
        Self { shortcuts }
    }

    #[must_use]
    pub fn expand(&self, text: &str) -> Option<Expansion<'a>> {
        self.shortcuts.iter().find_map(|shortcut| {
            shortcut
                .expand(text)
                .map(|text| Expansion { shortcut, text })
        })
    }
}
