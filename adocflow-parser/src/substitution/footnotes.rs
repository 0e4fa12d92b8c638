use crate::model::{Footnote, Inline};

/// Footnotes in document order. Numbers keep counting across elements.
#[derive(Debug, Default)]
pub(crate) struct FootnoteTracker {
    footnotes: Vec<Footnote>,
}

impl FootnoteTracker {
    /// Register a footnote and return its number. Defining an id a second
    /// time keeps the first content.
    pub(crate) fn define(&mut self, id: Option<&str>, content: Vec<Inline>) -> u32 {
        if let Some(number) = id.and_then(|id| self.lookup(id)) {
            tracing::warn!(id = ?id, "footnote id defined twice, reusing the first definition");
            return number;
        }
        let number = u32::try_from(self.footnotes.len() + 1).unwrap_or(u32::MAX);
        self.footnotes.push(Footnote {
            number,
            id: id.map(ToString::to_string),
            content,
        });
        number
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<u32> {
        self.footnotes
            .iter()
            .find(|footnote| footnote.id.as_deref() == Some(id))
            .map(|footnote| footnote.number)
    }

    pub(crate) fn take(&mut self) -> Vec<Footnote> {
        std::mem::take(&mut self.footnotes)
    }
}
