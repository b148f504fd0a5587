/// A byte range inside a single mnemonic line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Span covering `needle` inside `haystack`, or the dummy span when
    /// `needle` does not occur.
    pub fn find(haystack: &str, needle: &str) -> Self {
        match haystack.find(needle) {
            Some(pos) if !needle.is_empty() => {
                Self::new(pos as u32, (pos + needle.len()) as u32)
            }
            _ => Self::dummy(),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}
