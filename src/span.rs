use miette::SourceSpan;

/// Position relative to start of source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Idx(pub u32);

/// Holds a view into a source.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    start: Idx,
    len: u16,
}

impl Span {
    pub fn new(start: Idx, len: u16) -> Self {
        Span { start, len }
    }

    pub fn offs(&self) -> usize {
        self.start.0 as usize
    }

    pub fn end(&self) -> usize {
        self.offs() + self.len as usize
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.offs()..self.end()
    }

    /// 1-based line of the first character, counting newlines before it.
    pub fn line_in(&self, src: &str) -> usize {
        let start = self.offs().min(src.len());
        src.as_bytes()[..start].iter().filter(|b| **b == b'\n').count() + 1
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.offs(), span.len as usize).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_line_of_span() {
        let src = "segment: code\n  load 1\n\n  halt 0\n";
        assert_eq!(Span::new(Idx(0), 7).line_in(src), 1);
        assert_eq!(Span::new(Idx(16), 4).line_in(src), 2);
        assert_eq!(Span::new(Idx(26), 4).line_in(src), 4);
        assert_eq!(Span::new(Idx(26), 4).as_range(), 26..30);
    }
}
