use std::{fmt, ops::Range, path::Path, sync::Arc};

/// A byte range within a source document, together with the document it came
/// from. Every expression node carries one of these; diagnostics point back
/// into the source through them.
#[derive(Clone, PartialEq)]
pub struct Span {
    pub(super) context: Arc<Path>,
    pub(super) range: Range<usize>,
}

type Context = Arc<Path>;
type Offset = usize;

impl Span {
    pub fn new(context: Context, range: Range<Offset>) -> Self {
        Self { context, range }
    }

    pub fn context(&self) -> Context {
        Arc::clone(&self.context)
    }

    pub fn start(&self) -> Offset {
        self.range.start
    }

    pub fn end(&self) -> Offset {
        self.range.end
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty() && self.context.as_os_str().is_empty()
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{:?}", self.context, self.range)
    }
}

pub fn empty_span() -> Span {
    Span {
        range: 0..0,
        context: Arc::from(Path::new("")),
    }
}

/// Join two spans into a new span ranging from `lhs` to `rhs`. No validation
/// is performed; `lhs` is assumed to come first and to share a context with
/// `rhs`, which is copied from `lhs`.
pub fn join(lhs: &Span, rhs: &Span) -> Span {
    Span {
        range: lhs.range.start..rhs.range.end,
        context: Arc::clone(&lhs.context),
    }
}

pub trait Spanned {
    fn span(&self) -> &Span;
}
