use crate::{
    expr::{evaluate::Valuation, ExprKey, Exprs},
    span::Span,
    symbols::{Frame, Symbol},
};
use fxhash::{FxHashMap, FxHashSet};

/// The fully linked abstract system produced by the builder: global and
/// template-local declarations, automaton structure, instantiations and
/// properties, plus the shared expression arena.
///
/// The analyser borrows a system mutably: it writes type annotations, splits
/// location invariants into their pure part and rate bindings, normalizes
/// initializer expressions and populates function effect sets. It never
/// changes the shape of the system itself.
#[derive(Clone, Debug, Default)]
pub struct System {
    pub exprs: Exprs,
    pub globals: Declarations,
    pub templates: Vec<Template>,
    pub instances: Vec<Instance>,
    pub properties: Vec<ExprKey>,
    /// Expressions evaluated before and after each state-vector update.
    pub before_update: Vec<ExprKey>,
    pub after_update: Vec<ExprKey>,
    /// Constant symbols mapped to their checked initializers; grown in
    /// document order as constant declarations are visited.
    pub constants: Valuation,
    /// Effect sets of checked functions, keyed by the function symbol. Kept
    /// alongside `Function::{changes, depends}` for lookup by symbol.
    pub(crate) effects: FxHashMap<Symbol, Effects>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The symbols read and written by a function body, including through calls
/// to previously checked functions.
#[derive(Clone, Debug, Default)]
pub(crate) struct Effects {
    pub changes: FxHashSet<Symbol>,
    pub depends: FxHashSet<Symbol>,
}

/// A group of variable and function declarations sharing one frame; used for
/// the global scope and for each template's local scope.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    pub frame: Frame,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub uid: Symbol,
    pub init: Option<ExprKey>,
}

#[derive(Clone, Debug)]
pub struct Function {
    /// Symbol of `Function` type; parameters and return type live there.
    pub uid: Symbol,
    pub body: Stmt,
    /// Symbols assigned anywhere in the body; populated by the analyser.
    pub changes: FxHashSet<Symbol>,
    /// Symbols read anywhere in the body; populated by the analyser.
    pub depends: FxHashSet<Symbol>,
}

impl Function {
    pub fn new(uid: Symbol, body: Stmt) -> Self {
        Function {
            uid,
            body,
            changes: FxHashSet::default(),
            depends: FxHashSet::default(),
        }
    }
}

/// A statement of a function body.
#[derive(Clone, Debug)]
pub enum Stmt {
    Empty,
    Expr(ExprKey),
    Block {
        /// Parameters and block locals; every symbol's declared type is
        /// checked when the block is visited.
        frame: Frame,
        decls: Vec<Variable>,
        stmts: Vec<Stmt>,
    },
    For {
        init: Option<ExprKey>,
        cond: Option<ExprKey>,
        step: Option<ExprKey>,
        body: Box<Stmt>,
    },
    /// Iteration over a declared range, `for (i : int[0,N]) ...`.
    Iteration {
        symbol: Symbol,
        body: Box<Stmt>,
    },
    While {
        cond: ExprKey,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: ExprKey,
    },
    If {
        cond: ExprKey,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    Break,
    Continue,
    Return {
        value: Option<ExprKey>,
    },
}

/// An automaton blueprint.
#[derive(Clone, Debug)]
pub struct Template {
    /// Symbol of `Template` type.
    pub uid: Symbol,
    pub parameters: Frame,
    pub declarations: Declarations,
    pub locations: Vec<Location>,
    pub edges: Vec<Edge>,
    pub progress: Vec<Progress>,
}

impl Template {
    pub fn new(uid: Symbol, parameters: Frame) -> Self {
        Template {
            uid,
            parameters: parameters.clone(),
            declarations: Declarations {
                frame: Frame::with_parent(&parameters),
                variables: Vec::new(),
                functions: Vec::new(),
            },
            locations: Vec::new(),
            edges: Vec::new(),
            progress: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Location {
    pub uid: Symbol,
    pub invariant: Option<ExprKey>,
    /// Rate bindings split out of the invariant: `(cost variable, rate)`
    /// pairs. Populated by the analyser.
    pub rates: Vec<(ExprKey, ExprKey)>,
    /// The first rate expression, kept for quick access. Populated by the
    /// analyser.
    pub cost_rate: Option<ExprKey>,
    pub span: Span,
}

impl Location {
    pub fn new(uid: Symbol, invariant: Option<ExprKey>, span: Span) -> Self {
        Location {
            uid,
            invariant,
            rates: Vec::new(),
            cost_rate: None,
            span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    /// Select bindings, one symbol per bound name.
    pub select: Frame,
    pub guard: Option<ExprKey>,
    pub sync: Option<Sync>,
    pub assign: Option<ExprKey>,
    pub span: Span,
}

impl Edge {
    pub fn new(span: Span) -> Self {
        Edge {
            select: Frame::new(),
            guard: None,
            sync: None,
            assign: None,
            span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Sync {
    /// The channel expression; its head type must be a channel.
    pub channel: ExprKey,
    pub dir: SyncDir,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncDir {
    /// `chan!`
    Send,
    /// `chan?`
    Receive,
}

/// A progress measure of a template.
#[derive(Clone, Debug)]
pub struct Progress {
    pub guard: Option<ExprKey>,
    pub measure: ExprKey,
    pub span: Span,
}

/// An instantiation of a template, mapping each formal parameter to an
/// argument expression.
#[derive(Clone, Debug)]
pub struct Instance {
    pub uid: Symbol,
    /// Symbol of the instantiated template.
    pub template: Symbol,
    pub mapping: Vec<(Symbol, ExprKey)>,
    pub span: Span,
}
