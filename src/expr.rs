use crate::{
    span::{Span, Spanned},
    symbols::Symbol,
    types::{Base, Type},
};

pub mod evaluate;

slotmap::new_key_type! { pub struct ExprKey; }

/// A kind-tagged expression node. Nodes are owned by the arena ([`Exprs`])
/// and refer to their children by key. The type annotation lives in a
/// secondary map next to the arena, not in the node itself.
#[derive(Clone, Debug)]
pub enum Expr {
    Error(Span),
    Constant {
        value: i32,
        span: Span,
    },
    Ident {
        symbol: Symbol,
        span: Span,
    },
    /// Projection of a record field, by position within the field frame.
    Dot {
        expr: ExprKey,
        field: usize,
        span: Span,
    },
    Index {
        array: ExprKey,
        index: ExprKey,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: ExprKey,
        span: Span,
    },
    /// The rate of a cost variable, written `x'`.
    RateOf {
        expr: ExprKey,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprKey,
        rhs: ExprKey,
        span: Span,
    },
    Assign {
        op: AssignOp,
        lhs: ExprKey,
        rhs: ExprKey,
        span: Span,
    },
    IncDec {
        op: IncDecOp,
        expr: ExprKey,
        span: Span,
    },
    InlineIf {
        cond: ExprKey,
        then_expr: ExprKey,
        else_expr: ExprKey,
        span: Span,
    },
    Comma {
        lhs: ExprKey,
        rhs: ExprKey,
        span: Span,
    },
    Call {
        callee: ExprKey,
        args: Vec<ExprKey>,
        span: Span,
    },
    Forall {
        binding: Symbol,
        body: ExprKey,
        span: Span,
    },
    /// An initializer list. Entries may be positional (no name) or named
    /// record fields; the initializer checker normalizes every list it
    /// accepts to positional entries in declaration order.
    List {
        elements: Vec<(Option<String>, ExprKey)>,
        span: Span,
    },
    Deadlock {
        span: Span,
    },
    /// A path-quantified property such as `E<> phi`.
    Quantified {
        op: PathOp,
        expr: ExprKey,
        span: Span,
    },
    /// The leads-to property `phi --> psi`.
    LeadsTo {
        lhs: ExprKey,
        rhs: ExprKey,
        span: Span,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Min,
    Max,

    // Logical
    And,
    Or,

    // Comparison
    Lt,
    Le,
    Ge,
    Gt,
    Eq,
    Ne,
}

impl BinaryOp {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Min => "<?",
            BinaryOp::Max => ">?",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IncDecOp {
    PreIncrement,
    PostIncrement,
    PreDecrement,
    PostDecrement,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathOp {
    /// `E<>` -- some path eventually.
    Possibly,
    /// `A[]` -- all paths always.
    Invariantly,
    /// `E[]` -- some path always.
    Potentially,
    /// `A<>` -- all paths eventually.
    Eventually,
}

impl Expr {
    /// The keys of the direct sub-expressions, in evaluation order.
    pub fn child_keys(&self) -> Vec<ExprKey> {
        match self {
            Expr::Error(_)
            | Expr::Constant { .. }
            | Expr::Ident { .. }
            | Expr::Deadlock { .. } => Vec::new(),

            Expr::Dot { expr, .. }
            | Expr::Unary { expr, .. }
            | Expr::RateOf { expr, .. }
            | Expr::IncDec { expr, .. }
            | Expr::Quantified { expr, .. } => vec![*expr],

            Expr::Forall { body, .. } => vec![*body],

            Expr::Index { array, index, .. } => vec![*array, *index],

            Expr::Binary { lhs, rhs, .. }
            | Expr::Assign { lhs, rhs, .. }
            | Expr::Comma { lhs, rhs, .. }
            | Expr::LeadsTo { lhs, rhs, .. } => vec![*lhs, *rhs],

            Expr::InlineIf {
                cond,
                then_expr,
                else_expr,
                ..
            } => vec![*cond, *then_expr, *else_expr],

            Expr::Call { callee, args, .. } => {
                let mut keys = vec![*callee];
                keys.extend(args.iter().copied());
                keys
            }

            Expr::List { elements, .. } => elements.iter().map(|(_, key)| *key).collect(),
        }
    }
}

impl Spanned for Expr {
    fn span(&self) -> &Span {
        match self {
            Expr::Error(span)
            | Expr::Constant { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Dot { span, .. }
            | Expr::Index { span, .. }
            | Expr::Unary { span, .. }
            | Expr::RateOf { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::IncDec { span, .. }
            | Expr::InlineIf { span, .. }
            | Expr::Comma { span, .. }
            | Expr::Call { span, .. }
            | Expr::Forall { span, .. }
            | Expr::List { span, .. }
            | Expr::Deadlock { span }
            | Expr::Quantified { span, .. }
            | Expr::LeadsTo { span, .. } => span,
        }
    }
}

/// The expression arena and its type annotations. Nodes are inserted by the
/// builder through the factory methods below; the annotation slot starts out
/// `Unknown` for operator nodes and pre-typed for leaves whose type is
/// already determined by the declaration they refer to.
#[derive(Clone, Debug, Default)]
pub struct Exprs {
    exprs: slotmap::SlotMap<ExprKey, Expr>,
    types: slotmap::SecondaryMap<ExprKey, Type>,
}

impl Exprs {
    pub fn insert(&mut self, expr: Expr, ty: Type) -> ExprKey {
        let key = self.exprs.insert(expr);
        self.types.insert(key, ty);
        key
    }

    /// The expression for `key`. Panics if the key is not in the arena.
    pub fn get(&self, key: ExprKey) -> &Expr {
        &self.exprs[key]
    }

    pub fn try_get(&self, key: ExprKey) -> Option<&Expr> {
        self.exprs.get(key)
    }

    /// The annotated type of `key`. Panics if the key is not in the arena.
    pub fn ty(&self, key: ExprKey) -> &Type {
        &self.types[key]
    }

    pub fn set_ty(&mut self, key: ExprKey, ty: Type) {
        self.types.insert(key, ty);
    }

    pub fn span(&self, key: ExprKey) -> Span {
        self.get(key).span().clone()
    }

    pub fn constant(&mut self, value: i32, span: Span) -> ExprKey {
        self.insert(Expr::Constant { value, span }, Type::int())
    }

    pub fn ident(&mut self, symbol: &Symbol, span: Span) -> ExprKey {
        let ty = symbol.ty();
        self.insert(
            Expr::Ident {
                symbol: symbol.clone(),
                span,
            },
            ty,
        )
    }

    /// A record field projection. The node is pre-typed with the field's
    /// declared type when the record expression is a record.
    pub fn dot(&mut self, expr: ExprKey, field: usize, span: Span) -> ExprKey {
        let ty = self
            .ty(expr)
            .fields()
            .filter(|frame| field < frame.size())
            .map(|frame| frame.get(field).ty())
            .unwrap_or_else(Type::unknown);
        self.insert(Expr::Dot { expr, field, span }, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, expr: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Unary { op, expr, span }, Type::unknown())
    }

    pub fn rate_of(&mut self, expr: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::RateOf { expr, span }, Type::unknown())
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprKey, rhs: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Binary { op, lhs, rhs, span }, Type::unknown())
    }

    pub fn assign(&mut self, op: AssignOp, lhs: ExprKey, rhs: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Assign { op, lhs, rhs, span }, Type::unknown())
    }

    pub fn inc_dec(&mut self, op: IncDecOp, expr: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::IncDec { op, expr, span }, Type::unknown())
    }

    pub fn inline_if(
        &mut self,
        cond: ExprKey,
        then_expr: ExprKey,
        else_expr: ExprKey,
        span: Span,
    ) -> ExprKey {
        self.insert(
            Expr::InlineIf {
                cond,
                then_expr,
                else_expr,
                span,
            },
            Type::unknown(),
        )
    }

    pub fn comma(&mut self, lhs: ExprKey, rhs: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Comma { lhs, rhs, span }, Type::unknown())
    }

    pub fn call(&mut self, callee: ExprKey, args: Vec<ExprKey>, span: Span) -> ExprKey {
        self.insert(Expr::Call { callee, args, span }, Type::unknown())
    }

    pub fn index(&mut self, array: ExprKey, index: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Index { array, index, span }, Type::unknown())
    }

    pub fn forall(&mut self, binding: &Symbol, body: ExprKey, span: Span) -> ExprKey {
        self.insert(
            Expr::Forall {
                binding: binding.clone(),
                body,
                span,
            },
            Type::unknown(),
        )
    }

    pub fn list(&mut self, elements: Vec<(Option<String>, ExprKey)>, span: Span) -> ExprKey {
        self.insert(Expr::List { elements, span }, Type::unknown())
    }

    pub fn deadlock(&mut self, span: Span) -> ExprKey {
        self.insert(Expr::Deadlock { span }, Type::constraint())
    }

    pub fn quantified(&mut self, op: PathOp, expr: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::Quantified { op, expr, span }, Type::unknown())
    }

    pub fn leads_to(&mut self, lhs: ExprKey, rhs: ExprKey, span: Span) -> ExprKey {
        self.insert(Expr::LeadsTo { lhs, rhs, span }, Type::unknown())
    }

    /// The symbol an expression resolves to, when it is a (possibly
    /// projected) reference to one.
    pub fn symbol_of(&self, key: ExprKey) -> Option<Symbol> {
        match self.get(key) {
            Expr::Ident { symbol, .. } => Some(symbol.clone()),
            Expr::Dot { expr, .. } | Expr::Index { array: expr, .. } => self.symbol_of(*expr),
            Expr::Assign { lhs, .. } => self.symbol_of(*lhs),
            Expr::IncDec { expr, .. } => self.symbol_of(*expr),
            Expr::Comma { rhs, .. } => self.symbol_of(*rhs),
            _ => None,
        }
    }

    /// Structural equality of two expressions, the relation used to compare
    /// declared range bounds and array sizes when they cannot be evaluated.
    pub fn syntactically_equal(&self, a: ExprKey, b: ExprKey) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Expr::Constant { value: va, .. }, Expr::Constant { value: vb, .. }) => va == vb,

            (Expr::Ident { symbol: sa, .. }, Expr::Ident { symbol: sb, .. }) => sa == sb,

            (
                Expr::Dot {
                    expr: ea, field: fa, ..
                },
                Expr::Dot {
                    expr: eb, field: fb, ..
                },
            ) => fa == fb && self.syntactically_equal(*ea, *eb),

            (
                Expr::Index {
                    array: aa,
                    index: ia,
                    ..
                },
                Expr::Index {
                    array: ab,
                    index: ib,
                    ..
                },
            ) => self.syntactically_equal(*aa, *ab) && self.syntactically_equal(*ia, *ib),

            (Expr::Unary { op: oa, expr: ea, .. }, Expr::Unary { op: ob, expr: eb, .. }) => {
                oa == ob && self.syntactically_equal(*ea, *eb)
            }

            (Expr::RateOf { expr: ea, .. }, Expr::RateOf { expr: eb, .. }) => {
                self.syntactically_equal(*ea, *eb)
            }

            (
                Expr::Binary {
                    op: oa,
                    lhs: la,
                    rhs: ra,
                    ..
                },
                Expr::Binary {
                    op: ob,
                    lhs: lb,
                    rhs: rb,
                    ..
                },
            ) => {
                oa == ob
                    && self.syntactically_equal(*la, *lb)
                    && self.syntactically_equal(*ra, *rb)
            }

            (
                Expr::InlineIf {
                    cond: ca,
                    then_expr: ta,
                    else_expr: ea,
                    ..
                },
                Expr::InlineIf {
                    cond: cb,
                    then_expr: tb,
                    else_expr: eb,
                    ..
                },
            ) => {
                self.syntactically_equal(*ca, *cb)
                    && self.syntactically_equal(*ta, *tb)
                    && self.syntactically_equal(*ea, *eb)
            }

            _ => false,
        }
    }

    /// Syntactic equality of two optional bound pairs, as used for integer
    /// range declarations.
    pub fn ranges_syntactically_equal(
        &self,
        a: Option<(ExprKey, ExprKey)>,
        b: Option<(ExprKey, ExprKey)>,
    ) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some((al, au)), Some((bl, bu))) => {
                self.syntactically_equal(al, bl) && self.syntactically_equal(au, bu)
            }
            _ => false,
        }
    }

    /// The declared type of the symbol behind an expression, stripped of any
    /// array layers. Used to compare the range declarations of inline-if
    /// branches.
    pub(crate) fn stripped_symbol_ty(&self, key: ExprKey) -> Option<Type> {
        let symbol = self.symbol_of(key)?;
        let mut ty = symbol.ty();
        while ty.base() == Base::Array {
            match ty.sub() {
                Some(sub) => ty = sub,
                None => break,
            }
        }
        Some(ty)
    }
}
