use super::{BinaryOp, Expr, ExprKey, Exprs, UnaryOp};
use crate::{range::Range, symbols::Symbol};
use fxhash::FxHashMap;
use thiserror::Error;

/// Raised when an expression cannot be reduced to a value at analysis time,
/// typically because it mentions runtime state or a not-yet-defined constant.
/// This is never a diagnostic by itself; callers degrade to a weaker check.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("expression is not computable at analysis time")]
pub struct NotComputable;

/// Maps constant symbols to their (checked) initializer expressions.
pub type Valuation = FxHashMap<Symbol, ExprKey>;

/// Evaluates constant expressions under the constant valuation of a system,
/// optionally extended with the parameter mapping of an instantiation.
pub struct Interpreter<'a> {
    exprs: &'a Exprs,
    constants: &'a Valuation,
    mapping: Valuation,
}

impl<'a> Interpreter<'a> {
    pub fn new(exprs: &'a Exprs, constants: &'a Valuation) -> Self {
        Interpreter {
            exprs,
            constants,
            mapping: Valuation::default(),
        }
    }

    /// An interpreter that additionally resolves the formal parameters of an
    /// instantiation to their argument expressions.
    pub fn with_mapping(
        exprs: &'a Exprs,
        constants: &'a Valuation,
        mapping: &[(Symbol, ExprKey)],
    ) -> Self {
        Interpreter {
            exprs,
            constants,
            mapping: mapping.iter().cloned().collect(),
        }
    }

    fn lookup(&self, symbol: &Symbol) -> Option<ExprKey> {
        self.mapping
            .get(symbol)
            .or_else(|| self.constants.get(symbol))
            .copied()
    }

    pub fn evaluate(&self, key: ExprKey) -> Result<i32, NotComputable> {
        match self.exprs.get(key) {
            Expr::Constant { value, .. } => Ok(*value),

            Expr::Ident { symbol, .. } => match self.lookup(symbol) {
                Some(init) => self.evaluate(init),
                None => Err(NotComputable),
            },

            Expr::Unary { op, expr, .. } => {
                let value = self.evaluate(*expr)?;
                match op {
                    UnaryOp::Neg => value.checked_neg().ok_or(NotComputable),
                    UnaryOp::Not => Ok((value == 0) as i32),
                }
            }

            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.evaluate(*lhs)?;
                let rhs = self.evaluate(*rhs)?;
                self.apply(*op, lhs, rhs)
            }

            Expr::InlineIf {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                if self.evaluate(*cond)? != 0 {
                    self.evaluate(*then_expr)
                } else {
                    self.evaluate(*else_expr)
                }
            }

            Expr::Comma { rhs, .. } => self.evaluate(*rhs),

            _ => Err(NotComputable),
        }
    }

    fn apply(&self, op: BinaryOp, lhs: i32, rhs: i32) -> Result<i32, NotComputable> {
        match op {
            BinaryOp::Add => lhs.checked_add(rhs).ok_or(NotComputable),
            BinaryOp::Sub => lhs.checked_sub(rhs).ok_or(NotComputable),
            BinaryOp::Mul => lhs.checked_mul(rhs).ok_or(NotComputable),
            BinaryOp::Div => lhs.checked_div(rhs).ok_or(NotComputable),
            BinaryOp::Mod => lhs.checked_rem(rhs).ok_or(NotComputable),
            BinaryOp::BitAnd => Ok(lhs & rhs),
            BinaryOp::BitOr => Ok(lhs | rhs),
            BinaryOp::BitXor => Ok(lhs ^ rhs),
            BinaryOp::Shl => lhs.checked_shl(rhs as u32).ok_or(NotComputable),
            BinaryOp::Shr => lhs.checked_shr(rhs as u32).ok_or(NotComputable),
            BinaryOp::Min => Ok(lhs.min(rhs)),
            BinaryOp::Max => Ok(lhs.max(rhs)),
            BinaryOp::And => Ok((lhs != 0 && rhs != 0) as i32),
            BinaryOp::Or => Ok((lhs != 0 || rhs != 0) as i32),
            BinaryOp::Lt => Ok((lhs < rhs) as i32),
            BinaryOp::Le => Ok((lhs <= rhs) as i32),
            BinaryOp::Ge => Ok((lhs >= rhs) as i32),
            BinaryOp::Gt => Ok((lhs > rhs) as i32),
            BinaryOp::Eq => Ok((lhs == rhs) as i32),
            BinaryOp::Ne => Ok((lhs != rhs) as i32),
        }
    }

    /// Evaluates a declared `[lower, upper]` bound pair.
    pub fn evaluate_range(&self, range: (ExprKey, ExprKey)) -> Result<Range, NotComputable> {
        Ok(Range::new(self.evaluate(range.0)?, self.evaluate(range.1)?))
    }

    /// Evaluates an expression that may denote a whole aggregate, flattening
    /// array layers into the individual values.
    pub fn evaluate_flat(&self, key: ExprKey, out: &mut Vec<i32>) -> Result<(), NotComputable> {
        match self.exprs.get(key) {
            Expr::List { elements, .. } => {
                for (_, element) in elements {
                    self.evaluate_flat(*element, out)?;
                }
                Ok(())
            }

            Expr::Ident { symbol, .. } => match self.lookup(symbol) {
                Some(init) => self.evaluate_flat(init, out),
                None => Err(NotComputable),
            },

            _ => {
                out.push(self.evaluate(key)?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Interpreter, NotComputable, Valuation};
    use crate::{
        expr::{BinaryOp, Exprs},
        range::Range,
        span::empty_span,
        symbols::Frame,
        types::Type,
    };

    #[test]
    fn folds_constant_arithmetic() {
        let mut exprs = Exprs::default();
        let two = exprs.constant(2, empty_span());
        let three = exprs.constant(3, empty_span());
        let sum = exprs.binary(BinaryOp::Add, two, three, empty_span());
        let constants = Valuation::default();

        let interp = Interpreter::new(&exprs, &constants);
        assert_eq!(interp.evaluate(sum), Ok(5));
        assert_eq!(interp.evaluate_range((two, sum)), Ok(Range::new(2, 5)));
    }

    #[test]
    fn resolves_constants_through_the_valuation() {
        let mut exprs = Exprs::default();
        let frame = Frame::new();
        let n = frame.add("N", Type::int());
        let init = exprs.constant(7, empty_span());
        let ident = exprs.ident(&n, empty_span());

        let mut constants = Valuation::default();
        constants.insert(n.clone(), init);

        let interp = Interpreter::new(&exprs, &constants);
        assert_eq!(interp.evaluate(ident), Ok(7));
    }

    #[test]
    fn unbound_identifiers_are_not_computable() {
        let mut exprs = Exprs::default();
        let frame = Frame::new();
        let x = frame.add("x", Type::int());
        let ident = exprs.ident(&x, empty_span());
        let constants = Valuation::default();

        let interp = Interpreter::new(&exprs, &constants);
        assert_eq!(interp.evaluate(ident), Err(NotComputable));
    }

    #[test]
    fn division_by_zero_is_not_computable() {
        let mut exprs = Exprs::default();
        let one = exprs.constant(1, empty_span());
        let zero = exprs.constant(0, empty_span());
        let div = exprs.binary(BinaryOp::Div, one, zero, empty_span());
        let constants = Valuation::default();

        let interp = Interpreter::new(&exprs, &constants);
        assert_eq!(interp.evaluate(div), Err(NotComputable));
    }
}
