use crate::{
    expr::{BinaryOp, Expr, ExprKey, Exprs},
    types::{Base, Type},
};

/// Splits a conjunctive invariant into its pure part and the rate bindings
/// it contains. Each equality with a rate expression on exactly one side
/// becomes a `(cost variable, rate)` pair; every other conjunct is folded
/// back into the residual invariant. The conjunction of the residual and the
/// pairs is equivalent to the input.
#[derive(Debug, Default)]
pub(super) struct RateDecomposer {
    pub rates: Vec<(ExprKey, ExprKey)>,
    pub invariant: Option<ExprKey>,
}

impl RateDecomposer {
    pub(super) fn decompose(&mut self, exprs: &mut Exprs, key: ExprKey) {
        if exprs.ty(key).is_invariant() {
            self.conjoin(exprs, key);
            return;
        }

        // The annotator only types a conjunction or a rate equality as
        // invariant-with-rates, so these are the remaining shapes.
        match *exprs.get(key) {
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
                ..
            } => {
                self.decompose(exprs, lhs);
                self.decompose(exprs, rhs);
            }

            Expr::Binary {
                op: BinaryOp::Eq,
                lhs,
                rhs,
                ..
            } => {
                if exprs.ty(lhs).base() == Base::Rate {
                    self.rates.push((rate_operand(exprs, lhs), rhs));
                } else {
                    self.rates.push((rate_operand(exprs, rhs), lhs));
                }
            }

            _ => {}
        }
    }

    fn conjoin(&mut self, exprs: &mut Exprs, key: ExprKey) {
        self.invariant = Some(match self.invariant {
            None => key,
            Some(residual) => {
                let span = exprs.span(key);
                let conjunction = exprs.binary(BinaryOp::And, residual, key, span);
                exprs.set_ty(conjunction, Type::invariant());
                conjunction
            }
        });
    }
}

/// The cost variable underneath a rate expression.
fn rate_operand(exprs: &Exprs, key: ExprKey) -> ExprKey {
    match *exprs.get(key) {
        Expr::RateOf { expr, .. } => expr,
        _ => key,
    }
}
