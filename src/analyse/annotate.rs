use super::TypeChecker;
use crate::{
    error::{AnalyseError, Error},
    expr::{evaluate::Interpreter, AssignOp, BinaryOp, Expr, ExprKey, IncDecOp, UnaryOp},
    span::Spanned,
    types::{Base, Prefix, Type},
};

impl TypeChecker<'_> {
    /// Type check and annotate an expression bottom-up. Assigns a type to
    /// every node of the expression, checks that only left-hand-side values
    /// are updated, that functions are called with compatible arguments and
    /// that operators are applied to compatible operands. Returns true iff
    /// no type error was found; on failure the node's annotation stays
    /// `Unknown` and an error has been reported at its position.
    pub(super) fn annotate(&mut self, key: ExprKey) -> bool {
        let expr = self.system.exprs.get(key).clone();

        let mut ok = true;
        for child in expr.child_keys() {
            ok &= self.annotate(child);
        }
        if !ok {
            return false;
        }

        let span = expr.span().clone();
        let ty = match &expr {
            Expr::Error(span) => {
                self.handler.emit_err(Error::Internal {
                    msg: "cannot annotate an error expression",
                    span: span.clone(),
                });
                return false;
            }

            // Leaves arrive pre-typed from the builder.
            Expr::Constant { .. }
            | Expr::Ident { .. }
            | Expr::Dot { .. }
            | Expr::List { .. }
            | Expr::Deadlock { .. } => return true,

            Expr::Quantified { .. } | Expr::LeadsTo { .. } => Type::constraint(),

            Expr::Unary {
                op: UnaryOp::Not,
                expr: operand,
                ..
            } => {
                let operand_ty = self.ty(*operand);
                if operand_ty.is_value() {
                    Type::boolean()
                } else if operand_ty.is_constraint() {
                    Type::constraint()
                } else {
                    self.error(AnalyseError::InvalidOperation { span });
                    return false;
                }
            }

            Expr::Unary {
                op: UnaryOp::Neg,
                expr: operand,
                ..
            } => {
                if !self.ty(*operand).is_value() {
                    self.error(AnalyseError::InvalidOperation { span });
                    return false;
                }
                Type::int()
            }

            Expr::RateOf { expr: operand, .. } => {
                if !self.ty(*operand).is_cost() {
                    self.error(AnalyseError::RateOfNonCost { span });
                    return false;
                }
                Type::rate()
            }

            Expr::Binary { op, lhs, rhs, .. } => {
                match self.binary_type(*op, *lhs, *rhs) {
                    Ok(ty) => ty,
                    Err(error) => {
                        self.error(error);
                        return false;
                    }
                }
            }

            Expr::Assign { op, lhs, rhs, .. } => {
                let lhs_ty = self.ty(*lhs);
                let rhs_ty = self.ty(*rhs);
                let ty = match op {
                    AssignOp::Assign => {
                        if !assignment_compatible(&lhs_ty, &rhs_ty) {
                            self.error(AnalyseError::IncompatibleAssignment { span });
                            return false;
                        }
                        lhs_ty
                    }
                    AssignOp::AddAssign => {
                        if !(lhs_ty.is_integer() || lhs_ty.is_cost()) || !rhs_ty.is_integer() {
                            self.error(AnalyseError::AddAssignOperands { span });
                            return false;
                        }
                        lhs_ty
                    }
                    _ => {
                        if !lhs_ty.is_value() || !rhs_ty.is_value() {
                            self.error(AnalyseError::CompoundAssignOperands { span });
                            return false;
                        }
                        Type::int()
                    }
                };
                if !self.is_lhs_value(*lhs) {
                    self.error(AnalyseError::LhsExpected {
                        span: self.system.exprs.span(*lhs),
                    });
                    return false;
                }
                ty
            }

            Expr::IncDec { expr: operand, .. } => {
                if !self.is_lhs_value(*operand) {
                    self.error(AnalyseError::LhsExpected {
                        span: self.system.exprs.span(*operand),
                    });
                    return false;
                }
                if !self.ty(*operand).is_integer() {
                    self.error(AnalyseError::IntegerExpected { span });
                    return false;
                }
                Type::int()
            }

            Expr::InlineIf {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                if !self.ty(*cond).is_value() {
                    self.error(AnalyseError::InlineIfCondition { span });
                    return false;
                }
                let then_ty = self.ty(*then_expr);
                if !self.inline_if_compatible(&then_ty, &self.ty(*else_expr)) {
                    self.error(AnalyseError::InlineIfIncompatible { span });
                    return false;
                }
                then_ty
            }

            Expr::Comma { lhs, rhs, .. } => {
                for side in [*lhs, *rhs] {
                    let side_ty = self.ty(side);
                    if !(side_ty.is_value()
                        || side_ty.is_scalar()
                        || side_ty.is_clock()
                        || side_ty.is_record()
                        || side_ty.is_void()
                        || side_ty.is_cost())
                    {
                        self.error(AnalyseError::CommaOperand {
                            span: self.system.exprs.span(side),
                        });
                        return false;
                    }
                }
                self.ty(*rhs)
            }

            Expr::Call { callee, args, .. } => {
                let callee_ty = self.ty(*callee);
                if callee_ty.base() != Base::Function {
                    self.error(AnalyseError::FunctionExpected {
                        span: self.system.exprs.span(*callee),
                    });
                    return false;
                }
                self.check_call_arguments(&span, &callee_ty, args);
                callee_ty.sub().unwrap_or_else(Type::unknown)
            }

            Expr::Index { array, index, .. } => {
                match self.index_type(*array, *index) {
                    Ok(ty) => ty,
                    Err(error) => {
                        self.error(error);
                        return false;
                    }
                }
            }

            Expr::Forall { binding, body, .. } => {
                self.check_type(&binding.ty(), false);

                let body_ty = self.ty(*body);
                let ty = if body_ty.is_value() {
                    Type::boolean()
                } else if body_ty.is_invariant() {
                    Type::invariant()
                } else if body_ty.is_guard() {
                    Type::guard()
                } else if body_ty.is_constraint() {
                    Type::constraint()
                } else {
                    self.error(AnalyseError::BooleanExpected {
                        span: self.system.exprs.span(*body),
                    });
                    return false;
                };

                if !self.is_side_effect_free(*body) {
                    self.error(AnalyseError::SideEffect {
                        ctx: "expression",
                        span: self.system.exprs.span(*body),
                    });
                }
                ty
            }
        };

        self.system.exprs.set_ty(key, ty);
        true
    }

    fn binary_type(
        &self,
        op: BinaryOp,
        lhs: ExprKey,
        rhs: ExprKey,
    ) -> Result<Type, AnalyseError> {
        let lhs_ty = self.ty(lhs);
        let rhs_ty = self.ty(rhs);
        let span = crate::span::join(
            &self.system.exprs.span(lhs),
            &self.system.exprs.span(rhs),
        );

        use BinaryOp::*;
        match op {
            Eq | Ne => {
                if lhs_ty.is_value() && rhs_ty.is_value() {
                    Ok(Type::boolean())
                } else if lhs_ty.is_record()
                    && rhs_ty.is_record()
                    && record_frames_equal(&lhs_ty, &rhs_ty)
                {
                    Ok(Type::boolean())
                } else if lhs_ty.is_scalar() || rhs_ty.is_scalar() {
                    if lhs_ty != rhs_ty {
                        return Err(AnalyseError::ScalarComparison { span });
                    }
                    Ok(Type::boolean())
                } else {
                    binary_non_int(&lhs_ty, op, &rhs_ty)
                        .ok_or(AnalyseError::InvalidOperands { op: op.as_str(), span })
                }
            }

            Add | Sub | Mul | Div | Mod | BitAnd | BitOr | BitXor | Shl | Shr | Min | Max => {
                if lhs_ty.is_value() && rhs_ty.is_value() {
                    Ok(Type::int())
                } else {
                    binary_non_int(&lhs_ty, op, &rhs_ty)
                        .ok_or(AnalyseError::InvalidOperands { op: op.as_str(), span })
                }
            }

            And | Or | Lt | Le | Ge | Gt => {
                if lhs_ty.is_value() && rhs_ty.is_value() {
                    Ok(Type::boolean())
                } else {
                    binary_non_int(&lhs_ty, op, &rhs_ty)
                        .ok_or(AnalyseError::InvalidOperands { op: op.as_str(), span })
                }
            }
        }
    }

    fn index_type(&self, array: ExprKey, index: ExprKey) -> Result<Type, AnalyseError> {
        let array_ty = self.ty(array);
        let index_ty = self.ty(index);

        if array_ty.base() != Base::Array {
            return Err(AnalyseError::ArrayExpected {
                span: self.system.exprs.span(array),
            });
        }
        let element = array_ty.sub().unwrap_or_else(Type::unknown);

        let Some(size) = array_ty.array_size() else {
            return Ok(element);
        };

        if size.is_integer() && index_ty.is_value() {
            // Fold the index against the declared size where possible; a
            // non-computable index is left to runtime checking.
            if let Some(range) = size.range() {
                let interp = Interpreter::new(&self.system.exprs, &self.system.constants);
                if let (Ok(value), Ok(bounds)) =
                    (interp.evaluate(index), interp.evaluate_range(range))
                {
                    if !bounds.contains(value) {
                        return Err(AnalyseError::IndexOutOfRange {
                            span: self.system.exprs.span(index),
                        });
                    }
                }
            }
        } else if size.is_scalar() && index_ty.is_scalar() && size != index_ty {
            return Err(AnalyseError::IncompatibleIndex {
                span: self.system.exprs.span(index),
            });
        }

        Ok(element)
    }

    /// The LHS predicate: true for expressions that denote an updatable
    /// variable location. An inline if over integers only qualifies when
    /// both branches are declared with syntactically identical ranges; this
    /// deliberate over-approximation matches the instantiation rules in
    /// [`super::compat`] and should not be widened without revisiting them.
    pub(super) fn is_lhs_value(&self, key: ExprKey) -> bool {
        match self.system.exprs.get(key) {
            Expr::Ident { symbol, .. } => !symbol.ty().has_prefix(Prefix::Constant),

            Expr::Dot { expr, .. } | Expr::Index { array: expr, .. } => self.is_lhs_value(*expr),

            Expr::IncDec {
                op: IncDecOp::PreIncrement | IncDecOp::PreDecrement,
                expr,
                ..
            } => self.is_lhs_value(*expr),

            Expr::Assign { lhs, .. } => self.is_lhs_value(*lhs),

            Expr::InlineIf {
                then_expr,
                else_expr,
                ..
            } => {
                if !self.is_lhs_value(*then_expr) || !self.is_lhs_value(*else_expr) {
                    return false;
                }
                let then_ty = self.system.exprs.stripped_symbol_ty(*then_expr);
                let else_ty = self.system.exprs.stripped_symbol_ty(*else_expr);
                match (then_ty, else_ty) {
                    (Some(then_ty), Some(else_ty)) if then_ty.base() == Base::Int => self
                        .system
                        .exprs
                        .ranges_syntactically_equal(then_ty.range(), else_ty.range()),
                    (Some(only), None) | (None, Some(only)) if only.base() == Base::Int => {
                        only.range().is_none()
                    }
                    _ => true,
                }
            }

            Expr::Comma { rhs, .. } => self.is_lhs_value(*rhs),

            // Functions cannot return references.
            _ => false,
        }
    }

    /// Like the LHS predicate, but the location must additionally be
    /// determined by constants alone: array indices must not depend on the
    /// persistent set and an inline if never qualifies.
    pub(super) fn is_unique_reference(&self, key: ExprKey) -> bool {
        match self.system.exprs.get(key) {
            Expr::Ident { symbol, .. } => !symbol.ty().has_prefix(Prefix::Constant),

            Expr::Dot { expr, .. } => self.is_unique_reference(*expr),

            Expr::Index { array, index, .. } => {
                self.is_unique_reference(*array)
                    && !self.persistent.depends_on(self.system, *index)
            }

            Expr::IncDec {
                op: IncDecOp::PreIncrement | IncDecOp::PreDecrement,
                expr,
                ..
            } => self.is_unique_reference(*expr),

            Expr::Assign { lhs, .. } => self.is_unique_reference(*lhs),

            Expr::Comma { rhs, .. } => self.is_unique_reference(*rhs),

            _ => false,
        }
    }

    /// True if arguments of an inline if are compatible. The branches are
    /// compatible iff they have the same base type; arrays must additionally
    /// agree on their size and have compatible elements, records must have
    /// identical field frames and channels must agree on urgency and
    /// broadcast.
    pub(super) fn inline_if_compatible(&self, then_ty: &Type, else_ty: &Type) -> bool {
        if then_ty.is_value() && else_ty.is_value() {
            true
        } else if then_ty.is_clock() && else_ty.is_clock() {
            true
        } else if then_ty.is_channel() && else_ty.is_channel() {
            then_ty.has_prefix(Prefix::Urgent) == else_ty.has_prefix(Prefix::Urgent)
                && then_ty.has_prefix(Prefix::Broadcast) == else_ty.has_prefix(Prefix::Broadcast)
        } else if then_ty.is_array() && else_ty.is_array() {
            let sizes_match = match (then_ty.array_size(), else_ty.array_size()) {
                (Some(then_size), Some(else_size)) => {
                    if then_size.is_integer() && else_size.is_integer() {
                        self.system
                            .exprs
                            .ranges_syntactically_equal(then_size.range(), else_size.range())
                    } else if then_size.is_scalar() && else_size.is_scalar() {
                        then_size == else_size
                    } else {
                        false
                    }
                }
                _ => false,
            };
            sizes_match
                && match (then_ty.sub(), else_ty.sub()) {
                    (Some(then_sub), Some(else_sub)) => {
                        self.inline_if_compatible(&then_sub, &else_sub)
                    }
                    _ => false,
                }
        } else if then_ty.is_record() && else_ty.is_record() {
            record_frames_equal(then_ty, else_ty)
        } else if then_ty.is_scalar() && else_ty.is_scalar() {
            then_ty == else_ty
        } else {
            false
        }
    }
}

/// The type of a binary operation with non-value operands, or `None` when
/// the combination is not defined.
fn binary_non_int(lhs: &Type, op: BinaryOp, rhs: &Type) -> Option<Type> {
    use BinaryOp::*;
    match op {
        Add => {
            if (lhs.is_integer() && rhs.is_clock()) || (lhs.is_clock() && rhs.is_integer()) {
                Some(Type::clock())
            } else if (lhs.is_diff() && rhs.is_integer()) || (lhs.is_integer() && rhs.is_diff()) {
                Some(Type::diff())
            } else {
                None
            }
        }

        // `int - clock` is excluded so that the expression can be turned
        // into a clock guard downstream.
        Sub => {
            if lhs.is_clock() && rhs.is_integer() {
                Some(Type::clock())
            } else if (lhs.is_diff() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_diff())
                || (lhs.is_clock() && rhs.is_clock())
            {
                Some(Type::diff())
            } else {
                None
            }
        }

        And => {
            if lhs.is_invariant() && rhs.is_invariant() {
                Some(Type::invariant())
            } else if lhs.is_invariant_wr() && rhs.is_invariant_wr() {
                Some(Type::invariant_wr())
            } else if lhs.is_guard() && rhs.is_guard() {
                Some(Type::guard())
            } else if lhs.is_constraint() && rhs.is_constraint() {
                Some(Type::constraint())
            } else {
                None
            }
        }

        Or => {
            if lhs.is_value() && rhs.is_invariant() {
                Some(Type::invariant())
            } else if lhs.is_value() && rhs.is_guard() {
                Some(Type::guard())
            } else if lhs.is_constraint() && rhs.is_constraint() {
                Some(Type::constraint())
            } else {
                None
            }
        }

        Lt | Le => {
            if (lhs.is_clock() && rhs.is_clock())
                || (lhs.is_clock() && rhs.is_integer())
                || (lhs.is_diff() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_diff())
            {
                Some(Type::invariant())
            } else if lhs.is_integer() && rhs.is_clock() {
                Some(Type::guard())
            } else {
                None
            }
        }

        Eq => {
            if (lhs.is_clock() && rhs.is_clock())
                || (lhs.is_clock() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_clock())
                || (lhs.is_diff() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_diff())
            {
                Some(Type::guard())
            } else if (lhs.base() == Base::Rate && rhs.is_integer())
                || (lhs.is_integer() && rhs.base() == Base::Rate)
            {
                Some(Type::invariant_wr())
            } else {
                None
            }
        }

        Ne => {
            if (lhs.is_clock() && rhs.is_clock())
                || (lhs.is_clock() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_clock())
                || (lhs.is_diff() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_diff())
            {
                Some(Type::constraint())
            } else {
                None
            }
        }

        Ge | Gt => {
            if (lhs.is_clock() && rhs.is_clock())
                || (lhs.is_integer() && rhs.is_clock())
                || (lhs.is_diff() && rhs.is_integer())
                || (lhs.is_integer() && rhs.is_diff())
            {
                Some(Type::invariant())
            } else if lhs.is_clock() && rhs.is_guard() {
                Some(Type::guard())
            } else {
                None
            }
        }

        _ => None,
    }
}

/// Assignment compatibility of `lvalue <- rvalue`. Does not check whether
/// the left side actually is a left-hand-side value, nor integer ranges.
pub(super) fn assignment_compatible(lvalue: &Type, rvalue: &Type) -> bool {
    (lvalue.is_clock() && rvalue.is_value())
        || (lvalue.is_value() && rvalue.is_value())
        || (lvalue.is_record() && rvalue.is_record() && record_frames_equal(lvalue, rvalue))
        || (lvalue.is_scalar() && rvalue.is_scalar() && lvalue == rvalue)
}

pub(super) fn record_frames_equal(lhs: &Type, rhs: &Type) -> bool {
    match (lhs.fields(), rhs.fields()) {
        (Some(lhs), Some(rhs)) => lhs.same(&rhs),
        _ => false,
    }
}
