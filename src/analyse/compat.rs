use super::TypeChecker;
use crate::{
    error::AnalyseError,
    expr::{evaluate::Interpreter, ExprKey},
    range::Range,
    span::Span,
    symbols::Symbol,
    types::{Base, Prefix, Type},
};

/// Why an argument failed to match a formal parameter.
enum Incompat {
    NeedsLhs,
    Incompatible,
    RangeMismatch,
    RangeOutside,
    Channel,
}

/// The capability of a channel type: urgent channels rank lowest, non-urgent
/// broadcast channels in between, all others highest. An argument must have
/// at least the capability of the formal parameter it is bound to.
fn channel_capability(ty: &Type) -> u8 {
    if ty.has_prefix(Prefix::Urgent) {
        0
    } else if ty.has_prefix(Prefix::Broadcast) {
        1
    } else {
        2
    }
}

impl TypeChecker<'_> {
    /// Checks the arguments of a function call against the declared
    /// parameters: exact arity, then per-argument compatibility.
    pub(super) fn check_call_arguments(
        &self,
        call_span: &Span,
        callee_ty: &Type,
        args: &[ExprKey],
    ) {
        let Some(parameters) = callee_ty.parameters() else {
            return;
        };

        if parameters.size() > args.len() {
            self.error(AnalyseError::TooFewArguments {
                span: call_span.clone(),
            });
        } else if parameters.size() < args.len() {
            for surplus in &args[parameters.size()..] {
                self.error(AnalyseError::TooManyArguments {
                    span: self.system.exprs.span(*surplus),
                });
            }
        } else {
            for (index, arg) in args.iter().enumerate() {
                self.check_parameter_compatible(&[], &parameters.get(index).ty(), *arg);
            }
        }
    }

    /// Checks whether the type of `arg` is compatible with the formal
    /// parameter type `param`, under the constant valuation extended with
    /// `mapping` (the parameter bindings of the enclosing instantiation).
    pub(super) fn check_parameter_compatible(
        &self,
        mapping: &[(Symbol, ExprKey)],
        param: &Type,
        arg: ExprKey,
    ) {
        if let Err(incompat) = self.parameter_compatible(mapping, param, arg) {
            let span = self.system.exprs.span(arg);
            self.error(match incompat {
                Incompat::NeedsLhs => AnalyseError::ReferenceParameterNeedsLhs { span },
                Incompat::Incompatible => AnalyseError::IncompatibleParameter { span },
                Incompat::RangeMismatch => AnalyseError::ParameterRangeMismatch { span },
                Incompat::RangeOutside => AnalyseError::ParameterRangeOutside { span },
                Incompat::Channel => AnalyseError::IncompatibleChannel { span },
            });
        }
    }

    fn parameter_compatible(
        &self,
        mapping: &[(Symbol, ExprKey)],
        param: &Type,
        arg: ExprKey,
    ) -> Result<(), Incompat> {
        let interp =
            Interpreter::with_mapping(&self.system.exprs, &self.system.constants, mapping);

        let is_ref = param.has_prefix(Prefix::Reference);
        let constant = param.has_prefix(Prefix::Constant);
        let mut lhs = self.is_lhs_value(arg);

        let mut param_ty = param.clone();
        let mut arg_ty = self.system.exprs.ty(arg).clone();

        if !is_ref {
            // Value parameters admit silent conversion between booleans and
            // integers.
            if param_ty.base() == Base::Int && arg_ty.base() == Base::Bool {
                arg_ty = Type::int();
                lhs = false;
            }
            if param_ty.base() == Base::Bool && arg_ty.base() == Base::Int {
                arg_ty = Type::boolean();
                lhs = false;
            }
        }

        if is_ref && !constant && !lhs {
            return Err(Incompat::NeedsLhs);
        }

        // Peel array layers; each layer must agree on its size.
        while param_ty.base() == Base::Array {
            if arg_ty.base() != Base::Array {
                return Err(Incompat::Incompatible);
            }

            match (param_ty.array_size(), arg_ty.array_size()) {
                (Some(param_size), Some(arg_size)) => {
                    if param_size.is_integer() && arg_size.is_integer() {
                        // Sizes are compared syntactically. Evaluating them
                        // is not always possible, so this is stricter than
                        // it strictly needs to be.
                        if !self
                            .system
                            .exprs
                            .ranges_syntactically_equal(arg_size.range(), param_size.range())
                        {
                            return Err(Incompat::Incompatible);
                        }
                    } else if param_size.is_scalar() && arg_size.is_scalar() {
                        if arg_size != param_size {
                            return Err(Incompat::Incompatible);
                        }
                    } else {
                        return Err(Incompat::Incompatible);
                    }
                }
                _ => return Err(Incompat::Incompatible),
            }

            param_ty = param_ty.sub().ok_or(Incompat::Incompatible)?;
            arg_ty = arg_ty.sub().ok_or(Incompat::Incompatible)?;
        }

        if param_ty.base() != arg_ty.base() {
            return Err(Incompat::Incompatible);
        }

        match param_ty.base() {
            // For clocks and booleans there is nothing more to check.
            Base::Clock | Base::Bool => Ok(()),

            Base::Int => self.integer_parameter_compatible(
                &interp, &param_ty, &arg_ty, arg, is_ref, constant, lhs,
            ),

            Base::Record => {
                if super::annotate::record_frames_equal(&param_ty, &arg_ty) {
                    Ok(())
                } else {
                    Err(Incompat::Incompatible)
                }
            }

            Base::Channel => {
                if channel_capability(&arg_ty) < channel_capability(&param_ty) {
                    Err(Incompat::Channel)
                } else {
                    Ok(())
                }
            }

            Base::Scalar => {
                if param_ty != arg_ty {
                    Err(Incompat::Incompatible)
                } else {
                    Ok(())
                }
            }

            _ => Ok(()),
        }
    }

    /// Range discipline for integer parameters. References need their
    /// argument's declared range to match (non-const) or fit inside (const)
    /// the formal's range; value parameters are checked against the actual
    /// argument values when those are computable.
    #[allow(clippy::too_many_arguments)]
    fn integer_parameter_compatible(
        &self,
        interp: &Interpreter,
        param_ty: &Type,
        arg_ty: &Type,
        arg: ExprKey,
        is_ref: bool,
        constant: bool,
        lhs: bool,
    ) -> Result<(), Incompat> {
        // A formal without a declared range accepts everything.
        let Some(param_bounds) = param_ty.range() else {
            return Ok(());
        };

        if lhs {
            // The exact value of a left-hand-side argument is unknowable
            // here, so compare declared ranges.
            let evaluated = param_ty
                .range()
                .zip(arg_ty.range())
                .map(|(param_range, arg_range)| {
                    Ok::<_, crate::expr::evaluate::NotComputable>((
                        interp.evaluate_range(param_range)?,
                        interp.evaluate_range(arg_range)?,
                    ))
                })
                .unwrap_or(Err(crate::expr::evaluate::NotComputable));

            match evaluated {
                Ok((param_range, arg_range)) => {
                    if is_ref && !constant && arg_range != param_range {
                        return Err(Incompat::RangeMismatch);
                    }
                    if is_ref && constant && !param_range.contains_range(&arg_range) {
                        return Err(Incompat::RangeOutside);
                    }
                    if param_range.intersect(&arg_range).is_empty() {
                        return Err(Incompat::RangeOutside);
                    }
                }
                Err(_) => {
                    // Computing the declared ranges failed; for references
                    // fall back to syntactic equality of the declarations.
                    if is_ref
                        && !self
                            .system
                            .exprs
                            .ranges_syntactically_equal(param_ty.range(), arg_ty.range())
                    {
                        return Err(Incompat::RangeMismatch);
                    }
                }
            }
            Ok(())
        } else {
            let Ok(param_range) = interp.evaluate_range(param_bounds) else {
                return Ok(());
            };

            let mut values = Vec::new();
            if interp.evaluate_flat(arg, &mut values).is_ok() {
                let arg_range = values
                    .iter()
                    .fold(Range::empty(), |acc, value| acc.join(&Range::single(*value)));
                if !param_range.contains_range(&arg_range) {
                    return Err(Incompat::RangeOutside);
                }
            }
            // A non-computable argument is deferred to runtime checking.
            Ok(())
        }
    }
}
