use super::TypeChecker;
use crate::{
    error::AnalyseError,
    expr::{evaluate::Interpreter, Expr, ExprKey},
    types::{Base, Type},
};

/// Raised while checking an initializer; carries the offending
/// sub-expression. The outer caller turns it into one positioned
/// diagnostic.
pub(super) struct InitialiserError {
    pub expr: ExprKey,
    pub kind: InitialiserErrorKind,
}

pub(super) enum InitialiserErrorKind {
    InvalidArray,
    ScalarSetArray,
    ParameterisedArray,
    Excess,
    NamedElement,
    Missing,
    Invalid,
    OutOfRange,
    InvalidRecord,
    Incomplete,
}

fn raise(expr: ExprKey, kind: InitialiserErrorKind) -> InitialiserError {
    InitialiserError { expr, kind }
}

impl TypeChecker<'_> {
    pub(super) fn report_initialiser_error(&self, err: InitialiserError) {
        use InitialiserErrorKind::*;
        let span = self.system.exprs.span(err.expr);
        self.error(match err.kind {
            InvalidArray => AnalyseError::InvalidArrayInitialiser { span },
            ScalarSetArray => AnalyseError::ScalarSetArrayInitialiser { span },
            ParameterisedArray => AnalyseError::ParameterisedArrayInitialiser { span },
            Excess => AnalyseError::ExcessArrayElements { span },
            NamedElement => AnalyseError::PositionalElementExpected { span },
            Missing => AnalyseError::MissingArrayElements { span },
            Invalid => AnalyseError::InvalidInitialiser { span },
            OutOfRange => AnalyseError::OutOfRangeInitialiser { span },
            InvalidRecord => AnalyseError::InvalidRecordInitialiser { span },
            Incomplete => AnalyseError::IncompleteInitialiser { span },
        });
    }

    /// Checks that `init` is a valid initializer for a variable of type
    /// `ty` and returns it in normal form: array initializers become
    /// positional lists of exactly the declared length, record initializers
    /// become positional lists in field-declaration order. The returned
    /// expression carries the declared type.
    pub(super) fn check_initialiser(
        &mut self,
        ty: &Type,
        init: ExprKey,
    ) -> Result<ExprKey, InitialiserError> {
        use InitialiserErrorKind::*;

        match ty.base() {
            Base::Array => {
                let Expr::List { elements, span } = self.system.exprs.get(init).clone() else {
                    return Err(raise(init, InvalidArray));
                };

                let size = ty.array_size().ok_or_else(|| raise(init, InvalidArray))?;
                if !size.is_integer() {
                    return Err(raise(init, ScalarSetArray));
                }

                let dim = {
                    let bounds = size.range().ok_or_else(|| raise(init, ParameterisedArray))?;
                    let interp = Interpreter::new(&self.system.exprs, &self.system.constants);
                    match interp.evaluate_range(bounds) {
                        Ok(range) => range.size() as usize,
                        Err(_) => return Err(raise(init, ParameterisedArray)),
                    }
                };

                if elements.len() > dim {
                    return Err(raise(init, Excess));
                }

                let element_ty = ty.sub().unwrap_or_else(Type::unknown);
                let mut normalized = Vec::with_capacity(elements.len());
                for (name, element) in &elements {
                    if name.is_some() {
                        return Err(raise(*element, NamedElement));
                    }
                    normalized.push((None, self.check_initialiser(&element_ty, *element)?));
                }

                if elements.len() < dim {
                    return Err(raise(init, Missing));
                }

                Ok(self.system.exprs.insert(
                    Expr::List {
                        elements: normalized,
                        span,
                    },
                    ty.clone(),
                ))
            }

            Base::Bool => {
                if !self.system.exprs.ty(init).is_value() {
                    return Err(raise(init, Invalid));
                }
                Ok(init)
            }

            Base::Int => {
                if !self.system.exprs.ty(init).is_value() {
                    return Err(raise(init, Invalid));
                }

                // Constants may be declared without a range, in which case
                // there is nothing further to check.
                let Some(bounds) = ty.range() else {
                    return Ok(init);
                };

                // The initializer must lie within the declared range, but
                // only when both can be computed here.
                let interp = Interpreter::new(&self.system.exprs, &self.system.constants);
                if let (Ok(value), Ok(range)) =
                    (interp.evaluate(init), interp.evaluate_range(bounds))
                {
                    if !range.contains(value) {
                        return Err(raise(init, OutOfRange));
                    }
                }
                Ok(init)
            }

            Base::Record => {
                let fields = ty.fields().ok_or_else(|| raise(init, InvalidRecord))?;

                // An expression that already has this record type needs no
                // reordering.
                let init_ty = self.system.exprs.ty(init).clone();
                if init_ty.is_record() && super::annotate::record_frames_equal(ty, &init_ty) {
                    return Ok(init);
                }

                let Expr::List { elements, span } = self.system.exprs.get(init).clone() else {
                    return Err(raise(init, InvalidRecord));
                };

                let mut filled: Vec<Option<ExprKey>> = vec![None; fields.size()];
                let mut current = 0usize;
                for (name, element) in &elements {
                    if let Some(name) = name {
                        match fields.index_of(name) {
                            Some(index) => current = index,
                            None => {
                                self.error(AnalyseError::UnknownField {
                                    name: name.clone(),
                                    span: self.system.exprs.span(*element),
                                });
                                break;
                            }
                        }
                    }

                    if current >= fields.size() {
                        self.error(AnalyseError::ExcessFields {
                            span: self.system.exprs.span(*element),
                        });
                        break;
                    }

                    if filled[current].is_some() {
                        self.error(AnalyseError::DuplicateFieldInitialiser {
                            span: self.system.exprs.span(*element),
                        });
                        current += 1;
                        continue;
                    }

                    filled[current] =
                        Some(self.check_initialiser(&fields.get(current).ty(), *element)?);
                    current += 1;
                }

                let mut normalized = Vec::with_capacity(fields.size());
                for entry in filled {
                    match entry {
                        Some(element) => normalized.push((None, element)),
                        None => return Err(raise(init, Incomplete)),
                    }
                }

                Ok(self.system.exprs.insert(
                    Expr::List {
                        elements: normalized,
                        span,
                    },
                    ty.clone(),
                ))
            }

            _ => Err(raise(init, Invalid)),
        }
    }
}
