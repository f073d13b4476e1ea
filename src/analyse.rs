//! The semantic analyser. Verifies that every expression and declaration of
//! a system is well typed, annotates each expression with its inferred type,
//! applies the per-construct rules for invariants, guards,
//! synchronisations, updates, properties, functions and instantiations,
//! normalizes initializers and splits location invariants into their pure
//! part and explicit cost-rate bindings.

use crate::{
    error::{AnalyseError, Error, ErrorEmitted, Handler},
    expr::{evaluate::Interpreter, Expr, ExprKey},
    symbols::Frame,
    system::{Declarations, Edge, Effects, Instance, Progress, Stmt, System, SyncDir, Variable},
    types::{Base, Prefix, Type},
    warning::Warning,
};

pub(crate) mod annotate;
mod compat;
mod initialiser;
mod persistent;
mod rates;

#[cfg(test)]
mod tests;

use persistent::PersistentVariables;
use rates::RateDecomposer;

/// Analyses a complete system: all declarations, templates, instantiations
/// and properties. Annotates every expression reachable from the system and
/// reports all errors through `handler`. Returns `Ok` iff no error was
/// reported.
pub fn analyse_system(system: &mut System, handler: &Handler) -> Result<(), ErrorEmitted> {
    let mut checker = TypeChecker::new(system, handler);
    checker.check_system();
    handler.result(())
}

/// Analyses a single expression against the declarations of `system`, as
/// used for expressions entered separately from the model. Returns `Ok` iff
/// no error was reported.
pub fn analyse_expression(
    system: &mut System,
    expr: ExprKey,
    handler: &Handler,
) -> Result<(), ErrorEmitted> {
    let mut checker = TypeChecker::new(system, handler);
    checker.annotate(expr);
    handler.result(())
}

pub(crate) struct TypeChecker<'a> {
    system: &'a mut System,
    handler: &'a Handler,
    persistent: PersistentVariables,
}

impl<'a> TypeChecker<'a> {
    fn new(system: &'a mut System, handler: &'a Handler) -> Self {
        let persistent = PersistentVariables::collect(system);
        TypeChecker {
            system,
            handler,
            persistent,
        }
    }

    fn error(&self, error: AnalyseError) {
        self.handler.emit_err(Error::Analyse { error });
    }

    fn ty(&self, key: ExprKey) -> Type {
        self.system.exprs.ty(key).clone()
    }

    /// An expression is side effect free iff it does not update any
    /// variable of the runtime state; updates of function locals do not
    /// count.
    fn is_side_effect_free(&self, key: ExprKey) -> bool {
        !self.persistent.changes_variable(self.system, key)
    }

    fn check_system(&mut self) {
        for key in self.system.before_update.clone() {
            self.annotate(key);
        }
        for key in self.system.after_update.clone() {
            self.annotate(key);
        }

        self.check_declarations(None);

        for index in 0..self.system.templates.len() {
            self.check_template(index);
        }

        for index in 0..self.system.instances.len() {
            let instance = self.system.instances[index].clone();
            self.check_instance(&instance);
        }

        for key in self.system.properties.clone() {
            self.check_property(key);
        }
    }

    fn decls(&self, template: Option<usize>) -> &Declarations {
        match template {
            None => &self.system.globals,
            Some(index) => &self.system.templates[index].declarations,
        }
    }

    fn decls_mut(&mut self, template: Option<usize>) -> &mut Declarations {
        match template {
            None => &mut self.system.globals,
            Some(index) => &mut self.system.templates[index].declarations,
        }
    }

    fn check_declarations(&mut self, template: Option<usize>) {
        for index in 0..self.decls(template).variables.len() {
            let variable = self.decls(template).variables[index].clone();
            self.check_variable(&variable, template, index);
        }
        for index in 0..self.decls(template).functions.len() {
            self.check_function(template, index);
        }
    }

    /// Checks a variable declaration: the declared type, then the
    /// initializer, which must be a computable, side-effect-free expression
    /// fitting the declared type. A checked constant enters the constant
    /// valuation so later declarations can fold against it.
    fn check_variable(&mut self, variable: &Variable, template: Option<usize>, index: usize) {
        self.check_type(&variable.uid.ty(), false);

        if let Some(init) = variable.init {
            if self.annotate(init) {
                if self.persistent.depends_on(self.system, init) {
                    self.error(AnalyseError::ConstantExpected {
                        span: self.system.exprs.span(init),
                    });
                } else if !self.is_side_effect_free(init) {
                    self.error(AnalyseError::SideEffect {
                        ctx: "initialiser",
                        span: self.system.exprs.span(init),
                    });
                } else {
                    match self.check_initialiser(&variable.uid.ty(), init) {
                        Ok(normalized) => {
                            self.decls_mut(template).variables[index].init = Some(normalized);
                        }
                        Err(err) => self.report_initialiser_error(err),
                    }
                }
            }
        }

        if variable.uid.ty().has_prefix(Prefix::Constant) {
            if let Some(init) = self.decls(template).variables[index].init {
                self.system.constants.insert(variable.uid.clone(), init);
            }
        }
    }

    /// Annotates the expression and checks that it is an integer computable
    /// at analysis time. Returns true iff no error was found.
    fn annotate_and_expect_constant_integer(&mut self, key: ExprKey) -> bool {
        if self.annotate(key) {
            if !self.system.exprs.ty(key).is_integer() {
                self.error(AnalyseError::IntegerExpected {
                    span: self.system.exprs.span(key),
                });
            } else if self.persistent.depends_on(self.system, key) {
                self.error(AnalyseError::ConstantExpected {
                    span: self.system.exprs.span(key),
                });
            } else {
                return true;
            }
        }
        false
    }

    /// Checks that a declared type is well formed: range bounds are constant
    /// integers in the right order, array sizes are integers or scalar sets,
    /// record fields recursively check out. Inside a record every bound must
    /// be computable here; elsewhere a non-computable bound is deferred to
    /// the instantiation.
    pub(crate) fn check_type(&mut self, ty: &Type, in_record: bool) {
        match ty.base() {
            Base::Int | Base::Scalar => {
                let Some((lower, upper)) = ty.range() else {
                    return;
                };
                if self.annotate_and_expect_constant_integer(lower)
                    && self.annotate_and_expect_constant_integer(upper)
                {
                    // Errors evaluating the bounds are ignored unless the
                    // type sits inside a record: either an error was already
                    // generated above, or the bounds mention template
                    // parameters and will be checked per instance.
                    let interp = Interpreter::new(&self.system.exprs, &self.system.constants);
                    match (interp.evaluate(lower), interp.evaluate(upper)) {
                        (Ok(lo), Ok(hi)) => {
                            if lo > hi {
                                self.error(AnalyseError::InvalidRange {
                                    span: self.system.exprs.span(upper),
                                });
                            }
                        }
                        (Err(_), _) => {
                            if in_record {
                                self.error(AnalyseError::ParameterisedTypeInRecord {
                                    span: self.system.exprs.span(lower),
                                });
                            }
                        }
                        (_, Err(_)) => {
                            if in_record {
                                self.error(AnalyseError::ParameterisedTypeInRecord {
                                    span: self.system.exprs.span(upper),
                                });
                            }
                        }
                    }
                }
            }

            Base::Array => {
                let Some(size) = ty.array_size() else {
                    return;
                };
                self.check_type(&size, false);
                if let Some(element) = ty.sub() {
                    self.check_type(&element, in_record);
                }

                let size_span = size
                    .range()
                    .map(|(_, upper)| self.system.exprs.span(upper))
                    .unwrap_or_else(crate::span::empty_span);

                if !(size.is_integer() || size.is_scalar()) {
                    self.error(AnalyseError::InvalidArraySize { span: size_span });
                } else if let Some(bounds) = size.range() {
                    let interp = Interpreter::new(&self.system.exprs, &self.system.constants);
                    match interp.evaluate_range(bounds) {
                        Ok(range) => {
                            if range.is_empty() {
                                self.error(AnalyseError::InvalidArraySize { span: size_span });
                            }
                        }
                        Err(_) => {
                            // The dimension depends on a parameter and is
                            // checked per instance.
                            if in_record {
                                self.error(AnalyseError::ParameterisedTypeInRecord {
                                    span: size_span,
                                });
                            }
                        }
                    }
                }
            }

            Base::Record => {
                if let Some(fields) = ty.fields() {
                    for field in fields.symbols() {
                        self.check_type(&field.ty(), true);
                    }
                }
            }

            _ => {}
        }
    }

    fn check_template(&mut self, index: usize) {
        let parameters = self.system.templates[index].parameters.clone();
        for parameter in parameters.symbols() {
            self.check_type(&parameter.ty(), false);
        }

        self.check_declarations(Some(index));

        for location in 0..self.system.templates[index].locations.len() {
            self.check_location(index, location);
        }

        for edge_index in 0..self.system.templates[index].edges.len() {
            let edge = self.system.templates[index].edges[edge_index].clone();
            self.check_edge(&edge);
        }

        for progress in self.system.templates[index].progress.clone() {
            self.check_progress(&progress);
        }
    }

    /// Checks a location invariant and splits it into its pure part and the
    /// cost-rate bindings it contains. The location keeps the residual
    /// invariant; the bindings are stored next to it.
    fn check_location(&mut self, template: usize, location: usize) {
        let Some(invariant) = self.system.templates[template].locations[location].invariant
        else {
            return;
        };

        let mut ok = self.annotate(invariant);
        if ok {
            if !self.ty(invariant).is_invariant_wr() {
                self.error(AnalyseError::InvalidInvariant {
                    span: self.system.exprs.span(invariant),
                });
                ok = false;
            }
            if !self.is_side_effect_free(invariant) {
                self.error(AnalyseError::SideEffect {
                    ctx: "invariant",
                    span: self.system.exprs.span(invariant),
                });
                ok = false;
            }
        }

        if ok {
            let mut decomposer = RateDecomposer::default();
            decomposer.decompose(&mut self.system.exprs, invariant);

            let location = &mut self.system.templates[template].locations[location];
            location.invariant = decomposer.invariant;
            location.cost_rate = decomposer.rates.first().map(|(_, rate)| *rate);
            location.rates = decomposer.rates;
        }
    }

    fn check_edge(&mut self, edge: &Edge) {
        for binding in edge.select.symbols() {
            self.check_type(&binding.ty(), false);
        }

        if let Some(guard) = edge.guard {
            if self.annotate(guard) {
                if !self.ty(guard).is_guard() {
                    self.error(AnalyseError::InvalidGuard {
                        span: self.system.exprs.span(guard),
                    });
                } else if !self.is_side_effect_free(guard) {
                    self.error(AnalyseError::SideEffect {
                        ctx: "guard",
                        span: self.system.exprs.span(guard),
                    });
                }
            }
        }

        // A guard over clocks or clock differences restricts when the edge
        // can fire in ways an urgent or broadcast-receiving synchronisation
        // cannot honour.
        let has_clock_guard = edge.guard.is_some_and(|guard| {
            let ty = self.ty(guard);
            !ty.is_unknown() && !ty.is_value()
        });

        if let Some(sync) = &edge.sync {
            if self.annotate(sync.channel) {
                let channel_ty = self.ty(sync.channel);
                if channel_ty.base() != Base::Channel {
                    self.error(AnalyseError::ChannelExpected {
                        span: self.system.exprs.span(sync.channel),
                    });
                } else if !self.is_side_effect_free(sync.channel) {
                    self.error(AnalyseError::SideEffect {
                        ctx: "synchronisation",
                        span: sync.span.clone(),
                    });
                } else {
                    let is_urgent = channel_ty.has_prefix(Prefix::Urgent);
                    let receives_broadcast = channel_ty.has_prefix(Prefix::Broadcast)
                        && sync.dir == SyncDir::Receive;

                    if is_urgent && has_clock_guard {
                        self.error(AnalyseError::ClockGuardOnUrgent {
                            span: sync.span.clone(),
                        });
                    } else if receives_broadcast && has_clock_guard {
                        self.error(AnalyseError::ClockGuardOnBroadcastReceive {
                            span: sync.span.clone(),
                        });
                    }
                }
            }
        }

        if let Some(assign) = edge.assign {
            if self.annotate(assign) {
                let ty = self.ty(assign);
                if !(ty.is_value()
                    || ty.is_scalar()
                    || ty.is_clock()
                    || ty.is_record()
                    || ty.is_cost()
                    || ty.is_void())
                {
                    self.error(AnalyseError::InvalidAssignment {
                        span: self.system.exprs.span(assign),
                    });
                }

                // The literal `1` is the conventional empty update.
                let is_literal_one =
                    matches!(self.system.exprs.get(assign), Expr::Constant { value: 1, .. });
                if !is_literal_one && self.is_side_effect_free(assign) {
                    self.handler.emit_warn(Warning::NoEffect {
                        span: self.system.exprs.span(assign),
                    });
                }
            }
        }
    }

    fn check_progress(&mut self, progress: &Progress) {
        if let Some(guard) = progress.guard {
            if self.annotate(guard) && !self.ty(guard).is_value() {
                self.error(AnalyseError::NonBooleanProgressGuard {
                    span: self.system.exprs.span(guard),
                });
            }
        }
        if self.annotate(progress.measure) && !self.ty(progress.measure).is_value() {
            self.error(AnalyseError::NonValueProgressMeasure {
                span: self.system.exprs.span(progress.measure),
            });
        }
    }

    /// Checks an instantiation: each argument must be side effect free and
    /// either a computable value for a value or const-reference parameter,
    /// or a unique reference for a reference parameter. Compatible arguments
    /// are then matched against the formal parameter types.
    fn check_instance(&mut self, instance: &Instance) {
        for (formal, argument) in &instance.mapping {
            if !self.annotate(*argument) {
                continue;
            }

            if !self.is_side_effect_free(*argument) {
                self.error(AnalyseError::SideEffect {
                    ctx: "argument",
                    span: self.system.exprs.span(*argument),
                });
                continue;
            }

            let parameter = formal.ty();
            let is_ref = parameter.has_prefix(Prefix::Reference);
            let constant = parameter.has_prefix(Prefix::Constant);
            let computable = !self.persistent.depends_on(self.system, *argument);

            let acceptable = (is_ref && constant && computable)
                || (if is_ref {
                    self.is_unique_reference(*argument)
                } else {
                    computable
                });
            if !acceptable {
                self.error(AnalyseError::IncompatibleArgument {
                    span: self.system.exprs.span(*argument),
                });
                continue;
            }

            self.check_parameter_compatible(&instance.mapping, &parameter, *argument);
        }
    }

    fn check_property(&mut self, key: ExprKey) {
        if !self.annotate(key) {
            return;
        }

        if !self.is_side_effect_free(key) {
            self.error(AnalyseError::SideEffect {
                ctx: "property",
                span: self.system.exprs.span(key),
            });
        }

        let constrained = match self.system.exprs.get(key) {
            Expr::LeadsTo { lhs, rhs, .. } => {
                self.ty(*lhs).is_constraint() && self.ty(*rhs).is_constraint()
            }
            Expr::Quantified { expr, .. } => self.ty(*expr).is_constraint(),
            _ => false,
        };
        if !constrained {
            self.error(AnalyseError::PropertyNotConstraint {
                span: self.system.exprs.span(key),
            });
        }
    }

    /// Checks a function body and populates the function's effect sets,
    /// which later side-effect queries consult when they meet a call.
    fn check_function(&mut self, template: Option<usize>, index: usize) {
        let uid = self.decls(template).functions[index].uid.clone();

        let mut body = std::mem::replace(
            &mut self.decls_mut(template).functions[index].body,
            Stmt::Empty,
        );
        self.check_stmt(&mut body);

        let (changes, depends) = persistent::collect_effects(self.system, &body);

        let function = &mut self.decls_mut(template).functions[index];
        function.body = body;
        function.changes = changes.clone();
        function.depends = depends.clone();
        self.system.effects.insert(uid, Effects { changes, depends });
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Empty | Stmt::Break | Stmt::Continue => {}

            Stmt::Expr(key) => {
                if self.annotate(*key) {
                    self.check_function_expression(*key);
                }
            }

            Stmt::Block {
                frame,
                decls,
                stmts,
            } => {
                self.check_block_frame(frame);

                // Local initializers are checked against the declared type
                // but, unlike globals, need not be constant.
                for decl in decls.iter_mut() {
                    if let Some(init) = decl.init {
                        if self.annotate(init) {
                            match self.check_initialiser(&decl.uid.ty(), init) {
                                Ok(normalized) => decl.init = Some(normalized),
                                Err(err) => self.report_initialiser_error(err),
                            }
                        }
                    }
                }

                for stmt in stmts.iter_mut() {
                    self.check_stmt(stmt);
                }
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let (init, cond, step) = (*init, *cond, *step);
                for key in [init, step].into_iter().flatten() {
                    if self.annotate(key) {
                        self.check_function_expression(key);
                    }
                }
                if let Some(cond) = cond {
                    if self.annotate(cond) {
                        self.check_function_condition(cond);
                    }
                }
                self.check_stmt(body);
            }

            Stmt::Iteration { symbol, body } => {
                self.check_type(&symbol.ty(), false);
                self.check_stmt(body);
            }

            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                let cond = *cond;
                if self.annotate(cond) {
                    self.check_function_condition(cond);
                }
                self.check_stmt(body);
            }

            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let cond = *cond;
                if self.annotate(cond) {
                    self.check_function_condition(cond);
                }
                self.check_stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.check_stmt(else_stmt);
                }
            }

            Stmt::Return { value } => {
                if let Some(value) = *value {
                    self.annotate(value);
                }
            }
        }
    }

    fn check_block_frame(&mut self, frame: &Frame) {
        for symbol in frame.symbols() {
            self.check_type(&symbol.ty(), false);
        }
    }

    fn check_function_expression(&mut self, key: ExprKey) {
        let ty = self.ty(key);
        if !(ty.is_value() || ty.is_clock() || ty.is_record() || ty.is_void() || ty.is_scalar()) {
            self.error(AnalyseError::InvalidFunctionExpression {
                span: self.system.exprs.span(key),
            });
        }
    }

    fn check_function_condition(&mut self, key: ExprKey) {
        if !self.ty(key).is_value() {
            self.error(AnalyseError::BooleanExpected {
                span: self.system.exprs.span(key),
            });
        }
    }
}
