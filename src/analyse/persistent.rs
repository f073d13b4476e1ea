use crate::{
    expr::{Expr, ExprKey},
    symbols::Symbol,
    system::{Stmt, System},
    types::Prefix,
};
use fxhash::FxHashSet;

/// The set of symbols whose values are part of the runtime state vector.
/// A variable is persistent unless it is a constant; a template parameter is
/// persistent when it is a reference or a non-constant value parameter.
///
/// Computed once per analysis and threaded through every check that needs to
/// decide side-effect freedom or compile-time computability.
#[derive(Debug)]
pub(crate) struct PersistentVariables {
    set: FxHashSet<Symbol>,
}

impl PersistentVariables {
    pub(crate) fn collect(system: &System) -> Self {
        let mut set = FxHashSet::default();

        let mut add_variables = |variables: &[crate::system::Variable]| {
            for variable in variables {
                if !variable.uid.ty().has_prefix(Prefix::Constant) {
                    set.insert(variable.uid.clone());
                }
            }
        };

        add_variables(&system.globals.variables);
        for template in &system.templates {
            add_variables(&template.declarations.variables);
        }

        for template in &system.templates {
            for parameter in template.parameters.symbols() {
                let ty = parameter.ty();
                if ty.has_prefix(Prefix::Reference) || !ty.has_prefix(Prefix::Constant) {
                    set.insert(parameter);
                }
            }
        }

        PersistentVariables { set }
    }

    /// True iff any identifier in the expression resolves to a persistent
    /// symbol, looking through calls via the callee's dependency set.
    pub(crate) fn depends_on(&self, system: &System, key: ExprKey) -> bool {
        match system.exprs.get(key) {
            Expr::Ident { symbol, .. } => self.set.contains(symbol),

            Expr::Call { callee, args, .. } => {
                args.iter().any(|arg| self.depends_on(system, *arg))
                    || system
                        .exprs
                        .symbol_of(*callee)
                        .and_then(|symbol| system.effects.get(&symbol))
                        .is_some_and(|effects| {
                            effects.depends.iter().any(|dep| self.set.contains(dep))
                        })
            }

            expr => expr
                .child_keys()
                .iter()
                .any(|child| self.depends_on(system, *child)),
        }
    }

    /// True iff the expression contains an update whose target resolves to a
    /// persistent symbol, looking through calls via the callee's change set.
    pub(crate) fn changes_variable(&self, system: &System, key: ExprKey) -> bool {
        match system.exprs.get(key) {
            Expr::Assign { lhs, rhs, .. } => {
                self.targets(system, *lhs)
                    || self.changes_variable(system, *lhs)
                    || self.changes_variable(system, *rhs)
            }

            Expr::IncDec { expr, .. } => {
                self.targets(system, *expr) || self.changes_variable(system, *expr)
            }

            Expr::Call { callee, args, .. } => {
                args.iter().any(|arg| self.changes_variable(system, *arg))
                    || system
                        .exprs
                        .symbol_of(*callee)
                        .and_then(|symbol| system.effects.get(&symbol))
                        .is_some_and(|effects| {
                            effects.changes.iter().any(|chg| self.set.contains(chg))
                        })
            }

            expr => expr
                .child_keys()
                .iter()
                .any(|child| self.changes_variable(system, *child)),
        }
    }

    /// True iff an update of `lhs` writes into a persistent symbol. Both
    /// branches of an inline if count as potential targets.
    fn targets(&self, system: &System, lhs: ExprKey) -> bool {
        match system.exprs.get(lhs) {
            Expr::Ident { symbol, .. } => self.set.contains(symbol),

            Expr::Dot { expr, .. } | Expr::Index { array: expr, .. } => {
                self.targets(system, *expr)
            }

            Expr::InlineIf {
                then_expr,
                else_expr,
                ..
            } => self.targets(system, *then_expr) || self.targets(system, *else_expr),

            Expr::Comma { rhs, .. } => self.targets(system, *rhs),

            Expr::Assign { lhs, .. } => self.targets(system, *lhs),

            Expr::IncDec { expr, .. } => self.targets(system, *expr),

            _ => false,
        }
    }
}

/// Collects the symbols a function body writes and reads, including through
/// calls to functions whose effects are already known.
pub(crate) fn collect_effects(
    system: &System,
    body: &Stmt,
) -> (FxHashSet<Symbol>, FxHashSet<Symbol>) {
    let mut changes = FxHashSet::default();
    let mut depends = FxHashSet::default();
    collect_stmt(system, body, &mut changes, &mut depends);
    (changes, depends)
}

fn collect_stmt(
    system: &System,
    stmt: &Stmt,
    changes: &mut FxHashSet<Symbol>,
    depends: &mut FxHashSet<Symbol>,
) {
    match stmt {
        Stmt::Empty | Stmt::Break | Stmt::Continue => {}

        Stmt::Expr(key) => collect_expr(system, *key, changes, depends),

        Stmt::Block { decls, stmts, .. } => {
            for decl in decls {
                if let Some(init) = decl.init {
                    collect_expr(system, init, changes, depends);
                }
            }
            for stmt in stmts {
                collect_stmt(system, stmt, changes, depends);
            }
        }

        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            for key in [init, cond, step].into_iter().flatten() {
                collect_expr(system, *key, changes, depends);
            }
            collect_stmt(system, body, changes, depends);
        }

        Stmt::Iteration { body, .. } => collect_stmt(system, body, changes, depends),

        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            collect_expr(system, *cond, changes, depends);
            collect_stmt(system, body, changes, depends);
        }

        Stmt::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            collect_expr(system, *cond, changes, depends);
            collect_stmt(system, then_stmt, changes, depends);
            if let Some(else_stmt) = else_stmt {
                collect_stmt(system, else_stmt, changes, depends);
            }
        }

        Stmt::Return { value } => {
            if let Some(value) = value {
                collect_expr(system, *value, changes, depends);
            }
        }
    }
}

fn collect_expr(
    system: &System,
    key: ExprKey,
    changes: &mut FxHashSet<Symbol>,
    depends: &mut FxHashSet<Symbol>,
) {
    match system.exprs.get(key) {
        Expr::Ident { symbol, .. } => {
            depends.insert(symbol.clone());
        }

        Expr::Assign { lhs, rhs, .. } => {
            add_targets(system, *lhs, changes);
            collect_expr(system, *lhs, changes, depends);
            collect_expr(system, *rhs, changes, depends);
        }

        Expr::IncDec { expr, .. } => {
            add_targets(system, *expr, changes);
            collect_expr(system, *expr, changes, depends);
        }

        Expr::Call { callee, args, .. } => {
            if let Some(symbol) = system.exprs.symbol_of(*callee) {
                if let Some(effects) = system.effects.get(&symbol) {
                    changes.extend(effects.changes.iter().cloned());
                    depends.extend(effects.depends.iter().cloned());
                }
            }
            for arg in args {
                collect_expr(system, *arg, changes, depends);
            }
        }

        expr => {
            for child in expr.child_keys() {
                collect_expr(system, child, changes, depends);
            }
        }
    }
}

fn add_targets(system: &System, lhs: ExprKey, out: &mut FxHashSet<Symbol>) {
    match system.exprs.get(lhs) {
        Expr::Ident { symbol, .. } => {
            out.insert(symbol.clone());
        }

        Expr::Dot { expr, .. } | Expr::Index { array: expr, .. } => {
            add_targets(system, *expr, out)
        }

        Expr::InlineIf {
            then_expr,
            else_expr,
            ..
        } => {
            add_targets(system, *then_expr, out);
            add_targets(system, *else_expr, out);
        }

        Expr::Comma { rhs, .. } => add_targets(system, *rhs, out),

        Expr::Assign { lhs, .. } => add_targets(system, *lhs, out),

        Expr::IncDec { expr, .. } => add_targets(system, *expr, out),

        _ => {}
    }
}
