use crate::{expr::ExprKey, symbols::Frame};
use std::{fmt, rc::Rc};

mod display;

/// The base of a type term. For primitive types this is the type itself; for
/// constructed types it names the constructor (array, record, function, ...).
/// The tail of the list holds the classification bases produced by the
/// annotator for clock expressions: invariants, guards, constraints, clock
/// differences, costs and rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Base {
    Unknown,
    Void,
    Int,
    Bool,
    Clock,
    Scalar,
    Location,
    Channel,
    Template,
    Instance,
    Function,
    Array,
    Record,
    Process,
    Named,
    Invariant,
    InvariantWr,
    Guard,
    Diff,
    Constraint,
    Cost,
    Rate,
}

/// A type prefix, as written before the base type in a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prefix {
    Urgent,
    Committed,
    Constant,
    Broadcast,
    Reference,
    Meta,
    Winning,
    Losing,
}

impl Prefix {
    fn bit(self) -> u8 {
        match self {
            Prefix::Urgent => 1,
            Prefix::Committed => 1 << 1,
            Prefix::Constant => 1 << 2,
            Prefix::Broadcast => 1 << 3,
            Prefix::Reference => 1 << 4,
            Prefix::Meta => 1 << 5,
            Prefix::Winning => 1 << 6,
            Prefix::Losing => 1 << 7,
        }
    }
}

/// The prefix set of a type term.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prefixes(u8);

impl Prefixes {
    pub fn has(&self, prefix: Prefix) -> bool {
        self.0 & prefix.bit() != 0
    }

    pub fn with(self, prefix: Prefix) -> Self {
        Prefixes(self.0 | prefix.bit())
    }

    pub fn without(self, prefix: Prefix) -> Self {
        Prefixes(self.0 & !prefix.bit())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// The identity token of a scalar-set type. Two scalar sets are the same set
/// iff they carry the same token, i.e. they stem from the same declaration.
/// Prefix changes preserve the token.
#[derive(Clone)]
pub struct ScalarId(Rc<()>);

impl PartialEq for ScalarId {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ScalarId {}

impl fmt::Debug for ScalarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarId({:p})", Rc::as_ptr(&self.0))
    }
}

/// An immutable, shared type term. Cloning a `Type` clones a handle; the
/// factories and `set_prefix` are the only ways to obtain new terms.
///
/// Equality ignores prefixes and is structural, with two nominal exceptions:
/// records compare their field frames by identity and scalar sets compare
/// their identity tokens. Two separately declared records with identical
/// fields are distinct types. Syntactic comparison of integer range bounds
/// needs the expression arena and lives in [`crate::expr::Exprs`].
#[derive(Clone, Debug)]
pub struct Type(Rc<TypeData>);

#[derive(Clone, Debug)]
struct TypeData {
    base: Base,
    prefixes: Prefixes,
    /// Lower and upper bound expressions of an integer or scalar-set type.
    range: Option<(ExprKey, ExprKey)>,
    /// Element type of an array, return type of a function, underlying type
    /// of a named type.
    sub: Option<Type>,
    /// The size type of an array; always an integer or scalar-set type.
    size: Option<Type>,
    /// Record fields, or function/template/process parameters.
    frame: Option<Frame>,
    scalar: Option<ScalarId>,
}

impl TypeData {
    fn base_only(base: Base) -> Self {
        TypeData {
            base,
            prefixes: Prefixes::default(),
            range: None,
            sub: None,
            size: None,
            frame: None,
            scalar: None,
        }
    }
}

macro_rules! base_factory {
    ($($(#[$doc:meta])* $name:ident => $base:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name() -> Type {
                Type(Rc::new(TypeData::base_only(Base::$base)))
            }
        )*
    };
}

impl Type {
    base_factory! {
        unknown => Unknown,
        void => Void,
        /// A plain integer with no declared range.
        int => Int,
        boolean => Bool,
        clock => Clock,
        channel => Channel,
        location => Location,
        instance => Instance,
        invariant => Invariant,
        /// An invariant that may contain rate bindings.
        invariant_wr => InvariantWr,
        guard => Guard,
        diff => Diff,
        constraint => Constraint,
        cost => Cost,
        rate => Rate,
    }

    /// A bounded integer type `int[lower, upper]`.
    pub fn integer(lower: ExprKey, upper: ExprKey) -> Type {
        Type(Rc::new(TypeData {
            range: Some((lower, upper)),
            ..TypeData::base_only(Base::Int)
        }))
    }

    /// A fresh scalar set over `[lower, upper]`. Every call mints a new
    /// identity; call once per declaration.
    pub fn scalar_set(lower: ExprKey, upper: ExprKey) -> Type {
        Type(Rc::new(TypeData {
            range: Some((lower, upper)),
            scalar: Some(ScalarId(Rc::new(()))),
            ..TypeData::base_only(Base::Scalar)
        }))
    }

    pub fn record(fields: Frame) -> Type {
        Type(Rc::new(TypeData {
            frame: Some(fields),
            ..TypeData::base_only(Base::Record)
        }))
    }

    pub fn function(parameters: Frame, return_type: Type) -> Type {
        Type(Rc::new(TypeData {
            frame: Some(parameters),
            sub: Some(return_type),
            ..TypeData::base_only(Base::Function)
        }))
    }

    pub fn template(parameters: Frame) -> Type {
        Type(Rc::new(TypeData {
            frame: Some(parameters),
            ..TypeData::base_only(Base::Template)
        }))
    }

    pub fn process(parameters: Frame) -> Type {
        Type(Rc::new(TypeData {
            frame: Some(parameters),
            ..TypeData::base_only(Base::Process)
        }))
    }

    pub fn array(element: Type, size: Type) -> Type {
        Type(Rc::new(TypeData {
            sub: Some(element),
            size: Some(size),
            ..TypeData::base_only(Base::Array)
        }))
    }

    /// A named type (typedef) over `underlying`. Predicates and accessors see
    /// through the name.
    pub fn named(underlying: Type) -> Type {
        Type(Rc::new(TypeData {
            sub: Some(underlying),
            ..TypeData::base_only(Base::Named)
        }))
    }

    /// Returns a new term with `prefix` set or cleared.
    pub fn set_prefix(&self, prefix: Prefix, on: bool) -> Type {
        let mut data = (*self.0).clone();
        data.prefixes = if on {
            data.prefixes.with(prefix)
        } else {
            data.prefixes.without(prefix)
        };
        Type(Rc::new(data))
    }

    pub fn has_prefix(&self, prefix: Prefix) -> bool {
        self.0.prefixes.has(prefix)
            || (self.0.base == Base::Named
                && self.0.sub.as_ref().is_some_and(|sub| sub.has_prefix(prefix)))
    }

    fn resolved(&self) -> &Type {
        match (self.0.base, &self.0.sub) {
            (Base::Named, Some(sub)) => sub.resolved(),
            _ => self,
        }
    }

    /// The base of this type, with names resolved.
    pub fn base(&self) -> Base {
        self.resolved().0.base
    }

    /// The bound expressions of an integer or scalar-set type.
    pub fn range(&self) -> Option<(ExprKey, ExprKey)> {
        self.resolved().0.range
    }

    /// The element type of an array, or the return type of a function.
    pub fn sub(&self) -> Option<Type> {
        self.resolved().0.sub.clone()
    }

    /// The size type of an array.
    pub fn array_size(&self) -> Option<Type> {
        self.resolved().0.size.clone()
    }

    /// The field frame of a record type.
    pub fn fields(&self) -> Option<Frame> {
        let resolved = self.resolved();
        match resolved.0.base {
            Base::Record => resolved.0.frame.clone(),
            _ => None,
        }
    }

    /// The parameter frame of a function, template or process type.
    pub fn parameters(&self) -> Option<Frame> {
        let resolved = self.resolved();
        match resolved.0.base {
            Base::Function | Base::Template | Base::Process => resolved.0.frame.clone(),
            _ => None,
        }
    }

    fn scalar_id(&self) -> Option<&ScalarId> {
        self.resolved().0.scalar.as_ref()
    }

    pub fn is_unknown(&self) -> bool {
        self.base() == Base::Unknown
    }

    pub fn is_void(&self) -> bool {
        self.base() == Base::Void
    }

    pub fn is_integer(&self) -> bool {
        self.base() == Base::Int
    }

    /// Boolean or integer.
    pub fn is_value(&self) -> bool {
        matches!(self.base(), Base::Int | Base::Bool)
    }

    pub fn is_scalar(&self) -> bool {
        self.base() == Base::Scalar
    }

    pub fn is_clock(&self) -> bool {
        self.base() == Base::Clock
    }

    pub fn is_record(&self) -> bool {
        self.base() == Base::Record
    }

    pub fn is_array(&self) -> bool {
        self.base() == Base::Array
    }

    pub fn is_channel(&self) -> bool {
        self.base() == Base::Channel
    }

    pub fn is_diff(&self) -> bool {
        self.base() == Base::Diff
    }

    pub fn is_cost(&self) -> bool {
        self.base() == Base::Cost
    }

    /// Invariant, boolean or integer.
    pub fn is_invariant(&self) -> bool {
        self.base() == Base::Invariant || self.is_value()
    }

    /// Invariant-with-rates or any valid invariant.
    pub fn is_invariant_wr(&self) -> bool {
        self.base() == Base::InvariantWr || self.is_invariant()
    }

    /// Guard or any valid invariant.
    pub fn is_guard(&self) -> bool {
        self.base() == Base::Guard || self.is_invariant()
    }

    /// Constraint or any valid guard.
    pub fn is_constraint(&self) -> bool {
        self.base() == Base::Constraint || self.is_guard()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.resolved(), other.resolved());
        if Rc::ptr_eq(&a.0, &b.0) {
            return true;
        }
        if a.0.base != b.0.base {
            return false;
        }
        match a.0.base {
            Base::Scalar => a.0.scalar == b.0.scalar,
            Base::Record => match (&a.0.frame, &b.0.frame) {
                (Some(lhs), Some(rhs)) => lhs.same(rhs),
                _ => false,
            },
            // Bound expressions are compared by arena key here; syntactic
            // comparison goes through `Exprs::syntactically_equal`.
            Base::Int => a.0.range == b.0.range,
            Base::Array => {
                a.0.sub == b.0.sub
                    && match (&a.0.size, &b.0.size) {
                        (Some(lhs), Some(rhs)) => lhs == rhs,
                        (None, None) => true,
                        _ => false,
                    }
            }
            Base::Function => {
                a.0.sub == b.0.sub
                    && match (&a.0.frame, &b.0.frame) {
                        (Some(lhs), Some(rhs)) => lhs.same(rhs),
                        _ => false,
                    }
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Prefix, Type};
    use crate::symbols::Frame;

    #[test]
    fn scalar_sets_are_nominal() {
        let a = Type::scalar_set(Default::default(), Default::default());
        let b = Type::scalar_set(Default::default(), Default::default());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        // Prefix changes preserve the identity token.
        assert_eq!(a, a.set_prefix(Prefix::Constant, true));
    }

    #[test]
    fn records_are_nominal() {
        let fields = Frame::new();
        fields.add("x", Type::int());
        let other = Frame::new();
        other.add("x", Type::int());
        assert_ne!(Type::record(fields.clone()), Type::record(other));
        assert_eq!(Type::record(fields.clone()), Type::record(fields));
    }

    #[test]
    fn names_resolve_in_predicates() {
        let named = Type::named(Type::clock());
        assert!(named.is_clock());
        assert!(!named.is_constraint());

        let constant = Type::named(Type::int().set_prefix(Prefix::Constant, true));
        assert!(constant.has_prefix(Prefix::Constant));
    }

    #[test]
    fn classification_lattice() {
        assert!(Type::int().is_invariant());
        assert!(Type::int().is_guard());
        assert!(Type::int().is_constraint());
        assert!(Type::invariant().is_guard());
        assert!(!Type::guard().is_invariant());
        assert!(Type::guard().is_constraint());
        assert!(!Type::constraint().is_guard());
        assert!(Type::invariant().is_invariant_wr());
        assert!(!Type::invariant_wr().is_guard());
    }
}
