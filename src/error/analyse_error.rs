use crate::{
    error::{ErrorLabel, ReportableError},
    span::{Span, Spanned},
};
use thiserror::Error;
use yansi::Color;

/// A semantic error found while analysing a system. Every variant carries
/// the span of the offending expression or declaration.
#[derive(Error, Debug)]
pub enum AnalyseError {
    // Declared types.
    #[error("integer expression expected")]
    IntegerExpected { span: Span },
    #[error("constant expression expected")]
    ConstantExpected { span: Span },
    #[error("invalid integer range")]
    InvalidRange { span: Span },
    #[error("parameterised types are not allowed in records")]
    ParameterisedTypeInRecord { span: Span },
    #[error("invalid array size")]
    InvalidArraySize { span: Span },

    // Operators.
    #[error("invalid operands to binary operator `{op}`")]
    InvalidOperands { op: &'static str, span: Span },
    #[error("invalid operation for type")]
    InvalidOperation { span: Span },
    #[error("rate can only be applied to cost variables")]
    RateOfNonCost { span: Span },
    #[error("incompatible types in assignment")]
    IncompatibleAssignment { span: Span },
    #[error("left hand side value expected")]
    LhsExpected { span: Span },
    #[error("`+=` requires integer or cost operands")]
    AddAssignOperands { span: Span },
    #[error("non-value types must use the regular assignment operator")]
    CompoundAssignOperands { span: Span },
    #[error("condition of inline if must be a value")]
    InlineIfCondition { span: Span },
    #[error("incompatible arguments to inline if")]
    InlineIfIncompatible { span: Span },
    #[error("incompatible type for comma expression")]
    CommaOperand { span: Span },
    #[error("function name expected")]
    FunctionExpected { span: Span },
    #[error("too few arguments")]
    TooFewArguments { span: Span },
    #[error("too many arguments")]
    TooManyArguments { span: Span },
    #[error("array expected")]
    ArrayExpected { span: Span },
    #[error("array index out of range")]
    IndexOutOfRange { span: Span },
    #[error("incompatible array index type")]
    IncompatibleIndex { span: Span },
    #[error("scalars can only be compared to scalars of the same scalarset")]
    ScalarComparison { span: Span },
    #[error("boolean expected")]
    BooleanExpected { span: Span },
    #[error("{ctx} must be side effect free")]
    SideEffect { ctx: &'static str, span: Span },

    // Per-construct checks.
    #[error("invalid invariant expression")]
    InvalidInvariant { span: Span },
    #[error("invalid guard")]
    InvalidGuard { span: Span },
    #[error("channel expected")]
    ChannelExpected { span: Span },
    #[error("clock guards are not allowed on urgent edges")]
    ClockGuardOnUrgent { span: Span },
    #[error("clock guards are not allowed on broadcast receivers")]
    ClockGuardOnBroadcastReceive { span: Span },
    #[error("invalid assignment expression")]
    InvalidAssignment { span: Span },
    #[error("progress guard must evaluate to a boolean")]
    NonBooleanProgressGuard { span: Span },
    #[error("progress measure must evaluate to a value")]
    NonValueProgressMeasure { span: Span },
    #[error("property must be a constraint")]
    PropertyNotConstraint { span: Span },
    #[error("invalid expression in function")]
    InvalidFunctionExpression { span: Span },
    #[error("incompatible argument")]
    IncompatibleArgument { span: Span },

    // Parameter compatibility.
    #[error("reference parameter requires a left hand side value argument")]
    ReferenceParameterNeedsLhs { span: Span },
    #[error("argument is incompatible with the formal parameter")]
    IncompatibleParameter { span: Span },
    #[error("range of argument does not match range of formal parameter")]
    ParameterRangeMismatch { span: Span },
    #[error("range of argument is outside of the range of the formal parameter")]
    ParameterRangeOutside { span: Span },
    #[error("incompatible channel type")]
    IncompatibleChannel { span: Span },

    // Initializers.
    #[error("invalid initialiser")]
    InvalidInitialiser { span: Span },
    #[error("invalid array initialiser")]
    InvalidArrayInitialiser { span: Span },
    #[error("arrays of scalarsets cannot have initialisers")]
    ScalarSetArrayInitialiser { span: Span },
    #[error("arrays with parameterised size cannot have an initialiser")]
    ParameterisedArrayInitialiser { span: Span },
    #[error("excess elements in array initialiser")]
    ExcessArrayElements { span: Span },
    #[error("unknown field specified in array initialiser")]
    PositionalElementExpected { span: Span },
    #[error("missing fields in initialiser")]
    MissingArrayElements { span: Span },
    #[error("invalid initialiser for struct")]
    InvalidRecordInitialiser { span: Span },
    #[error("unknown field `{name}`")]
    UnknownField { name: String, span: Span },
    #[error("excess elements in initialiser")]
    ExcessFields { span: Span },
    #[error("multiple initialisers for field")]
    DuplicateFieldInitialiser { span: Span },
    #[error("incomplete initialiser")]
    IncompleteInitialiser { span: Span },
    #[error("initialiser is out of range")]
    OutOfRangeInitialiser { span: Span },
}

impl ReportableError for AnalyseError {
    fn labels(&self) -> Vec<ErrorLabel> {
        use AnalyseError::*;

        let label = |message: &str, span: &Span| {
            vec![ErrorLabel {
                message: message.to_string(),
                span: span.clone(),
                color: Color::Red,
            }]
        };

        match self {
            IntegerExpected { span } => label("this must be an integer expression", span),
            ConstantExpected { span } => label("this must be computable at analysis time", span),
            InvalidRange { span } => label("lower bound exceeds upper bound", span),
            ParameterisedTypeInRecord { span } => {
                label("record fields need bounds known at analysis time", span)
            }
            InvalidArraySize { span } => label("array size found here", span),

            InvalidOperands { op, span } => {
                label(&format!("`{op}` is not defined for these operand types"), span)
            }
            InvalidOperation { span } => label("operand has an unsupported type", span),
            RateOfNonCost { span } => label("not a cost variable", span),
            IncompatibleAssignment { span } => label("left and right side disagree", span),
            LhsExpected { span } => label("this does not denote a variable", span),
            AddAssignOperands { span } => label("operands found here", span),
            CompoundAssignOperands { span } => label("operands found here", span),
            InlineIfCondition { span } => label("condition found here", span),
            InlineIfIncompatible { span } => label("branches have incompatible types", span),
            CommaOperand { span } => label("operand found here", span),
            FunctionExpected { span } => label("this is not a function", span),
            TooFewArguments { span } => label("call found here", span),
            TooManyArguments { span } => label("surplus argument", span),
            ArrayExpected { span } => label("this is not an array", span),
            IndexOutOfRange { span } => label("index lies outside the declared size", span),
            IncompatibleIndex { span } => label("index found here", span),
            ScalarComparison { span } => label("operands stem from different scalarsets", span),
            BooleanExpected { span } => label("this must be a boolean expression", span),
            SideEffect { span, .. } => label("this expression has a side effect", span),

            InvalidInvariant { span } => label("not an invariant", span),
            InvalidGuard { span } => label("not a guard", span),
            ChannelExpected { span } => label("this is not a channel", span),
            ClockGuardOnUrgent { span } => label("synchronisation found here", span),
            ClockGuardOnBroadcastReceive { span } => label("synchronisation found here", span),
            InvalidAssignment { span } => label("assignment found here", span),
            NonBooleanProgressGuard { span } => label("guard found here", span),
            NonValueProgressMeasure { span } => label("measure found here", span),
            PropertyNotConstraint { span } => label("property found here", span),
            InvalidFunctionExpression { span } => label("statement expression found here", span),
            IncompatibleArgument { span } => label("argument found here", span),

            ReferenceParameterNeedsLhs { span } => {
                label("this does not denote a variable", span)
            }
            IncompatibleParameter { span } => label("argument found here", span),
            ParameterRangeMismatch { span } => label("argument found here", span),
            ParameterRangeOutside { span } => label("argument found here", span),
            IncompatibleChannel { span } => {
                label("channel lacks a capability of the formal parameter", span)
            }

            InvalidInitialiser { span } => label("initialiser found here", span),
            InvalidArrayInitialiser { span } => label("array initialisers are lists", span),
            ScalarSetArrayInitialiser { span } => label("initialiser found here", span),
            ParameterisedArrayInitialiser { span } => label("initialiser found here", span),
            ExcessArrayElements { span } => label("more elements than the declared size", span),
            PositionalElementExpected { span } => label("field name not allowed here", span),
            MissingArrayElements { span } => label("fewer elements than the declared size", span),
            InvalidRecordInitialiser { span } => label("initialiser found here", span),
            UnknownField { span, .. } => label("no such field in the record", span),
            ExcessFields { span } => label("more entries than record fields", span),
            DuplicateFieldInitialiser { span } => label("field is written twice", span),
            IncompleteInitialiser { span } => label("a field is left without a value", span),
            OutOfRangeInitialiser { span } => label("value lies outside the declared range", span),
        }
    }

    fn note(&self) -> Option<String> {
        use AnalyseError::*;
        match self {
            ScalarComparison { .. } => Some(
                "scalarsets are nominal; two separate declarations of the same size are \
                 distinct types"
                    .to_string(),
            ),
            ParameterisedTypeInRecord { .. } => Some(
                "a bound mentioning a template parameter cannot be evaluated where the record \
                 is declared"
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn code(&self) -> Option<String> {
        None
    }

    fn help(&self) -> Option<String> {
        use AnalyseError::*;
        match self {
            CompoundAssignOperands { .. } => {
                Some("clocks, records and scalars only support `=`".to_string())
            }
            ClockGuardOnUrgent { .. } | ClockGuardOnBroadcastReceive { .. } => {
                Some("restrict the guard to data variables".to_string())
            }
            ReferenceParameterNeedsLhs { .. } => {
                Some("pass a variable, an array element or a record field".to_string())
            }
            _ => None,
        }
    }
}

impl Spanned for AnalyseError {
    fn span(&self) -> &Span {
        use AnalyseError::*;
        match self {
            IntegerExpected { span }
            | ConstantExpected { span }
            | InvalidRange { span }
            | ParameterisedTypeInRecord { span }
            | InvalidArraySize { span }
            | InvalidOperands { span, .. }
            | InvalidOperation { span }
            | RateOfNonCost { span }
            | IncompatibleAssignment { span }
            | LhsExpected { span }
            | AddAssignOperands { span }
            | CompoundAssignOperands { span }
            | InlineIfCondition { span }
            | InlineIfIncompatible { span }
            | CommaOperand { span }
            | FunctionExpected { span }
            | TooFewArguments { span }
            | TooManyArguments { span }
            | ArrayExpected { span }
            | IndexOutOfRange { span }
            | IncompatibleIndex { span }
            | ScalarComparison { span }
            | BooleanExpected { span }
            | SideEffect { span, .. }
            | InvalidInvariant { span }
            | InvalidGuard { span }
            | ChannelExpected { span }
            | ClockGuardOnUrgent { span }
            | ClockGuardOnBroadcastReceive { span }
            | InvalidAssignment { span }
            | NonBooleanProgressGuard { span }
            | NonValueProgressMeasure { span }
            | PropertyNotConstraint { span }
            | InvalidFunctionExpression { span }
            | IncompatibleArgument { span }
            | ReferenceParameterNeedsLhs { span }
            | IncompatibleParameter { span }
            | ParameterRangeMismatch { span }
            | ParameterRangeOutside { span }
            | IncompatibleChannel { span }
            | InvalidInitialiser { span }
            | InvalidArrayInitialiser { span }
            | ScalarSetArrayInitialiser { span }
            | ParameterisedArrayInitialiser { span }
            | ExcessArrayElements { span }
            | PositionalElementExpected { span }
            | MissingArrayElements { span }
            | InvalidRecordInitialiser { span }
            | UnknownField { span, .. }
            | ExcessFields { span }
            | DuplicateFieldInitialiser { span }
            | IncompleteInitialiser { span }
            | OutOfRangeInitialiser { span } => span,
        }
    }
}
