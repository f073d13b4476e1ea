use super::{Base, Prefix, Type};
use itertools::Itertools;
use std::fmt::{Display, Formatter, Result};

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> Result {
        for prefix in [
            Prefix::Urgent,
            Prefix::Committed,
            Prefix::Broadcast,
            Prefix::Constant,
            Prefix::Meta,
            Prefix::Winning,
            Prefix::Losing,
        ] {
            if self.has_prefix(prefix) {
                let word = match prefix {
                    Prefix::Urgent => "urgent",
                    Prefix::Committed => "committed",
                    Prefix::Broadcast => "broadcast",
                    Prefix::Constant => "const",
                    Prefix::Meta => "meta",
                    Prefix::Winning => "winning",
                    Prefix::Losing => "losing",
                    Prefix::Reference => unreachable!(),
                };
                write!(f, "{word} ")?;
            }
        }

        match self.base() {
            Base::Unknown => write!(f, "<unknown>"),
            Base::Void => write!(f, "void"),
            Base::Int => {
                write!(f, "int")?;
                if self.range().is_some() {
                    write!(f, "[..]")?;
                }
                Ok(())
            }
            Base::Bool => write!(f, "bool"),
            Base::Clock => write!(f, "clock"),
            Base::Scalar => write!(f, "scalar[..]"),
            Base::Location => write!(f, "location"),
            Base::Channel => write!(f, "chan"),
            Base::Template => write!(f, "template"),
            Base::Instance => write!(f, "instance"),
            Base::Function => match self.sub() {
                Some(ret) => write!(f, "function(..) -> {ret}"),
                None => write!(f, "function"),
            },
            Base::Array => match self.sub() {
                Some(element) => write!(f, "{element}[..]"),
                None => write!(f, "array"),
            },
            Base::Record => {
                let fields = self
                    .fields()
                    .map(|frame| {
                        frame
                            .symbols()
                            .iter()
                            .map(|field| format!("{} {}", field.ty(), field.name()))
                            .join("; ")
                    })
                    .unwrap_or_default();
                write!(f, "struct {{ {fields} }}")
            }
            Base::Process => write!(f, "process"),
            Base::Named => write!(f, "<named>"),
            Base::Invariant => write!(f, "invariant"),
            Base::InvariantWr => write!(f, "invariant+rates"),
            Base::Guard => write!(f, "guard"),
            Base::Diff => write!(f, "clock difference"),
            Base::Constraint => write!(f, "constraint"),
            Base::Cost => write!(f, "cost"),
            Base::Rate => write!(f, "rate"),
        }
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{self:?}")
    }
}
