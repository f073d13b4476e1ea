use crate::{error::Error, warning::Warning};
use core::cell::RefCell;

/// The diagnostic sink. Interior mutability keeps `&mut` out of every
/// signature in the analyser; checks report through a shared `&Handler`.
#[derive(Default, Debug)]
pub struct Handler {
    inner: RefCell<HandlerInner>,
}

#[derive(Default, Debug)]
struct HandlerInner {
    errors: Vec<Error>,
    warnings: Vec<Warning>,
}

impl Handler {
    /// Emit the error `err`.
    pub fn emit_err(&self, err: Error) -> ErrorEmitted {
        self.inner.borrow_mut().errors.push(err);
        ErrorEmitted { _priv: () }
    }

    /// Emit the warning `warning`.
    pub fn emit_warn(&self, warning: Warning) -> WarningEmitted {
        self.inner.borrow_mut().warnings.push(warning);
        WarningEmitted { _priv: () }
    }

    /// Analysis should be cancelled; an error has been emitted previously.
    pub fn cancel(&self) -> ErrorEmitted {
        ErrorEmitted { _priv: () }
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.borrow().errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.inner.borrow().warnings.is_empty()
    }

    /// `Ok(value)` iff no error has been emitted.
    pub fn result<T>(&self, value: T) -> Result<T, ErrorEmitted> {
        if self.has_errors() {
            Err(self.cancel())
        } else {
            Ok(value)
        }
    }

    /// Extract all the errors and warnings from this handler.
    pub fn consume(self) -> (Vec<Error>, Vec<Warning>) {
        let inner = self.inner.into_inner();
        (inner.errors, inner.warnings)
    }
}

/// Proof that an error was emitted through a `Handler`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ErrorEmitted {
    _priv: (),
}

/// Proof that a warning was emitted through a `Handler`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WarningEmitted {
    _priv: (),
}
