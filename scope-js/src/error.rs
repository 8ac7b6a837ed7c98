use crate::loc::Loc;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

/// Why a declaration could not be bound in the scope it was registered in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeErrorType {
  /// The name is already bound in a way the new declaration may not shadow,
  /// e.g. `let x; var x;` or two `let x;` in the same block.
  AlreadyDeclared,
}

/// A binding error surfaced while registering declarations.
///
/// These correspond to early `SyntaxError`s in the language; once one is
/// raised the whole analysis is abandoned, so registrars return
/// [`ScopeResult`] and callers bail with `?`.
#[derive(Clone)]
pub struct ScopeError {
  pub typ: ScopeErrorType,
  pub name: String,
  pub loc: Loc,
}

impl ScopeError {
  pub fn new(typ: ScopeErrorType, name: String, loc: Loc) -> ScopeError {
    ScopeError { typ, name, loc }
  }

  pub(crate) fn already_declared(name: &str, loc: Loc) -> ScopeError {
    ScopeError::new(ScopeErrorType::AlreadyDeclared, name.to_string(), loc)
  }
}

impl Debug for ScopeError {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "{:?} for `{}` around loc [{}:{}]",
      self.typ, self.name, self.loc.0, self.loc.1
    )
  }
}

impl Display for ScopeError {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self.typ {
      ScopeErrorType::AlreadyDeclared => {
        write!(f, "identifier `{}` has already been declared", self.name)
      }
    }
  }
}

impl Error for ScopeError {}

impl PartialEq for ScopeError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ && self.name == other.name
  }
}

impl Eq for ScopeError {}

pub type ScopeResult<T> = Result<T, ScopeError>;
