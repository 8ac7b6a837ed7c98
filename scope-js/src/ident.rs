use serde::Deserialize;
use serde::Serialize;

/// Handle to one identifier occurrence created by the parser via
/// [`ScopeCollector::create_identifier`](crate::ScopeCollector::create_identifier).
///
/// The analysis phase attaches a [`Resolution`], an optional
/// [`DeclarationKind`], and a poisoned-scope flag to every handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct IdentId(pub(crate) usize);

/// Handle to one function declaration registered via
/// [`ScopeCollector::add_function_declaration`](crate::ScopeCollector::add_function_declaration).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FuncDeclId(pub(crate) usize);

/// How a binding was declared. `Let` and `Const` bindings have a temporal
/// dead zone; `Var` bindings do not.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DeclarationKind {
  Var,
  Let,
  Const,
}

/// How an identifier occurrence is looked up at runtime.
///
/// Every occurrence starts out `Dynamic` (full scope-chain walk through
/// environment records). Analysis upgrades occurrences where it can prove
/// the binding's location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Resolution {
  /// Walk the environment chain at runtime.
  #[default]
  Dynamic,
  /// A property of the global object.
  Global,
  /// A numbered slot in the owning function's locals table.
  Local(usize),
  /// A positional argument of the owning function.
  Parameter(usize),
}

impl Resolution {
  /// Whether the occurrence reads storage inside the owning function's
  /// frame rather than an environment record or the global object.
  pub fn is_local(&self) -> bool {
    matches!(self, Resolution::Local(_) | Resolution::Parameter(_))
  }
}

/// Per-occurrence facts, filled in by analysis.
#[derive(Debug)]
pub(crate) struct IdentData {
  pub name: String,
  pub decl_kind: Option<DeclarationKind>,
  pub resolution: Resolution,
  pub poisoned: bool,
}

impl IdentData {
  pub fn new(name: String) -> IdentData {
    IdentData {
      name,
      decl_kind: None,
      resolution: Resolution::Dynamic,
      poisoned: false,
    }
  }
}

/// Per-declaration facts for function declarations.
#[derive(Debug)]
pub(crate) struct FuncDeclData {
  pub name: String,
  pub hoisted: bool,
}
