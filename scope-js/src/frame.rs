use crate::ident::DeclarationKind;
use crate::ident::FuncDeclId;
use crate::ident::IdentId;
use crate::summary::FunctionScopeSummary;
use crate::summary::LocalVarKind;
use crate::summary::LocalVariable;
use ahash::HashMap;
use serde::Deserialize;
use serde::Serialize;
use std::ops::BitOr;
use std::ops::BitOrAssign;

/// Handle to one scope frame, returned by the `open_*` methods on
/// [`ScopeCollector`](crate::ScopeCollector).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ScopeId(pub(crate) usize);

/// The syntactic construct a frame was opened for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ScopeKind {
  Program,
  Function,
  Block,
  ForLoop,
  With,
  Catch,
  ClassStaticInit,
  ClassField,
  ClassDeclaration,
}

/// Whether a frame is a top-level frame, i.e. a `var` hoisting target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScopeLevel {
  /// Not a hoisting target; `var` declarations walk past it.
  Nested,
  /// Top level of a classic script.
  Script,
  /// Top level of a module.
  Module,
  /// Top level of a function body.
  Function,
  /// Top level of a class static initializer block.
  StaticInit,
}

impl ScopeLevel {
  pub fn is_top_level(self) -> bool {
    self != ScopeLevel::Nested
  }
}

/// Bit-set describing everything known about one name in one frame.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub(crate) struct DeclFlags(u16);

impl DeclFlags {
  /// Declared with `var` (or an equivalent hoisted form).
  pub const VAR: DeclFlags = DeclFlags(1 << 0);
  /// Declared with `let`, `const`, or `class`.
  pub const LEXICAL: DeclFlags = DeclFlags(1 << 1);
  /// Declared by a sloppy-mode function declaration in a nested frame.
  pub const FUNCTION: DeclFlags = DeclFlags(1 << 2);
  /// A `catch` clause parameter.
  pub const CATCH_PARAM: DeclFlags = DeclFlags(1 << 3);
  /// A later lexical declaration of this name must error, even though no
  /// lexical binding exists here, e.g. function parameters.
  pub const NO_LEXICAL: DeclFlags = DeclFlags(1 << 4);
  /// A later `var` declaration of this name must error, e.g. a destructured
  /// `catch` parameter.
  pub const NO_VAR: DeclFlags = DeclFlags(1 << 5);
  /// The implicit self-binding of a named function expression or a class.
  pub const SELF_BINDING: DeclFlags = DeclFlags(1 << 6);
  /// A function parameter that may resolve to a positional argument slot.
  pub const PARAM_CANDIDATE: DeclFlags = DeclFlags(1 << 7);
  /// Referenced inside default parameter expressions, so the body-level
  /// binding lives in a separate environment from the parameter.
  pub const IN_PARAM_EXPRS: DeclFlags = DeclFlags(1 << 8);

  pub fn intersects(self, other: DeclFlags) -> bool {
    self.0 & other.0 != 0
  }
}

impl BitOr for DeclFlags {
  type Output = DeclFlags;

  fn bitor(self, rhs: DeclFlags) -> DeclFlags {
    DeclFlags(self.0 | rhs.0)
  }
}

impl BitOrAssign for DeclFlags {
  fn bitor_assign(&mut self, rhs: DeclFlags) {
    self.0 |= rhs.0;
  }
}

/// One declared name in one frame.
#[derive(Default, Debug)]
pub(crate) struct Binding {
  pub flags: DeclFlags,
  /// The declaration's own identifier occurrence, kept so the summary
  /// builder can read the slot it resolved to.
  pub var_ident: Option<IdentId>,
}

/// All occurrences of one name that could plausibly refer to the same
/// binding, accumulated per frame and merged upward as frames resolve.
#[derive(Debug)]
pub(crate) struct IdentGroup {
  /// Some occurrence is observable from a nested function or class part,
  /// so the binding must live in an environment record.
  pub captured: bool,
  /// Some occurrence sits inside a `with` statement.
  pub in_with: bool,
  pub ids: Vec<IdentId>,
  pub decl_kind: Option<DeclarationKind>,
}

impl IdentGroup {
  pub fn empty() -> IdentGroup {
    IdentGroup {
      captured: false,
      in_with: false,
      ids: Vec::new(),
      decl_kind: None,
    }
  }
}

/// A sloppy-mode block function declaration waiting for the Annex B
/// hoisting decision.
#[derive(Debug)]
pub(crate) struct HoistCandidate {
  pub name: String,
  pub decl: FuncDeclId,
}

/// One positional parameter. Destructuring patterns occupy a position with
/// an empty name so later parameters keep their indices.
#[derive(Clone, Debug)]
pub(crate) struct Param {
  pub name: String,
  pub is_rest: bool,
}

/// One frame in the scope tree. Parent/child/top-level links are indices
/// into the collector's frame arena.
#[derive(Debug)]
pub(crate) struct ScopeFrame {
  pub kind: ScopeKind,
  pub level: ScopeLevel,
  pub parent: Option<usize>,
  /// Nearest enclosing top-level frame, or self if this frame is one.
  pub top_level: Option<usize>,
  pub children: Vec<usize>,

  pub bindings: HashMap<String, Binding>,
  pub groups: HashMap<String, IdentGroup>,
  pub hoist_candidates: Vec<HoistCandidate>,
  /// Function declarations bound at this top-level frame, in source order.
  pub function_decls: Vec<FuncDeclId>,

  pub has_parameters: bool,
  pub has_parameter_expressions: bool,
  pub params: Vec<Param>,
  pub is_arrow: bool,
  pub is_function_declaration: bool,

  /// Contains a direct call to `eval` (possibly in a nested non-function
  /// child; accumulated upward on close).
  pub calls_eval: bool,
  /// Some frame at or below this one calls `eval` directly. Set during
  /// analysis; crosses function boundaries.
  pub chain_has_eval: bool,
  /// A direct `eval` call exists in the same function as this frame. Set
  /// during analysis; stops at function boundaries.
  pub eval_in_function: bool,
  /// Accesses the `arguments` object in non-strict code.
  pub accesses_arguments: bool,
  pub has_await: bool,
  /// A `this` expression somewhere in this function's body.
  pub uses_this: bool,
  /// The `this` binding must be readable through the environment chain,
  /// because an arrow function or `new.target` reads it there.
  pub uses_this_from_environment: bool,

  pub locals: Vec<LocalVariable>,
  pub annex_b_function_names: Vec<String>,
  pub summary: Option<Box<FunctionScopeSummary>>,
}

impl ScopeFrame {
  pub fn new(kind: ScopeKind, level: ScopeLevel) -> ScopeFrame {
    ScopeFrame {
      kind,
      level,
      parent: None,
      top_level: None,
      children: Vec::new(),
      bindings: HashMap::default(),
      groups: HashMap::default(),
      hoist_candidates: Vec::new(),
      function_decls: Vec::new(),
      has_parameters: false,
      has_parameter_expressions: false,
      params: Vec::new(),
      is_arrow: false,
      is_function_declaration: false,
      calls_eval: false,
      chain_has_eval: false,
      eval_in_function: false,
      accesses_arguments: false,
      has_await: false,
      uses_this: false,
      uses_this_from_environment: false,
      locals: Vec::new(),
      annex_b_function_names: Vec::new(),
      summary: None,
    }
  }

  pub fn is_top_level(&self) -> bool {
    self.level.is_top_level()
  }

  pub fn binding_mut(&mut self, name: &str) -> &mut Binding {
    self.bindings.entry(name.to_string()).or_default()
  }

  pub fn flags(&self, name: &str) -> DeclFlags {
    self
      .bindings
      .get(name)
      .map(|b| b.flags)
      .unwrap_or_default()
  }

  pub fn has_flag(&self, name: &str, flags: DeclFlags) -> bool {
    self.flags(name).intersects(flags)
  }

  /// Positional index of the last parameter with this name, matching the
  /// runtime behavior that a repeated parameter name binds the last one.
  pub fn parameter_index(&self, name: &str) -> Option<usize> {
    self.params.iter().rposition(|p| p.name == name)
  }

  pub fn has_rest_parameter(&self, name: &str) -> bool {
    self.params.iter().any(|p| p.is_rest && p.name == name)
  }

  pub fn has_hoist_candidate(&self, name: &str) -> bool {
    self.hoist_candidates.iter().any(|c| c.name == name)
  }

  /// Appends a local slot and returns its index.
  pub fn push_local(&mut self, name: String, kind: LocalVarKind) -> usize {
    let index = self.locals.len();
    self.locals.push(LocalVariable { name, kind });
    index
  }
}

/// Index of the nearest frame at or above `start` that owns a locals table
/// for functions, i.e. a function body or a static initializer block.
pub(crate) fn nearest_function(frames: &[ScopeFrame], start: usize) -> Option<usize> {
  let mut cursor = Some(start);
  while let Some(i) = cursor {
    match frames[i].kind {
      ScopeKind::Function | ScopeKind::ClassStaticInit => return Some(i),
      _ => cursor = frames[i].parent,
    }
  }
  None
}
