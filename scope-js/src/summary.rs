use crate::frame::DeclFlags;
use crate::frame::ScopeFrame;
use crate::ident::FuncDeclData;
use crate::ident::FuncDeclId;
use crate::ident::IdentData;
use crate::ident::Resolution;
use ahash::HashSet;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

/// What kind of binding occupies a local slot. The bytecode generator uses
/// this to decide which slots need a temporal dead zone sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LocalVarKind {
  /// `var` at the frame's top level; initialized to undefined on entry.
  Var,
  /// `let`, `const`, or `class`; starts out in the temporal dead zone.
  LetOrConst,
  Function,
  /// The implicit `arguments` object of a non-arrow function.
  ArgumentsObject,
  CatchClauseParameter,
}

/// One slot in a frame's locals table.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LocalVariable {
  pub name: String,
  pub kind: LocalVarKind,
}

/// A function declaration whose binding must be created and initialized on
/// function entry.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FunctionInitializer {
  pub name: String,
  pub decl: FuncDeclId,
}

/// A `var` name the prologue must create, with enough detail to pick the
/// initialization strategy.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VarInitializer {
  pub name: String,
  /// The name is also a parameter; its initial value comes from the
  /// parameter binding rather than undefined.
  pub is_parameter: bool,
  /// The name is also a function declaration at the frame's top level; the
  /// function initializer supersedes the undefined write.
  pub is_function_name: bool,
  /// Where the binding's storage ended up. [`Resolution::Dynamic`] means an
  /// environment record entry must be created.
  pub slot: Resolution,
}

/// Everything a bytecode generator needs to emit a function's prologue.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionScopeSummary {
  /// Top-level function declarations, deduplicated so only the last
  /// declaration of each name survives.
  pub functions_to_initialize: Vec<FunctionInitializer>,
  /// Top-level `var` names, sorted by name.
  pub vars_to_initialize: Vec<VarInitializer>,
  /// Names of `vars_to_initialize`, sorted by name.
  pub var_names: Vec<String>,
  /// A parameter is named `arguments`, so the implicit object is shadowed.
  pub has_parameter_named_arguments: bool,
  /// A top-level function declaration is named `arguments`.
  pub has_function_named_arguments: bool,
  /// A lexical declaration is named `arguments`.
  pub has_lexically_declared_arguments: bool,
  /// `var` names without a local slot, excluding parameters. Each needs an
  /// environment record entry.
  pub non_local_var_count: usize,
  /// As above but including parameters; the relevant count when parameter
  /// expressions split the parameter and body environments.
  pub non_local_var_count_for_parameter_expressions: usize,
}

/// Distills a fully resolved function or static initializer frame into the
/// facts the prologue emitter needs.
pub(crate) fn build_summary(
  frame: &ScopeFrame,
  idents: &[IdentData],
  func_decls: &[FuncDeclData],
) -> FunctionScopeSummary {
  let mut summary = FunctionScopeSummary::default();

  // Walk declarations in reverse so that for duplicate names only the last
  // one in source order is initialized.
  let mut seen_function_names = HashSet::<&str>::default();
  for &decl in frame.function_decls.iter().rev() {
    let name = func_decls[decl.0].name.as_str();
    if seen_function_names.insert(name) {
      summary.functions_to_initialize.push(FunctionInitializer {
        name: name.to_string(),
        decl,
      });
    }
  }
  summary.has_function_named_arguments = seen_function_names.contains("arguments");

  for (name, binding) in frame.bindings.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
    if !binding.flags.intersects(DeclFlags::VAR) {
      continue;
    }
    let is_parameter = binding.flags.intersects(DeclFlags::NO_LEXICAL);
    let slot = binding
      .var_ident
      .map(|id| idents[id.0].resolution)
      .unwrap_or(Resolution::Dynamic);
    if !slot.is_local() {
      summary.non_local_var_count_for_parameter_expressions += 1;
      if !is_parameter {
        summary.non_local_var_count += 1;
      }
    }
    summary.vars_to_initialize.push(VarInitializer {
      name: name.clone(),
      is_parameter,
      is_function_name: seen_function_names.contains(name.as_str()),
      slot,
    });
    summary.var_names.push(name.clone());
  }

  summary.has_parameter_named_arguments = frame.has_flag("arguments", DeclFlags::NO_LEXICAL);
  summary.has_lexically_declared_arguments = frame.has_flag("arguments", DeclFlags::LEXICAL);

  summary
}
