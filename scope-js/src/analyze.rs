use crate::frame::nearest_function;
use crate::frame::DeclFlags;
use crate::frame::IdentGroup;
use crate::frame::ScopeFrame;
use crate::frame::ScopeId;
use crate::frame::ScopeKind;
use crate::ident::DeclarationKind;
use crate::ident::FuncDeclData;
use crate::ident::FuncDeclId;
use crate::ident::IdentData;
use crate::ident::IdentId;
use crate::ident::Resolution;
use crate::summary::build_summary;
use crate::summary::FunctionScopeSummary;
use crate::summary::LocalVarKind;
use crate::summary::LocalVariable;
use itertools::Itertools;
use std::mem;

pub(crate) struct AnalyzeOptions {
  /// The program was created by a direct `eval` call and shares its
  /// caller's scope chain, so program-level names stay dynamic.
  pub initiated_by_eval: bool,
  /// The program is the body of a dynamically constructed function;
  /// program-level names never resolve to globals.
  pub suppress_globals: bool,
}

/// The result of scope analysis: a resolution for every identifier
/// occurrence, per-frame locals tables, Annex B hoisting outcomes, and
/// prologue summaries for function frames.
pub struct ScopeAnalysis {
  scopes: Vec<ScopeOutput>,
  idents: Vec<IdentData>,
  func_decls: Vec<FuncDeclData>,
}

struct ScopeOutput {
  kind: ScopeKind,
  locals: Vec<LocalVariable>,
  annex_b_function_names: Vec<String>,
  summary: Option<Box<FunctionScopeSummary>>,
  eval_poisoned: bool,
  accesses_arguments: bool,
  has_await: bool,
}

impl ScopeAnalysis {
  /// How this identifier occurrence is looked up at runtime.
  pub fn resolution(&self, id: IdentId) -> Resolution {
    self.idents[id.0].resolution
  }

  /// The kind of the declaration this occurrence belongs to, if analysis
  /// attributed it to one. `Let` and `Const` occurrences may need a
  /// temporal dead zone check.
  pub fn declaration_kind(&self, id: IdentId) -> Option<DeclarationKind> {
    self.idents[id.0].decl_kind
  }

  /// Whether a direct `eval` call can observe or create this binding, so
  /// the emitter must keep it reachable through environment records.
  pub fn is_inside_scope_with_eval(&self, id: IdentId) -> bool {
    self.idents[id.0].poisoned
  }

  /// Whether Annex B hoisted this sloppy-mode block function to its
  /// enclosing top level.
  pub fn is_hoisted_function(&self, decl: FuncDeclId) -> bool {
    self.func_decls[decl.0].hoisted
  }

  pub fn scope_kind(&self, scope: ScopeId) -> ScopeKind {
    self.scopes[scope.0].kind
  }

  /// The frame's locals table, in slot order.
  pub fn locals(&self, scope: ScopeId) -> &[LocalVariable] {
    &self.scopes[scope.0].locals
  }

  pub fn local_count(&self, scope: ScopeId) -> usize {
    self.scopes[scope.0].locals.len()
  }

  /// Names of block functions Annex B hoisted to this top-level frame.
  pub fn annex_b_function_names(&self, scope: ScopeId) -> &[String] {
    &self.scopes[scope.0].annex_b_function_names
  }

  /// Prologue facts for a function or static initializer frame.
  pub fn function_scope_summary(&self, scope: ScopeId) -> Option<&FunctionScopeSummary> {
    self.scopes[scope.0].summary.as_deref()
  }

  /// Whether this frame, or any frame below it, contains a direct call to
  /// `eval`.
  pub fn contains_direct_call_to_eval(&self, scope: ScopeId) -> bool {
    self.scopes[scope.0].eval_poisoned
  }

  pub fn accesses_arguments_object(&self, scope: ScopeId) -> bool {
    self.scopes[scope.0].accesses_arguments
  }

  pub fn contains_await_expression(&self, scope: ScopeId) -> bool {
    self.scopes[scope.0].has_await
  }
}

pub(crate) fn run(
  mut frames: Vec<ScopeFrame>,
  mut idents: Vec<IdentData>,
  mut func_decls: Vec<FuncDeclData>,
  opts: AnalyzeOptions,
) -> ScopeAnalysis {
  let roots = (0..frames.len())
    .filter(|&i| frames[i].parent.is_none())
    .collect::<Vec<_>>();
  for root in roots {
    analyze_frame(&mut frames, &mut idents, &mut func_decls, root, &opts);
  }
  let scopes = frames
    .into_iter()
    .map(|frame| ScopeOutput {
      kind: frame.kind,
      eval_poisoned: frame.calls_eval || frame.chain_has_eval,
      accesses_arguments: frame.accesses_arguments,
      has_await: frame.has_await,
      locals: frame.locals,
      annex_b_function_names: frame.annex_b_function_names,
      summary: frame.summary,
    })
    .collect();
  ScopeAnalysis {
    scopes,
    idents,
    func_decls,
  }
}

/// Post-order walk: children resolve before their parent so their
/// unresolved clusters have merged upward by the time the parent runs.
fn analyze_frame(
  frames: &mut Vec<ScopeFrame>,
  idents: &mut [IdentData],
  func_decls: &mut [FuncDeclData],
  index: usize,
  opts: &AnalyzeOptions,
) {
  let children = mem::take(&mut frames[index].children);
  for &child in &children {
    analyze_frame(frames, idents, func_decls, child, opts);
  }
  frames[index].children = children;

  propagate_eval_poisoning(frames, index);
  resolve_identifiers(frames, idents, index, opts);
  hoist_functions(frames, func_decls, index);

  let wants_summary = frames[index].has_parameters
    && matches!(
      frames[index].kind,
      ScopeKind::Function | ScopeKind::ClassStaticInit
    );
  if wants_summary {
    let summary = build_summary(&frames[index], idents, func_decls);
    frames[index].summary = Some(Box::new(summary));
  }
}

/// Direct `eval` poisons every enclosing frame without limit; the
/// same-function flag additionally stops at function boundaries, since an
/// `eval` in a nested function cannot inject `var`s into this one.
fn propagate_eval_poisoning(frames: &mut [ScopeFrame], index: usize) {
  let Some(parent) = frames[index].parent else {
    return;
  };
  let poisons_chain = frames[index].calls_eval || frames[index].chain_has_eval;
  let poisons_function =
    frames[index].eval_in_function && frames[index].kind != ScopeKind::Function;
  if poisons_chain {
    frames[parent].chain_has_eval = true;
  }
  if poisons_function {
    frames[parent].eval_in_function = true;
  }
}

fn resolve_identifiers(
  frames: &mut [ScopeFrame],
  idents: &mut [IdentData],
  index: usize,
  opts: &AnalyzeOptions,
) {
  let groups = mem::take(&mut frames[index].groups);
  let mut unresolved = Vec::<(String, IdentGroup)>::new();

  // Name order makes slot numbering deterministic regardless of hash
  // iteration order.
  for (name, mut group) in groups.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
    if let Some(kind) = group.decl_kind {
      for &id in &group.ids {
        idents[id.0].decl_kind = Some(kind);
      }
    }

    let kind = frames[index].kind;
    let flags = frames[index].flags(&name);

    let mut slot_kind = if frames[index].is_top_level() && flags.intersects(DeclFlags::VAR) {
      Some(LocalVarKind::Var)
    } else if flags.intersects(DeclFlags::LEXICAL) {
      Some(LocalVarKind::LetOrConst)
    } else if flags.intersects(DeclFlags::FUNCTION) {
      Some(LocalVarKind::Function)
    } else {
      None
    };
    if kind == ScopeKind::Function && !frames[index].is_arrow && name == "arguments" {
      slot_kind = Some(LocalVarKind::ArgumentsObject);
    }
    if kind == ScopeKind::Catch && flags.intersects(DeclFlags::CATCH_PARAM) {
      slot_kind = Some(LocalVarKind::CatchClauseParameter);
    }

    // A body `var` also referenced from default parameter expressions must
    // live in the shared environment; surrender the cluster and force the
    // outer binding into an environment record.
    if flags.intersects(DeclFlags::IN_PARAM_EXPRS)
      && flags.intersects(DeclFlags::VAR)
      && !flags.intersects(DeclFlags::NO_LEXICAL)
    {
      if let Some(parent) = frames[index].parent {
        frames[parent]
          .groups
          .entry(name)
          .or_insert_with(IdentGroup::empty)
          .captured = true;
      }
      continue;
    }

    // A class's inner name binding is immutable and always resolved via
    // the class environment.
    if kind == ScopeKind::ClassDeclaration && flags.intersects(DeclFlags::SELF_BINDING) {
      continue;
    }

    // The self-binding of a named function expression is observable
    // through recursion and deletion attempts; keep it dynamic and out of
    // the global fast path. The cluster still merges upward (below) as an
    // always-captured use.
    if kind == ScopeKind::Function
      && !frames[index].is_function_declaration
      && flags.intersects(DeclFlags::SELF_BINDING)
    {
      for &id in &group.ids {
        idents[id.0].poisoned = true;
      }
    }

    let mut slot_kind = if kind == ScopeKind::ClassDeclaration {
      None
    } else {
      slot_kind
    };

    let hoistable = frames[index].has_hoist_candidate(&name);
    let mut is_parameter = false;
    let mut use_parameter_index = false;
    if kind == ScopeKind::Function {
      if flags.intersects(DeclFlags::PARAM_CANDIDATE) {
        is_parameter = true;
        // The arguments object aliases non-rest parameters; an aliased
        // parameter gets a fresh slot instead of its positional index so
        // both views stay coherent.
        use_parameter_index =
          !frames[index].accesses_arguments || frames[index].has_rest_parameter(&name);
      } else if flags.intersects(DeclFlags::NO_LEXICAL) {
        continue;
      }
      if hoistable {
        continue;
      }
    }

    // The program frame is the end of the chain: names that survive to
    // here become globals or stay dynamic, and never get slots of their
    // own. Nested top-level blocks slot into this frame instead.
    if kind == ScopeKind::Program {
      if !opts.suppress_globals && !opts.initiated_by_eval && !group.in_with {
        for &id in &group.ids {
          if !idents[id.0].poisoned {
            idents[id.0].resolution = Resolution::Global;
          }
        }
      }
      continue;
    }

    if slot_kind.is_some() || is_parameter {
      if hoistable {
        // An Annex B candidate's fate is unknown until the top-level frame
        // closes; its occurrences stay dynamic.
        continue;
      }
      if frames[index].has_parameter_expressions
        && group.captured
        && flags.intersects(DeclFlags::VAR)
        && !flags.intersects(DeclFlags::NO_LEXICAL)
      {
        if let Some(parent) = frames[index].parent {
          frames[parent]
            .groups
            .entry(name.clone())
            .or_insert_with(IdentGroup::empty)
            .captured = true;
        }
      }
      if !group.captured && !group.in_with {
        if frames[index].calls_eval || frames[index].chain_has_eval {
          // eval can observe the binding; transitively poisoned.
          for &id in &group.ids {
            idents[id.0].poisoned = true;
          }
          continue;
        }
        let mut owner = nearest_function(frames, index);
        if owner.is_none() {
          if group.decl_kind == Some(DeclarationKind::Var) {
            // Program-level vars are global object properties, never
            // slots.
            continue;
          }
          owner = frames[index].top_level;
        }
        let Some(owner) = owner else {
          continue;
        };
        if is_parameter {
          let position = if use_parameter_index {
            frames[owner].parameter_index(&name)
          } else {
            None
          };
          match position {
            Some(position) => {
              for &id in &group.ids {
                idents[id.0].resolution = Resolution::Parameter(position);
              }
            }
            None => {
              // Destructured or arguments-aliased parameter: a fresh slot
              // the prologue copies the parameter value into.
              let slot = frames[owner].push_local(name.clone(), LocalVarKind::Var);
              for &id in &group.ids {
                idents[id.0].resolution = Resolution::Local(slot);
              }
            }
          }
        } else if let Some(slot_kind) = slot_kind.take() {
          let slot = frames[owner].push_local(name.clone(), slot_kind);
          for &id in &group.ids {
            idents[id.0].resolution = Resolution::Local(slot);
          }
        }
      }
      // Captured, with-tainted, or poisoned clusters keep their dynamic
      // tags; the binding stays in an environment record. They are NOT
      // handed to the parent: they already found their binding here.
      continue;
    }

    // Undeclared here: taint the cluster with what this frame knows, then
    // hand it to the parent.
    if frames[index].has_parameters
      || matches!(kind, ScopeKind::ClassField | ScopeKind::ClassStaticInit)
    {
      group.captured = true;
    }
    if kind == ScopeKind::With {
      group.in_with = true;
    }
    if frames[index].eval_in_function {
      for &id in &group.ids {
        idents[id.0].poisoned = true;
      }
    }
    unresolved.push((name, group));
  }

  if let Some(parent) = frames[index].parent {
    for (name, group) in unresolved {
      match frames[parent].groups.get_mut(&name) {
        Some(existing) => {
          existing.ids.extend(group.ids);
          existing.captured |= group.captured;
          existing.in_with |= group.in_with;
        }
        None => {
          frames[parent].groups.insert(name, group);
        }
      }
    }
  }
}

/// Annex B.3.3: a sloppy-mode block function hoists its binding to the
/// enclosing top level, unless a conflicting declaration anywhere on the
/// way up (or at the destination) would change an existing name's meaning.
fn hoist_functions(frames: &mut [ScopeFrame], func_decls: &mut [FuncDeclData], index: usize) {
  let candidates = mem::take(&mut frames[index].hoist_candidates);
  for candidate in candidates {
    if frames[index].has_flag(&candidate.name, DeclFlags::LEXICAL | DeclFlags::NO_VAR) {
      continue;
    }
    if frames[index].is_top_level() {
      if frames[index].has_flag(&candidate.name, DeclFlags::NO_LEXICAL) {
        continue;
      }
      // Hoisting a function named `arguments` would shadow the arguments
      // object, unless a parameter of that name already does.
      if candidate.name == "arguments"
        && frames[index].accesses_arguments
        && !frames[index].has_flag("arguments", DeclFlags::NO_LEXICAL)
      {
        continue;
      }
      if !frames[index]
        .annex_b_function_names
        .contains(&candidate.name)
      {
        frames[index]
          .annex_b_function_names
          .push(candidate.name.clone());
      }
      func_decls[candidate.decl.0].hoisted = true;
    } else if let Some(parent) = frames[index].parent {
      if !frames[parent].has_flag(&candidate.name, DeclFlags::LEXICAL | DeclFlags::FUNCTION) {
        frames[parent].hoist_candidates.push(candidate);
      }
    }
  }
}
