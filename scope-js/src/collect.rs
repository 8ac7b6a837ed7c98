use crate::analyze;
use crate::analyze::AnalyzeOptions;
use crate::analyze::ScopeAnalysis;
use crate::error::ScopeError;
use crate::error::ScopeResult;
use crate::frame::nearest_function;
use crate::frame::DeclFlags;
use crate::frame::HoistCandidate;
use crate::frame::IdentGroup;
use crate::frame::Param;
use crate::frame::ScopeFrame;
use crate::frame::ScopeId;
use crate::frame::ScopeKind;
use crate::frame::ScopeLevel;
use crate::ident::DeclarationKind;
use crate::ident::FuncDeclData;
use crate::ident::FuncDeclId;
use crate::ident::IdentData;
use crate::ident::IdentId;
use crate::loc::Loc;
use crate::FunctionKind;
use crate::TopLevelMode;

/// One parameter position in a function's formal parameter list.
///
/// A destructuring pattern occupies its position with all of its bound
/// names attached, so later parameters keep their runtime indices.
pub enum ParameterPattern<'a> {
  Identifier {
    name: &'a str,
    ident: Option<IdentId>,
    is_rest: bool,
  },
  Pattern {
    bound_names: Vec<(&'a str, Option<IdentId>)>,
    is_rest: bool,
  },
}

/// `this` flags of one enclosing function frame, snapshotted because
/// [`set_uses_this`](ScopeCollector::set_uses_this) mutates frames that
/// outlive a failed speculative parse.
struct SavedThisFlags {
  frame: usize,
  uses_this: bool,
  uses_this_from_environment: bool,
}

/// Snapshot of collector state, for parser backtracking. Restoring discards
/// every frame, identifier, and declaration recorded after the snapshot and
/// undoes `this` propagation into surviving frames.
pub struct ScopeCheckpoint {
  frames: usize,
  idents: usize,
  func_decls: usize,
  current: Option<usize>,
  saved_this: Vec<SavedThisFlags>,
}

/// Phase 1 of scope analysis: records the scope tree, declarations, and
/// identifier occurrences as the parser emits them.
///
/// The parser opens a frame for each scope-introducing construct, registers
/// declarations and identifier uses into the innermost open frame, and
/// closes frames on the way out. Once the whole program has been walked,
/// [`analyze`](ScopeCollector::analyze) consumes the collector and produces
/// a [`ScopeAnalysis`].
pub struct ScopeCollector {
  frames: Vec<ScopeFrame>,
  current: Option<usize>,
  idents: Vec<IdentData>,
  func_decls: Vec<FuncDeclData>,
}

impl Default for ScopeCollector {
  fn default() -> Self {
    Self::new()
  }
}

impl ScopeCollector {
  pub fn new() -> ScopeCollector {
    ScopeCollector {
      frames: Vec::new(),
      current: None,
      idents: Vec::new(),
      func_decls: Vec::new(),
    }
  }

  fn current(&self) -> usize {
    self.current.expect("an open scope")
  }

  fn open_scope(&mut self, kind: ScopeKind, level: ScopeLevel) -> ScopeId {
    let index = self.frames.len();
    let mut frame = ScopeFrame::new(kind, level);
    frame.parent = self.current;
    frame.top_level = if level.is_top_level() {
      Some(index)
    } else {
      self.current.and_then(|p| self.frames[p].top_level)
    };
    if let Some(parent) = self.current {
      self.frames[parent].children.push(index);
    }
    self.frames.push(frame);
    self.current = Some(index);
    ScopeId(index)
  }

  /// Closes the innermost open frame. Eval, arguments, and await
  /// accumulators flow into the parent unless the closing frame is a
  /// function boundary (it has a registered parameter list).
  pub fn close_scope(&mut self) {
    let index = self.current();
    self.current = self.frames[index].parent;
    let Some(parent) = self.current else {
      return;
    };
    if self.frames[index].has_parameters {
      return;
    }
    let calls_eval = self.frames[index].calls_eval;
    let accesses_arguments = self.frames[index].accesses_arguments;
    let has_await = self.frames[index].has_await;
    let parent = &mut self.frames[parent];
    parent.calls_eval |= calls_eval;
    parent.eval_in_function |= calls_eval;
    parent.accesses_arguments |= accesses_arguments;
    parent.has_await |= has_await;
  }

  pub fn open_program_scope(&mut self, mode: TopLevelMode) -> ScopeId {
    let level = match mode {
      TopLevelMode::Global => ScopeLevel::Script,
      TopLevelMode::Module => ScopeLevel::Module,
    };
    self.open_scope(ScopeKind::Program, level)
  }

  /// Opens a function body frame. `self_name` is the name of a named
  /// function expression, which binds inside its own body; function
  /// declarations bind in the enclosing scope instead, via
  /// [`add_function_declaration`](ScopeCollector::add_function_declaration).
  pub fn open_function_scope(&mut self, self_name: Option<&str>) -> ScopeId {
    let id = self.open_scope(ScopeKind::Function, ScopeLevel::Function);
    if let Some(name) = self_name {
      self.frames[id.0].binding_mut(name).flags |= DeclFlags::SELF_BINDING;
    }
    id
  }

  pub fn open_block_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::Block, ScopeLevel::Nested)
  }

  pub fn open_for_loop_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::ForLoop, ScopeLevel::Nested)
  }

  pub fn open_with_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::With, ScopeLevel::Nested)
  }

  pub fn open_catch_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::Catch, ScopeLevel::Nested)
  }

  pub fn open_class_field_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::ClassField, ScopeLevel::Nested)
  }

  pub fn open_static_init_scope(&mut self) -> ScopeId {
    self.open_scope(ScopeKind::ClassStaticInit, ScopeLevel::StaticInit)
  }

  /// Opens the frame a class's heritage clause and body elements live in.
  /// A named class binds its own name inside this frame.
  pub fn open_class_declaration_scope(&mut self, name: Option<&str>) -> ScopeId {
    let id = self.open_scope(ScopeKind::ClassDeclaration, ScopeLevel::Nested);
    if let Some(name) = name {
      self.frames[id.0].binding_mut(name).flags |= DeclFlags::SELF_BINDING;
    }
    id
  }

  /// Allocates a handle for one identifier occurrence in the source.
  pub fn create_identifier(&mut self, name: &str) -> IdentId {
    let id = IdentId(self.idents.len());
    self.idents.push(IdentData::new(name.to_string()));
    id
  }

  /// Attaches an identifier occurrence to the innermost open frame's
  /// cluster for its name. Declarations pass their kind so every
  /// occurrence that ends up referring to the binding can be annotated
  /// with it.
  pub fn register_identifier(&mut self, id: IdentId, decl_kind: Option<DeclarationKind>) {
    let index = self.current();
    let name = self.idents[id.0].name.clone();
    let group = self.frames[index]
      .groups
      .entry(name)
      .or_insert_with(IdentGroup::empty);
    group.ids.push(id);
    // The first declaration of a name decides the kind the whole cluster
    // is annotated with.
    if decl_kind.is_some() && group.decl_kind.is_none() {
      group.decl_kind = decl_kind;
    }
  }

  /// Registers `let`/`const`/`class` bound names in the innermost frame.
  pub fn add_lexical_declaration(&mut self, names: &[&str], loc: Loc) -> ScopeResult<()> {
    let index = self.current();
    for &name in names {
      let conflict = DeclFlags::VAR | DeclFlags::LEXICAL | DeclFlags::FUNCTION | DeclFlags::NO_LEXICAL;
      if self.frames[index].has_flag(name, conflict) {
        return Err(ScopeError::already_declared(name, loc));
      }
      self.frames[index].binding_mut(name).flags |= DeclFlags::LEXICAL;
    }
    Ok(())
  }

  /// Registers `var` bound names. The binding is recorded on every frame
  /// from the innermost up to and including its top-level frame, so nested
  /// frames can detect later lexical conflicts and the top-level frame
  /// owns the hoisted binding.
  pub fn add_var_declaration(
    &mut self,
    bound_names: &[(&str, Option<IdentId>)],
    kind: DeclarationKind,
    loc: Loc,
  ) -> ScopeResult<()> {
    let start = self.current();
    for &(name, ident) in bound_names {
      if let Some(id) = ident {
        self.register_identifier(id, Some(kind));
      }
      let mut cursor = Some(start);
      while let Some(index) = cursor {
        let conflict = DeclFlags::LEXICAL | DeclFlags::FUNCTION | DeclFlags::NO_VAR;
        if self.frames[index].has_flag(name, conflict) {
          return Err(ScopeError::already_declared(name, loc));
        }
        let binding = self.frames[index].binding_mut(name);
        binding.flags |= DeclFlags::VAR;
        binding.var_ident = ident;
        if self.frames[index].is_top_level() {
          break;
        }
        cursor = self.frames[index].parent;
      }
    }
    Ok(())
  }

  /// Registers a function declaration's name in the innermost frame.
  ///
  /// At a non-module top level the name binds like `var`. Elsewhere,
  /// generators, async functions, and strict-mode functions bind
  /// lexically; a plain sloppy-mode function binds as a block function and
  /// becomes an Annex B hoisting candidate.
  pub fn add_function_declaration(
    &mut self,
    name: &str,
    ident: Option<IdentId>,
    kind: FunctionKind,
    is_strict: bool,
    loc: Loc,
  ) -> ScopeResult<FuncDeclId> {
    let decl = FuncDeclId(self.func_decls.len());
    self.func_decls.push(FuncDeclData {
      name: name.to_string(),
      hoisted: false,
    });
    let index = self.current();
    let binds_like_var =
      self.frames[index].level.is_top_level() && self.frames[index].level != ScopeLevel::Module;
    if let Some(id) = ident {
      self.register_identifier(id, None);
    }
    let frame = &mut self.frames[index];
    if binds_like_var {
      if frame.has_flag(name, DeclFlags::LEXICAL) {
        return Err(ScopeError::already_declared(name, loc));
      }
      let binding = frame.binding_mut(name);
      binding.flags |= DeclFlags::VAR;
      binding.var_ident = ident;
      frame.function_decls.push(decl);
      return Ok(decl);
    }
    let flags = frame.flags(name);
    if flags.intersects(DeclFlags::VAR | DeclFlags::LEXICAL) {
      return Err(ScopeError::already_declared(name, loc));
    }
    if kind != FunctionKind::Normal || is_strict {
      if flags.intersects(DeclFlags::FUNCTION) {
        return Err(ScopeError::already_declared(name, loc));
      }
      frame.binding_mut(name).flags |= DeclFlags::LEXICAL;
      return Ok(decl);
    }
    if !flags.intersects(DeclFlags::LEXICAL) {
      frame.hoist_candidates.push(HoistCandidate {
        name: name.to_string(),
        decl,
      });
    }
    frame.binding_mut(name).flags |= DeclFlags::FUNCTION;
    Ok(decl)
  }

  /// Registers the bound names of a destructuring `catch` parameter.
  /// These forbid `var` redeclaration inside the clause.
  pub fn add_catch_parameter_pattern(&mut self, names: &[&str]) {
    let index = self.current();
    for &name in names {
      self.frames[index].binding_mut(name).flags |= DeclFlags::NO_VAR | DeclFlags::CATCH_PARAM;
    }
  }

  /// Registers a simple `catch (e)` parameter. Unlike the pattern form,
  /// `var e` inside the clause is tolerated and refers to the parameter.
  pub fn add_catch_parameter_identifier(&mut self, name: &str, ident: IdentId) {
    self.register_identifier(ident, None);
    let index = self.current();
    let binding = self.frames[index].binding_mut(name);
    binding.flags |= DeclFlags::VAR | DeclFlags::CATCH_PARAM;
    binding.var_ident = Some(ident);
  }

  /// Registers the formal parameter list of the innermost (function)
  /// frame. This marks the frame as a function boundary for accumulator
  /// propagation, so it must be called for every function, even with an
  /// empty list.
  ///
  /// Must be called after parameter expressions have been parsed (their
  /// identifier occurrences decide which names get split environments) and
  /// before the body is parsed.
  pub fn set_function_parameters(
    &mut self,
    params: &[ParameterPattern],
    has_parameter_expressions: bool,
  ) {
    let index = self.current();
    self.frames[index].has_parameters = true;
    self.frames[index].has_parameter_expressions = has_parameter_expressions;
    for param in params {
      match param {
        ParameterPattern::Identifier {
          name,
          ident,
          is_rest,
        } => {
          self.frames[index].params.push(Param {
            name: name.to_string(),
            is_rest: *is_rest,
          });
          if let Some(id) = ident {
            self.register_identifier(*id, None);
          }
          self.frames[index].binding_mut(name).flags |=
            DeclFlags::PARAM_CANDIDATE | DeclFlags::NO_LEXICAL;
        }
        ParameterPattern::Pattern {
          bound_names,
          is_rest,
        } => {
          // The pattern itself holds the position; its bound names have no
          // positional slot of their own.
          self.frames[index].params.push(Param {
            name: String::new(),
            is_rest: *is_rest,
          });
          for &(name, ident) in bound_names {
            if let Some(id) = ident {
              self.register_identifier(id, None);
            }
            self.frames[index].binding_mut(name).flags |=
              DeclFlags::PARAM_CANDIDATE | DeclFlags::NO_LEXICAL;
          }
        }
      }
    }
    if has_parameter_expressions {
      let referenced = self.frames[index]
        .groups
        .keys()
        .filter(|name| !self.frames[index].has_flag(name.as_str(), DeclFlags::NO_LEXICAL))
        .cloned()
        .collect::<Vec<_>>();
      for name in referenced {
        self.frames[index].binding_mut(&name).flags |= DeclFlags::IN_PARAM_EXPRS;
      }
    }
  }

  pub fn set_contains_direct_call_to_eval(&mut self) {
    let index = self.current();
    self.frames[index].calls_eval = true;
    self.frames[index].eval_in_function = true;
  }

  pub fn set_contains_access_to_arguments_object(&mut self) {
    let index = self.current();
    self.frames[index].accesses_arguments = true;
  }

  pub fn set_contains_await_expression(&mut self) {
    let index = self.current();
    self.frames[index].has_await = true;
  }

  /// Marks every enclosing function frame as using `this`. An arrow
  /// function has no `this` of its own, so when the innermost function is
  /// an arrow the binding must additionally stay readable through the
  /// environment chain.
  pub fn set_uses_this(&mut self) {
    let index = self.current();
    let from_environment =
      nearest_function(&self.frames, index).is_some_and(|f| self.frames[f].is_arrow);
    let mut cursor = Some(index);
    while let Some(i) = cursor {
      if self.frames[i].kind == ScopeKind::Function {
        self.frames[i].uses_this = true;
        if from_environment {
          self.frames[i].uses_this_from_environment = true;
        }
      }
      cursor = self.frames[i].parent;
    }
  }

  /// `new.target` is always read from the environment.
  pub fn set_uses_new_target(&mut self) {
    let index = self.current();
    let mut cursor = Some(index);
    while let Some(i) = cursor {
      if self.frames[i].kind == ScopeKind::Function {
        self.frames[i].uses_this = true;
        self.frames[i].uses_this_from_environment = true;
      }
      cursor = self.frames[i].parent;
    }
  }

  pub fn set_is_arrow_function(&mut self) {
    let index = self.current();
    self.frames[index].is_arrow = true;
  }

  pub fn set_is_function_declaration(&mut self) {
    let index = self.current();
    self.frames[index].is_function_declaration = true;
  }

  pub fn current_scope(&self) -> Option<ScopeId> {
    self.current.map(ScopeId)
  }

  pub fn scope_kind(&self) -> Option<ScopeKind> {
    self.current.map(|i| self.frames[i].kind)
  }

  pub fn contains_direct_call_to_eval(&self) -> bool {
    self.current.is_some_and(|i| self.frames[i].calls_eval)
  }

  pub fn contains_await_expression(&self) -> bool {
    self.current.is_some_and(|i| self.frames[i].has_await)
  }

  pub fn uses_arguments_object(&self) -> bool {
    self.current.is_some_and(|i| self.frames[i].accesses_arguments)
  }

  pub fn uses_this(&self) -> bool {
    self.current.is_some_and(|i| self.frames[i].uses_this)
  }

  pub fn uses_this_from_environment(&self) -> bool {
    self
      .current
      .is_some_and(|i| self.frames[i].uses_this_from_environment)
  }

  pub fn has_current_scope(&self) -> bool {
    self.current.is_some()
  }

  /// Whether the innermost frame already binds `name` lexically, as a
  /// `var`, or as a pending block function. A destructured `catch`
  /// parameter is not a declaration in this sense.
  pub fn has_declaration(&self, name: &str) -> bool {
    let Some(index) = self.current else {
      return false;
    };
    let frame = &self.frames[index];
    frame.has_flag(name, DeclFlags::VAR | DeclFlags::LEXICAL) || frame.has_hoist_candidate(name)
  }

  /// Whether `name` is declared (including as a parameter) anywhere
  /// between the innermost frame and the nearest enclosing function or
  /// static initializer body, inclusive.
  pub fn has_declaration_in_current_function(&self, name: &str) -> bool {
    let mut cursor = self.current;
    while let Some(index) = cursor {
      let frame = &self.frames[index];
      if frame.has_flag(
        name,
        DeclFlags::VAR | DeclFlags::LEXICAL | DeclFlags::PARAM_CANDIDATE,
      ) || frame.has_hoist_candidate(name)
      {
        return true;
      }
      if matches!(frame.kind, ScopeKind::Function | ScopeKind::ClassStaticInit) {
        return false;
      }
      cursor = frame.parent;
    }
    false
  }

  /// `using` declarations are not allowed at the top level of a classic
  /// script.
  pub fn can_have_using_declaration(&self) -> bool {
    self
      .current
      .is_some_and(|i| self.frames[i].level != ScopeLevel::Script)
  }

  pub fn checkpoint(&self) -> ScopeCheckpoint {
    let mut saved_this = Vec::new();
    let mut cursor = self.current;
    while let Some(index) = cursor {
      if self.frames[index].kind == ScopeKind::Function {
        saved_this.push(SavedThisFlags {
          frame: index,
          uses_this: self.frames[index].uses_this,
          uses_this_from_environment: self.frames[index].uses_this_from_environment,
        });
      }
      cursor = self.frames[index].parent;
    }
    ScopeCheckpoint {
      frames: self.frames.len(),
      idents: self.idents.len(),
      func_decls: self.func_decls.len(),
      current: self.current,
      saved_this,
    }
  }

  /// Rewinds to a checkpoint taken earlier on this collector, dropping
  /// everything recorded since and pruning references to it from the
  /// surviving frames. The `this` flags of surviving function frames are
  /// rolled back to their snapshotted values; other accumulated flags are
  /// deliberately kept, they are conservative.
  pub fn restore(&mut self, checkpoint: ScopeCheckpoint) {
    self.frames.truncate(checkpoint.frames);
    self.idents.truncate(checkpoint.idents);
    self.func_decls.truncate(checkpoint.func_decls);
    self.current = checkpoint.current;
    let frames = self.frames.len();
    let idents = self.idents.len();
    let func_decls = self.func_decls.len();
    let mut cursor = self.current;
    while let Some(index) = cursor {
      let frame = &mut self.frames[index];
      frame.children.retain(|&c| c < frames);
      for group in frame.groups.values_mut() {
        group.ids.retain(|id| id.0 < idents);
      }
      frame
        .groups
        .retain(|_, g| !g.ids.is_empty() || g.decl_kind.is_some() || g.captured || g.in_with);
      for binding in frame.bindings.values_mut() {
        if binding.var_ident.is_some_and(|id| id.0 >= idents) {
          binding.var_ident = None;
        }
      }
      frame.hoist_candidates.retain(|c| c.decl.0 < func_decls);
      frame.function_decls.retain(|d| d.0 < func_decls);
      cursor = frame.parent;
    }
    for saved in &checkpoint.saved_this {
      if saved.frame < frames {
        self.frames[saved.frame].uses_this = saved.uses_this;
        self.frames[saved.frame].uses_this_from_environment = saved.uses_this_from_environment;
      }
    }
  }

  /// Consumes the finished scope tree and resolves every identifier.
  ///
  /// `top_level_initiated_by_eval` disables global resolution for
  /// program-level names, since an eval-created script shares its caller's
  /// scope chain.
  pub fn analyze(self, top_level_initiated_by_eval: bool) -> ScopeAnalysis {
    analyze::run(
      self.frames,
      self.idents,
      self.func_decls,
      AnalyzeOptions {
        initiated_by_eval: top_level_initiated_by_eval,
        suppress_globals: false,
      },
    )
  }

  /// Like [`analyze`](ScopeCollector::analyze) but for code destined for
  /// the `Function` constructor, whose top-level names never resolve to
  /// globals.
  pub fn analyze_as_dynamic_function(self) -> ScopeAnalysis {
    analyze::run(
      self.frames,
      self.idents,
      self.func_decls,
      AnalyzeOptions {
        initiated_by_eval: false,
        suppress_globals: true,
      },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn restore_discards_scopes_and_identifiers() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    let outer = collector.create_identifier("x");
    collector.register_identifier(outer, None);
    let checkpoint = collector.checkpoint();

    collector.open_block_scope();
    let inner = collector.create_identifier("y");
    collector.register_identifier(inner, None);
    collector
      .add_lexical_declaration(&["y"], Loc(0, 1))
      .unwrap();
    collector.restore(checkpoint);

    assert_eq!(collector.scope_kind(), Some(ScopeKind::Program));
    assert!(!collector.has_declaration("y"));
    // The surviving program frame must not reference the discarded block.
    let recreated = collector.create_identifier("y");
    assert_eq!(recreated, inner);
  }

  #[test]
  fn has_declaration_in_current_function_stops_at_function_boundary() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector
      .add_var_declaration(&[("outer", None)], DeclarationKind::Var, Loc(0, 5))
      .unwrap();
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.open_block_scope();
    collector
      .add_lexical_declaration(&["inner"], Loc(10, 15))
      .unwrap();

    assert!(collector.has_declaration_in_current_function("inner"));
    assert!(!collector.has_declaration_in_current_function("outer"));
  }

  #[test]
  fn parameters_count_as_declarations_in_current_function() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(
      &[ParameterPattern::Identifier {
        name: "p",
        ident: None,
        is_rest: false,
      }],
      false,
    );
    collector.open_block_scope();
    assert!(collector.has_declaration_in_current_function("p"));
    assert!(!collector.has_declaration("p"));
  }

  #[test]
  fn static_initializers_bound_the_declaration_query() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector
      .add_var_declaration(&[("outer", None)], DeclarationKind::Var, Loc(0, 5))
      .unwrap();
    collector.open_class_declaration_scope(Some("C"));
    collector.open_static_init_scope();
    collector.set_function_parameters(&[], false);
    assert!(!collector.has_declaration_in_current_function("outer"));
  }

  #[test]
  fn block_functions_count_as_declarations() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.open_block_scope();
    collector
      .add_function_declaration("g", None, FunctionKind::Normal, false, Loc(0, 1))
      .unwrap();
    assert!(collector.has_declaration("g"));
    assert!(collector.has_declaration_in_current_function("g"));
  }

  #[test]
  fn destructured_catch_names_are_not_declarations() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_catch_scope();
    collector.add_catch_parameter_pattern(&["e"]);
    assert!(!collector.has_declaration("e"));

    let mut simple = ScopeCollector::new();
    simple.open_program_scope(TopLevelMode::Global);
    simple.open_catch_scope();
    let param = simple.create_identifier("e");
    simple.add_catch_parameter_identifier("e", param);
    assert!(simple.has_declaration("e"));
  }

  #[test]
  fn first_declaration_kind_wins_for_a_cluster() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector
      .add_lexical_declaration(&["x"], Loc(0, 1))
      .unwrap();
    let first = collector.create_identifier("x");
    collector.register_identifier(first, Some(DeclarationKind::Let));
    let second = collector.create_identifier("x");
    collector.register_identifier(second, Some(DeclarationKind::Const));
    collector.close_scope();
    collector.close_scope();

    let analysis = collector.analyze(false);
    assert_eq!(analysis.declaration_kind(first), Some(DeclarationKind::Let));
    assert_eq!(analysis.declaration_kind(second), Some(DeclarationKind::Let));
  }

  #[test]
  fn this_marks_the_enclosing_function() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.open_block_scope();
    collector.set_uses_this();
    collector.close_scope();
    assert!(collector.uses_this());
    assert!(!collector.uses_this_from_environment());
  }

  #[test]
  fn this_in_an_arrow_reads_from_the_environment() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.open_function_scope(None);
    collector.set_is_arrow_function();
    collector.set_function_parameters(&[], false);
    collector.set_uses_this();
    assert!(collector.uses_this());
    assert!(collector.uses_this_from_environment());
    collector.close_scope();
    // The outer function owns the binding the arrow reads.
    assert!(collector.uses_this());
    assert!(collector.uses_this_from_environment());
  }

  #[test]
  fn new_target_always_reads_from_the_environment() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.set_uses_new_target();
    assert!(collector.uses_this());
    assert!(collector.uses_this_from_environment());
  }

  #[test]
  fn restore_rolls_back_this_flags() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    let checkpoint = collector.checkpoint();

    collector.open_function_scope(None);
    collector.set_is_arrow_function();
    collector.set_function_parameters(&[], false);
    collector.set_uses_this();
    collector.restore(checkpoint);

    assert!(!collector.uses_this());
    assert!(!collector.uses_this_from_environment());
  }

  #[test]
  fn await_accumulates_through_blocks_but_not_functions() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    collector.open_function_scope(None);
    collector.set_function_parameters(&[], false);
    collector.open_block_scope();
    collector.set_contains_await_expression();
    collector.close_scope();
    assert!(collector.contains_await_expression());
    collector.close_scope();
    assert!(!collector.contains_await_expression());
  }

  #[test]
  fn using_declarations_rejected_at_script_top_level_only() {
    let mut collector = ScopeCollector::new();
    collector.open_program_scope(TopLevelMode::Global);
    assert!(!collector.can_have_using_declaration());
    collector.open_block_scope();
    assert!(collector.can_have_using_declaration());
    collector.close_scope();
    collector.close_scope();

    let mut module = ScopeCollector::new();
    module.open_program_scope(TopLevelMode::Module);
    assert!(module.can_have_using_declaration());
  }
}
