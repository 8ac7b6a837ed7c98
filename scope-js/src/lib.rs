//! Variable binding resolution for JavaScript.
//!
//! The crate runs in two phases. During parsing, a [`ScopeCollector`]
//! records the scope tree: one frame per scope-introducing construct,
//! declarations registered into frames, and every identifier occurrence
//! clustered by name. After parsing, [`ScopeCollector::analyze`] resolves
//! the tree bottom-up into a [`ScopeAnalysis`]:
//!
//! - every identifier occurrence gets a [`Resolution`]: a global, a local
//!   slot, a positional parameter, or a dynamic scope-chain walk;
//! - sloppy-mode block functions get their Annex B hoisting verdict;
//! - direct `eval` and `with` conservatively demote everything they can
//!   observe to dynamic resolution;
//! - each function frame gets a [`FunctionScopeSummary`] describing the
//!   prologue its bytecode needs.
//!
//! Redeclaration errors (`let x; var x;` and friends) surface from the
//! registrar methods as [`ScopeError`]s while the tree is being built.

use serde::Deserialize;
use serde::Serialize;

pub mod analyze;
pub mod collect;
pub mod error;
pub mod frame;
pub mod ident;
pub mod loc;
pub mod summary;

pub use analyze::ScopeAnalysis;
pub use collect::ParameterPattern;
pub use collect::ScopeCheckpoint;
pub use collect::ScopeCollector;
pub use error::ScopeError;
pub use error::ScopeErrorType;
pub use error::ScopeResult;
pub use frame::ScopeId;
pub use frame::ScopeKind;
pub use ident::DeclarationKind;
pub use ident::FuncDeclId;
pub use ident::IdentId;
pub use ident::Resolution;
pub use loc::Loc;
pub use summary::FunctionScopeSummary;
pub use summary::LocalVarKind;
pub use summary::LocalVariable;

/// Whether the program being analyzed is a classic script or a module.
/// Modules are always strict and their top-level bindings are never
/// global object properties.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TopLevelMode {
  Global,
  Module,
}

/// The flavor of a function declaration. Only plain sloppy-mode functions
/// participate in Annex B block-function hoisting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FunctionKind {
  Normal,
  Generator,
  Async,
  AsyncGenerator,
}
