use serde::Deserialize;
use serde::Serialize;
use std::cmp::max;
use std::cmp::min;

/// A location within the current source file expressed as UTF-8 byte offsets.
///
/// The range is half-open: `Loc(a, b)` covers bytes `a..b`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1 - self.0
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }
}
