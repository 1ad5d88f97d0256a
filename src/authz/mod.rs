//! Authorization core.
//!
//! - `evaluator`: pure (role, resource, action) decisions plus the combined
//!   per-request decision with ownership shortcuts
//! - `ownership`: which records a caller owns
//! - `visibility`: list-query narrowing and single-record visibility
//!
//! Nothing in here performs I/O. The caller's role comes from the token
//! snapshot, see [`Identity`].

mod evaluator;
mod identity;
mod ownership;
mod visibility;

pub use evaluator::{authorize, decide, is_allowed, require_admin};
pub use identity::Identity;
pub use ownership::{Owned, Ownership};
pub use visibility::{ensure_visible, scope_query, ListFilter, ResourceKind};
