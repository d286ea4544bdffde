//! Business-rule verification for intent frames.
//!
//! This layer sits above the state guard: it judges *what was asked*, not
//! the shape of session memory.
//!
//! - [`ConstraintsVerifier`]: policy limits then explicit constraints, in a
//!   fixed order, stopping at the first failure.
//! - [`PostChecks`]: semantic completion rules applied after a plan ran.

pub mod constraints;
pub mod policy;
pub mod post_checks;
mod value;

pub use constraints::{ConstraintViolation, ConstraintsVerifier, VerifyTrace};
pub use policy::Policy;
pub use post_checks::{PostCheckError, PostChecks};
