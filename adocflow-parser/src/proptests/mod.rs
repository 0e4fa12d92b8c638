//! Property-based tests.
//!
//! These check invariants that hold for any input rather than for specific
//! documents: the pipeline never panics, section ids stay unique, every
//! source line becomes exactly one fragment, and inline content survives
//! substitution.

mod generators;
mod invariants;
