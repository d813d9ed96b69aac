//! Purpose: Shared core library crate used by the `symco-reset` CLI and tests.
//! Exports: `core` (file-set model, deletion, errors).
//! Role: Internal library backing the binary; not a stable public SDK.
//! Invariants: Treat the crate API as internal until a dedicated library release.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod core;
