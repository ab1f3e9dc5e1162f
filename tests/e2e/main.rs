//! End-to-end scenarios for rewind.

mod harness;
