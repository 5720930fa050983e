//! Property-based tests for result normalization using proptest.
//!
//! These tests check the invariants the results viewer relies on:
//!
//! - array input of length N yields paths `run_0..run_{N-1}` in order
//! - object input yields one record per key, in key order
//! - every column is an output; only plain names are parameters
//! - CSV data rows map one-to-one onto records
