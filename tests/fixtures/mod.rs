// Shared builders for integration tests; not every test file uses every helper
#![allow(dead_code)]

pub mod sample_graphs;
