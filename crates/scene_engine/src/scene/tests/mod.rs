//! Cross-module tests: scatter subtrees compiled under stencil state

mod stencil_scatter_integration;
