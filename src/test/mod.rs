//! Synthetic module images for tests.
