//! Core map types: geographic primitives, viewport math and the owned map view

pub mod geo;
pub mod map;
pub mod viewport;
