//! Contracts the core depends on but does not implement (§6, §9 "abstract
//! interface, not subclass ladder").

pub mod engine_adapter;
pub mod state_store;
