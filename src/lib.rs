pub mod collaborators;
pub use collaborators::*;

pub mod configuration;

pub mod controller;
pub use controller::*;

pub mod decoy;

pub mod error_handling;

pub mod identity;

pub mod orchestrator;

pub mod storage;
