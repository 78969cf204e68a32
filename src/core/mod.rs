// src/core/mod.rs

pub mod acl_engine;
pub mod conditions;
pub mod generator;
pub mod naming;
pub mod paths;
pub mod planner;
pub mod tree_display;
