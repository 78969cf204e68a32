// src/system/mod.rs

pub mod acl;
pub mod fs;
pub mod principals;
pub mod store;
