pub mod apply;
pub mod preview;
pub mod profiles;
pub mod projects;
