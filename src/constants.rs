// src/constants.rs

/// The name of the progen directory inside the user's config directory.
pub const PROGEN_DIR: &str = "progen";

/// Subdirectory holding one JSON file per profile.
pub const PROFILES_DIR: &str = "profiles";

/// Subdirectory holding one JSON file per project.
pub const PROJECTS_DIR: &str = "projects";

/// Flat catalog of known groups/users for ACL identity pickers.
pub const PRINCIPALS_FILENAME: &str = "principals.json";

/// Root naming formula used when a profile does not define one.
pub const DEFAULT_ROOT_FORMULA: &str = "{ProjectCode}_{ProjectShortName}";
