// Security module for path validation and access control
//
// Every file a tool reads or writes goes through this module so that
// operations stay inside the configured root directory.

pub mod path_validator;

pub use path_validator::{PathSecurityError, validate_output_path, validate_path};
