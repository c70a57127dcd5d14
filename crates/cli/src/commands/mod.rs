pub mod analyze;
pub mod config_cmd;
pub mod doctor;

use calmwire_core::error::Error;

/// Config crate errors surface as [`Error::Config`].
pub(crate) fn config_error(e: impl std::fmt::Display) -> Error {
    Error::Config {
        message: e.to_string(),
    }
}
