//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonify_core::domain::DomainError;
use jsonify_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const INVALID_STATE: i32 = 4002;
    pub const CAPABILITY_UNAVAILABLE: i32 = 4003;
    pub const NO_RESULT: i32 = 4004;
    pub const EXPORT_FAILED: i32 = 4005;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// JSON-RPC error code for an application error
pub fn error_code(err: &AppError) -> i32 {
    match err {
        AppError::Validation(_) | AppError::Serialization(_) => code::VALIDATION_ERROR,
        AppError::Domain(DomainError::InvalidState { .. }) => code::INVALID_STATE,
        AppError::Domain(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::CapabilityUnavailable(_) => code::CAPABILITY_UNAVAILABLE,
        AppError::NoResult(_) => code::NO_RESULT,
        AppError::Export(_) => code::EXPORT_FAILED,
        AppError::Database(_) => code::DB_ERROR,
        AppError::Engine(_) | AppError::Io(_) => code::SYSTEM_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    }
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(error_code(&err), err.to_string(), None::<()>)
}

/// Same as [`to_rpc_error`], attaching structured data for the caller
pub fn to_rpc_error_with<D: serde::Serialize>(err: AppError, data: D) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(error_code(&err), err.to_string(), Some(data))
}
