//! Error macros for attain

/// Macro for creating invalid value errors
#[macro_export]
macro_rules! bail_invalid {
    ($context:expr, $value:expr) => {
        return Err($crate::error::AttainError::invalid_value($context, $value))
    };
}

/// Macro for creating usage errors
#[macro_export]
macro_rules! bail_usage {
    ($msg:expr) => {
        return Err($crate::error::AttainError::UsageError($msg.to_string()))
    };
}

/// Macro for creating missing-input errors
#[macro_export]
macro_rules! bail_missing {
    ($what:expr, $location:expr) => {
        return Err($crate::error::AttainError::missing_input($what, $location))
    };
}

/// Macro for creating empty-data errors
#[macro_export]
macro_rules! bail_empty {
    ($what:expr, $location:expr) => {
        return Err($crate::error::AttainError::empty_data($what, $location))
    };
}
