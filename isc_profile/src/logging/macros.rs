//! Code-tagged logging macros
//!
//! Every macro takes a message and optional `"key" => value` pairs whose
//! values only need `Display`.

/// Render `key => value` pairs and hand them to a logging function
#[doc(hidden)]
#[macro_export]
macro_rules! __isc_log {
    ($emit:expr $(, $key:expr => $value:expr)*) => {{
        let rendered: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),*];
        let context: Vec<(&str, &str)> = rendered.iter().map(|(k, v)| (*k, v.as_str())).collect();
        ($emit)(context)
    }};
}

/// Error with a diagnostic code
#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)*) => {
        $crate::__isc_log!(
            |context| $crate::logging::log_error_with_context($code, $message, context)
            $(, $key => $value)*
        )
    };
}

/// Milestone reached, tagged with a success code
#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)*) => {
        $crate::__isc_log!(
            |context| $crate::logging::log_success_with_context($code, $message, context)
            $(, $key => $value)*
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($message:expr $(, $key:expr => $value:expr)*) => {
        $crate::__isc_log!(
            |context| $crate::logging::log_with_context($crate::logging::LogLevel::Info, $message, context)
            $(, $key => $value)*
        )
    };
}

#[macro_export]
macro_rules! log_warning {
    ($message:expr $(, $key:expr => $value:expr)*) => {
        $crate::__isc_log!(
            |context| $crate::logging::log_with_context($crate::logging::LogLevel::Warning, $message, context)
            $(, $key => $value)*
        )
    };
}

#[macro_export]
macro_rules! log_debug {
    ($message:expr $(, $key:expr => $value:expr)*) => {
        $crate::__isc_log!(
            |context| $crate::logging::log_with_context($crate::logging::LogLevel::Debug, $message, context)
            $(, $key => $value)*
        )
    };
}
