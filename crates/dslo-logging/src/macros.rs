//! ---
//! dslo_section: "03-logging"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Context-aware logging macros."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
/// Shared body of the context macros. Not part of the public surface.
#[doc(hidden)]
#[macro_export]
macro_rules! __dslo_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            resource = ctx.resource.unwrap_or(""),
            service = ctx.service.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            transaction = ctx.transaction.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with lifecycle context.
#[macro_export]
macro_rules! dslo_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with lifecycle context.
#[macro_export]
macro_rules! dslo_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with lifecycle context.
#[macro_export]
macro_rules! dslo_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with lifecycle context.
#[macro_export]
macro_rules! dslo_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__dslo_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
