use std::sync::atomic::AtomicBool;
#[doc(hidden)]
pub static TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

/// Turns on packet and shutdown tracing for the rest of the process.
pub fn enable_tracing() {
    TRACE_ENABLED.store(true, std::sync::atomic::Ordering::Relaxed);
}

pub fn tracing_enabled() -> bool {
    TRACE_ENABLED.load(std::sync::atomic::Ordering::Relaxed)
}

#[macro_export]
macro_rules! trace_packet {
    ($($arg:tt)*) => {{
        if $crate::logging::tracing_enabled() {
            $crate::display::log(
                $crate::display::LogLevel::Trace,
                std::module_path!(),
                &std::format!($($arg)*),
            );
        }
    }};
}

#[macro_export]
macro_rules! trace_shutdown {
    ($arg:literal) => {{
        if $crate::logging::tracing_enabled() {
            $crate::display::log(
                $crate::display::LogLevel::Trace,
                std::module_path!(),
                &std::format!("[SHUTDOWN] {}", $arg),
            );
        }
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        $crate::display::log(
            $crate::display::LogLevel::Info,
            std::module_path!(),
            &std::format!($($arg)*),
        );
    }};
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {{
        $crate::display::log(
            $crate::display::LogLevel::Warning,
            std::module_path!(),
            &std::format!($($arg)*),
        );
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::display::log(
            $crate::display::LogLevel::Error,
            std::module_path!(),
            &std::format!($($arg)*),
        );
    }};
}
