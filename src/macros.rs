//! Macros for user-facing console output
//!
//! Diagnostics go through `tracing`; these macros are for the messages a
//! person at the terminal is supposed to read.

/// Print to stdout with a line ending
///
/// This unified macro supports multiple message types:
/// - uprintln!("message")                    - Regular message
/// - uprintln!(info: "message")              - Info message
/// - uprintln!(warn: "message")              - Warning message
/// - uprintln!(error: "message")             - Error message (stderr)
#[macro_export]
macro_rules! uprintln {
    // Empty case
    () => {
        println!()
    };

    (info: $($arg:tt)*) => {{
        println!("{}ℹ️ Info:{} {}",
                 $crate::constants::FORMAT_BOLD,
                 $crate::constants::FORMAT_RESET,
                 format!($($arg)*));
    }};

    (warn: $($arg:tt)*) => {{
        println!("{}⚠️ Warning:{} {}",
                 $crate::constants::FORMAT_YELLOW,
                 $crate::constants::FORMAT_RESET,
                 format!($($arg)*));
    }};

    (error: $($arg:tt)*) => {{
        eprintln!("{}❌ Error:{} {}",
                  $crate::constants::FORMAT_RED,
                  $crate::constants::FORMAT_RESET,
                  format!($($arg)*));
    }};

    // Default case (regular message)
    ($($arg:tt)*) => {{
        println!($($arg)*);
    }};
}
