#![allow(unused_macros)]
///
/// **Note**: These macros (`w3c_debug!` and `w3c_warn!`) are intended to be used
/// **internally within w3ctrace crates** to report propagation problems that are
/// swallowed on purpose, such as a malformed `traceparent` sent by a peer. They
/// are not designed for general application logging.
///
/// With the `internal-logs` feature the events are emitted through `tracing`
/// with the crate name as target. Without it the macros compile to nothing.
///
/// When running tests with `--nocapture`, these macros print their output to
/// stdout, which helps to understand why a header was dropped.
///
/// Macro for logging debug messages.
///
/// # Fields:
/// - `name`: The operation or action being logged.
/// - Additional optional key-value pairs can be passed as attributes.
///
/// # Example:
/// ```rust
/// use w3ctrace::w3c_debug;
/// w3c_debug!(name: "Traceparent.Generated", trace_id = "0192a3b4c5d6e7f8a9b0c1d2e3f40516");
/// ```
#[macro_export]
macro_rules! w3c_debug {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }

        #[cfg(test)]
        {
            print!("w3c_debug: name={}\n", $name);
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = $name;
        }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name, $($key = %$value),+);
        }

        #[cfg(test)]
        {
            print!("w3c_debug: name={}", $name);
            $(
                print!(", {}={}", stringify!($key), $value);
            )+
            print!("\n");
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = ($name, $($value),+);
        }
    };
}

/// Macro for logging warning messages.
///
/// # Fields:
/// - `name`: The operation or action being logged.
/// - Additional optional key-value pairs can be passed as attributes.
///
/// # Example:
/// ```rust
/// use w3ctrace::w3c_warn;
/// w3c_warn!(name: "Context.AttachFailed", max_depth = 65535);
/// ```
#[macro_export]
macro_rules! w3c_warn {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::warn!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }

        #[cfg(test)]
        {
            print!("w3c_warn: name={}\n", $name);
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = $name;
        }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::warn!(name: $name,
                            target: env!("CARGO_PKG_NAME"),
                            name = $name,
                            $($key = %$value),+,
                    )
        }

        #[cfg(test)]
        {
            print!("w3c_warn: name={}", $name);
            $(
                print!(", {}={}", stringify!($key), $value);
            )+
            print!("\n");
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = ($name, $($value),+);
        }
    };
}
