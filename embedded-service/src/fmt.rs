//! Logging facade
//!
//! The macros forward to `defmt` when the `defmt` feature is enabled, otherwise to `log` when the
//! `log` feature is enabled. With neither feature the arguments are still borrowed so call sites
//! do not produce unused-variable warnings, but nothing is emitted.
//!
//! Crates using these macros must depend on `defmt` themselves when they enable the `defmt`
//! feature, as the `defmt` proc macros resolve their support paths from the calling crate.

#[cfg(feature = "defmt")]
#[doc(hidden)]
#[macro_export]
macro_rules! __log_dispatch {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        $crate::_defmt::$level!($s $(, $x)*)
    };
}

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[doc(hidden)]
#[macro_export]
macro_rules! __log_dispatch {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        $crate::_log::$level!($s $(, $x)*)
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[doc(hidden)]
#[macro_export]
macro_rules! __log_dispatch {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($(&$x),*);
    }};
}

/// Log at trace level
#[macro_export]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log_dispatch!(trace, $s $(, $x)*)
    };
}

/// Log at debug level
#[macro_export]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log_dispatch!(debug, $s $(, $x)*)
    };
}

/// Log at info level
#[macro_export]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log_dispatch!(info, $s $(, $x)*)
    };
}

/// Log at warn level
#[macro_export]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log_dispatch!(warn, $s $(, $x)*)
    };
}

/// Log at error level
#[macro_export]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log_dispatch!(error, $s $(, $x)*)
    };
}
