// Extra timer logging
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

// EXPRESSION LOWERING LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_lowering")]
macro_rules! lowering_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_lowering"))]
macro_rules! lowering_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// CLEANUP STACK LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_cleanups")]
macro_rules! cleanup_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_cleanups"))]
macro_rules! cleanup_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
