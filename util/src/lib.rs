//! Utility library for the arm control software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod time;

// ---------------------------------------------------------------------------
// MACROS
// ---------------------------------------------------------------------------

/// Fire an unrecoverable error which will panic.
///
/// # Notes
/// = It is prefered to return a `Result<_,Error>` instead of raising an error
///   as this allows the application to potentially handle. Only programmer
///   errors (e.g. passing a vector of the wrong length) should be raised.
#[macro_export]
macro_rules! raise_error {
    () => ({
        log::error!("Explicit error raised.");
        std::panic!("Unrecoverable error");
    });
    ($fmt:expr) => ({
        log::error!("{}", $fmt);
        std::panic!("Unrecoverable error: {}", $fmt);
    });
    ($fmt:expr, $($arg:tt)*) => ({
        log::error!("{}", std::format_args!($fmt, $($arg)*));
        std::panic!("Unrecoverable error: {}", std::format_args!($fmt, $($arg)*));
    });
}

/// Raise an error if the length of a vector-like value doesn't match the
/// expected length.
///
/// The value must provide a `len()` method.
#[macro_export]
macro_rules! check_len {
    ($name:expr, $value:expr, $expected:expr) => {
        if $value.len() != $expected {
            $crate::raise_error!(
                "{} has length {}, expected {}",
                $name,
                $value.len(),
                $expected
            );
        }
    };
}

#[cfg(test)]
mod test {
    #[test]
    fn test_check_len_accepts_matching() {
        let v = vec![0.0; 3];
        check_len!("v", v, 3);
    }

    #[test]
    #[should_panic]
    fn test_check_len_raises_on_mismatch() {
        let v = vec![0.0; 2];
        check_len!("v", v, 3);
    }
}
