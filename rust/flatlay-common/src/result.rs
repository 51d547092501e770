pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
/// from the enclosing function unless `$cond` holds.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        if !$cond {
            return ::core::result::Result::Err($crate::error::Error::invalid_arg(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}
