//! Configuration constants and environment helpers

pub mod constants;

use std::env;

/// Read an environment variable and parse it, falling back to `default`
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read an optional parsed environment variable
pub fn env_opt<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("ISC_TEST_UNSET_VARIABLE_XYZ", 7usize), 7);
        env::set_var("ISC_TEST_GARBAGE_VARIABLE", "not-a-number");
        assert_eq!(env_or("ISC_TEST_GARBAGE_VARIABLE", 3u64), 3);
        env::set_var("ISC_TEST_NUMBER_VARIABLE", " 12 ");
        assert_eq!(env_opt::<u64>("ISC_TEST_NUMBER_VARIABLE"), Some(12));
    }
}
