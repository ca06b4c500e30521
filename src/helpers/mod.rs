pub mod datetime;
pub mod json;
pub mod units;

use std::path::PathBuf;

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::warn!("Unable to expand {}: {}", path, e);
            PathBuf::from(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(
            expand_path("~/.eth-deposit/keystore"),
            PathBuf::from(home).join(".eth-deposit/keystore")
        );
        assert_eq!(expand_path("/tmp/keys"), PathBuf::from("/tmp/keys"));
    }
}
