/// Build metadata for the ModelRunner package: prefer compile-time
/// constants pulled from Cargo over anything computed at runtime.
pub struct ModelRunnerPackage;

impl ModelRunnerPackage {
    /// Semantic version, taken from `Cargo.toml` via `CARGO_PKG_VERSION`.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!ModelRunnerPackage::VERSION.is_empty());
    }
}
