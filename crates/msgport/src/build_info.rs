//! What the build script and cargo features recorded about this binary.

use serde::Serialize;

const UNRECORDED: &str = "unknown";

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub features: Vec<&'static str>,
}

impl BuildInfo {
    pub fn current() -> Self {
        let features = [
            ("port", cfg!(feature = "port")),
            ("async", cfg!(feature = "async")),
            ("cli", cfg!(feature = "cli")),
        ];
        Self {
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("MSGPORT_BUILD_TARGET").unwrap_or(UNRECORDED),
            profile: option_env!("MSGPORT_BUILD_PROFILE").unwrap_or(UNRECORDED),
            features: features
                .into_iter()
                .filter_map(|(name, enabled)| enabled.then_some(name))
                .collect(),
        }
    }
}
