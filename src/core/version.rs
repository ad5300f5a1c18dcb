//! Build metadata accessors.
//! Includes the version.rs generated by the build script so there is a
//! single source of truth for build time, git hash and rule format.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Crate version as published
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Highest rule source `format` this build accepts.
/// Falls back to 1 if the generated value cannot be parsed.
pub fn rule_format_version() -> u32 {
    RULE_FORMAT_VERSION.parse().unwrap_or(1)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}
