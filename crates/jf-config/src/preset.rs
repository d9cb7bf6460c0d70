//! Built-in project presets.
//!
//! Projects whose fix-linkage data supports real label latency. In `auto`
//! verification mode these run in real-latency mode, all others in simple mode.

/// Projects with usable fix linkage for real-latency verification.
pub const REAL_LATENCY_PROJECTS: &[&str] = &[
    "ant-ivy",
    "commons-bcel",
    "commons-beanutils",
    "commons-codec",
    "commons-collections",
    "commons-compress",
    "commons-configuration",
    "commons-digester",
    "commons-jcs",
    "commons-lang",
    "commons-math",
    "commons-net",
    "commons-scxml",
    "commons-validator",
    "commons-vfs",
    "gora",
    "parquet-mr",
];

/// Whether `project` is in the built-in real-latency list.
pub fn is_real_latency_project(project: &str) -> bool {
    REAL_LATENCY_PROJECTS.contains(&project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_membership() {
        assert!(is_real_latency_project("gora"));
        assert!(is_real_latency_project("parquet-mr"));
        assert!(!is_real_latency_project("Gora"));
        assert!(!is_real_latency_project(""));
    }

    #[test]
    fn preset_has_no_duplicates() {
        let mut sorted = REAL_LATENCY_PROJECTS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), REAL_LATENCY_PROJECTS.len());
    }
}
