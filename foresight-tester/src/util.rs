use anyhow::{Context, Result};
use chrono::Utc;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Per-run directory below `--save-dir`, stamped so reruns never collide.
pub fn artifacts_dir(base: &Path, scenario: &str, seed: u64) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S");
    base.join(scenario).join(format!("seed-{seed}")).join(ts.to_string())
}

/// Write the saved snapshot and rendered report of a finished run.
pub fn write_session_artifacts(dir: &Path, snapshot_json: &str, report_markdown: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating artifacts dir {}", dir.display()))?;
    fs::write(dir.join("session.json"), snapshot_json).context("writing session snapshot")?;
    fs::write(dir.join("report.md"), report_markdown).context("writing foresight report")?;
    Ok(())
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn artifacts_dir_includes_key_segments() {
        let dir = artifacts_dir(Path::new("target/out"), "full-workflow", 42);
        let rendered = dir.to_string_lossy().replace('\\', "/");
        assert!(rendered.contains("target/out/full-workflow/seed-42/"));
    }

    #[test]
    fn session_artifacts_are_written() {
        let base = std::env::temp_dir().join(format!(
            "foresight-artifacts-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        write_session_artifacts(&base, "{}", "# Report").expect("write artifacts");
        assert!(base.join("session.json").exists());
        assert_eq!(
            fs::read_to_string(base.join("report.md")).unwrap(),
            "# Report"
        );
        let _ = fs::remove_dir_all(base);
    }
}
