use std::path::PathBuf;

use super::types::{EmptyState, Source};

pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";
pub const OPENCODE_DATA_DIR_ENV: &str = "OPENCODE_DATA_DIR";

/// Check whether any usable local data exists for `source`.
///
/// Best-effort and advisory: existence of a candidate path only means a load
/// is worth attempting, not that it will find anything.
pub fn detect(source: Source) -> EmptyState {
    let candidates = match source {
        Source::Claude => claude_candidate_paths(),
        Source::Opencode => opencode_candidate_paths(),
    };
    evaluate(source, candidates)
}

fn evaluate(source: Source, candidates: Vec<PathBuf>) -> EmptyState {
    if candidates.iter().any(|p| p.exists()) {
        return EmptyState::default();
    }

    EmptyState {
        is_empty: true,
        missing_paths: candidates
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        checklist: checklist(source),
    }
}

fn checklist(source: Source) -> Vec<String> {
    let agent_name = match source {
        Source::Claude => "Claude Code",
        Source::Opencode => "OpenCode",
    };
    vec![
        "Install ccusage (or run it via bunx/npx).".to_string(),
        format!("Run {} to generate local usage data.", agent_name),
        "Verify the data directories exist (see missing paths).".to_string(),
        "Pricing cache missing; costs may show as zero while offline.".to_string(),
    ]
}

/// Candidate paths that exist iff Claude Code has ever produced data.
///
/// `CLAUDE_CONFIG_DIR` may hold a comma-separated list of config dirs; each
/// is checked alongside its `projects` subdirectory. Without the override,
/// the two conventional locations are checked.
pub fn claude_candidate_paths() -> Vec<PathBuf> {
    claude_candidates_from(
        std::env::var(CLAUDE_CONFIG_DIR_ENV).ok().as_deref(),
        dirs::home_dir(),
    )
}

fn claude_candidates_from(config_dir: Option<&str>, home: Option<PathBuf>) -> Vec<PathBuf> {
    if let Some(listing) = config_dir {
        let mut candidates = Vec::new();
        for raw in listing.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let dir = PathBuf::from(shellexpand::tilde(raw).into_owned());
            let already_projects = dir.ends_with("projects");
            if !already_projects {
                candidates.push(dir.join("projects"));
            }
            candidates.push(dir);
        }
        return candidates;
    }

    match home {
        Some(home) => vec![
            home.join(".config/claude/projects"),
            home.join(".claude/projects"),
        ],
        None => Vec::new(),
    }
}

/// Directories the scanner walks for `*.jsonl` transcripts: the `projects`
/// subdirectory of every configured Claude config dir.
pub fn claude_project_dirs() -> Vec<PathBuf> {
    claude_candidate_paths()
        .into_iter()
        .filter(|p| p.ends_with("projects"))
        .collect()
}

/// The opencode storage directory, under `OPENCODE_DATA_DIR` or the XDG
/// default data location.
pub fn opencode_candidate_paths() -> Vec<PathBuf> {
    opencode_candidates_from(
        std::env::var(OPENCODE_DATA_DIR_ENV).ok().as_deref(),
        dirs::home_dir(),
    )
}

fn opencode_candidates_from(data_dir: Option<&str>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let base = match data_dir {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw.trim()).into_owned()),
        None => match home {
            Some(home) => home.join(".local/share/opencode"),
            None => return Vec::new(),
        },
    };
    vec![base.join("storage")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_defaults_without_override() {
        let home = PathBuf::from("/home/dev");
        let candidates = claude_candidates_from(None, Some(home));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/home/dev/.config/claude/projects"),
                PathBuf::from("/home/dev/.claude/projects"),
            ]
        );
    }

    #[test]
    fn test_claude_override_pairs_each_dir_with_projects() {
        let candidates =
            claude_candidates_from(Some("/a/claude, /b/claude/projects"), None);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/a/claude/projects"),
                PathBuf::from("/a/claude"),
                PathBuf::from("/b/claude/projects"),
            ]
        );
    }

    #[test]
    fn test_opencode_override_checks_storage_subdir() {
        let candidates = opencode_candidates_from(Some("/data/oc"), None);
        assert_eq!(candidates, vec![PathBuf::from("/data/oc/storage")]);

        let home = PathBuf::from("/home/dev");
        let defaults = opencode_candidates_from(None, Some(home));
        assert_eq!(
            defaults,
            vec![PathBuf::from("/home/dev/.local/share/opencode/storage")]
        );
    }

    #[test]
    fn test_evaluate_existing_path_is_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = evaluate(Source::Claude, vec![dir.path().to_path_buf()]);
        assert!(!state.is_empty);
        assert!(state.missing_paths.is_empty());
        assert!(state.checklist.is_empty());
    }

    #[test]
    fn test_evaluate_missing_paths_reports_all_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let ghost_a = dir.path().join("nope-a");
        let ghost_b = dir.path().join("nope-b");
        let state = evaluate(Source::Opencode, vec![ghost_a.clone(), ghost_b.clone()]);
        assert!(state.is_empty);
        assert_eq!(state.missing_paths.len(), 2);
        assert!(state.missing_paths[0].ends_with("nope-a"));
        assert!(!state.checklist.is_empty());
        assert!(state.checklist[1].contains("OpenCode"));
    }
}
