use helpdesk_core::paths::HELPDESK_DIR;
use std::path::{Path, PathBuf};

/// Resolve the helpdesk workspace root.
///
/// Priority:
/// 1. `--root` flag / `HELPDESK_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` containing `.helpdesk/`
/// 3. Nearest ancestor of `cwd` containing `.git/`
/// 4. `cwd` itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(cwd: &Path) -> PathBuf {
    find_upward(cwd, HELPDESK_DIR)
        .or_else(|| find_upward(cwd, ".git"))
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
