// Bounded-depth directory walk that finds bare git mirrors.
//
// A directory is a mirror root when it holds a `HEAD` file and its name
// does not end in `logs` (git keeps `logs/HEAD` inside every repository).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

const HEAD_FILE: &str = "HEAD";
const LOGS_SUFFIX: &str = "logs";

/// Visit every mirror root under `base_dir`.
///
/// `base_dir` is depth 0; a directory deeper than `max_depth` is never
/// listed. Children are walked before their parent is checked, and a
/// directory that cannot be read is skipped.
pub fn walk<F>(base_dir: &Path, max_depth: usize, visit: &mut F)
where
    F: FnMut(&Path),
{
    walk_at(base_dir, 0, max_depth, visit);
}

fn walk_at<F>(dir: &Path, depth: usize, max_depth: usize, visit: &mut F)
where
    F: FnMut(&Path),
{
    if depth > max_depth {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(path = %dir.display(), %error, "skipping unreadable directory");
            return;
        }
    };

    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    subdirs.sort();

    for subdir in subdirs {
        walk_at(&subdir, depth + 1, max_depth, visit);
        if is_mirror_root(&subdir) {
            visit(&subdir);
        }
    }
}

/// Whether `dir` looks like a bare mirror root.
pub fn is_mirror_root(dir: &Path) -> bool {
    let name_ok = dir
        .file_name()
        .map(|name| !name.to_string_lossy().ends_with(LOGS_SUFFIX))
        .unwrap_or(false);
    name_ok && dir.join(HEAD_FILE).is_file()
}

/// Collect mirror roots in visit order.
pub fn discover(base_dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(base_dir, max_depth, &mut |path| found.push(path.to_path_buf()));
    found
}

/// Number of mirror roots under `base_dir`.
pub fn count(base_dir: &Path, max_depth: usize) -> u64 {
    let mut total = 0u64;
    walk(base_dir, max_depth, &mut |_| total += 1);
    total
}
