// Mirror path → upstream URL.
//
// Mirrors live at `<base>/<host>/<owner>/<repo>`, so the upstream is the
// same path with the base directory swapped for `https://`.

use std::path::Path;

const REMOTE_SCHEME: &str = "https://";

/// Remote URL for the mirror at `local_path`, or `None` when the path is not
/// strictly inside `base_dir` or is not valid UTF-8.
pub fn remote_url_for(base_dir: &Path, local_path: &Path) -> Option<String> {
    let relative = local_path.strip_prefix(base_dir).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        segments.push(component.as_os_str().to_str()?);
    }
    if segments.is_empty() {
        return None;
    }
    Some(format!("{REMOTE_SCHEME}{}", segments.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn replaces_base_dir_with_https() {
        let base = PathBuf::from("/var/cache/gitcache");
        let path = base.join("github.com/rust-lang/cargo");
        assert_eq!(
            remote_url_for(&base, &path).as_deref(),
            Some("https://github.com/rust-lang/cargo")
        );
    }

    #[test]
    fn keeps_dot_git_suffix() {
        let base = PathBuf::from("/cache");
        let path = PathBuf::from("/cache/gitlab.com/group/tool.git");
        assert_eq!(
            remote_url_for(&base, &path).as_deref(),
            Some("https://gitlab.com/group/tool.git")
        );
    }

    #[test]
    fn trailing_slash_on_base_is_irrelevant() {
        let base = PathBuf::from("/cache/");
        let path = PathBuf::from("/cache/host/a/b");
        assert_eq!(remote_url_for(&base, &path).as_deref(), Some("https://host/a/b"));
    }

    #[test]
    fn outside_base_dir_has_no_remote() {
        let base = PathBuf::from("/cache");
        assert!(remote_url_for(&base, Path::new("/elsewhere/host/a/b")).is_none());
        assert!(remote_url_for(&base, Path::new("/cache")).is_none());
    }
}
