//! Browsable source locations for jobs.

use std::path::{Component, Path, PathBuf};

use skein_config::LocationSection;

use crate::task::SourceLocation;

/// Render where a task is defined.
///
/// With a repository configured this is a link into the repository browser,
/// `<repository_url>/blob/<revision>/<path>#L<line>`; otherwise the local
/// path prefixed with `file://`.
pub fn resolve_location(location: &SourceLocation, repository: Option<&LocationSection>) -> String {
    let anchor = location
        .line
        .map(|line| format!("#L{line}"))
        .unwrap_or_default();

    match repository {
        Some(repo) => {
            let path = repository_path(&location.file, repo.root.as_deref());
            format!(
                "{}/blob/{}/{}{}",
                repo.repository_url.trim_end_matches('/'),
                repo.revision,
                path,
                anchor
            )
        }
        None => format!("file://{}{}", location.file.to_string_lossy(), anchor),
    }
}

/// Path of `file` inside the repository, `/`-separated and without a leading
/// slash.
fn repository_path(file: &Path, root: Option<&Path>) -> String {
    let relative: PathBuf = match root.and_then(|root| file.strip_prefix(root).ok()) {
        Some(stripped) => stripped.to_path_buf(),
        None => file.to_path_buf(),
    };
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
