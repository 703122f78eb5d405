//! Store path helpers.
//!
//! Store paths are `/`-separated strings relative to the store root
//! [`ROOT`]. A child of the root named `n` has path `n`; a child of `p` has
//! path `p/n`. These are remote keys, not local filesystem paths.

/// Path of the store root.
pub const ROOT: &str = ".";

/// Path of the child `name` under `parent`.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT || parent.is_empty() {
        name.to_owned()
    } else {
        format!("{}/{name}", parent.trim_end_matches('/'))
    }
}

/// Parent of `path`; top-level entries (and the root itself) map to [`ROOT`].
pub fn parent(path: &str) -> String {
    let path = normalize(path);
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() && parent != ROOT => parent.to_owned(),
        _ => ROOT.to_owned(),
    }
}

/// Last segment of `path`, used as the display name.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// `true` if `path` equals `ancestor` or lies underneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return true;
    }
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Strip a leading `./` and trailing slashes; an empty path is the root.
pub fn normalize(path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path).trim_end_matches('/');
    if path.is_empty() {
        ROOT.to_owned()
    } else {
        path.to_owned()
    }
}
