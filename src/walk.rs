use std::fs;
use std::path::{Path, PathBuf};

/// Visit `root` and its descendants down to `max_depth` levels, parents first.
///
/// `children` is asked for the children of every node above the depth limit;
/// `action` receives each node with its depth (root is 0).
pub fn walk_subtree<N, C, I, A>(root: N, max_depth: usize, mut children: C, mut action: A)
where
    C: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
    A: FnMut(&N, usize),
{
    let mut stack = vec![(root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        action(&node, depth);
        if depth < max_depth {
            let mut kids: Vec<N> = children(&node).into_iter().collect();
            kids.reverse();
            stack.extend(kids.into_iter().map(|kid| (kid, depth + 1)));
        }
    }
}

/// Directory entries of `path`, sorted by name. Symbolic links are followed
/// when `follow_links` is set; otherwise linked directories are leaves.
pub fn dir_children(path: &Path, follow_links: bool) -> Vec<PathBuf> {
    let is_dir = if follow_links {
        path.is_dir()
    } else {
        fs::symlink_metadata(path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    };
    if !is_dir {
        return Vec::new();
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(path)
        .map(|read| read.flatten().map(|entry| entry.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}
