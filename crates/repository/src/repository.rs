use std::fs;
use std::path::{Path, PathBuf};

use repo_read_protocol::{
    DirEntries, DirTreeOutput, FileChunk, ReadDirsOutput, ReadFilesOutput,
};

use crate::paths::safe_join;

/// Upper bound on entries returned by a tree walk, root entry included.
pub const MAX_TREE_ENTRIES: usize = 100;

/// Read-only view of one repository checkout.
///
/// Every operation resolves caller paths through [`safe_join`] and reports
/// per-item failures inside the returned envelope.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read whole files. Successful entries span line 1 through the file's
    /// last line; failed entries carry the reason in-band.
    pub fn read_files(&self, file_paths: &[String]) -> ReadFilesOutput {
        let files = file_paths
            .iter()
            .map(|file_path| self.read_whole_file(file_path))
            .collect();
        ReadFilesOutput { files, error: None }
    }

    fn read_whole_file(&self, file_path: &str) -> FileChunk {
        let abs_path = match safe_join(&self.root, file_path) {
            Ok(path) => path,
            Err(err) => return FileChunk::failed(file_path, err.to_string()),
        };
        match fs::read(&abs_path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                FileChunk {
                    file_path: file_path.to_string(),
                    start_line: 1,
                    end_line: content.lines().count(),
                    content,
                    error: None,
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                FileChunk::failed(file_path, format!("File not found: {file_path}"))
            }
            Err(err) => FileChunk::failed(file_path, format!("Error reading file: {err}")),
        }
    }

    /// Read a 1-based, inclusive line range. The requested range is clamped
    /// into the file's bounds rather than rejected.
    pub fn read_file_lines(
        &self,
        file_path: &str,
        start_line: usize,
        end_line: usize,
    ) -> FileChunk {
        let abs_path = match safe_join(&self.root, file_path) {
            Ok(path) => path,
            Err(err) => return FileChunk::failed(file_path, err.to_string()),
        };
        let bytes = match fs::read(&abs_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return FileChunk::failed(file_path, format!("File not found: {file_path}"));
            }
            Err(err) => {
                return FileChunk::failed(file_path, format!("Error reading file: {err}"));
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = content.lines().collect();

        let start = start_line.min(lines.len()).max(1);
        let end = end_line.min(lines.len()).max(start);
        let slice_end = end.min(lines.len());
        let slice_start = (start - 1).min(slice_end);

        FileChunk {
            file_path: file_path.to_string(),
            start_line: start,
            end_line: end,
            content: lines[slice_start..slice_end].join("\n"),
            error: None,
        }
    }

    /// Non-recursive listing of each requested directory, entries sorted by
    /// name for stable output.
    pub fn read_dirs(&self, dir_paths: &[String]) -> ReadDirsOutput {
        let dirs = dir_paths
            .iter()
            .map(|dir_path| self.read_single_dir(dir_path))
            .collect();
        ReadDirsOutput { dirs, error: None }
    }

    fn read_single_dir(&self, dir_path: &str) -> DirEntries {
        let listing = safe_join(&self.root, dir_path)
            .map_err(|err| err.to_string())
            .and_then(|abs_path| {
                fs::read_dir(&abs_path).map_err(|err| format!("Error reading directory: {err}"))
            });
        match listing {
            Ok(read_dir) => {
                let mut entries: Vec<String> = read_dir
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect();
                entries.sort();
                DirEntries {
                    dir_path: dir_path.to_string(),
                    entries,
                    error: None,
                }
            }
            Err(error) => DirEntries {
                dir_path: dir_path.to_string(),
                entries: Vec::new(),
                error: Some(error),
            },
        }
    }

    /// Depth-limited walk below `dir_path`. At most [`MAX_TREE_ENTRIES`]
    /// paths are returned, the requested directory itself included.
    /// Directories that vanish mid-walk are skipped silently.
    pub fn tree_dir(&self, dir_path: &str, depth: usize) -> DirTreeOutput {
        let root_path = match safe_join(&self.root, dir_path) {
            Ok(path) => path,
            Err(err) => {
                return DirTreeOutput {
                    dir_path: dir_path.to_string(),
                    tree: Vec::new(),
                    error: Some(err.to_string()),
                };
            }
        };
        if !root_path.is_dir() {
            return DirTreeOutput {
                dir_path: dir_path.to_string(),
                tree: Vec::new(),
                error: Some(format!("Directory not found at '{dir_path}'")),
            };
        }

        let mut tree = vec![dir_path.to_string()];
        walk_tree(&root_path, dir_path, 1, depth, &mut tree);
        tree.truncate(MAX_TREE_ENTRIES);

        DirTreeOutput {
            dir_path: dir_path.to_string(),
            tree,
            error: None,
        }
    }
}

fn walk_tree(
    current: &Path,
    display_prefix: &str,
    current_depth: usize,
    max_depth: usize,
    out: &mut Vec<String>,
) {
    if out.len() >= MAX_TREE_ENTRIES || current_depth > max_depth {
        return;
    }
    // A directory deleted between listing and descent is not an error.
    let Ok(read_dir) = fs::read_dir(current) else {
        return;
    };
    let mut entries: Vec<_> = read_dir.filter_map(|entry| entry.ok()).collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        if out.len() >= MAX_TREE_ENTRIES {
            return;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let display = join_display(display_prefix, &name);
        out.push(display.clone());
        if entry.path().is_dir() {
            walk_tree(&entry.path(), &display, current_depth + 1, max_depth, out);
        }
    }
}

fn join_display(prefix: &str, name: &str) -> String {
    if prefix.is_empty() || prefix == "." {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("README.md"), "hello\nworld\n").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {\n    run();\n}\n").unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), "pub fn noop() {}\n").unwrap();
        dir
    }

    #[test]
    fn read_files_returns_content_and_line_span() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let output = repo.read_files(&["README.md".to_string()]);
        assert_eq!(output.files.len(), 1);
        let chunk = &output.files[0];
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 2);
        assert_eq!(chunk.content, "hello\nworld\n");
        assert!(chunk.error.is_none());
    }

    #[test]
    fn read_files_reports_missing_and_escaping_paths_in_band() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let output = repo.read_files(&["nope.txt".to_string(), "../escape".to_string()]);
        assert_eq!(output.files.len(), 2);
        assert_eq!(output.files[0].start_line, 0);
        assert!(output.files[0]
            .error
            .as_deref()
            .unwrap()
            .contains("File not found"));
        assert!(output.files[1]
            .error
            .as_deref()
            .unwrap()
            .contains("escapes the repository root"));
    }

    #[test]
    fn read_file_lines_clamps_range_into_bounds() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let chunk = repo.read_file_lines("src/main.rs", 2, 99);
        assert_eq!(chunk.start_line, 2);
        assert_eq!(chunk.end_line, 3);
        assert_eq!(chunk.content, "    run();\n}");

        // Degenerate requests collapse onto the nearest valid line.
        let chunk = repo.read_file_lines("src/main.rs", 0, 0);
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 1);
        assert_eq!(chunk.content, "fn main() {");
    }

    #[test]
    fn read_file_lines_handles_empty_files() {
        let dir = sample_repo();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        let repo = Repository::new(dir.path());

        let chunk = repo.read_file_lines("empty.txt", 1, 10);
        assert_eq!(chunk.start_line, 1);
        assert_eq!(chunk.end_line, 1);
        assert_eq!(chunk.content, "");
        assert!(chunk.error.is_none());
    }

    #[test]
    fn read_dirs_lists_entries_sorted() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let output = repo.read_dirs(&["src".to_string(), "missing".to_string()]);
        assert_eq!(output.dirs.len(), 2);
        assert_eq!(output.dirs[0].entries, vec!["main.rs", "nested"]);
        assert!(output.dirs[1].error.is_some());
        assert!(output.dirs[1].entries.is_empty());
    }

    #[test]
    fn tree_dir_walks_to_requested_depth() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let shallow = repo.tree_dir("src", 1);
        assert_eq!(shallow.tree, vec!["src", "src/main.rs", "src/nested"]);

        let deep = repo.tree_dir("src", 2);
        assert_eq!(
            deep.tree,
            vec!["src", "src/main.rs", "src/nested", "src/nested/mod.rs"]
        );
    }

    #[test]
    fn tree_dir_reports_missing_directory() {
        let dir = sample_repo();
        let repo = Repository::new(dir.path());

        let output = repo.tree_dir("not-here", 1);
        assert!(output.tree.is_empty());
        assert!(output
            .error
            .as_deref()
            .unwrap()
            .contains("Directory not found"));
    }

    #[test]
    fn tree_dir_caps_total_entries() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..150 {
            fs::write(dir.path().join(format!("file-{i:03}.txt")), "x").unwrap();
        }
        let repo = Repository::new(dir.path());

        let output = repo.tree_dir(".", 1);
        assert_eq!(output.tree.len(), MAX_TREE_ENTRIES);
        assert_eq!(output.tree[0], ".");
    }
}
