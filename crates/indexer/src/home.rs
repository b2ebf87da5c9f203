use std::path::{Path, PathBuf};

/// Directory holding everything ctxai persists for a project.
///
/// Defaults to `<project>/.ctxai`; `CTXAI_HOME` overrides it, which
/// tests use to keep stores out of the working tree.
pub fn ctxai_home(project_root: &Path) -> PathBuf {
    match std::env::var_os("CTXAI_HOME") {
        Some(home) => PathBuf::from(home),
        None => project_root.join(".ctxai"),
    }
}

/// Path of the project's configuration file
pub fn config_path(project_root: &Path) -> PathBuf {
    ctxai_home(project_root).join("config.json")
}

/// Store directory for a named index
pub fn index_dir(project_root: &Path, index_name: &str) -> PathBuf {
    ctxai_home(project_root)
        .join("indexes")
        .join(sanitize_index_name(index_name))
}

/// Remove a named index from disk
pub async fn delete_index(project_root: &Path, index_name: &str) -> std::io::Result<()> {
    let dir = index_dir(project_root, index_name);
    if dir.exists() {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}

/// Make an index name safe to use as a directory name
fn sanitize_index_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "default".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitizes_hostile_index_names() {
        assert_eq!(sanitize_index_name("my-index"), "my-index");
        assert_eq!(sanitize_index_name("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_index_name("über cool"), "-ber-cool");
        assert_eq!(sanitize_index_name(""), "default");
    }

    #[test]
    fn index_dir_lives_under_home() {
        let dir = index_dir(Path::new("/proj"), "main");
        assert!(dir.ends_with(".ctxai/indexes/main") || dir.ends_with("indexes/main"));
    }
}
