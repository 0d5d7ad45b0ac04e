use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::ScanConfig;

fn default_overrides(repo_root: &Path, exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(repo_root);

    // Note: for directories, include patterns for both the directory entry and its
    // descendants, otherwise walkers may still descend into the directory.
    for d in [
        ".git",
        ".vs",
        ".idea",
        "bin",
        "obj",
        "node_modules",
        "packages",
        "TestResults",
        "artifacts",
    ] {
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    // Generated designer and assembly-info files carry no call structure worth tracing.
    ob.add("!**/*.g.cs")?;
    ob.add("!**/*.Designer.cs")?;
    ob.add("!**/AssemblyInfo.cs")?;

    for d in exclude_dir_names {
        let d = d.trim().trim_matches('/');
        if d.is_empty() {
            continue;
        }
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    Ok(ob.build()?)
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub bytes: u64,
}

impl FileEntry {
    /// Document id: relative path with `/` separators.
    pub fn document_id(&self) -> String {
        self.rel_path.to_string_lossy().replace('\\', "/")
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub repo_root: PathBuf,
    pub target: PathBuf,
    pub max_file_bytes: u64,
    pub exclude_dir_names: Vec<String>,
    pub extensions: Vec<String>,
}

impl ScanOptions {
    pub fn new(repo_root: &Path, scan: &ScanConfig) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            target: PathBuf::from("."),
            max_file_bytes: scan.effective_max_file_bytes(),
            exclude_dir_names: scan.exclude_dir_names.clone(),
            extensions: scan.extensions.iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect(),
        }
    }

    pub fn target_root(&self) -> PathBuf {
        if self.target.is_absolute() {
            self.target.clone()
        } else {
            self.repo_root.join(&self.target)
        }
    }

    fn wants(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        self.extensions.iter().any(|e| *e == ext)
    }
}

pub fn scan_workspace(opts: &ScanOptions) -> Result<Vec<FileEntry>> {
    let target_root = opts.target_root();

    let meta = std::fs::metadata(&target_root)
        .with_context(|| format!("Target does not exist: {}", target_root.display()))?;

    if meta.is_file() {
        return scan_single_file(opts, &target_root);
    }

    let mut entries = Vec::new();
    let overrides = default_overrides(&opts.repo_root, &opts.exclude_dir_names)?;
    let walker = WalkBuilder::new(&target_root)
        .standard_filters(true) // .gitignore, .ignore, hidden, etc.
        .overrides(overrides)
        .build();

    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(_) => continue,
        };

        if !dent.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = dent.into_path();
        if !opts.wants(&abs_path) {
            continue;
        }

        let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
            Ok(b) => b,
            Err(_) => continue,
        };

        if bytes == 0 || bytes > opts.max_file_bytes {
            continue;
        }

        let rel_path = path_relative_to(&abs_path, &opts.repo_root)
            .with_context(|| format!("Failed to relativize path: {}", abs_path.display()))?;

        entries.push(FileEntry {
            abs_path,
            rel_path,
            bytes,
        });
    }

    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}

fn scan_single_file(opts: &ScanOptions, abs_path: &Path) -> Result<Vec<FileEntry>> {
    let ov = default_overrides(&opts.repo_root, &opts.exclude_dir_names)?;
    if ov.matched(abs_path, /* is_dir */ false).is_ignore() || !opts.wants(abs_path) {
        return Ok(vec![]);
    }

    let bytes = std::fs::metadata(abs_path)?.len();
    if bytes == 0 || bytes > opts.max_file_bytes {
        return Ok(vec![]);
    }

    let rel_path = path_relative_to(abs_path, &opts.repo_root)?;
    Ok(vec![FileEntry {
        abs_path: abs_path.to_path_buf(),
        rel_path,
        bytes,
    }])
}

fn path_relative_to(path: &Path, base: &Path) -> Result<PathBuf> {
    let rel = path
        .strip_prefix(base)
        .with_context(|| format!("{} is not under {}", path.display(), base.display()))?;
    Ok(rel.to_path_buf())
}

/// Read a source file, replacing invalid UTF-8 rather than failing.
pub fn read_file_lossy(abs_path: &Path) -> Result<String> {
    let bytes = std::fs::read(abs_path).with_context(|| format!("Failed to read {}", abs_path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, body).unwrap();
    }

    #[test]
    fn finds_sources_and_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/App/Program.cs", "class Program { }");
        write(root, "src/App/obj/Debug/Gen.cs", "class Gen { }");
        write(root, "src/App/bin/Release/Out.cs", "class Out { }");
        write(root, "src/App/Form.Designer.cs", "class Form { }");
        write(root, "src/App/Generated/Proto.cs", "class Proto { }");
        write(root, "src/App/readme.md", "# hi");
        write(root, "src/App/Empty.cs", "");
        write(root, "tests/App.Tests/ProgramTests.cs", "class ProgramTests { }");

        let scan = ScanConfig {
            exclude_dir_names: vec!["Generated".to_string()],
            ..ScanConfig::default()
        };
        let files = scan_workspace(&ScanOptions::new(root, &scan)).unwrap();
        let ids: Vec<String> = files.iter().map(FileEntry::document_id).collect();
        assert_eq!(ids, vec!["src/App/Program.cs", "tests/App.Tests/ProgramTests.cs"]);
    }

    #[test]
    fn oversized_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Big.cs", &"// x\n".repeat(100));
        let scan = ScanConfig {
            max_file_bytes: 10,
            ..ScanConfig::default()
        };
        assert!(scan_workspace(&ScanOptions::new(dir.path(), &scan)).unwrap().is_empty());
    }
}
