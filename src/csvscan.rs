//! Local CSV finder: walk a directory tree, list every `.csv` file, and
//! group byte-identical files by content checksum.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::{CsvFileInfo, CsvScanReport, format_size, system_time_iso};

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn name_matches(path: &Path, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.to_ascii_lowercase().contains(&filter.to_ascii_lowercase()))
}

pub(crate) fn scan_csv_files(
    root: &Path,
    name_filter: Option<&str>,
) -> Result<CsvScanReport, Box<dyn std::error::Error>> {
    let mut scanned = 0usize;
    let mut files = Vec::new();
    let mut by_checksum: HashMap<String, Vec<String>> = HashMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        scanned += 1;
        let path = entry.path();
        if !is_csv(path) || !name_matches(path, name_filter) {
            continue;
        }

        let bytes = fs::read(path)?;
        let checksum = blake3::hash(&bytes).to_hex().to_string();
        let modified = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().ok())
            .map(system_time_iso);

        let display_path = path.display().to_string();
        by_checksum
            .entry(checksum.clone())
            .or_default()
            .push(display_path.clone());
        files.push(CsvFileInfo {
            path: display_path,
            size_bytes: bytes.len() as u64,
            modified,
            checksum,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut duplicate_groups: Vec<Vec<String>> = by_checksum
        .into_values()
        .filter(|paths| paths.len() > 1)
        .map(|mut paths| {
            paths.sort();
            paths
        })
        .collect();
    duplicate_groups.sort();

    Ok(CsvScanReport {
        root: root.display().to_string(),
        scanned,
        files,
        duplicate_groups,
    })
}

pub(crate) fn print_csv_report(
    report: &CsvScanReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for file in &report.files {
        println!(
            "{:>10}  {}  {}",
            format_size(file.size_bytes),
            file.modified.as_deref().unwrap_or("-"),
            file.path
        );
    }
    println!(
        "{} CSV file(s) among {} files under {}",
        report.files.len(),
        report.scanned,
        report.root
    );
    for group in &report.duplicate_groups {
        println!("identical contents ({} files):", group.len());
        for path in group {
            println!("  {path}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_tree(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("bankctl_test")
            .join(format!("csv_{}_{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("sub")).unwrap();
        dir
    }

    #[test]
    fn test_scan_finds_nested_csv_only() {
        let root = temp_tree("nested");
        fs::write(root.join("grades.csv"), "id,score\n1,10\n").unwrap();
        fs::write(root.join("sub").join("roster.csv"), "id,name\n1,ann\n").unwrap();
        fs::write(root.join("notes.txt"), "not a csv").unwrap();

        let report = scan_csv_files(&root, None).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.scanned, 3);
        assert!(report.files.iter().any(|f| f.path.ends_with("grades.csv")));
        assert!(report.files.iter().any(|f| f.path.ends_with("roster.csv")));
        assert!(report.duplicate_groups.is_empty());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_scan_honors_name_filter() {
        let root = temp_tree("filter");
        fs::write(root.join("grades.csv"), "a\n").unwrap();
        fs::write(root.join("Roster.CSV"), "b\n").unwrap();

        let report = scan_csv_files(&root, Some("roster")).unwrap();
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].path.ends_with("Roster.CSV"));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_scan_groups_duplicates() {
        let root = temp_tree("dupes");
        fs::write(root.join("a.csv"), "id,x\n1,2\n").unwrap();
        fs::write(root.join("sub").join("copy.csv"), "id,x\n1,2\n").unwrap();
        fs::write(root.join("other.csv"), "different\n").unwrap();

        let report = scan_csv_files(&root, None).unwrap();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.duplicate_groups.len(), 1);
        assert_eq!(report.duplicate_groups[0].len(), 2);

        fs::remove_dir_all(&root).ok();
    }
}
