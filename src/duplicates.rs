use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::HumanCount;
use log::info;
use serde::Serialize;

use crate::aggregator::FileMap;
use crate::hasher::FileRecord;
use crate::utils::format_size;

/// Groups with at least two members, largest reclaimable space first.
/// Member order inside a group is untouched: index 0 stays the original.
pub fn duplicate_groups(file_map: &FileMap) -> Vec<(&str, &[FileRecord])> {
    let mut groups: Vec<(&str, &[FileRecord])> = file_map
        .iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(digest, group)| (digest.as_str(), group.as_slice()))
        .collect();

    groups.sort_by_key(|(_, group)| Reverse(wasted_bytes(group)));
    groups
}

/// Bytes freed if every member but the first were removed.
pub fn wasted_bytes(group: &[FileRecord]) -> u64 {
    match group.first() {
        Some(first) => first.size * (group.len() as u64 - 1),
        None => 0,
    }
}

/// Totals over all duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateStats {
    pub groups: u64,
    pub redundant_files: u64,
    pub reclaimable_bytes: u64,
}

pub fn stats(file_map: &FileMap) -> DuplicateStats {
    let mut stats = DuplicateStats::default();
    for group in file_map.values().filter(|group| group.len() > 1) {
        stats.groups += 1;
        stats.redundant_files += group.len() as u64 - 1;
        stats.reclaimable_bytes += wasted_bytes(group);
    }
    stats
}

pub fn print_results(file_map: &FileMap) {
    let groups = duplicate_groups(file_map);
    if groups.is_empty() {
        println!("{}", "No duplicate files found!".green());
        return;
    }

    let totals = stats(file_map);
    println!(
        "Found {} duplicate files in {} groups wasting {}",
        HumanCount(totals.redundant_files).to_string().yellow(),
        HumanCount(totals.groups),
        format_size(totals.reclaimable_bytes).yellow(),
    );

    for (digest, group) in groups {
        println!();
        println!(
            "Duplicate files with hash {} ({} each):",
            digest.cyan(),
            format_size(group[0].size)
        );
        for record in group {
            println!("  {}", record.path.display());
        }
    }
}

#[derive(Serialize)]
struct ReportGroup<'a> {
    digest: &'a str,
    file_size: u64,
    reclaimable_bytes: u64,
    paths: Vec<&'a Path>,
}

/// Writes the duplicate groups as a JSON array, largest group first.
pub fn write_json_report(file_map: &FileMap, path: &Path) -> Result<()> {
    let report: Vec<ReportGroup> = duplicate_groups(file_map)
        .into_iter()
        .map(|(digest, group)| ReportGroup {
            digest,
            file_size: group[0].size,
            reclaimable_bytes: wasted_bytes(group),
            paths: group.iter().map(|record| record.path.as_path()).collect(),
        })
        .collect();

    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create report file: '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, &report)
        .with_context(|| format!("Failed to write report file: '{}'", path.display()))?;
    info!(
        "Wrote {} duplicate groups to {}",
        report.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn record(digest: &str, path: &str, size: u64) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            digest: digest.to_string(),
            size,
        }
    }

    fn sample_map() -> FileMap {
        let mut map: FileMap = HashMap::new();
        for rec in [
            record("aa", "/a1", 100),
            record("aa", "/a2", 100),
            record("aa", "/a3", 100),
            record("bb", "/b1", 5000),
            record("bb", "/b2", 5000),
            record("cc", "/lonely", 9),
        ] {
            map.entry(rec.digest.clone()).or_default().push(rec);
        }
        map
    }

    #[test]
    fn filters_singletons_and_sorts_by_reclaimable_space() {
        let map = sample_map();
        let groups = duplicate_groups(&map);

        assert_eq!(groups.len(), 2);
        // bb wastes 5000 bytes, aa wastes 200.
        assert_eq!(groups[0].0, "bb");
        assert_eq!(groups[1].0, "aa");
        assert!(groups.iter().all(|(digest, _)| *digest != "cc"));
    }

    #[test]
    fn group_members_keep_arrival_order() {
        let map = sample_map();
        let groups = duplicate_groups(&map);
        let (_, aa) = groups.iter().find(|(d, _)| *d == "aa").unwrap();
        let paths: Vec<_> = aa.iter().map(|r| r.path.to_string_lossy().into_owned()).collect();
        assert_eq!(paths, ["/a1", "/a2", "/a3"]);
    }

    #[test]
    fn wasted_bytes_counts_all_but_one_copy() {
        let group = [
            record("aa", "/a1", 100),
            record("aa", "/a2", 100),
            record("aa", "/a3", 100),
        ];
        assert_eq!(wasted_bytes(&group), 200);
        assert_eq!(wasted_bytes(&group[..1]), 0);
        assert_eq!(wasted_bytes(&[]), 0);
    }

    #[test]
    fn stats_totals_across_groups() {
        let totals = stats(&sample_map());
        assert_eq!(totals.groups, 2);
        assert_eq!(totals.redundant_files, 3);
        assert_eq!(totals.reclaimable_bytes, 5200);
    }

    #[test]
    fn json_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.json");
        write_json_report(&sample_map(), &out).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let groups = parsed.as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["digest"], "bb");
        assert_eq!(groups[0]["reclaimable_bytes"], 5000);
        assert_eq!(groups[1]["paths"].as_array().unwrap().len(), 3);
    }
}
