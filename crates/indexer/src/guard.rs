use crate::config::IndexingConfig;
use crate::scanner::ScannedFile;
use serde::{Deserialize, Serialize};

/// Fraction of a limit at which the guard starts warning
const WARN_RATIO: f64 = 0.8;

/// How many of the largest files to report back to the user
const TOP_FILES: usize = 5;

/// Measured size of a project before indexing starts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectStats {
    /// Every file that survived filtering, oversized ones included
    pub total_files: usize,
    pub total_size_bytes: u64,
    /// Files over the per-file limit; skipped, never indexed
    pub oversized: Vec<(String, u64)>,
    /// Largest files, descending, for the size report
    pub largest: Vec<(String, u64)>,
}

impl ProjectStats {
    /// Measure the complete scanned file set
    pub fn collect(files: &[ScannedFile], max_file_size_bytes: u64) -> Self {
        let mut stats = Self {
            total_files: files.len(),
            ..Default::default()
        };

        let mut sized: Vec<(String, u64)> = Vec::with_capacity(files.len());
        for file in files {
            stats.total_size_bytes += file.size;
            sized.push((file.rel_path.clone(), file.size));
            if file.size > max_file_size_bytes {
                stats.oversized.push((file.rel_path.clone(), file.size));
            }
        }

        sized.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sized.truncate(TOP_FILES);
        stats.largest = sized;
        stats
    }
}

/// Guard verdict over a project's stats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeCheck {
    Ok,
    /// Close to a limit; indexing proceeds
    Warn(Vec<String>),
    /// Over a limit; indexing must not start
    Reject(Vec<String>),
}

impl SizeCheck {
    pub const fn is_reject(&self) -> bool {
        matches!(self, Self::Reject(_))
    }
}

/// Checks project stats against the configured limits.
///
/// A metric at its limit still passes; one strictly above it rejects.
/// Oversized individual files never reject, they are skipped instead.
pub struct SizeGuard<'a> {
    config: &'a IndexingConfig,
}

impl<'a> SizeGuard<'a> {
    pub fn new(config: &'a IndexingConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, stats: &ProjectStats) -> SizeCheck {
        let mut rejections = Vec::new();
        let mut warnings = Vec::new();

        let max_files = self.config.max_files;
        if stats.total_files > max_files {
            rejections.push(format!(
                "project has {} files, over the limit of {max_files}; \
                 narrow --include patterns or raise max_files in .ctxai/config.json",
                stats.total_files
            ));
        } else if stats.total_files as f64 >= max_files as f64 * WARN_RATIO {
            warnings.push(format!(
                "project has {} files, approaching the limit of {max_files}",
                stats.total_files
            ));
        }

        let max_total = self.config.max_total_size_bytes();
        if stats.total_size_bytes > max_total {
            rejections.push(format!(
                "project totals {:.1} MB, over the limit of {} MB; \
                 narrow --include patterns or raise max_total_size_mb in .ctxai/config.json",
                mb(stats.total_size_bytes),
                self.config.max_total_size_mb
            ));
        } else if stats.total_size_bytes as f64 >= max_total as f64 * WARN_RATIO {
            warnings.push(format!(
                "project totals {:.1} MB, approaching the limit of {} MB",
                mb(stats.total_size_bytes),
                self.config.max_total_size_mb
            ));
        }

        for (path, size) in &stats.oversized {
            warnings.push(format!(
                "skipping {path} ({:.1} MB, over the {} MB per-file limit)",
                mb(*size),
                self.config.max_file_size_mb
            ));
        }

        if !rejections.is_empty() {
            SizeCheck::Reject(rejections)
        } else if !warnings.is_empty() {
            SizeCheck::Warn(warnings)
        } else {
            SizeCheck::Ok
        }
    }
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
