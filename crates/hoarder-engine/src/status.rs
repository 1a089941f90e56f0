//! Human-readable snapshot of in-flight downloads.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const BAR_WIDTH: usize = 30;

/// One in-flight download as seen by the status view.
#[derive(Debug, Clone)]
pub struct DownloadSnapshot {
    /// Torrent display name.
    pub name: String,
    /// Path the payload is currently being written to.
    pub dest: PathBuf,
    /// Expected payload size in bytes.
    pub expected: u64,
}

/// Render the deterministic status block: names sorted and right-padded,
/// a fixed-width progress bar per line, and an `error:` column when the
/// destination cannot be statted. Lines are newline-joined with no trailing
/// newline; no downloads renders as the empty string.
#[must_use]
pub fn render_status(snapshots: &[DownloadSnapshot]) -> String {
    let mut rows: Vec<&DownloadSnapshot> = snapshots.iter().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);

    rows.iter()
        .map(|row| match on_disk_size(&row.dest) {
            Ok(bytes) => {
                let fraction = fraction(bytes, row.expected);
                format!(
                    "{name:<width$} [{bar}] {percent:6.2}%",
                    name = row.name,
                    bar = bar(fraction),
                    percent = fraction * 100.0,
                )
            }
            Err(err) => format!("{name:<width$} error: {err}", name = row.name),
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn fraction(on_disk: u64, expected: u64) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let fraction = on_disk as f64 / expected as f64;
    fraction.clamp(0.0, 1.0)
}

fn bar(fraction: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let mut bar = String::with_capacity(BAR_WIDTH);
    if filled > 0 {
        bar.push_str(&"=".repeat(filled - 1));
        bar.push('>');
    }
    bar.push_str(&" ".repeat(BAR_WIDTH - filled));
    bar
}

/// Bytes on disk for a destination: the file size, or the recursive sum for
/// a directory.
fn on_disk_size(path: &Path) -> std::io::Result<u64> {
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }
    let mut total = 0_u64;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(std::io::Error::other)?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, len: usize) {
        let mut file = fs::File::create(path).expect("create");
        file.write_all(&vec![0_u8; len]).expect("write");
    }

    #[test]
    fn empty_snapshot_renders_empty_string() {
        assert_eq!(render_status(&[]), "");
    }

    #[test]
    fn names_sort_and_pad_to_longest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let alpha = dir.path().join("alpha.bin");
        write_file(&alpha, 512);

        let rendered = render_status(&[
            DownloadSnapshot {
                name: "beta-longer-name".to_string(),
                dest: dir.path().join("missing.bin"),
                expected: 1024,
            },
            DownloadSnapshot {
                name: "alpha".to_string(),
                dest: alpha,
                expected: 1024,
            },
        ]);

        let lines: Vec<&str> = rendered.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("alpha            ["), "sorted first, padded to 16");
        assert!(lines[1].starts_with("beta-longer-name error: "));
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn half_done_bar_fills_fifteen_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("alpha.bin");
        write_file(&dest, 512);

        let rendered = render_status(&[DownloadSnapshot {
            name: "alpha".to_string(),
            dest,
            expected: 1024,
        }]);

        let bar_start = rendered.find('[').expect("bar opens") + 1;
        let bar_end = rendered.find(']').expect("bar closes");
        let bar = &rendered[bar_start..bar_end];
        assert_eq!(bar.len(), 30);
        assert_eq!(bar.chars().filter(|&c| c == '=' || c == '>').count(), 15);
        assert_eq!(bar.chars().nth(14), Some('>'));
        assert!(rendered.contains("50.00%"));
    }

    #[test]
    fn directory_destinations_sum_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("show");
        fs::create_dir_all(dest.join("extras")).expect("mkdirs");
        write_file(&dest.join("episode-1.mkv"), 600);
        write_file(&dest.join("extras/notes.txt"), 424);

        let rendered = render_status(&[DownloadSnapshot {
            name: "show".to_string(),
            dest,
            expected: 1024,
        }]);
        assert!(rendered.contains("100.00%"));
    }

    #[test]
    fn complete_bar_is_fully_filled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("alpha.bin");
        write_file(&dest, 1024);

        let rendered = render_status(&[DownloadSnapshot {
            name: "alpha".to_string(),
            dest,
            expected: 1024,
        }]);
        let bar_start = rendered.find('[').expect("bar opens") + 1;
        let bar = &rendered[bar_start..bar_start + 30];
        assert!(!bar.contains(' '));
        assert!(bar.ends_with('>'));
    }
}
