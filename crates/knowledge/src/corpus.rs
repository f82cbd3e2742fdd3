//! Corpus discovery and CSV loading.
//!
//! The corpus is a directory tree of CSV exports (Medium articles, Reddit
//! threads). Each row with a non-empty body becomes a [`CorpusRecord`].

use crate::types::CorpusRecord;
use std::path::{Path, PathBuf};
use tripweave_core::{AppError, AppResult};

/// Cities recognised in corpus file names. Anything else gets no city.
pub const KNOWN_CITIES: &[&str] = &[
    "paris", "london", "rome", "barcelona", "tokyo", "kyoto", "chengdu",
];

const BODY_COLUMNS: &[&str] = &["text", "body", "content", "selftext"];
const URL_COLUMNS: &[&str] = &["url", "link", "permalink"];

/// Records loaded from one CSV file.
#[derive(Debug, Clone, Default)]
pub struct CorpusFile {
    pub records: Vec<CorpusRecord>,

    /// Rows dropped for an empty body or a malformed line
    pub skipped: u32,
}

/// Find every `*.csv` under `data_dir`, sorted by path.
pub fn discover_csv_files(data_dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "data directory {}",
            data_dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    tracing::debug!("Discovered {} CSV files under {:?}", files.len(), data_dir);
    Ok(files)
}

/// Infer a city key from a corpus file name.
///
/// Lowercase substring match of the file name against [`KNOWN_CITIES`];
/// returns an empty string when nothing matches.
pub fn infer_city(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();

    KNOWN_CITIES
        .iter()
        .find(|city| name.contains(*city))
        .map(|city| city.to_string())
        .unwrap_or_default()
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// Load the records of one CSV file.
///
/// The body column is the first of `text`, `body`, `content`, `selftext`,
/// falling back to the second column. Rows whose body is blank are skipped.
pub fn load_records(path: &Path) -> AppResult<CorpusFile> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::Knowledge(format!("Cannot read {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::Knowledge(format!("Cannot read header of {}: {}", path.display(), e)))?
        .clone();

    let body_col = find_column(&headers, BODY_COLUMNS)
        .or(if headers.len() > 1 { Some(1) } else { None })
        .or(if headers.is_empty() { None } else { Some(0) })
        .ok_or_else(|| AppError::Knowledge(format!("{} has no columns", path.display())))?;
    let title_col = find_column(&headers, &["title"]);
    let url_col = find_column(&headers, URL_COLUMNS);

    let source = path.display().to_string();
    let city = infer_city(path);
    let mut file = CorpusFile::default();

    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping malformed row {} of {}: {}", row, source, e);
                file.skipped += 1;
                continue;
            }
        };

        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let body = field(Some(body_col));
        if body.is_empty() {
            file.skipped += 1;
            continue;
        }

        file.records.push(CorpusRecord {
            source: source.clone(),
            row,
            title: field(title_col),
            body,
            url: field(url_col),
            city: city.clone(),
        });
    }

    tracing::debug!(
        "Loaded {} records from {} ({} skipped, city: {:?})",
        file.records.len(),
        source,
        file.skipped,
        city
    );

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_infer_city() {
        assert_eq!(infer_city(Path::new("data/reddit/Tokyo_travel.csv")), "tokyo");
        assert_eq!(infer_city(Path::new("data/medium/CHENGDU-2023.csv")), "chengdu");
        assert_eq!(infer_city(Path::new("data/medium/asia_trips.csv")), "");
    }

    #[test]
    fn test_infer_city_ignores_unlisted_names() {
        assert_eq!(infer_city(Path::new("data/medium/new-york-2023.csv")), "");
        assert_eq!(infer_city(Path::new("data/medium/成都游记.csv")), "");
        // directories do not count
        assert_eq!(infer_city(Path::new("data/paris/notes.csv")), "");
    }

    #[test]
    fn test_discover_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("reddit")).unwrap();
        fs::create_dir_all(temp.path().join("medium")).unwrap();
        fs::write(temp.path().join("reddit/paris.csv"), "title,text\n").unwrap();
        fs::write(temp.path().join("medium/kyoto.CSV"), "title,text\n").unwrap();
        fs::write(temp.path().join("medium/notes.txt"), "ignored").unwrap();

        let files = discover_csv_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("medium/kyoto.CSV"));
        assert!(files[1].ends_with("reddit/paris.csv"));
    }

    #[test]
    fn test_discover_missing_dir() {
        let result = discover_csv_files(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_load_named_columns_and_skip_empty_bodies() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("paris.csv");
        fs::write(
            &path,
            "id,title,selftext,permalink\n\
             1,Left bank,\"Cafes, bookshops and the Seine\",https://r/1\n\
             2,Empty,   ,https://r/2\n\
             3,Montmartre,Sunset at Sacre-Coeur,https://r/3\n",
        )
        .unwrap();

        let file = load_records(&path).unwrap();
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.skipped, 1);

        let first = &file.records[0];
        assert_eq!(first.title, "Left bank");
        assert_eq!(first.body, "Cafes, bookshops and the Seine");
        assert_eq!(first.url, "https://r/1");
        assert_eq!(first.city, "paris");
        assert_eq!(first.row, 0);
        assert_eq!(file.records[1].row, 2);
    }

    #[test]
    fn test_load_falls_back_to_second_column() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("misc.csv");
        fs::write(&path, "name,story\nA,Night market in Taipei\n").unwrap();

        let file = load_records(&path).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.records[0].body, "Night market in Taipei");
        assert_eq!(file.records[0].title, "");
        assert_eq!(file.records[0].city, "");
    }

    #[test]
    fn test_load_unreadable_file_is_error() {
        let result = load_records(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }
}
