use std::path::Path;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Serialization formats a network file can arrive in.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[display("json")]
    Json,
    #[display("excel")]
    Excel,
    #[display("pickle")]
    Pickle,
    #[display("sqlite")]
    Sqlite,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [
        FileFormat::Json,
        FileFormat::Excel,
        FileFormat::Pickle,
        FileFormat::Sqlite,
    ];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileFormat::Json => &[".json"],
            FileFormat::Excel => &[".xlsx", ".xls"],
            FileFormat::Pickle => &[".p", ".pkl", ".pickle"],
            FileFormat::Sqlite => &[".sqlite", ".db"],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FileFormat::Json => "JSON format (recommended)",
            FileFormat::Excel => "Excel spreadsheet",
            FileFormat::Pickle => "Python pickle",
            FileFormat::Sqlite => "SQLite database",
        }
    }

    /// Maps a filename to its format by extension, ignoring case.
    /// Returns `None` for anything not in the table.
    pub fn detect(filename: &str) -> Option<FileFormat> {
        let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
        let ext = format!(".{ext}");
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }
}

/// Every accepted extension, in table order.
pub fn supported_extensions() -> Vec<&'static str> {
    FileFormat::ALL
        .iter()
        .flat_map(|f| f.extensions().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_every_listed_extension() {
        for format in FileFormat::ALL {
            for ext in format.extensions() {
                assert_eq!(FileFormat::detect(&format!("net{ext}")), Some(format));
                let upper = format!("NET{}", ext.to_uppercase());
                assert_eq!(FileFormat::detect(&upper), Some(format));
            }
        }
    }

    #[test]
    fn unknown_extensions_are_not_detected() {
        for name in ["net.csv", "net", "", ".json.bak", "archive.tar.gz", "json"] {
            assert_eq!(FileFormat::detect(name), None, "{name}");
        }
        assert_eq!(FileFormat::detect("dir.v2/case.JSON"), Some(FileFormat::Json));
    }

    #[test]
    fn extension_list_and_names() {
        assert_eq!(
            supported_extensions(),
            vec![".json", ".xlsx", ".xls", ".p", ".pkl", ".pickle", ".sqlite", ".db"]
        );
        assert_eq!(FileFormat::Excel.to_string(), "excel");
        assert_eq!(
            serde_json::to_string(&FileFormat::Sqlite).unwrap(),
            "\"sqlite\""
        );
    }
}
