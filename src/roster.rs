//! Course roster loading.

use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// One enrolled student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub user_id: String,
    /// Display name, conventionally "Last, First".
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Student")]
    student: String,
    #[serde(rename = "ID")]
    id: String,
}

/// Reads a roster CSV with `Student` and `ID` columns.
///
/// Rows keep file order. Duplicate ids are returned as-is; the grading merge
/// step rejects them.
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<RosterEntry>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut entries = Vec::new();
    for result in rdr.deserialize() {
        let row: RosterRow = result?;
        entries.push(RosterEntry {
            user_id: row.id,
            full_name: row.student,
        });
    }

    info!(path = %path.display(), students = entries.len(), "Roster loaded");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_load_roster() {
        let path = temp_path("participation_rater_roster.csv");
        fs::write(
            &path,
            "Student,ID\n\"Lovelace, Ada\",1001\n\"Hopper, Grace\", 1002 \n",
        )
        .unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(
            roster,
            vec![
                RosterEntry {
                    user_id: "1001".into(),
                    full_name: "Lovelace, Ada".into()
                },
                RosterEntry {
                    user_id: "1002".into(),
                    full_name: "Hopper, Grace".into()
                },
            ]
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_roster_keeps_duplicates() {
        let path = temp_path("participation_rater_roster_dupes.csv");
        fs::write(&path, "Student,ID\nA,1\nB,1\n").unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.len(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_roster_missing_file() {
        assert!(load_roster(temp_path("participation_rater_no_such_roster.csv")).is_err());
    }
}
