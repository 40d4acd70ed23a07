//! `.cutlist` INI files: `[General] ApplyToFile=` plus `Cut*` sections

use std::path::{Path, PathBuf};

use super::{CutListError, CutSource};
use crate::domain::model::{CutList, CutPoint, CutUnit};

#[derive(Debug)]
struct Section {
    name: String,
    line: usize,
    entries: Vec<(String, String)>,
}

impl Section {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn sections(text: &str, origin: &Path) -> Result<Vec<Section>, CutListError> {
    let mut sections: Vec<Section> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push(Section {
                name: name.trim().to_string(),
                line: index + 1,
                entries: Vec::new(),
            });
            continue;
        }
        let syntax = |message: &str| CutListError::Syntax {
            path: origin.to_path_buf(),
            line: index + 1,
            message: message.to_string(),
        };
        let (key, value) = line.split_once('=').ok_or_else(|| syntax("expected KEY=VALUE"))?;
        let section = sections
            .last_mut()
            .ok_or_else(|| syntax("entry outside of any section"))?;
        section
            .entries
            .push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(sections)
}

/// Parse a cutlist; each `Cut*` section is one segment of `Duration` seconds
pub fn parse(text: &str, base_dir: &Path, origin: &Path) -> Result<CutSource, CutListError> {
    let sections = sections(text, origin)?;
    let missing = |section: &Section, key: &str| CutListError::Syntax {
        path: origin.to_path_buf(),
        line: section.line,
        message: format!("[{}] has no {}", section.name, key),
    };

    let general = sections
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case("General"))
        .ok_or_else(|| CutListError::Syntax {
            path: origin.to_path_buf(),
            line: 1,
            message: "no [General] section".to_string(),
        })?;
    let apply_to = general
        .get("ApplyToFile")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(general, "ApplyToFile"))?;
    let input = if Path::new(apply_to).is_absolute() {
        PathBuf::from(apply_to)
    } else {
        base_dir.join(apply_to)
    };

    let mut points = Vec::new();
    for section in sections.iter().filter(|s| s.name.starts_with("Cut")) {
        let number = |key: &str| -> Result<f64, CutListError> {
            let value = section.get(key).ok_or_else(|| missing(section, key))?;
            value.parse::<f64>().map_err(|_| CutListError::Syntax {
                path: origin.to_path_buf(),
                line: section.line,
                message: format!("[{}] {}={} is not a number", section.name, key, value),
            })
        };
        let start = number("Start")?;
        let duration = number("Duration")?;
        points.push(CutPoint::new(Some(start), Some(start + duration))?);
    }

    Ok(CutSource {
        input,
        cuts: CutList::new(CutUnit::Seconds, points)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUTLIST: &str = "\
[General]
Version=1
ApplyToFile=Show.avi
NoOfCuts=2

[Cut0]
Start=12.5
Duration=100

[Cut1]
Start=300
Duration=50.25

[Info]
SuggestedMovieName=Show
";

    #[test]
    fn test_cut_sections_become_segments() {
        let source = parse(CUTLIST, Path::new("/rec"), Path::new("/rec/show.cutlist")).unwrap();
        assert_eq!(source.input, PathBuf::from("/rec/Show.avi"));
        assert_eq!(
            source.cuts.points,
            vec![
                CutPoint { start: Some(12.5), end: Some(112.5) },
                CutPoint { start: Some(300.0), end: Some(350.25) },
            ]
        );
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let no_file = "[General]\nVersion=1\n";
        assert!(matches!(
            parse(no_file, Path::new("."), Path::new("a.cutlist")),
            Err(CutListError::Syntax { .. })
        ));

        let no_duration = "[General]\nApplyToFile=a.avi\n[Cut0]\nStart=1\n";
        let err = parse(no_duration, Path::new("."), Path::new("a.cutlist")).unwrap_err();
        assert!(err.to_string().contains("Duration"));
    }
}
