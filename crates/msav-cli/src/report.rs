use std::path::Path;

use serde::Serialize;

use msav_engine::{Mutant, MutateError, Source};

/// Machine-readable summary of one run, written as `report.json`.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub total_files: usize,
    pub skipped_files: usize,
    pub total_mutants: usize,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn push(&mut self, file: FileReport) {
        self.total_files += 1;
        if file.status == FileStatus::Skipped {
            self.skipped_files += 1;
        }
        self.total_mutants += file.mutants.len();
        self.files.push(file);
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Mutated,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub mutants: Vec<MutantReport>,
}

impl FileReport {
    pub fn mutated(source: &Source, mutants: &[Mutant]) -> Self {
        Self {
            file: source.filename().to_string(),
            status: FileStatus::Mutated,
            error: None,
            mutants: mutants
                .iter()
                .map(|m| MutantReport::new(m, source))
                .collect(),
        }
    }

    pub fn skipped(path: &Path, err: &MutateError) -> Self {
        Self {
            file: path.display().to_string(),
            status: FileStatus::Skipped,
            error: Some(err.to_string()),
            mutants: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutantReport {
    pub mid: u32,
    pub line: usize,
    pub col: usize,
    pub original: String,
    pub replacement: String,
    pub condition: String,
}

impl MutantReport {
    fn new(mutant: &Mutant, source: &Source) -> Self {
        let (line, col) = source.line_col(mutant.span.start);
        Self {
            mid: mutant.mid,
            line,
            col,
            original: mutant.original.to_string(),
            replacement: mutant.replacement.to_string(),
            condition: mutant.condition.to_string(),
        }
    }
}
