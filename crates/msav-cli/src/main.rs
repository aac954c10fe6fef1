//! `msav`: generate guarded weak mutants for annotated source files.
//!
//! Every input file needs a `<file>.model.json` sidecar holding its parsed,
//! type-annotated program model. For each file the tool writes one complete
//! mutated copy per mutant under the output directory, plus a mutation log
//! and a JSON report for the whole run.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use msav_analysis::mcs::McsMode;
use msav_engine::{mutate_file, Mutant, Source};
use msav_smt::backends::z3::Z3Solver;

use report::{FileReport, RunReport};

#[derive(Parser)]
#[command(name = "msav")]
#[command(about = "Weak-mutation generator: one guarded mutant per reachable abstract state")]
#[command(version)]
struct Cli {
    /// Source files to mutate; each needs a `<file>.model.json` sidecar
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output directory for mutants, log, and report
    #[arg(long, default_value = "msav_out")]
    outdir: PathBuf,

    /// Apply the boolean identity laws while building condition sets
    #[arg(long, default_value_t = false)]
    optimize: bool,

    /// Solver timeout per satisfiability probe, in seconds (0 disables)
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.optimize {
        McsMode::Optimize
    } else {
        McsMode::Plain
    };

    fs::create_dir_all(&cli.outdir)
        .map_err(|e| miette::miette!("cannot create {}: {e}", cli.outdir.display()))?;

    let mut log_lines = Vec::new();
    let mut report = RunReport::default();

    for path in &cli.files {
        // One solver per file: declarations never leak across files.
        let mut solver = if cli.timeout_secs == 0 {
            Z3Solver::new()
        } else {
            Z3Solver::with_timeout_secs(cli.timeout_secs)
        };
        match mutate_file(path, &mut solver, mode) {
            Ok((source, mutants)) => {
                info!(file = %path.display(), mutants = mutants.len(), "file mutated");
                write_mutants(&cli.outdir, &source, &mutants)
                    .map_err(|e| miette::miette!("cannot write mutants: {e}"))?;
                log_lines.extend(mutants.iter().map(|m| m.log_line(&source)));
                report.push(FileReport::mutated(&source, &mutants));
            }
            Err(err) => {
                // A broken file must not sink the rest of the run.
                error!(file = %path.display(), error = %err, "file skipped");
                report.push(FileReport::skipped(path, &err));
            }
        }
    }

    write_log(&cli.outdir, &log_lines)
        .map_err(|e| miette::miette!("cannot write mutants.log: {e}"))?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| miette::miette!("cannot serialize report: {e}"))?;
    fs::write(cli.outdir.join("report.json"), json)
        .map_err(|e| miette::miette!("cannot write report.json: {e}"))?;

    info!(
        files = report.total_files,
        skipped = report.skipped_files,
        mutants = report.total_mutants,
        "run complete"
    );
    Ok(())
}

/// Write one complete mutated copy per mutant:
/// `<outdir>/mutants/<mid>/<file>`. Mutant ids restart at 1 for every file;
/// the filename inside the mid directory keeps runs over several files
/// apart. Existing copies are overwritten.
fn write_mutants(outdir: &Path, source: &Source, mutants: &[Mutant]) -> std::io::Result<()> {
    for mutant in mutants {
        let dir = outdir.join("mutants").join(mutant.mid.to_string());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(source.filename()), mutant.as_file_string(source))?;
    }
    Ok(())
}

fn write_log(outdir: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    fs::write(outdir.join("mutants.log"), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msav_ast::ast::{Expr, Span};

    fn sample(source: &Source) -> Mutant {
        let start = source.contents().rfind('x').unwrap();
        Mutant {
            mid: 1,
            filename: source.filename().to_string(),
            span: Span::new(start, start + 1),
            original: Expr::var("x"),
            replacement: Expr::paren(Expr::conditional(
                Expr::paren(Expr::var("x")),
                Expr::not(Expr::paren(Expr::var("x"))),
                Expr::paren(Expr::var("x")),
            )),
            condition: Expr::var("x"),
        }
    }

    #[test]
    fn mutants_land_in_per_mid_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = Source::new("F.java", "boolean f(boolean x) { return x; }");
        let mutant = sample(&source);
        write_mutants(dir.path(), &source, &[mutant])?;

        let written = fs::read_to_string(dir.path().join("mutants/1/F.java"))?;
        assert!(written.contains("((x) ? !(x) : (x))"));
        Ok(())
    }

    #[test]
    fn round_trip_writes_mutants_and_report() -> Result<(), Box<dyn std::error::Error>> {
        use msav_ast::ast::{Block, Method, Param, Program, Stmt, Type};
        use msav_ast::resolve::ProgramFile;

        let dir = tempfile::tempdir()?;
        let text = "boolean f(boolean x) { return x; }";
        let start = text.rfind('x').unwrap();
        let path = dir.path().join("F.java");
        fs::write(&path, text)?;

        let mut target = Expr::var("x");
        target.span = Span::new(start, start + 1);
        let model = ProgramFile {
            program: Program {
                methods: vec![Method {
                    name: "f".to_string(),
                    params: vec![Param {
                        name: "x".to_string(),
                        ty: Type::Boolean,
                    }],
                    return_type: Type::Boolean,
                    body: Block {
                        stmts: vec![Stmt::Return {
                            id: 1,
                            span: Span::new(0, 1),
                            expr: Some(target),
                        }],
                    },
                }],
            },
            ..Default::default()
        };
        fs::write(
            dir.path().join("F.java.model.json"),
            serde_json::to_string(&model)?,
        )?;

        let mut solver = Z3Solver::new();
        let (source, mutants) = mutate_file(&path, &mut solver, McsMode::Plain)?;
        assert_eq!(mutants.len(), 2);

        let outdir = dir.path().join("out");
        fs::create_dir_all(&outdir)?;
        write_mutants(&outdir, &source, &mutants)?;
        let mut report = RunReport::default();
        report.push(FileReport::mutated(&source, &mutants));
        fs::write(
            outdir.join("report.json"),
            serde_json::to_string_pretty(&report)?,
        )?;

        assert!(outdir.join("mutants/1/F.java").is_file());
        assert!(outdir.join("mutants/2/F.java").is_file());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(outdir.join("report.json"))?)?;
        assert_eq!(json["total_mutants"], 2);
        Ok(())
    }

    #[test]
    fn log_file_has_one_line_per_mutant() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = Source::new("F.java", "return x;");
        let mutant = sample(&source);
        let lines = vec![mutant.log_line(&source)];
        write_log(dir.path(), &lines)?;

        let log = fs::read_to_string(dir.path().join("mutants.log"))?;
        assert_eq!(log, "1:MSAV:::F.java:1,8:x |==> ((x) ? !(x) : (x))\n");
        Ok(())
    }

    #[test]
    fn empty_run_writes_an_empty_log() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_log(dir.path(), &[])?;
        assert_eq!(fs::read_to_string(dir.path().join("mutants.log"))?, "");
        Ok(())
    }
}
