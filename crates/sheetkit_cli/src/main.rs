//! `sheetkit` command line front end.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sheetkit_io_xlsx::read_first_sheet;
use sheetkit_merge::{
    C_LABEL_IDENTITY_DEFAULT, C_SHEET_NAME_MERGED, L_LABELS_DEFAULT, N_ROWS_HEADER_WINDOW_DEFAULT,
    SpecAuditOptions, SpecExtractOptions, SpecExtractedTable, SpecInputFile,
    aggregate_by_identity, audit_table, discover_candidate_labels, list_split_values, merge_files,
    read_table_from_bytes, split_by_value, write_table_to_bytes,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "sheetkit",
    about = "Merge, split, audit and deduplicate payroll workbooks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print candidate header labels found near the top of a workbook.
    Columns(ArgsColumns),
    /// Merge the selected columns of many workbooks into one.
    Merge(ArgsMerge),
    /// Check identity numbers, bank accounts and names row by row.
    Audit(ArgsAudit),
    /// Extract the rows holding one value of a column.
    Split(ArgsSplit),
    /// Collapse rows sharing an identity, summing numeric columns.
    Dedup(ArgsDedup),
    /// Print the table read with a given header row.
    Inspect(ArgsInspect),
}

#[derive(Args, Debug)]
struct ArgsColumns {
    /// Input workbook.
    file: PathBuf,

    /// Rows scanned from the top of the sheet.
    #[arg(long, default_value_t = N_ROWS_HEADER_WINDOW_DEFAULT)]
    window: usize,
}

#[derive(Args, Debug)]
struct ArgsMerge {
    /// Input workbooks, merged in the given order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Header labels to extract (repeatable).
    #[arg(short = 'c', long = "column", default_values = L_LABELS_DEFAULT)]
    columns: Vec<String>,

    /// Label every file must contain.
    #[arg(long, default_value = C_LABEL_IDENTITY_DEFAULT)]
    identity: String,

    /// Rows scanned from the top of each sheet.
    #[arg(long, default_value_t = N_ROWS_HEADER_WINDOW_DEFAULT)]
    window: usize,

    /// Output workbook.
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ArgsHeaderRow {
    /// Input workbook.
    file: PathBuf,

    /// 1-based row holding the column names.
    #[arg(long, default_value_t = 1)]
    header_row: usize,
}

#[derive(Args, Debug)]
struct ArgsAudit {
    #[command(flatten)]
    input: ArgsHeaderRow,

    /// Identity-number column (18-character check).
    #[arg(long)]
    id_col: Option<String>,

    /// Bank-account column (whitespace and length checks).
    #[arg(long)]
    bank_col: Option<String>,

    /// Name column (whitespace check).
    #[arg(long)]
    name_col: Option<String>,

    /// Output workbook.
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ArgsSplit {
    #[command(flatten)]
    input: ArgsHeaderRow,

    /// Column to split on.
    #[arg(long)]
    column: String,

    /// Value to extract; without it the distinct values are listed.
    #[arg(long)]
    value: Option<String>,

    /// Output workbook; defaults to `<value>.xlsx`.
    #[arg(short, long, requires = "value")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ArgsDedup {
    #[command(flatten)]
    input: ArgsHeaderRow,

    /// Identity column rows are grouped by.
    #[arg(long)]
    key: String,

    /// Numeric columns summed within a group (repeatable).
    #[arg(long = "sum")]
    cols_sum: Vec<String>,

    /// Output workbook.
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ArgsInspect {
    #[command(flatten)]
    input: ArgsHeaderRow,

    /// Maximum body rows printed.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn main() -> Result<()> {
    init_logging();
    run(Cli::parse())
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Columns(args) => run_columns(&args),
        Command::Merge(args) => run_merge(&args),
        Command::Audit(args) => run_audit(&args),
        Command::Split(args) => run_split(&args),
        Command::Dedup(args) => run_dedup(&args),
        Command::Inspect(args) => run_inspect(&args),
    }
}

fn run_columns(args: &ArgsColumns) -> Result<()> {
    let grid = read_first_sheet(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    for c_label in discover_candidate_labels(&grid, args.window) {
        println!("{c_label}");
    }
    Ok(())
}

fn run_merge(args: &ArgsMerge) -> Result<()> {
    let l_files: Vec<SpecInputFile> = args
        .files
        .iter()
        .map(|path| SpecInputFile::from_path(derive_display_name(path), path.clone()))
        .collect();

    let options = SpecExtractOptions {
        label_identity: args.identity.clone(),
        n_rows_header_window: args.window,
    };
    let output = merge_files(&l_files, &args.columns, &options)?;

    println!("{}", output.report);
    for err in &output.report.errors {
        println!("  error   {}: {}", err.name, err.exception);
    }
    for c_warning in &output.report.warnings {
        println!("  warning {c_warning}");
    }
    if !output.report.has_succeeded() {
        bail!("no input file could be merged");
    }

    write_output(&output.table, &args.output)
}

fn run_audit(args: &ArgsAudit) -> Result<()> {
    let table = load_table(&args.input)?;
    let options = SpecAuditOptions {
        col_identity_number: args.id_col.clone(),
        col_bank_account: args.bank_col.clone(),
        col_name: args.name_col.clone(),
        ..Default::default()
    };
    let output = audit_table(&table, &options)?;
    println!(
        "{} of {} rows flagged",
        output.cnt_flagged,
        output.table.height()
    );
    write_output(&output.table, &args.output)
}

fn run_split(args: &ArgsSplit) -> Result<()> {
    let table = load_table(&args.input)?;
    let Some(c_value) = args.value.as_deref() else {
        for c_value in list_split_values(&table, &args.column)? {
            println!("{c_value}");
        }
        return Ok(());
    };

    let table_part = split_by_value(&table, &args.column, c_value)?;
    let path_out = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{c_value}.xlsx")));
    println!("{} rows with {} = {c_value}", table_part.height(), args.column);
    write_output(&table_part, &path_out)
}

fn run_dedup(args: &ArgsDedup) -> Result<()> {
    let table = load_table(&args.input)?;
    let output = aggregate_by_identity(&table, &args.key, &args.cols_sum)?;
    println!(
        "{} rows -> {} rows, {} identities merged",
        table.height(),
        output.table.height(),
        output.keys_merged.len()
    );
    for c_key in &output.keys_merged {
        println!("  {c_key}");
    }
    write_output(&output.table, &args.output)
}

fn run_inspect(args: &ArgsInspect) -> Result<()> {
    let table = load_table(&args.input)?;
    println!("{}", table.columns().join("\t"));
    for row in table.rows().iter().take(args.limit) {
        let l_cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", l_cells.join("\t"));
    }
    if table.height() > args.limit {
        println!("... {} more rows", table.height() - args.limit);
    }
    Ok(())
}

fn load_table(args: &ArgsHeaderRow) -> Result<SpecExtractedTable> {
    let v_bytes =
        fs::read(&args.file).with_context(|| format!("failed to read {}", args.file.display()))?;
    read_table_from_bytes(&v_bytes, args.header_row)
        .with_context(|| format!("failed to load table from {}", args.file.display()))
}

fn write_output(table: &SpecExtractedTable, path: &Path) -> Result<()> {
    let v_bytes = write_table_to_bytes(table, C_SHEET_NAME_MERGED)?;
    fs::write(path, v_bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), n_rows = table.height(), "workbook written");
    Ok(())
}

fn derive_display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sheetkit_io_xlsx::EnumCellValue;

    use super::*;

    fn strs(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn write_fixture(path: &Path, columns: &[&str], rows: Vec<Vec<EnumCellValue>>) {
        let table = SpecExtractedTable::new(strs(columns), rows);
        let v_bytes = write_table_to_bytes(&table, "Sheet1").expect("bytes");
        fs::write(path, v_bytes).expect("write fixture");
    }

    fn read_output(path: &Path) -> SpecExtractedTable {
        let v_bytes = fs::read(path).expect("read output");
        read_table_from_bytes(&v_bytes, 1).expect("table")
    }

    #[test]
    fn parse_merge_uses_default_columns() {
        let cli = Cli::try_parse_from(["sheetkit", "merge", "a.xlsx", "b.xlsx", "-o", "out.xlsx"])
            .expect("parse");
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.columns, strs(&["姓名", "身份证号", "应付工资"]));
        assert_eq!(args.identity, "姓名");
        assert_eq!(args.window, 10);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn parse_merge_requires_files_and_output() {
        assert!(Cli::try_parse_from(["sheetkit", "merge", "-o", "out.xlsx"]).is_err());
        assert!(Cli::try_parse_from(["sheetkit", "merge", "a.xlsx"]).is_err());
    }

    #[test]
    fn parse_split_output_requires_value() {
        assert!(
            Cli::try_parse_from(["sheetkit", "split", "a.xlsx", "--column", "部门", "-o", "x.xlsx"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["sheetkit", "split", "a.xlsx", "--column", "部门"])
            .expect("parse");
        let Command::Split(args) = cli.command else {
            panic!("expected split");
        };
        assert_eq!(args.input.header_row, 1);
        assert!(args.value.is_none());
    }

    #[test]
    fn parse_dedup_collects_sum_columns() {
        let cli = Cli::try_parse_from([
            "sheetkit",
            "dedup",
            "a.xlsx",
            "--header-row",
            "2",
            "--key",
            "身份证号",
            "--sum",
            "应付工资",
            "--sum",
            "奖金",
            "-o",
            "out.xlsx",
        ])
        .expect("parse");
        let Command::Dedup(args) = cli.command else {
            panic!("expected dedup");
        };
        assert_eq!(args.input.header_row, 2);
        assert_eq!(args.cols_sum, strs(&["应付工资", "奖金"]));
    }

    #[test]
    fn run_merge_writes_combined_workbook() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_a = dir.path().join("a.xlsx");
        let path_b = dir.path().join("b.xlsx");
        let path_out = dir.path().join("out.xlsx");
        write_fixture(
            &path_a,
            &["姓名", "应付工资"],
            vec![vec!["张三".into(), 100.0.into()]],
        );
        write_fixture(
            &path_b,
            &["应付工资", "姓名"],
            vec![vec![200.0.into(), "李四".into()]],
        );

        let cli = Cli::try_parse_from([
            "sheetkit",
            "merge",
            path_a.to_str().expect("utf-8 path"),
            path_b.to_str().expect("utf-8 path"),
            "-c",
            "姓名",
            "-c",
            "应付工资",
            "-o",
            path_out.to_str().expect("utf-8 path"),
        ])
        .expect("parse");
        run(cli).expect("run");

        let table = read_output(&path_out);
        assert_eq!(table.columns(), strs(&["姓名", "应付工资"]).as_slice());
        assert_eq!(
            table.rows(),
            &[
                vec![EnumCellValue::from("张三"), EnumCellValue::from(100.0)],
                vec![EnumCellValue::from("李四"), EnumCellValue::from(200.0)],
            ]
        );
    }

    #[test]
    fn run_merge_skips_missing_input_and_writes_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_missing = dir.path().join("missing.xlsx");
        let path_ok = dir.path().join("ok.xlsx");
        let path_out = dir.path().join("out.xlsx");
        write_fixture(&path_ok, &["姓名"], vec![vec!["张三".into()]]);

        let args = ArgsMerge {
            files: vec![path_missing, path_ok],
            columns: strs(&["姓名"]),
            identity: C_LABEL_IDENTITY_DEFAULT.to_string(),
            window: N_ROWS_HEADER_WINDOW_DEFAULT,
            output: path_out.clone(),
        };
        run_merge(&args).expect("run");

        let table = read_output(&path_out);
        assert_eq!(table.rows(), &[vec![EnumCellValue::from("张三")]]);
    }

    #[test]
    fn run_merge_fails_when_no_file_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_a = dir.path().join("a.xlsx");
        let path_out = dir.path().join("out.xlsx");
        write_fixture(&path_a, &["工号"], vec![vec!["1".into()]]);

        let args = ArgsMerge {
            files: vec![path_a],
            columns: strs(&["姓名"]),
            identity: C_LABEL_IDENTITY_DEFAULT.to_string(),
            window: N_ROWS_HEADER_WINDOW_DEFAULT,
            output: path_out.clone(),
        };
        assert!(run_merge(&args).is_err());
        assert!(!path_out.exists());
    }

    #[test]
    fn run_dedup_sums_duplicate_identities() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path_in = dir.path().join("in.xlsx");
        let path_out = dir.path().join("out.xlsx");
        write_fixture(
            &path_in,
            &["身份证号", "应付工资"],
            vec![
                vec!["A".into(), 100.0.into()],
                vec!["B".into(), 50.0.into()],
                vec!["A".into(), 25.5.into()],
            ],
        );

        let args = ArgsDedup {
            input: ArgsHeaderRow {
                file: path_in,
                header_row: 1,
            },
            key: "身份证号".to_string(),
            cols_sum: strs(&["应付工资"]),
            output: path_out.clone(),
        };
        run_dedup(&args).expect("dedup");

        let table = read_output(&path_out);
        assert_eq!(
            table.rows(),
            &[
                vec![EnumCellValue::from("A"), EnumCellValue::from(125.5)],
                vec![EnumCellValue::from("B"), EnumCellValue::from(50.0)],
            ]
        );
    }

    #[test]
    fn load_table_reports_missing_file() {
        let args = ArgsHeaderRow {
            file: PathBuf::from("/nonexistent/sheetkit/in.xlsx"),
            header_row: 1,
        };
        let err = load_table(&args).expect_err("missing file");
        assert!(err.to_string().contains("failed to read"));
    }
}
