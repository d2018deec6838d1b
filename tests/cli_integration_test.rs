use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use coopledger::cli::{self, Cli, Command};
use tempfile::NamedTempFile;

const VALID_INI: &str = r#"
[api]
base_url = http://localhost:9/api
timeout_secs = 5

[context]
branch_id = 12
plan_id = 7
year = 2025
default_unit_id = 3
role = manager

[grid]
name = Earnings
fiscal_start_month = 7

[items]
order = rice, beans, fees

[item.rice]
name = Rice
unit = kg
external_id = 101

[item.beans]
unit = bag
external_id = 102

[item.fees]
name = Membership fees
unit = member
editable = false
"#;

const EDITS_CSV: &str = "item,sell_price,jul,aug\nrice,2.50,10,4\nbeans,1,3,\nfees,9,9,9\n";

fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_temp_ini(content: &str) -> NamedTempFile {
    write_temp(content, ".ini")
}

// ExitCode doesn't implement PartialEq, so compare the debug output
fn assert_code(actual: ExitCode, expected: u8) {
    let got = format!("{actual:?}");
    let want = format!("{:?}", ExitCode::from(expected));
    assert_eq!(got, want, "expected exit code {expected}, got: {got}");
}

fn without_line(content: &str, prefix: &str) -> String {
    content
        .lines()
        .filter(|l| !l.starts_with(prefix))
        .collect::<Vec<_>>()
        .join("\n")
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_file_loads() {
        let file = write_temp_ini(VALID_INI);
        let config = cli::load_config(file.path()).unwrap();
        assert_eq!(config.name, "Earnings");
        assert_eq!(config.items.len(), 3);
        assert_eq!(config.fiscal_start_month, 7);
        assert!(config.context.missing().is_empty());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = cli::load_config(&PathBuf::from("/nonexistent/grid.ini"));
        match result {
            Err(code) => assert_code(code, 2),
            Ok(_) => panic!("expected failure for a missing file"),
        }
    }

    #[test]
    fn missing_item_unit_is_rejected() {
        let file = write_temp_ini(&without_line(VALID_INI, "unit = bag"));
        assert!(cli::load_config(file.path()).is_err());
    }
}

mod validate {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        let code = cli::run(Cli {
            command: Command::Validate {
                config: file.path().to_path_buf(),
            },
        });
        assert_code(code, 0);
    }

    #[test]
    fn incomplete_context_still_validates() {
        let file = write_temp_ini(&without_line(VALID_INI, "plan_id"));
        assert_code(cli::run_validate(file.path()), 0);
    }

    #[test]
    fn bad_start_month_fails() {
        let content = VALID_INI.replace("fiscal_start_month = 7", "fiscal_start_month = 13");
        let file = write_temp_ini(&content);
        assert_code(cli::run_validate(file.path()), 2);
    }
}

mod export {
    use super::*;

    #[test]
    fn writes_grid_with_totals() {
        let ini = write_temp_ini(VALID_INI);
        let edits = write_temp(EDITS_CSV, ".csv");
        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();

        let code = cli::run(Cli {
            command: Command::Export {
                config: ini.path().to_path_buf(),
                output: out.path().to_path_buf(),
                input: Some(edits.path().to_path_buf()),
                remote: false,
            },
        });
        assert_code(code, 0);

        let text = std::fs::read_to_string(out.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5, "header, three items, footer: {text}");
        assert!(lines[0].starts_with("item,name,unit,sell_price,buy_price,note,jul,aug"));
        assert!(lines[0].ends_with("jun,total_quantity,total_amount"));
        assert!(lines[1].starts_with("rice,Rice,kg,2.50,"));
        assert!(lines[1].ends_with(",14,35.00"), "rice row: {}", lines[1]);
        assert!(lines[2].ends_with(",3,3.00"), "beans row: {}", lines[2]);
        // read-only row ignores imported values
        assert!(lines[3].ends_with(",-,-"), "fees row: {}", lines[3]);
        assert!(lines[4].starts_with("TOTAL,,,,,,28.00,10.00,"));
        assert!(lines[4].ends_with(",17,38.00"), "footer: {}", lines[4]);
    }

    #[test]
    fn without_edits_every_total_is_the_placeholder() {
        let ini = write_temp_ini(VALID_INI);
        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();

        let code = cli::run_export(ini.path(), out.path(), None, false);
        assert_code(code, 0);

        let text = std::fs::read_to_string(out.path()).unwrap();
        let footer = text.lines().last().unwrap();
        assert!(footer.starts_with("TOTAL"));
        assert!(footer.ends_with(",-,-"), "footer: {footer}");
    }

    #[test]
    fn missing_input_fails() {
        let ini = write_temp_ini(VALID_INI);
        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let code = cli::run_export(
            ini.path(),
            out.path(),
            Some(&PathBuf::from("/nonexistent/edits.csv")),
            false,
        );
        assert_code(code, 1);
    }
}

mod show {
    use super::*;

    #[test]
    fn renders_after_edits() {
        let ini = write_temp_ini(VALID_INI);
        let edits = write_temp(EDITS_CSV, ".csv");
        assert_code(cli::run_show(ini.path(), Some(edits.path()), false), 0);
    }

    #[test]
    fn table_has_footer_and_placeholders() {
        let ini = write_temp_ini(VALID_INI);
        let edits = write_temp(EDITS_CSV, ".csv");
        let config = cli::load_config(ini.path()).unwrap();
        let grid = cli::prepare_grid(&config, Some(edits.path()), false).unwrap();

        let table = cli::render_table(&grid, &config.placeholder);
        assert!(table.contains("Rice"));
        assert!(table.contains("35.00"));
        assert!(table.contains("38.00"));
        assert!(table.contains('-'));
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn complete_context_succeeds() {
        let ini = write_temp_ini(VALID_INI);
        let edits = write_temp(EDITS_CSV, ".csv");
        let code = cli::run(Cli {
            command: Command::Save {
                config: ini.path().to_path_buf(),
                input: edits.path().to_path_buf(),
                dry_run: true,
            },
        });
        assert_code(code, 0);
    }

    #[test]
    fn missing_context_is_a_configuration_gap() {
        let ini = write_temp_ini(&without_line(VALID_INI, "default_unit_id"));
        let edits = write_temp(EDITS_CSV, ".csv");
        assert_code(cli::run_dry_run(ini.path(), edits.path()), 2);
    }

    #[test]
    fn edits_without_item_column_fail() {
        let ini = write_temp_ini(VALID_INI);
        let edits = write_temp("name,jul\nRice,4\n", ".csv");
        assert_code(cli::run_dry_run(ini.path(), edits.path()), 1);
    }
}

mod parsing {
    use super::*;
    use clap::Parser;

    #[test]
    fn save_flags_parse() {
        let cli = Cli::try_parse_from([
            "coopledger",
            "save",
            "--config",
            "grid.ini",
            "--input",
            "edits.csv",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Save { dry_run, input, .. } => {
                assert!(dry_run);
                assert_eq!(input, PathBuf::from("edits.csv"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn export_requires_output() {
        assert!(Cli::try_parse_from(["coopledger", "export", "--config", "grid.ini"]).is_err());
    }
}
