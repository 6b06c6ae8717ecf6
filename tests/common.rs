use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::{Path, PathBuf};

pub fn attain() -> Command {
    cargo_bin_cmd!("attain")
}

const OUTCOMES: &str = "\
Outcome,Quiz 1,Midterm,Lab
CO-1,x,x,
CO-2,,,x
";

// Ann: CO-1 (95 + 85) / 2 = 90 -> 5, CO-2 72 -> 3
// Bob: CO-1 (70 + 71) / 2 = 70.5 -> 3, CO-2 no lab grade -> 1
const GRADES_001: &str = "\
Student,SIS User ID,Quiz 1 (101),Midterm (102),Lab (103)
Ann,1001,95,85,72
Bob,1002,70,71,
Points Possible,,100,100,100
";

const PROGRAM_OUTCOMES: &str = "Outcome\nPO-1\nPO-2\n";

const CO_PO: &str = "\
Outcome,PO-1,PO-2
COMP-101.CO-1,1,0
COMP-101.CO-2,1,2
MATH-201.CO-1,5,5
";

const INSTITUTION_OUTCOMES: &str = "Outcome\nIO-1\n";

const PO_IO: &str = "\
Outcome,IO-1
PO-1,3
PO-2,1
";

/// Write a two-section run: section 001 is complete, section 002 has no
/// grades file. Returns the configuration path.
#[allow(dead_code)]
pub fn write_fixture(dir: &Path) -> PathBuf {
    write_fixture_with(dir, "")
}

/// Same as [`write_fixture`] with extra `[output]` lines
#[allow(dead_code)]
pub fn write_fixture_with(dir: &Path, output_extra: &str) -> PathBuf {
    fs::create_dir_all(dir.join("comp101")).unwrap();
    fs::write(dir.join("comp101/outcomes.csv"), OUTCOMES).unwrap();
    fs::write(dir.join("comp101/grades_001.csv"), GRADES_001).unwrap();
    fs::write(dir.join("program_outcomes.csv"), PROGRAM_OUTCOMES).unwrap();
    fs::write(dir.join("co_po.csv"), CO_PO).unwrap();
    fs::write(dir.join("institution_outcomes.csv"), INSTITUTION_OUTCOMES).unwrap();
    fs::write(dir.join("po_io.csv"), PO_IO).unwrap();

    let config = format!(
        r#"
[[courses]]
name = "COMP-101"
semester = "S24"
outcomes_file = "comp101/outcomes.csv"

[[courses.sections]]
section = "001"
grades_file = "comp101/grades_001.csv"

[[courses.sections]]
section = "002"
grades_file = "comp101/grades_002.csv"

[mappings]
program_outcomes_file = "program_outcomes.csv"
co_to_po_file = "co_po.csv"
institution_outcomes_file = "institution_outcomes.csv"
po_to_io_file = "po_io.csv"

[output]
directory = "results"
{output_extra}
"#
    );
    let path = dir.join("run.toml");
    fs::write(&path, config).unwrap();
    path
}

/// Drop section 002 so every configured section can complete
#[allow(dead_code)]
pub fn remove_broken_section(config: &Path) {
    let text = fs::read_to_string(config).unwrap();
    let fixed = text.replace(
        "[[courses.sections]]\nsection = \"002\"\ngrades_file = \"comp101/grades_002.csv\"\n",
        "",
    );
    fs::write(config, fixed).unwrap();
}
