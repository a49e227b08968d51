use std::fs;
use std::process::Command;

use tempfile::tempdir;

const TRAIN: &str = "Dates,Category,Descript,DayOfWeek,PdDistrict,Resolution,Address,X,Y\n\
2015-05-13 23:53:00,WARRANTS,WARRANT ARREST,Wednesday,NORTHERN,\"ARREST, BOOKED\",OAK ST / LAGUNA ST,-122.4258,37.7745\n\
2015-05-13 23:33:00,WARRANTS,WARRANT ARREST,Wednesday,NORTHERN,\"ARREST, BOOKED\",VANNESS AV / GREENWICH ST,-122.4243,37.8004\n\
2015-05-12 21:30:00,VEHICLE THEFT,STOLEN AUTOMOBILE,Tuesday,INGLESIDE,NONE,ALEMANY BL / SILVER AV,-122.4190,37.7310\n\
2015-05-12 20:00:00,VEHICLE THEFT,STOLEN AUTOMOBILE,Tuesday,INGLESIDE,NONE,MISSION ST / RUTH ST,-122.4380,37.7140\n\
2015-05-11 09:10:00,ROBBERY,ROBBERY ON THE STREET,Monday,TENDERLOIN,NONE,EDDY ST / JONES ST,-122.4124,37.7838\n";

const TEST: &str = "Id,Dates,DayOfWeek,PdDistrict,Address,X,Y\n\
0,2015-05-10 23:59:00,Monday,TENDERLOIN,TURK ST / TAYLOR ST,-122.4110,37.7830\n\
1,2015-05-10 23:51:00,Tuesday,INGLESIDE,3RD ST / REVERE AV,-122.4300,37.7200\n\
2,2015-05-10 23:50:00,Wednesday,NORTHERN,2000 Block of GOUGH ST,-122.4250,37.7900\n";

#[test]
fn run_subcommand_writes_submission_in_data_dir() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("train.small.csv"), TRAIN).expect("write training data");
    fs::write(tmp.path().join("test.small.csv"), TEST).expect("write test data");

    let exe = env!("CARGO_BIN_EXE_precinct");
    let status = Command::new(exe)
        .args([
            "run",
            "--data-dir",
            tmp.path().to_str().expect("path str"),
            "--output",
            "predictions.csv",
            "--sequential",
        ])
        .status()
        .expect("run precinct cli");
    assert!(status.success(), "CLI exited with status {status:?}");

    let submission =
        fs::read_to_string(tmp.path().join("predictions.csv")).expect("read submission");
    let mut lines = submission.lines();
    let header: Vec<&str> = lines.next().expect("header").split(',').collect();
    assert_eq!(header.len(), 40);
    assert_eq!(header[0], "Id");

    let expected = ["ROBBERY", "VEHICLE THEFT", "WARRANTS"];
    for (id, (line, category)) in lines.zip(expected).enumerate() {
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells[0], id.to_string());
        let hot: Vec<&str> = header
            .iter()
            .zip(&cells)
            .skip(1)
            .filter(|(_, cell)| **cell == "1")
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(hot, [category]);
    }
}

#[test]
fn config_file_is_applied_and_full_mode_reads_full_files() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("all.csv"), TRAIN).expect("write training data");
    fs::write(tmp.path().join("holdout.csv"), TEST).expect("write test data");
    let config_path = tmp.path().join("precinct.toml");
    fs::write(
        &config_path,
        format!(
            "data_dir = {:?}\noutput = \"full.csv\"\n\n[full]\ntrain_file = \"all.csv\"\ntest_file = \"holdout.csv\"\nn_trees = 3\n",
            tmp.path().to_str().expect("path str")
        ),
    )
    .expect("write config");

    let exe = env!("CARGO_BIN_EXE_precinct");
    let status = Command::new(exe)
        .args([
            "run",
            "--full",
            "--config",
            config_path.to_str().expect("path str"),
        ])
        .status()
        .expect("run precinct cli");

    assert!(status.success(), "CLI exited with status {status:?}");
    let submission = fs::read_to_string(tmp.path().join("full.csv")).expect("read submission");
    assert_eq!(submission.lines().count(), 4);
}

#[test]
fn missing_inputs_exit_with_failure() {
    let tmp = tempdir().expect("temporary directory");
    let exe = env!("CARGO_BIN_EXE_precinct");
    let output = Command::new(exe)
        .args(["run", "--data-dir", tmp.path().to_str().expect("path str")])
        .output()
        .expect("run precinct cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "unexpected stderr: {stderr}");
    assert!(!tmp.path().join("submission.csv").exists());
}
