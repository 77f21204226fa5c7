use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn run_help(home: &TempDir, args: &[&str]) {
    let mut cmd = cargo_bin_cmd!("fotrack");
    cmd.env("HOME", home.path())
        .args(args)
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn every_cli_command_has_help_path() {
    let home = TempDir::new().expect("temp home");

    // top-level
    run_help(&home, &[]);

    run_help(&home, &["auth"]);
    run_help(&home, &["auth", "sign-up"]);
    run_help(&home, &["auth", "sign-in"]);
    run_help(&home, &["auth", "sign-out"]);
    run_help(&home, &["auth", "whoami"]);

    run_help(&home, &["candidates"]);
    run_help(&home, &["candidates", "import"]);
    run_help(&home, &["candidates", "list"]);
    run_help(&home, &["candidates", "suggest"]);

    run_help(&home, &["fo"]);
    run_help(&home, &["fo", "submit"]);
    run_help(&home, &["fo", "suggest"]);

    run_help(&home, &["judge"]);
    run_help(&home, &["judge", "list"]);
    run_help(&home, &["judge", "record"]);

    run_help(&home, &["control"]);
    run_help(&home, &["control", "pending"]);
    run_help(&home, &["control", "close"]);
    run_help(&home, &["control", "resume"]);
    run_help(&home, &["control", "list"]);
    run_help(&home, &["control", "download"]);

    run_help(&home, &["stats"]);
    run_help(&home, &["stats", "counter"]);
    run_help(&home, &["stats", "most-sanctioned"]);
    run_help(&home, &["stats", "top-issuer"]);
    run_help(&home, &["stats", "suggest"]);
    run_help(&home, &["stats", "summary"]);

    run_help(&home, &["user"]);
    run_help(&home, &["user", "list"]);
    run_help(&home, &["user", "set-role"]);
}

#[test]
fn unknown_subcommand_is_rejected() {
    let home = TempDir::new().expect("temp home");
    cargo_bin_cmd!("fotrack")
        .env("HOME", home.path())
        .args(["control", "reopen"])
        .assert()
        .failure();
}
