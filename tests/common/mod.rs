#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "adm@unidade.mil.br";
pub const OFFICER_EMAIL: &str = "ten.araujo@unidade.mil.br";
pub const PASSWORD: &str = "segredo123";

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub pdfs: PathBuf,
    pub roster: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let config_dir = home.join(".config/fotrack");
        fs::create_dir_all(&config_dir).expect("create isolated config dir");

        let pdfs = tmp.path().join("pdfs");
        fs::write(
            config_dir.join("config.toml"),
            format!(
                "[controls]\nout_dir = \"{}\"\n\n[access]\nbootstrap_admins = [\"{}\"]\n",
                pdfs.display(),
                ADMIN_EMAIL
            ),
        )
        .expect("write config");

        let roster = tmp.path().join("candidatos.csv");
        fs::write(
            &roster,
            "Nome,Tipo,Ativo\nAna Reis,cfg,true\nBruno Dias,cfg,true\nCarla Lima,cfs,false\n",
        )
        .expect("write roster");

        Self {
            _tmp: tmp,
            home,
            pdfs,
            roster,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("fotrack");
        cmd.env("HOME", &self.home).env_remove("RUST_LOG");
        cmd
    }

    /// Runs with `--json`, expects success and returns the `data` payload.
    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let v: Value = serde_json::from_slice(&out).expect("valid json output");
        assert_eq!(v["ok"], true, "unexpected envelope: {}", v);
        v["data"].clone()
    }

    /// Runs with `--json`, expects failure and returns the error code.
    pub fn run_json_fail(&self, args: &[&str]) -> String {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        let v: Value = serde_json::from_slice(&out).expect("valid json error envelope");
        assert_eq!(v["ok"], false);
        v["error"]["code"]
            .as_str()
            .expect("error code")
            .to_string()
    }

    pub fn sign_up(&self, email: &str, war_name: &str, rank: &str) -> Value {
        self.run_json(&[
            "auth",
            "sign-up",
            "--email",
            email,
            "--password",
            PASSWORD,
            "--nome-guerra",
            war_name,
            "--posto",
            rank,
        ])
    }

    pub fn sign_in(&self, email: &str) -> Value {
        self.run_json(&["auth", "sign-in", "--email", email, "--password", PASSWORD])
    }

    /// Admin and officer accounts plus the candidate roster; leaves the
    /// officer signed in.
    pub fn seeded() -> Self {
        let env = Self::new();
        env.sign_up(ADMIN_EMAIL, "Moura", "Capitão");
        env.run_json(&[
            "candidates",
            "import",
            env.roster.to_str().expect("roster path utf8"),
        ]);
        env.sign_up(OFFICER_EMAIL, "Araújo", "1º Tenente");
        env
    }

    pub fn candidate_id(&self, name: &str) -> String {
        let list = self.run_json(&["candidates", "list"]);
        list.as_array()
            .expect("candidate array")
            .iter()
            .find(|c| c["name"] == name)
            .and_then(|c| c["id"].as_str())
            .expect("candidate present")
            .to_string()
    }

    pub fn submit(&self, kind: &str, candidate: &str, description: &str) -> Value {
        self.run_json(&[
            "fo",
            "submit",
            "--kind",
            kind,
            "--candidate",
            candidate,
            "--description",
            description,
        ])
    }
}
