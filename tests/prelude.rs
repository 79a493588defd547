//! Shared test helpers for the `taskwrapper` binary specs.

use assert_cmd::Command;

pub struct Cmd(Command);

pub fn cli() -> Cmd {
    Cmd(Command::cargo_bin("taskwrapper").expect("taskwrapper binary built by cargo test harness"))
}

impl Cmd {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.0.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.0.env(key, value);
        self
    }

    pub fn passes(mut self) -> Output {
        let output = self.0.output().expect("taskwrapper spawned");
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        Output::from(output)
    }

    pub fn fails(mut self) -> Output {
        let output = self.0.output().expect("taskwrapper spawned");
        assert!(!output.status.success(), "expected failure, got success");
        Output::from(output)
    }
}

pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code().unwrap_or(-1),
        }
    }
}

impl Output {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn code_is(self, expected: i32) -> Self {
        assert_eq!(self.code, expected);
        self
    }
}
