// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shell command construction for the external tooling.
//!
//! Every tool invocation is a single `sh -c` string of the form
//! `export K1=V1 && export K2=V2 && <command>`. Values are not quoted;
//! they come from validated [`AlgorithmName`](crate::types::AlgorithmName)s,
//! integers, flags and temp paths.

use std::fmt;
use std::process::Command;

/// Environment-parameterized shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    command: String,
    env: Vec<(String, String)>,
}

impl ShellCommand {
    /// Start a command with no environment overrides.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: Vec::new(),
        }
    }

    /// Export `key=value` before the command runs.
    ///
    /// Setting the same key twice replaces the earlier value in place.
    pub fn env(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Export a boolean as `0` or `1`.
    pub fn flag(self, key: impl Into<String>, value: bool) -> Self {
        self.env(key, u8::from(value))
    }

    /// The command run after the exports.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Exported variables in insertion order.
    pub fn vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Render the full shell string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.env {
            out.push_str("export ");
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push_str(" && ");
        }
        out.push_str(&self.command);
        out
    }

    /// A `sh -c` process for the rendered string.
    pub fn to_process(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(self.render());
        cmd
    }

    /// Like [`to_process`](Self::to_process) but with stderr of the whole
    /// command list folded into stdout, so the caller reads one
    /// interleaved stream.
    pub fn to_merged_process(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!("{{ {}; }} 2>&1", self.render()));
        cmd
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
