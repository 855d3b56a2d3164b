//! Scripted command runner shared by the unit tests

use crate::core::traits::{CommandOutput, CommandRunner, CommandSpec};
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use std::sync::Mutex;

/// A command as seen by [`ScriptedRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub env_keys: Vec<String>,
}

impl RecordedCall {
    pub fn line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct Rule {
    program: String,
    prefix: Vec<String>,
    output: CommandOutput,
}

/// Answers commands from a rule list (first match wins, default success)
/// and records every call.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &str, prefix: &[&str], output: CommandOutput) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output,
        });
        self
    }

    pub fn fail(self, program: &str, prefix: &[&str], stderr: &str) -> Self {
        self.respond(program, prefix, CommandOutput::failed(1, stderr))
    }

    pub fn succeed_with(self, program: &str, prefix: &[&str], stdout: &str) -> Self {
        self.respond(program, prefix, CommandOutput::ok(stdout))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::line).collect()
    }

    /// True when any recorded call starts with `program prefix...`
    pub fn ran(&self, program: &str, prefix: &[&str]) -> bool {
        self.calls().iter().any(|c| {
            c.program == program
                && c.args.len() >= prefix.len()
                && c.args.iter().zip(prefix).all(|(a, p)| a == p)
        })
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(RecordedCall {
            program: spec.program.clone(),
            args: spec.args.clone(),
            stdin: spec.stdin.clone(),
            env_keys: spec.envs.iter().map(|(k, _)| k.clone()).collect(),
        });

        let output = self
            .rules
            .iter()
            .find(|rule| {
                let prefix: Vec<&str> = rule.prefix.iter().map(String::as_str).collect();
                spec.starts_with(&rule.program, &prefix)
            })
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""));

        Ok(output)
    }
}
