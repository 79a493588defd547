// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decides whether a configured command needs a shell to interpret it
//! (pipes, redirections, globs, variable expansion) when shell mode is
//! `Auto`, without pulling in a full POSIX shell grammar.

/// Whether the command should run through `/bin/sh -c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    Enable,
    Disable,
    Auto,
}

const SHELL_METACHARACTERS: &[char] =
    &['|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', '*', '?', '~', '\n'];

/// A single-element command list is treated as a shell string (it is
/// what a user typing `--command "a | b"` produces); a multi-element
/// command list is an argv array and is only shell-wrapped if asked to.
pub fn needs_shell(command: &[String], mode: ShellMode) -> bool {
    match mode {
        ShellMode::Enable => true,
        ShellMode::Disable => false,
        ShellMode::Auto => {
            command.len() == 1 && command[0].chars().any(|c| SHELL_METACHARACTERS.contains(&c))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_enable_always_uses_shell() {
        assert!(needs_shell(&["true".to_string()], ShellMode::Enable));
    }

    #[test]
    fn explicit_disable_never_uses_shell() {
        assert!(!needs_shell(&["echo hi | cat".to_string()], ShellMode::Disable));
    }

    #[test]
    fn auto_detects_pipe_in_single_string_command() {
        assert!(needs_shell(&["echo hi | cat".to_string()], ShellMode::Auto));
    }

    #[test]
    fn auto_leaves_plain_argv_command_alone() {
        let cmd = vec!["echo".to_string(), "hi".to_string()];
        assert!(!needs_shell(&cmd, ShellMode::Auto));
    }

    #[test]
    fn auto_leaves_single_word_command_alone() {
        assert!(!needs_shell(&["date".to_string()], ShellMode::Auto));
    }

    #[test]
    fn auto_detects_variable_expansion() {
        assert!(needs_shell(&["echo $HOME".to_string()], ShellMode::Auto));
    }

    #[test]
    fn auto_does_not_treat_multi_arg_command_as_shell_even_with_metacharacters() {
        // Metacharacters inside a single argv element (e.g. a glob meant
        // literally) shouldn't force shell mode when argv form was used.
        let cmd = vec!["grep".to_string(), "a|b".to_string()];
        assert!(!needs_shell(&cmd, ShellMode::Auto));
    }
}
