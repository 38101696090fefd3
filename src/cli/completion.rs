//! Shell completion generation.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

/// Write the completion script for `shell` to `out`.
pub fn generate_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = crate::cli::Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut out = Vec::new();
        generate_completions(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("flockbot"));
        assert!(script.contains("parse"));
    }
}
