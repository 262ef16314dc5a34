//! The console command table: a keyword-to-alias lookup feeding a single
//! `match`, rather than a long `if`/`else if` chain over raw strings.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    Continue,
    Step,
    Verbose,
    Break,
    Clear,
    Run,
    Quit,
    Reset,
    Read,
    Write,
    Vblank,
    DebugInterrupt,
    Help,
}

const ALIASES: &[(&str, DebugCommand)] = &[
    ("c", DebugCommand::Continue),
    ("continue", DebugCommand::Continue),
    ("s", DebugCommand::Step),
    ("step", DebugCommand::Step),
    ("v", DebugCommand::Verbose),
    ("verbose", DebugCommand::Verbose),
    ("b", DebugCommand::Break),
    ("break", DebugCommand::Break),
    ("clear", DebugCommand::Clear),
    ("r", DebugCommand::Run),
    ("run", DebugCommand::Run),
    ("q", DebugCommand::Quit),
    ("quit", DebugCommand::Quit),
    ("exit", DebugCommand::Quit),
    ("reset", DebugCommand::Reset),
    ("read", DebugCommand::Read),
    ("ld", DebugCommand::Read),
    ("write", DebugCommand::Write),
    ("vblank", DebugCommand::Vblank),
    ("debug", DebugCommand::DebugInterrupt),
    ("?", DebugCommand::Help),
    ("help", DebugCommand::Help),
];

/// Resolves a keyword (already lowercased by the caller) to its command, if
/// any alias matches.
pub fn resolve(keyword: &str) -> Option<DebugCommand> {
    ALIASES.iter().find(|(alias, _)| *alias == keyword).map(|(_, cmd)| *cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_aliases_resolve_to_the_same_command() {
        assert_eq!(resolve("c"), resolve("continue"));
        assert_eq!(resolve("s"), resolve("step"));
        assert_eq!(resolve("q"), resolve("quit"));
        assert_eq!(resolve("q"), resolve("exit"));
    }

    #[test]
    fn unknown_keyword_resolves_to_none() {
        assert_eq!(resolve("frobnicate"), None);
    }

    #[test]
    fn help_aliases_both_resolve() {
        assert_eq!(resolve("?"), Some(DebugCommand::Help));
        assert_eq!(resolve("help"), Some(DebugCommand::Help));
    }
}
