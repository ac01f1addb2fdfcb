//! Slash commands typed into the input box.

/// A slash command, named without its leading `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl Command {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Name with aliases, e.g. `quit (exit, q)`.
    pub fn display_name(&self) -> String {
        if self.aliases.is_empty() {
            self.name.to_string()
        } else {
            format!("{} ({})", self.name, self.aliases.join(", "))
        }
    }
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "panel",
        aliases: &["toggle"],
        description: "Open or close the document panel",
    },
    Command {
        name: "reset",
        aliases: &["new"],
        description: "Start over with the default document",
    },
    Command {
        name: "save",
        aliases: &[],
        description: "Write the document to disk",
    },
    Command {
        name: "open",
        aliases: &[],
        description: "Open the document file in the default app",
    },
    Command {
        name: "help",
        aliases: &["?"],
        description: "List commands and key bindings",
    },
    Command {
        name: "quit",
        aliases: &["exit", "q"],
        description: "Exit quill",
    },
];

/// Parses `/name args` input into a known command.
pub fn find_command(input: &str) -> Option<&'static Command> {
    let name = input.trim().strip_prefix('/')?.split_whitespace().next()?;
    COMMANDS.iter().find(|c| c.is(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_command_by_name_and_alias() {
        assert_eq!(find_command("/panel").map(|c| c.name), Some("panel"));
        assert_eq!(find_command("  /EXIT ").map(|c| c.name), Some("quit"));
    }

    #[test]
    fn test_find_command_rejects_plain_text() {
        assert!(find_command("panel").is_none());
        assert!(find_command("/").is_none());
        assert!(find_command("/unknown").is_none());
    }

    #[test]
    fn test_display_name_lists_aliases() {
        let quit = find_command("/quit").expect("quit command");
        assert_eq!(quit.display_name(), "quit (exit, q)");
    }
}
