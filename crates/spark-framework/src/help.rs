//! The built-in `help` command.

use async_trait::async_trait;

use spark_core::{Affinity, Args, Command, CommandContext, CommandRegistry, CommandResult};

/// Upper bound on the length of one help message.
pub const HELP_CHUNK_LIMIT: usize = 1900;

const FENCE_OPEN: &str = "```diff";
const FENCE_CLOSE: &str = "```";

/// Lists every registered command.
///
/// Runs on the main loop: it only reads the registry.
#[derive(Debug, Default)]
pub struct HelpCommand;

impl HelpCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "~ List every command"
    }

    fn affinity(&self) -> Affinity {
        Affinity::MainLoop
    }

    async fn invoke(&self, ctx: CommandContext, _args: Args) -> CommandResult<()> {
        for page in render_help(ctx.prefix(), ctx.registry()) {
            ctx.say(page).await?;
        }
        Ok(())
    }
}

/// Renders the help listing as one or more fenced messages.
///
/// Each message stays within [`HELP_CHUNK_LIMIT`] bytes unless a single
/// entry is longer than that on its own.
pub fn render_help(prefix: &str, registry: &CommandRegistry) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = format!(
        "{FENCE_OPEN}\n\
         <arg>: Mandatory | [arg]: Optional | (arg): Default value | ...: Can provide multiple values\n\
         You can also pipe commands using $(<command>), i.e. {prefix}echo $({prefix}upper hi)\n\
         =========="
    );

    for command in registry.iter() {
        let entry = format!(
            "\n\n{prefix}{} {}{}",
            command.name(),
            command.description(),
            command.usage()
        );
        if page.len() + entry.len() + FENCE_CLOSE.len() > HELP_CHUNK_LIMIT && page != FENCE_OPEN {
            page.push_str(FENCE_CLOSE);
            pages.push(std::mem::replace(&mut page, FENCE_OPEN.to_string()));
        }
        page.push_str(&entry);
    }

    page.push_str(FENCE_CLOSE);
    pages.push(page);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_core::command_fn;

    fn registry(count: usize, description: &str) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for i in 0..count {
            registry
                .register(
                    command_fn(format!("cmd{i}"), |_ctx, _args| async { Ok(()) })
                        .description(description)
                        .usage(" <text>"),
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_single_page() {
        let pages = render_help("!", &registry(2, "~ Does things"));
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert!(page.starts_with("```diff\n<arg>: Mandatory"));
        assert!(page.contains("$(!upper hi)"));
        assert!(page.contains("\n\n!cmd0 ~ Does things <text>"));
        assert!(page.contains("\n\n!cmd1 ~ Does things <text>"));
        assert!(page.ends_with("```"));
    }

    #[test]
    fn test_pages_respect_limit() {
        let description = "~ ".to_string() + &"x".repeat(200);
        let pages = render_help("!", &registry(30, &description));

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.len() <= HELP_CHUNK_LIMIT, "page too long: {}", page.len());
            assert!(page.starts_with(FENCE_OPEN));
            assert!(page.ends_with(FENCE_CLOSE));
        }
        let listed: usize = pages.iter().map(|p| p.matches("\n\n!cmd").count()).sum();
        assert_eq!(listed, 30);
    }

    #[test]
    fn test_empty_registry() {
        let pages = render_help(".", &CommandRegistry::new());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("$(.upper hi)"));
    }
}
