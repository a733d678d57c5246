//! Command handlers

use core::fmt::Write;

use super::parser::ParsedCommand;
use super::ConsoleError;
use crate::level::Level;
use crate::registry::Registry;

type Handler = fn(&ParsedCommand<'_>, &mut Registry, &mut dyn Write) -> Result<(), ConsoleError>;

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub usage: &'static str,
    pub brief: &'static str,
    pub handler: Handler,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", usage: "help [cmd]", brief: "List commands", handler: cmd_help },
    CommandDescriptor { name: "level", usage: "level [tag] <level>", brief: "Set global or tag level", handler: cmd_level },
    CommandDescriptor { name: "clear", usage: "clear <tag>", brief: "Drop tag level override", handler: cmd_clear },
    CommandDescriptor { name: "unroute", usage: "unroute <tag>", brief: "Drop tag sink override", handler: cmd_unroute },
    CommandDescriptor { name: "show", usage: "show [tag]", brief: "Show effective configuration", handler: cmd_show },
    CommandDescriptor { name: "tags", usage: "tags", brief: "List configured tags", handler: cmd_tags },
    CommandDescriptor { name: "set", usage: "set <directives>", brief: "Apply e.g. warning,NET=debug", handler: cmd_set },
];

/// Execute a parsed command against `registry`
pub fn execute(
    cmd: &ParsedCommand<'_>,
    registry: &mut Registry,
    out: &mut dyn Write,
) -> Result<(), ConsoleError> {
    if cmd.is_empty() {
        return Ok(()); // Empty line, do nothing
    }

    let descriptor = COMMANDS
        .iter()
        .find(|c| c.name == cmd.command)
        .ok_or(ConsoleError::UnknownCommand)?;

    (descriptor.handler)(cmd, registry, out)
}

/// Get all command names
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|c| c.name)
}

// --- Command Implementations ---

fn cmd_help(cmd: &ParsedCommand<'_>, _: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(name) = cmd.arg(0) {
        let c = COMMANDS
            .iter()
            .find(|c| c.name == name)
            .ok_or(ConsoleError::UnknownCommand)?;
        let _ = writeln!(out, "{}: {}", c.usage, c.brief);
    } else {
        for c in COMMANDS {
            let _ = writeln!(out, "  {:<20} {}", c.usage, c.brief);
        }
    }
    Ok(())
}

fn cmd_level(cmd: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    match (cmd.arg(0), cmd.arg(1)) {
        (None, _) => Err(ConsoleError::MissingArg),
        (Some(level), None) => {
            let level: Level = level.parse()?;
            registry.set_global_level(level);
            let _ = writeln!(out, "global={}", level);
            Ok(())
        }
        (Some(tag), Some(level)) => {
            let level: Level = level.parse()?;
            registry.set_level(tag, level);
            let _ = writeln!(out, "{}={}", tag, level);
            Ok(())
        }
    }
}

fn cmd_clear(cmd: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let tag = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    registry.clear_level(tag);
    let _ = writeln!(out, "{}={} (global)", tag, registry.level(tag));
    Ok(())
}

fn cmd_unroute(cmd: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let tag = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    registry.clear_sinks(tag);
    let _ = writeln!(out, "{}: global sinks", tag);
    Ok(())
}

fn cmd_show(cmd: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(tag) = cmd.arg(0) {
        show_tag(registry, tag, out);
        return Ok(());
    }

    let _ = writeln!(
        out,
        "global: level={} sinks={}",
        registry.global_level(),
        registry.global_sinks().len()
    );
    for tag in registry.tags() {
        show_tag(registry, tag, out);
    }
    Ok(())
}

fn show_tag(registry: &Registry, tag: &str, out: &mut dyn Write) {
    let cfg = registry.resolve(tag);
    let _ = writeln!(
        out,
        "{}: level={} ({}) sinks={} ({})",
        tag,
        cfg.level,
        origin(cfg.level_inherited),
        cfg.sinks.len(),
        origin(cfg.sinks_inherited)
    );
}

fn origin(inherited: bool) -> &'static str {
    if inherited {
        "global"
    } else {
        "tag"
    }
}

fn cmd_tags(_: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let tags = registry.tags();
    if tags.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for tag in tags {
        let _ = writeln!(out, "  {}", tag);
    }
    Ok(())
}

fn cmd_set(cmd: &ParsedCommand<'_>, registry: &mut Registry, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let directives = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    registry.apply_directives(directives)?;
    let _ = writeln!(out, "ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::parse_line;
    use crate::sink::MemorySink;

    fn run(line: &str, registry: &mut Registry) -> (Result<(), ConsoleError>, String) {
        let mut out = String::new();
        let result = execute(&parse_line(line), registry, &mut out);
        (result, out)
    }

    #[test]
    fn test_show_reports_inheritance() {
        let mut reg = Registry::new();
        reg.add_global_sink(Box::new(MemorySink::new()));
        reg.set_level("NET", Level::Debug);

        let (result, out) = run("show NET", &mut reg);
        assert!(result.is_ok());
        assert_eq!(out, "NET: level=debug (tag) sinks=1 (global)\n");
    }

    #[test]
    fn test_show_all_lists_globals_then_tags() {
        let mut reg = Registry::new();
        reg.set_global_level(Level::Warning);
        reg.set_sinks("USB", Vec::new());

        let (_, out) = run("show", &mut reg);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "global: level=warning sinks=0");
        assert_eq!(lines[1], "USB: level=warning (global) sinks=0 (tag)");
    }

    #[test]
    fn test_help_for_single_command() {
        let mut reg = Registry::new();
        let (result, out) = run("help level", &mut reg);
        assert!(result.is_ok());
        assert!(out.starts_with("level [tag] <level>"));

        assert_eq!(run("help nope", &mut reg).0, Err(ConsoleError::UnknownCommand));
    }
}
