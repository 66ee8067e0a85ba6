//! Parser Tests
//!
//! These tests verify:
//! - Valid GET / SET / DEL lines
//! - Whitespace handling
//! - The order in which malformed lines are rejected

use kvdb::protocol::{parse, Command, CommandName};
use kvdb::QueryError;

// =============================================================================
// Helper Functions
// =============================================================================

fn assert_parses(input: &str, name: CommandName, args: &[&str]) {
    let command = parse(input).unwrap_or_else(|e| panic!("{input:?} failed: {e}"));
    assert_eq!(command.name(), name, "input: {input:?}");
    assert_eq!(command.args(), args, "input: {input:?}");
    assert_eq!(command.key(), args[0], "input: {input:?}");
}

fn assert_rejects(input: &str, expected: QueryError) {
    assert_eq!(parse(input), Err(expected), "input: {input:?}");
}

// =============================================================================
// Valid Commands
// =============================================================================

#[test]
fn test_parse_set() {
    assert_parses(
        "SET weather_2_pm cold_moscow_weather",
        CommandName::Set,
        &["weather_2_pm", "cold_moscow_weather"],
    );
}

#[test]
fn test_parse_get() {
    assert_parses("GET key123", CommandName::Get, &["key123"]);
}

#[test]
fn test_parse_del() {
    assert_parses("DEL key_to_delete", CommandName::Del, &["key_to_delete"]);
}

#[test]
fn test_extra_spaces_between_words() {
    assert_parses("SET   key   value", CommandName::Set, &["key", "value"]);
}

#[test]
fn test_spaces_at_start_and_end() {
    assert_parses("   GET key   ", CommandName::Get, &["key"]);
}

#[test]
fn test_tabs_and_newlines_separate_tokens() {
    assert_parses("SET\tkey\nvalue\r\n", CommandName::Set, &["key", "value"]);
}

#[test]
fn test_arguments_keep_punctuation() {
    assert_parses("SET /path/to/file value*", CommandName::Set, &["/path/to/file", "value*"]);
}

#[test]
fn test_command_display_round_trips() {
    let command = parse("  SET  a   b ").unwrap();
    assert_eq!(command.to_string(), "SET a b");
    assert_eq!(parse(&command.to_string()).unwrap(), command);
}

// =============================================================================
// Rejected Lines
// =============================================================================

#[test]
fn test_blank_line_is_invalid() {
    assert_rejects("", QueryError::InvalidQuery);
    assert_rejects("   ", QueryError::InvalidQuery);
}

#[test]
fn test_unknown_command() {
    assert_rejects("FOO arg", QueryError::UnknownCommand);
    assert_rejects("FOO", QueryError::UnknownCommand);
}

#[test]
fn test_lowercase_command_is_unknown() {
    assert_rejects("set key value", QueryError::UnknownCommand);
    assert_rejects("Get key", QueryError::UnknownCommand);
}

#[test]
fn test_wrong_argument_count() {
    assert_rejects("SET key_only", QueryError::WrongArgumentCount);
    assert_rejects("SET key ", QueryError::WrongArgumentCount);
    assert_rejects("GET key extra", QueryError::WrongArgumentCount);
    assert_rejects("GET", QueryError::WrongArgumentCount);
    assert_rejects("DEL", QueryError::WrongArgumentCount);
}

#[test]
fn test_too_many_tokens() {
    assert_rejects("SET key value extra", QueryError::TooManyArguments);
}

#[test]
fn test_token_count_checked_before_command_name() {
    assert_rejects("FOO a b c", QueryError::TooManyArguments);
}

#[test]
fn test_argument_count_errors_share_wire_text() {
    assert_eq!(QueryError::TooManyArguments.to_string(), "invalid number of args");
    assert_eq!(QueryError::WrongArgumentCount.to_string(), "invalid number of args");
    assert_eq!(QueryError::UnknownCommand.to_string(), "unknown command");
    assert_eq!(QueryError::InvalidQuery.to_string(), "invalid query");
}

// =============================================================================
// Checked Construction
// =============================================================================

#[test]
fn test_command_new_rejects_untokenizable_arguments() {
    let spaced = Command::new(CommandName::Set, vec!["k".to_string(), "a b".to_string()]);
    assert_eq!(spaced, Err(QueryError::InvalidArgument));

    let empty = Command::new(CommandName::Get, vec![String::new()]);
    assert_eq!(empty, Err(QueryError::InvalidArgument));

    let tabbed = Command::new(CommandName::Del, vec!["a\tb".to_string()]);
    assert_eq!(tabbed, Err(QueryError::InvalidArgument));
}

#[test]
fn test_command_new_checks_count_first() {
    let command = Command::new(CommandName::Set, vec!["a b".to_string()]);
    assert_eq!(command, Err(QueryError::WrongArgumentCount));
}

#[test]
fn test_constructed_command_parses_back() {
    let command = Command::new(CommandName::Set, vec!["key".to_string(), "value*".to_string()]).unwrap();
    assert_eq!(parse(&command.to_string()), Ok(command));
}
