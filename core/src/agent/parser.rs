//! Tool call parser
//!
//! Extracts a structured invocation from raw model output that mixes
//! prose with an embedded call marker:
//!
//! ```text
//! I'll check the directory first.
//! [TOOL_CALL] list_files({"path": "."}) [/TOOL_CALL]
//! ```
//!
//! Parsing is intentionally defensive: nested JSON, escaped quotes, and
//! literal newlines inside string values all survive, and every failure
//! degrades to "no call found" — the raw text becomes a plain answer.
//! Nothing here executes anything; this is a pure text -> structure
//! transform.

use super::ToolInvocation;
use crate::tools::JsonMap;
use regex::Regex;
use std::sync::OnceLock;

/// Marker opening a tool call block.
pub const MARKER_OPEN: &str = "[TOOL_CALL]";
/// Marker closing a tool call block.
pub const MARKER_CLOSE: &str = "[/TOOL_CALL]";

/// Outcome of parsing one assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTurn {
    /// The invocation, when the reply requested one
    pub invocation: Option<ToolInvocation>,
    /// Reply text with the call marker stripped; the final answer when no
    /// invocation was found
    pub reasoning: String,
}

impl ParsedTurn {
    fn final_answer(content: &str) -> Self {
        Self {
            invocation: None,
            reasoning: content.trim().to_string(),
        }
    }
}

/// Parse one assistant reply into an optional invocation plus reasoning.
pub fn parse_turn(content: &str) -> ParsedTurn {
    if content.trim().is_empty() {
        return ParsedTurn::final_answer(content);
    }

    if let Some(open) = content.find(MARKER_OPEN) {
        let after_open = open + MARKER_OPEN.len();
        let (block, strip_end) = match content[after_open..].find(MARKER_CLOSE) {
            Some(rel) => (
                &content[after_open..after_open + rel],
                after_open + rel + MARKER_CLOSE.len(),
            ),
            None => (&content[after_open..], content.len()),
        };

        if let Some(invocation) = parse_call_block(block) {
            let mut reasoning = String::new();
            reasoning.push_str(&content[..open]);
            reasoning.push_str(&content[strip_end..]);
            return ParsedTurn {
                invocation: Some(invocation),
                reasoning: reasoning.trim().to_string(),
            };
        }

        // Marker present but unusable: fail open toward conversation
        // continuity, never toward guessed execution.
        return ParsedTurn::final_answer(content);
    }

    // Secondary form: a bare {"name": ..., "arguments": {...}} object,
    // considered only when the text is talking about a tool call at all.
    let lower = content.to_lowercase();
    if lower.contains("tool_call") || lower.contains("tool_use") {
        for candidate in extract_balanced_json_objects(content) {
            if let Some(invocation) = parse_named_arguments_object(&candidate) {
                let reasoning = content.replacen(&candidate, "", 1).trim().to_string();
                return ParsedTurn {
                    invocation: Some(invocation),
                    reasoning,
                };
            }
        }
    }

    ParsedTurn::final_answer(content)
}

/// Parse the inside of a marker block: `name({...})` or `name()`.
fn parse_call_block(block: &str) -> Option<ToolInvocation> {
    let block = block.trim();
    let paren = block.find('(');
    let brace = block.find('{');

    let name_end = match (paren, brace) {
        (Some(p), Some(b)) => p.min(b),
        (Some(p), None) => p,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    let name = block[..name_end].trim();
    if !is_identifier(name) {
        return None;
    }

    let arguments = match brace {
        Some(_) => {
            let objects = extract_balanced_json_objects(block);
            let raw = objects.first()?;
            parse_arguments(raw)?
        }
        // `name()` with no braces at all: an argument-free call.
        None => JsonMap::new(),
    };

    Some(ToolInvocation {
        name: name.to_string(),
        arguments,
    })
}

/// Strict JSON first, newline normalization second, loose scalar pairs last.
fn parse_arguments(raw: &str) -> Option<JsonMap> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(raw) {
        return Some(map);
    }

    // Some models emit invalid JSON with literal newlines inside string
    // values. Normalize and retry before giving up on strict parsing.
    let normalized = escape_unescaped_newlines_in_json_strings(raw);
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(&normalized) {
        return Some(map);
    }

    parse_loose_scalar_pairs(raw)
}

/// Best-effort `key: value` extraction over unambiguous scalars only.
///
/// The moment the argument text carries nested structure that strict
/// parsing already rejected, this abstains — a tool must never run on
/// arguments that could not be typed with confidence.
fn parse_loose_scalar_pairs(raw: &str) -> Option<JsonMap> {
    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    if inner.contains('{') || inner.contains('[') {
        return None;
    }

    static PAIR_RE: OnceLock<Regex> = OnceLock::new();
    let pair_re = PAIR_RE.get_or_init(|| {
        Regex::new(
            r#""?([A-Za-z_][A-Za-z0-9_]*)"?\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?|true|false)"#,
        )
        .expect("valid regex")
    });

    let mut map = JsonMap::new();
    for caps in pair_re.captures_iter(inner) {
        let key = caps[1].to_string();
        let value: serde_json::Value = serde_json::from_str(&caps[2]).ok()?;
        map.insert(key, value);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// Parse a standalone `{"name": ..., "arguments": {...}}` object.
fn parse_named_arguments_object(candidate: &str) -> Option<ToolInvocation> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let name = value.get("name")?.as_str()?;
    if !is_identifier(name) {
        return None;
    }
    let arguments = value.get("arguments")?.as_object()?.clone();
    Some(ToolInvocation {
        name: name.to_string(),
        arguments,
    })
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Extract top-level `{ ... }` candidates by brace balancing.
///
/// Respects JSON strings and escapes, so braces inside strings don't
/// affect balancing.
fn extract_balanced_json_objects(content: &str) -> Vec<String> {
    let mut out = Vec::new();

    let mut in_string = false;
    let mut escape = false;
    let mut depth: i32 = 0;
    let mut start: Option<usize> = None;

    for (i, ch) in content.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                if depth > 0 {
                    in_string = true;
                }
            }
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            out.push(content[s..=i].to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    out
}

/// Convert invalid JSON containing literal newlines inside string values
/// into valid JSON. Only escapes `\n`/`\r` when inside a string literal.
fn escape_unescaped_newlines_in_json_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escape = false;

    for ch in input.chars() {
        if in_string {
            if escape {
                out.push(ch);
                escape = false;
                continue;
            }
            match ch {
                '\\' => {
                    out.push(ch);
                    escape = true;
                }
                '"' => {
                    out.push(ch);
                    in_string = false;
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
            if ch == '"' {
                in_string = true;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_means_final_answer() {
        let parsed = parse_turn("The workspace is empty, nothing to do.");
        assert!(parsed.invocation.is_none());
        assert_eq!(parsed.reasoning, "The workspace is empty, nothing to do.");

        // Braces alone never trigger a call.
        let parsed = parse_turn(r#"Here is some JSON: {"a": 1}"#);
        assert!(parsed.invocation.is_none());
    }

    #[test]
    fn marker_call_with_surrounding_prose() {
        let content = "Let me look around first.\n[TOOL_CALL] list_files({\"path\": \".\"}) [/TOOL_CALL]\nBack soon.";
        let parsed = parse_turn(content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "list_files");
        assert_eq!(invocation.arguments["path"], ".");
        assert_eq!(parsed.reasoning, "Let me look around first.\n\nBack soon.");
    }

    #[test]
    fn nested_json_and_escaped_quotes_survive() {
        let content = r#"[TOOL_CALL] write_file({"path": "cfg.json", "content": "{\"nested\": {\"deep\": true}}"}) [/TOOL_CALL]"#;
        let parsed = parse_turn(content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "write_file");
        assert_eq!(
            invocation.arguments["content"],
            r#"{"nested": {"deep": true}}"#
        );
    }

    #[test]
    fn multiline_string_values_are_normalized() {
        let content = "[TOOL_CALL] write_file({\"path\": \"a.txt\", \"content\": \"line 1\nline 2\"}) [/TOOL_CALL]";
        let parsed = parse_turn(content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.arguments["content"], "line 1\nline 2");
    }

    #[test]
    fn argument_round_trip_is_exact() {
        let args = serde_json::json!({
            "cmd": "grep -r \"TODO\" .",
            "timeout": 5,
            "verbose": true,
        });
        let content = format!("[TOOL_CALL] execute_command({}) [/TOOL_CALL]", args);
        let parsed = parse_turn(&content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(serde_json::Value::Object(invocation.arguments), args);
    }

    #[test]
    fn argument_free_call() {
        let parsed = parse_turn("[TOOL_CALL] get_system_info() [/TOOL_CALL]");
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "get_system_info");
        assert!(invocation.arguments.is_empty());
    }

    #[test]
    fn loose_fallback_handles_scalar_pairs() {
        let parsed = parse_turn(r#"[TOOL_CALL] read_file({path: "notes.txt"}) [/TOOL_CALL]"#);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "read_file");
        assert_eq!(invocation.arguments["path"], "notes.txt");
    }

    #[test]
    fn loose_fallback_abstains_on_nested_structure() {
        // Broken quoting plus nesting: nothing unambiguous to extract, so
        // the whole reply degrades to a final answer.
        let content = r#"[TOOL_CALL] write_file({path: "a", content: {broken: ]}) [/TOOL_CALL]"#;
        let parsed = parse_turn(content);
        assert!(parsed.invocation.is_none());
        assert_eq!(parsed.reasoning, content);
    }

    #[test]
    fn garbage_in_marker_degrades_to_final_answer() {
        let content = "[TOOL_CALL] ??? [/TOOL_CALL] hello";
        let parsed = parse_turn(content);
        assert!(parsed.invocation.is_none());
        assert_eq!(parsed.reasoning, content);
    }

    #[test]
    fn bare_named_arguments_object_form() {
        let content = r#"Using a tool_call here: {"name": "read_file", "arguments": {"path": "x"}}"#;
        let parsed = parse_turn(content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "read_file");
        assert_eq!(invocation.arguments["path"], "x");
        assert_eq!(parsed.reasoning, "Using a tool_call here:");
    }

    #[test]
    fn missing_close_marker_is_tolerated() {
        let content = r#"[TOOL_CALL] list_files({"path": "src"})"#;
        let parsed = parse_turn(content);
        let invocation = parsed.invocation.unwrap();
        assert_eq!(invocation.name, "list_files");
        assert_eq!(invocation.arguments["path"], "src");
        assert!(parsed.reasoning.is_empty());
    }
}
