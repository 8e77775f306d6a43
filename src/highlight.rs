use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use serde_json::Value;

const INDENT: &str = "  ";

/// Pretty-prints a JSON value as coloured lines, one span per token.
pub fn highlight_value(value: &Value) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    write_value(value, 0, &mut current, &mut lines);
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn bracket(text: &'static str) -> Span<'static> {
    Span::styled(
        text,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn punct(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::Gray))
}

fn key(text: &str) -> Span<'static> {
    Span::styled(
        Value::String(text.to_string()).to_string(),
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
    )
}

fn scalar(value: &Value) -> Span<'static> {
    match value {
        Value::String(s) => Span::styled(
            Value::String(s.clone()).to_string(),
            Style::default().fg(Color::Green),
        ),
        Value::Number(n) => Span::styled(n.to_string(), Style::default().fg(Color::Magenta)),
        Value::Bool(b) => Span::styled(
            b.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        _ => Span::styled(
            "null",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn newline(depth: usize, current: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(std::mem::take(current)));
    if depth > 0 {
        current.push(Span::raw(INDENT.repeat(depth)));
    }
}

fn write_value(
    value: &Value,
    depth: usize,
    current: &mut Vec<Span<'static>>,
    lines: &mut Vec<Line<'static>>,
) {
    match value {
        Value::Object(map) if map.is_empty() => current.push(bracket("{}")),
        Value::Array(items) if items.is_empty() => current.push(bracket("[]")),
        Value::Object(map) => {
            current.push(bracket("{"));
            let last = map.len() - 1;
            for (i, (k, v)) in map.iter().enumerate() {
                newline(depth + 1, current, lines);
                current.push(key(k));
                current.push(punct(": "));
                write_value(v, depth + 1, current, lines);
                if i < last {
                    current.push(punct(","));
                }
            }
            newline(depth, current, lines);
            current.push(bracket("}"));
        }
        Value::Array(items) => {
            current.push(bracket("["));
            let last = items.len() - 1;
            for (i, item) in items.iter().enumerate() {
                newline(depth + 1, current, lines);
                write_value(item, depth + 1, current, lines);
                if i < last {
                    current.push(punct(","));
                }
            }
            newline(depth, current, lines);
            current.push(bracket("]"));
        }
        other => current.push(scalar(other)),
    }
}
