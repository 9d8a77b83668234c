// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MarkdownV2 escaping for the Telegram Bot API.
//!
//! Outside code, every reserved character gets a backslash. Inside inline
//! code and fenced blocks only `\` is escaped (the closing backtick ends the
//! span). An unclosed span is escaped as ordinary text.

/// Characters reserved by MarkdownV2 outside code entities.
const RESERVED: &str = "_*[]()~`>#+-=|{}.!\\";

const FENCE: &str = "```";

/// Escapes `text` so it renders literally, keeping code spans intact.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(body) = rest.strip_prefix(FENCE) {
            let Some(end) = body.find(FENCE) else {
                push_text(&mut out, rest);
                break;
            };
            out.push_str(FENCE);
            push_code(&mut out, &body[..end]);
            out.push_str(FENCE);
            rest = &body[end + FENCE.len()..];
        } else if let Some(body) = rest.strip_prefix('`') {
            match body.find('`') {
                Some(end) if end > 0 => {
                    out.push('`');
                    push_code(&mut out, &body[..end]);
                    out.push('`');
                    rest = &body[end + 1..];
                }
                _ => {
                    out.push_str("\\`");
                    rest = body;
                }
            }
        } else {
            let next = rest.find('`').unwrap_or(rest.len());
            push_text(&mut out, &rest[..next]);
            rest = &rest[next..];
        }
    }

    out
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        if RESERVED.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn push_code(out: &mut String, code: &str) {
    for c in code.chars() {
        if c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}
