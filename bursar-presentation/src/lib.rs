#![warn(clippy::uninlined_format_args)]

//! Plain-text rendering of treasury replies, one line per fact.

use bursar_application::{HistoryEntry, HistoryKind, Reply};
use bursar_domain::Statement;

pub const DONE: &str = "Done";

pub struct ReplyPresenter;

impl ReplyPresenter {
    pub fn render(reply: &Reply) -> String {
        match reply {
            Reply::Done => DONE.to_owned(),
            Reply::Balance(statements) => render_balance(statements),
            Reply::History(entries) => render_history(entries),
        }
    }
}

fn render_balance(statements: &[Statement]) -> String {
    let lines: Vec<String> = statements
        .iter()
        .map(|statement| {
            format!(
                "{} owes {} {}",
                statement.debtor, statement.creditor, statement.amount
            )
        })
        .collect();
    lines.join("\n")
}

fn render_history(entries: &[HistoryEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            let date = entry.date.format("%d/%m/%Y");
            let description = entry
                .description
                .as_deref()
                .map(|text| format!(" {text}"))
                .unwrap_or_default();
            let verb = match entry.kind {
                HistoryKind::GetBack => "you get back",
                HistoryKind::PayBack => "you pay back",
            };
            format!("{date}{description} - {verb} {}", entry.amount)
        })
        .collect();
    lines.join("\n")
}
