use bursar_domain::{Money, Statement};
use chrono::{DateTime, Utc};

/// An inbound chat message as handed over by the transport.
#[derive(Clone, Copy, Debug)]
pub struct Message<'a> {
    pub sender: &'a str,
    pub date: DateTime<Utc>,
    pub text: &'a str,
}

/// What the treasury answers with. `None` from the processor means silence;
/// a `Reply` is always rendered back to the sender.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Done,
    Balance(Vec<Statement>),
    History(Vec<HistoryEntry>),
}

/// One line of a user's expense history, already filtered to the asking
/// user's point of view.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub kind: HistoryKind,
    pub amount: Money,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    /// The user paid and gets the amount back.
    GetBack,
    /// The user owes the amount to the payer.
    PayBack,
}
