use bursar_domain::{Expense, Ledger, Money, SettlementOptimizer, User};
use bursar_parser::{Command, ExpenseDraft, Handle, ParseError};
use fxhash::FxHashSet;

use crate::{
    groups::{GroupDirectory, GroupError},
    model::{HistoryEntry, HistoryKind, Message, Reply},
    ports::BlobStore,
    store::TreasuryStore,
};

/// The message processor: parses inbound messages, keeps the expense history
/// and ledger, and answers queries.
///
/// State is loaded from the host's blob store once at construction and
/// written through after every successful mutation. Malformed messages and
/// rejected expenses produce no reply at all.
pub struct Treasury<'a> {
    store: TreasuryStore<'a>,
    expenses: Vec<Expense>,
    ledger: Ledger,
    groups: GroupDirectory,
    optimizer: SettlementOptimizer,
}

impl<'a> Treasury<'a> {
    pub fn new(blobs: &'a dyn BlobStore) -> Self {
        let store = TreasuryStore::new(blobs);
        store.initialize();
        let expenses = store.load_expenses();
        let ledger = store.load_ledger();
        let groups = store.load_groups();
        Self {
            store,
            expenses,
            ledger,
            groups,
            optimizer: SettlementOptimizer,
        }
    }

    /// Handles one message. `None` means the message was not recognized or
    /// the command failed; nothing is sent back in that case.
    pub fn handle_message(&mut self, message: &Message<'_>) -> Option<Reply> {
        let command = match bursar_parser::parse_message(message.text) {
            Ok(command) => command,
            Err(ParseError::UnrecognizedMessage) => return None,
        };

        match command {
            Command::Expense(draft) => self.record_expense(message, draft).then_some(Reply::Done),
            Command::Balance => Some(Reply::Balance(
                self.optimizer.generate_statements(&self.ledger),
            )),
            Command::History => Some(Reply::History(
                self.history_for(&User::new(message.sender)),
            )),
            Command::CreateGroup { group } => {
                let outcome = self.groups.create(group);
                self.commit_group_change(outcome)
            }
            Command::AddMember { user, group } => {
                let outcome = self.groups.add_member(group, User::new(user));
                self.commit_group_change(outcome)
            }
            Command::RemoveMember { user, group } => {
                let outcome = self.groups.remove_member(group, &User::new(user));
                self.commit_group_change(outcome)
            }
        }
    }

    /// Expands the draft's handles, finalizes the expense against the ledger
    /// and appends it to the history. Returns false (and mutates nothing) on
    /// a duplicate participant or a resolver rejection.
    fn record_expense(&mut self, message: &Message<'_>, draft: ExpenseDraft<'_>) -> bool {
        let payer = User::new(message.sender);
        let mut expense = Expense::new(
            message.date,
            draft.description,
            Money::new(draft.amount),
            payer,
        );

        let mut seen: FxHashSet<User> = FxHashSet::default();
        for spec in &draft.participants {
            let plus_mod = spec.plus_mod.map(Money::new);
            let star_mod = spec.star_mod.map(Money::new);
            match spec.handle {
                Handle::User(name) => {
                    let user = User::new(name);
                    if !seen.insert(user.clone()) {
                        tracing::debug!(user = name, "duplicate participant, expense dropped");
                        return false;
                    }
                    expense.add_participant(user, plus_mod, star_mod);
                }
                Handle::Group(name) => {
                    for member in self.groups.members(name) {
                        if !seen.insert(member.clone()) {
                            tracing::debug!(
                                user = member.name(),
                                group = name,
                                "duplicate participant via group, expense dropped"
                            );
                            return false;
                        }
                        expense.add_participant(member.clone(), plus_mod, star_mod);
                    }
                }
            }
        }

        match expense.finalize(&mut self.ledger) {
            Ok(()) => {
                tracing::info!(
                    payer = message.sender,
                    amount = %expense.amount(),
                    participants = seen.len(),
                    "expense recorded"
                );
                self.expenses.push(expense);
                self.store.save_expenses(&self.expenses);
                self.store.save_ledger(&self.ledger);
                true
            }
            Err(err) => {
                tracing::debug!(payer = message.sender, %err, "expense rejected");
                false
            }
        }
    }

    fn commit_group_change(&mut self, outcome: Result<(), GroupError>) -> Option<Reply> {
        match outcome {
            Ok(()) => {
                self.store.save_groups(&self.groups);
                Some(Reply::Done)
            }
            Err(err) => {
                tracing::debug!(%err, "group command ignored");
                None
            }
        }
    }

    fn history_for(&self, user: &User) -> Vec<HistoryEntry> {
        let mut entries = Vec::new();
        for expense in &self.expenses {
            if expense.is_payer(user) {
                entries.push(HistoryEntry {
                    date: expense.date(),
                    description: expense.description().map(str::to_owned),
                    kind: HistoryKind::GetBack,
                    amount: expense.payer_credit(),
                });
            } else if let Some(share) = expense.debtor_share(user) {
                entries.push(HistoryEntry {
                    date: expense.date(),
                    description: expense.description().map(str::to_owned),
                    kind: HistoryKind::PayBack,
                    amount: share,
                });
            }
        }
        entries
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn groups(&self) -> &GroupDirectory {
        &self.groups
    }
}
