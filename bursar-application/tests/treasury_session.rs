use std::{collections::HashMap, sync::RwLock};

use bursar_application::{BlobStore, HistoryKind, Message, Reply, Treasury};
use bursar_domain::{Money, User};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

#[derive(Default)]
struct MemoryStub {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl BlobStore for MemoryStub {
    fn retrieve(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(key).cloned()
    }

    fn store(&self, key: &str, value: Vec<u8>) {
        self.blobs.write().unwrap().insert(key.to_owned(), value);
    }
}

fn session_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).single().expect("valid date")
}

fn send(treasury: &mut Treasury<'_>, sender: &str, text: &str) -> Option<Reply> {
    treasury.handle_message(&Message {
        sender,
        date: session_date(),
        text,
    })
}

fn money(text: &str) -> Money {
    Money::new(text.parse::<Decimal>().expect("literal decimal"))
}

fn user(name: &str) -> User {
    User::new(name)
}

#[test]
fn equal_split_updates_the_ledger() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "30|AA,BB,CC"), Some(Reply::Done));

    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("20.00")));
    assert_eq!(treasury.ledger().status(&user("BB")), Some(money("-10.00")));
    assert_eq!(treasury.ledger().status(&user("CC")), Some(money("-10.00")));
}

#[test]
fn plus_modifier_takes_a_lump_off_the_top() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "30|AA,BB+5,CC"), Some(Reply::Done));

    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("21.66")));
    assert_eq!(treasury.ledger().status(&user("BB")), Some(money("-13.33")));
    assert_eq!(treasury.ledger().status(&user("CC")), Some(money("-8.33")));
}

#[test]
fn star_modifier_weights_the_pro_rata_split() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(
        send(&mut treasury, "AA", "100|AA*1,BB*3,CC*1"),
        Some(Reply::Done)
    );

    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("80.00")));
    assert_eq!(treasury.ledger().status(&user("BB")), Some(money("-60.00")));
    assert_eq!(treasury.ledger().status(&user("CC")), Some(money("-20.00")));
}

#[test]
fn missing_star_modifier_defaults_to_one() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    // (10 - 5) split over two default star weights: BB owes 2.50 + 2.00.
    assert_eq!(send(&mut treasury, "AA", "10|AA+3,BB+2"), Some(Reply::Done));

    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("4.50")));
    assert_eq!(treasury.ledger().status(&user("BB")), Some(money("-4.50")));
}

#[test]
fn oversized_plus_modifiers_drop_the_expense_silently() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "10|AA,BB+20"), None);

    assert!(treasury.ledger().is_empty());
    assert!(treasury.expenses().is_empty());
}

#[test]
fn leftover_money_with_zero_stars_drops_the_expense_silently() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "10|AA+3*0,BB+2*0"), None);

    assert!(treasury.ledger().is_empty());
    assert!(treasury.expenses().is_empty());
}

#[test]
fn balance_pairs_matching_creditors_and_debtors() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    // Two disjoint debts: CC owes AA 10.00 and DD owes BB 5.00.
    assert_eq!(send(&mut treasury, "AA", "10|AA*0,CC+10*0"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "BB", "5|BB*0,DD+5*0"), Some(Reply::Done));

    let Some(Reply::Balance(statements)) = send(&mut treasury, "AA", "BALANCE") else {
        panic!("expected a balance reply");
    };

    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].debtor, user("DD"));
    assert_eq!(statements[0].creditor, user("BB"));
    assert_eq!(statements[0].amount, money("5.00"));
    assert_eq!(statements[1].debtor, user("CC"));
    assert_eq!(statements[1].creditor, user("AA"));
    assert_eq!(statements[1].amount, money("10.00"));
}

#[test]
fn balance_settles_an_irreducible_ledger_in_one_component() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    // Ledger becomes {AA: +7, BB: +3, CC: -6, DD: -4}: no exact pair and no
    // sub-partition, so three transfers are required.
    assert_eq!(
        send(&mut treasury, "AA", "7|AA*0,CC+6*0,DD+1*0"),
        Some(Reply::Done)
    );
    assert_eq!(send(&mut treasury, "BB", "3|BB*0,DD+3*0"), Some(Reply::Done));

    let Some(Reply::Balance(statements)) = send(&mut treasury, "AA", "BALANCE") else {
        panic!("expected a balance reply");
    };

    assert_eq!(statements.len(), 3);
    // The ledger itself is untouched by the query.
    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("7.00")));
    assert_eq!(treasury.ledger().status(&user("DD")), Some(money("-4.00")));
}

#[test]
fn balance_on_an_empty_ledger_is_empty() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(
        send(&mut treasury, "AA", "BALANCE"),
        Some(Reply::Balance(Vec::new()))
    );
}

#[test]
fn duplicate_direct_participant_drops_the_expense() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "30|AA,BB,BB"), None);

    assert!(treasury.ledger().is_empty());
    assert!(treasury.expenses().is_empty());
}

#[test]
fn duplicate_participant_via_group_drops_the_expense() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);
    assert_eq!(send(&mut treasury, "AA", "CREATE TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "ADD BB TRIP"), Some(Reply::Done));

    assert_eq!(send(&mut treasury, "AA", "30|BB,TRIP"), None);

    assert!(treasury.ledger().is_empty());
}

#[test]
fn group_handles_expand_to_their_members() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);
    assert_eq!(send(&mut treasury, "AA", "CREATE TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "ADD BB TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "ADD CC TRIP"), Some(Reply::Done));

    assert_eq!(send(&mut treasury, "AA", "30|AA,TRIP"), Some(Reply::Done));

    assert_eq!(treasury.ledger().status(&user("AA")), Some(money("20.00")));
    assert_eq!(treasury.ledger().status(&user("BB")), Some(money("-10.00")));
    assert_eq!(treasury.ledger().status(&user("CC")), Some(money("-10.00")));
}

#[test]
fn unknown_group_contributes_no_participants() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    // NOBODY expands to nothing, so the expense has no participants.
    assert_eq!(send(&mut treasury, "AA", "30|NOBODY"), None);
    assert!(treasury.ledger().is_empty());
}

#[test]
fn group_command_failures_are_silent() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "CREATE TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "CREATE TRIP"), None);

    assert_eq!(send(&mut treasury, "AA", "ADD BB TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "ADD BB TRIP"), None);
    assert_eq!(send(&mut treasury, "AA", "ADD BB NOPE"), None);

    assert_eq!(send(&mut treasury, "AA", "DELETE BB TRIP"), Some(Reply::Done));
    assert_eq!(send(&mut treasury, "AA", "DELETE BB TRIP"), None);
}

#[test]
fn unrecognized_messages_are_ignored() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);

    assert_eq!(send(&mut treasury, "AA", "good morning everyone"), None);
    assert_eq!(send(&mut treasury, "AA", "30|aa,bb"), None);
    assert!(treasury.ledger().is_empty());
}

#[test]
fn history_is_filtered_to_the_asking_user() {
    let store = MemoryStub::default();
    let mut treasury = Treasury::new(&store);
    assert_eq!(
        send(&mut treasury, "AA", "30|AA,BB,CC \"dinner\""),
        Some(Reply::Done)
    );
    assert_eq!(send(&mut treasury, "BB", "10|AA,BB"), Some(Reply::Done));

    let Some(Reply::History(entries)) = send(&mut treasury, "AA", "HISTORY") else {
        panic!("expected a history reply");
    };

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, HistoryKind::GetBack);
    assert_eq!(entries[0].amount, money("20.00"));
    assert_eq!(entries[0].description.as_deref(), Some("dinner"));
    assert_eq!(entries[1].kind, HistoryKind::PayBack);
    assert_eq!(entries[1].amount, money("5.00"));
    assert_eq!(entries[1].description, None);

    let Some(Reply::History(entries)) = send(&mut treasury, "DD", "HISTORY") else {
        panic!("expected a history reply");
    };
    assert!(entries.is_empty());
}

#[test]
fn state_survives_a_restart_through_the_store() {
    let store = MemoryStub::default();
    {
        let mut treasury = Treasury::new(&store);
        assert_eq!(send(&mut treasury, "AA", "CREATE TRIP"), Some(Reply::Done));
        assert_eq!(send(&mut treasury, "AA", "ADD BB TRIP"), Some(Reply::Done));
        assert_eq!(send(&mut treasury, "AA", "30|AA,BB,CC"), Some(Reply::Done));
    }

    let mut reloaded = Treasury::new(&store);

    assert_eq!(reloaded.expenses().len(), 1);
    assert_eq!(reloaded.ledger().status(&user("AA")), Some(money("20.00")));
    assert!(reloaded.groups().contains("TRIP"));
    // The reloaded ledger keeps settling correctly.
    let Some(Reply::Balance(statements)) = send(&mut reloaded, "AA", "BALANCE") else {
        panic!("expected a balance reply");
    };
    assert_eq!(statements.len(), 2);
}
