use std::{
    cmp::Ordering,
    collections::{BTreeMap, btree_map::Entry},
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Fractional digits used inside share division before rounding back to
/// [`MONEY_SCALE`].
pub const WORKING_SCALE: u32 = 3;

const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointNearestEven;

/// Exact fixed-point money at two fractional digits.
///
/// Every constructor re-rounds to [`MONEY_SCALE`] with round-half-to-even and
/// then pins the scale, so the cent amount of a value is always exact and two
/// values compare equal exactly when their cent amounts do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);

    /// Rounds `value` half-to-even onto the money scale.
    pub fn new(value: Decimal) -> Self {
        let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, ROUNDING);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// The value in whole cents. Exact because the scale is pinned at
    /// construction; mirrors the narrowing the settlement search performs to
    /// work on integers.
    pub fn cents(self) -> i64 {
        debug_assert!(self.0.scale() <= MONEY_SCALE);
        if self.0.scale() == MONEY_SCALE {
            self.0.mantissa() as i64
        } else {
            // Money::ZERO and friends carry scale 0.
            (self.0.mantissa() as i64) * 10_i64.pow(MONEY_SCALE - self.0.scale())
        }
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

/// A participant identity. Equality is by name: two users with the same name
/// are the same user.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct User(String);

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for User {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// Reasons an expense cannot be finalized. The expense is discarded whole;
/// the ledger is never touched on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExpenseError {
    #[error("expense has no participants")]
    EmptyExpense,
    #[error("sum of plus modifiers exceeds the expense amount")]
    PlusModTooLarge,
    #[error("money left over but no star modifier to absorb it")]
    PhantomMoney,
}

/// Split terms and computed share of one non-payer participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareTerms {
    /// Fixed lump taken off the top before the pro-rata split.
    pub plus_mod: Money,
    /// Relative weight on the remaining pro-rata split.
    pub star_mod: Money,
    /// Computed at finalization; zero until then.
    pub share: Money,
}

/// A single submitted expense.
///
/// Built up with [`Expense::add_participant`] and sealed by
/// [`Expense::finalize`]; once finalized it is read-only and lives in the
/// history list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    date: DateTime<Utc>,
    description: Option<String>,
    amount: Money,
    payer: User,
    participants: IndexMap<User, ShareTerms>,
    payer_credit: Money,
    total_plus: Money,
    total_star: Money,
    finalized: bool,
}

impl Expense {
    pub fn new(
        date: DateTime<Utc>,
        description: Option<String>,
        amount: Money,
        payer: User,
    ) -> Self {
        Self {
            date,
            description,
            amount,
            payer,
            participants: IndexMap::new(),
            payer_credit: Money::ZERO,
            total_plus: Money::ZERO,
            total_star: Money::ZERO,
            finalized: false,
        }
    }

    /// Registers a participant. A missing plus modifier counts as 0, a
    /// missing star modifier as 1. The payer may participate in their own
    /// expense: their modifiers feed the totals but they never become their
    /// own debtor. Calling this on a finalized expense is a no-op.
    pub fn add_participant(
        &mut self,
        user: User,
        plus_mod: Option<Money>,
        star_mod: Option<Money>,
    ) {
        debug_assert!(!self.participants.contains_key(&user));
        if self.finalized {
            return;
        }

        let plus_mod = plus_mod.unwrap_or(Money::ZERO);
        let star_mod = star_mod.unwrap_or(Money::ONE);
        self.total_plus += plus_mod;
        self.total_star += star_mod;

        if user != self.payer {
            self.participants.insert(
                user,
                ShareTerms {
                    plus_mod,
                    star_mod,
                    share: Money::ZERO,
                },
            );
        }
    }

    /// Computes every participant's share and applies the whole expense to
    /// the ledger. Finalization is atomic: on error nothing is applied, on
    /// success the expense is sealed.
    pub fn finalize(&mut self, ledger: &mut Ledger) -> Result<(), ExpenseError> {
        if self.participants.is_empty() {
            return Err(ExpenseError::EmptyExpense);
        }
        self.resolve_shares()?;
        self.apply_to(ledger);
        self.finalized = true;
        Ok(())
    }

    fn resolve_shares(&mut self) -> Result<(), ExpenseError> {
        let common_fraction = match self.amount.as_decimal().cmp(&self.total_plus.as_decimal()) {
            Ordering::Less => return Err(ExpenseError::PlusModTooLarge),
            Ordering::Equal => Decimal::ZERO,
            Ordering::Greater => {
                if self.total_star.is_zero() {
                    return Err(ExpenseError::PhantomMoney);
                }
                let residue = self.amount.as_decimal() - self.total_plus.as_decimal();
                (residue / self.total_star.as_decimal())
                    .round_dp_with_strategy(WORKING_SCALE, ROUNDING)
            }
        };

        let mut payer_credit = Money::ZERO;
        for terms in self.participants.values_mut() {
            let share = Money::new(
                common_fraction * terms.star_mod.as_decimal() + terms.plus_mod.as_decimal(),
            );
            terms.share = share;
            payer_credit += share;
        }
        self.payer_credit = payer_credit;
        Ok(())
    }

    fn apply_to(&self, ledger: &mut Ledger) {
        ledger.apply(&self.payer, self.payer_credit);
        for (user, terms) in &self.participants {
            ledger.apply(user, -terms.share);
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_payer(&self, user: &User) -> bool {
        self.payer == *user
    }

    pub fn payer_credit(&self) -> Money {
        self.payer_credit
    }

    pub fn is_debtor(&self, user: &User) -> bool {
        self.participants.contains_key(user)
    }

    pub fn debtor_share(&self, user: &User) -> Option<Money> {
        self.participants.get(user).map(|terms| terms.share)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Running signed balance per user.
///
/// Entries that reach exactly zero are removed, so iteration only ever sees
/// live creditors and debtors, and the values always sum to zero after a
/// fully applied expense.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    statuses: BTreeMap<User, Money>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the user's status, dropping the entry when it lands on
    /// exactly zero. Zero deltas are skipped so a no-op share never creates a
    /// dead entry.
    pub fn apply(&mut self, user: &User, delta: Money) {
        if delta.is_zero() {
            return;
        }
        match self.statuses.entry(user.clone()) {
            Entry::Occupied(mut entry) => {
                let updated = *entry.get() + delta;
                if updated.is_zero() {
                    entry.remove();
                } else {
                    *entry.get_mut() = updated;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(delta);
            }
        }
    }

    pub fn status(&self, user: &User) -> Option<Money> {
        self.statuses.get(user).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&User, Money)> + '_ {
        self.statuses.iter().map(|(user, status)| (user, *status))
    }

    pub fn total(&self) -> Money {
        self.statuses.values().copied().sum()
    }
}

/// One transfer of a settlement: `debtor` pays `amount` to `creditor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub debtor: User,
    pub creditor: User,
    pub amount: Money,
}
