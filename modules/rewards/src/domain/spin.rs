//! Spin-wheel prize table and selection.

use anyhow::bail;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::contract::model::{Prize, PrizeType};
use crate::domain::error::DomainError;

/// Who decides the prize of a spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinSelection {
    /// Weighted draw on the server; a prize sent by the client is ignored.
    #[default]
    Server,
    /// The client animates the wheel and reports the result, which must be on the table.
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeEntry {
    pub prize: Prize,
    pub weight: u32,
}

impl PrizeEntry {
    pub const fn new(prize_type: PrizeType, value: u32, weight: u32) -> Self {
        Self {
            prize: Prize { prize_type, value },
            weight,
        }
    }
}

pub fn default_prize_table() -> Vec<PrizeEntry> {
    vec![
        PrizeEntry::new(PrizeType::Plant, 1, 1),
        PrizeEntry::new(PrizeType::Seeds, 5, 3),
        PrizeEntry::new(PrizeType::Vermicompost, 1, 2),
        PrizeEntry::new(PrizeType::Cashback, 10, 2),
        PrizeEntry::new(PrizeType::Coupon, 20, 3),
        PrizeEntry::new(PrizeType::Gift, 1, 1),
    ]
}

/// Turn the loosely typed prize a client declared into a [`Prize`].
/// Both parts must be present together; the value must be positive.
pub fn parse_declared(
    prize_type: Option<&str>,
    value: Option<i64>,
) -> Result<Option<Prize>, DomainError> {
    match (prize_type, value) {
        (None, None) => Ok(None),
        (Some(t), Some(v)) => {
            let prize_type = t
                .parse::<PrizeType>()
                .map_err(|e| DomainError::validation("type", e))?;
            if v <= 0 {
                return Err(DomainError::validation("value", "must be greater than 0"));
            }
            let value = u32::try_from(v)
                .map_err(|_| DomainError::validation("value", "out of range"))?;
            Ok(Some(Prize { prize_type, value }))
        }
        (None, Some(_)) => Err(DomainError::validation("type", "required with value")),
        (Some(_), None) => Err(DomainError::validation("value", "required with type")),
    }
}

fn total_weight(table: &[PrizeEntry]) -> u64 {
    table.iter().map(|e| u64::from(e.weight)).sum()
}

pub struct SpinResolver {
    table: Vec<PrizeEntry>,
    total_weight: u64,
    selection: SpinSelection,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for SpinResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinResolver")
            .field("table", &self.table)
            .field("selection", &self.selection)
            .finish()
    }
}

impl Default for SpinResolver {
    fn default() -> Self {
        let table = default_prize_table();
        Self {
            total_weight: total_weight(&table),
            table,
            selection: SpinSelection::Server,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }
}

impl SpinResolver {
    /// `seed` makes server-side draws reproducible.
    pub fn new(
        table: Vec<PrizeEntry>,
        selection: SpinSelection,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        if table.is_empty() {
            bail!("spin prize table is empty");
        }
        if let Some(e) = table.iter().find(|e| e.prize.value == 0) {
            bail!("spin prize '{}' has a zero value", e.prize.prize_type);
        }
        let total_weight = total_weight(&table);
        if total_weight == 0 {
            bail!("spin prize weights must have a positive sum");
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            table,
            total_weight,
            selection,
            rng: Mutex::new(rng),
        })
    }

    pub fn selection(&self) -> SpinSelection {
        self.selection
    }

    pub fn table(&self) -> &[PrizeEntry] {
        &self.table
    }

    /// Weighted draw: a ticket in `0..total_weight` lands on the entry whose
    /// cumulative weight range contains it.
    fn draw(&self) -> Prize {
        let mut ticket = self.rng.lock().random_range(0..self.total_weight);
        for entry in &self.table {
            let w = u64::from(entry.weight);
            if ticket < w {
                return entry.prize;
            }
            ticket -= w;
        }
        // total_weight > 0 is checked on construction, so the loop always returns
        self.table[self.table.len() - 1].prize
    }

    fn on_table(&self, prize: &Prize) -> bool {
        self.table.iter().any(|e| e.prize == *prize)
    }

    /// Pick the prize for a spin according to the selection policy.
    pub fn resolve(&self, declared: Option<Prize>) -> Result<Prize, DomainError> {
        match self.selection {
            SpinSelection::Server => {
                if let Some(p) = declared {
                    debug!(declared = %p.prize_type, value = p.value, "ignoring client-declared prize");
                }
                Ok(self.draw())
            }
            SpinSelection::Client => {
                let prize = declared
                    .ok_or_else(|| DomainError::validation("prize", "a declared prize is required"))?;
                if !self.on_table(&prize) {
                    return Err(DomainError::validation(
                        "prize",
                        format!("{} x{} is not on the prize table", prize.prize_type, prize.value),
                    ));
                }
                Ok(prize)
            }
        }
    }
}
