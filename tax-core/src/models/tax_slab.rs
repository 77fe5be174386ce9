use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One marginal-rate bracket. `upper_bound` of `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSlab {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxSlab {
    pub fn bounded(
        upper_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub fn unbounded(rate: Decimal) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }
}

/// Reasons a list of slabs cannot form a [`SlabTable`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlabTableError {
    #[error("slab table is empty")]
    Empty,

    #[error("slab {index} is unbounded but is not the last slab")]
    UnboundedBeforeEnd { index: usize },

    #[error("last slab must be unbounded")]
    LastSlabBounded,

    #[error("slab {index} upper bound {bound} must be greater than {previous}")]
    BoundsNotIncreasing {
        index: usize,
        bound: Decimal,
        previous: Decimal,
    },

    #[error("slab {index} rate {rate} must be between 0 and 1")]
    RateOutOfRange { index: usize, rate: Decimal },

    #[error("slab {index} rate {rate} is lower than the previous rate {previous}")]
    RateDecreasing {
        index: usize,
        rate: Decimal,
        previous: Decimal,
    },
}

/// An ordered, validated sequence of [`TaxSlab`]s.
///
/// Upper bounds strictly increase from an implicit floor of zero, rates never
/// decrease, and only the final slab is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlabTable {
    slabs: Vec<TaxSlab>,
}

impl SlabTable {
    pub fn new(slabs: Vec<TaxSlab>) -> Result<Self, SlabTableError> {
        let last = slabs.len().checked_sub(1).ok_or(SlabTableError::Empty)?;

        let mut previous_bound = Decimal::ZERO;
        let mut previous_rate = Decimal::ZERO;

        for (index, slab) in slabs.iter().enumerate() {
            if slab.rate < Decimal::ZERO || slab.rate > Decimal::ONE {
                return Err(SlabTableError::RateOutOfRange {
                    index,
                    rate: slab.rate,
                });
            }
            if slab.rate < previous_rate {
                return Err(SlabTableError::RateDecreasing {
                    index,
                    rate: slab.rate,
                    previous: previous_rate,
                });
            }
            previous_rate = slab.rate;

            match slab.upper_bound {
                None if index != last => {
                    return Err(SlabTableError::UnboundedBeforeEnd { index });
                }
                None => {}
                Some(_) if index == last => return Err(SlabTableError::LastSlabBounded),
                Some(bound) => {
                    if bound <= previous_bound {
                        return Err(SlabTableError::BoundsNotIncreasing {
                            index,
                            bound,
                            previous: previous_bound,
                        });
                    }
                    previous_bound = bound;
                }
            }
        }

        Ok(Self { slabs })
    }

    /// The fixed progressive table: 0% to 4L, then +5% every 4L up to 30%
    /// above 24L.
    pub fn canonical() -> Self {
        Self {
            slabs: vec![
                TaxSlab::bounded(dec!(400000), dec!(0)),
                TaxSlab::bounded(dec!(800000), dec!(0.05)),
                TaxSlab::bounded(dec!(1200000), dec!(0.10)),
                TaxSlab::bounded(dec!(1600000), dec!(0.15)),
                TaxSlab::bounded(dec!(2000000), dec!(0.20)),
                TaxSlab::bounded(dec!(2400000), dec!(0.25)),
                TaxSlab::unbounded(dec!(0.30)),
            ],
        }
    }

    pub fn slabs(&self) -> &[TaxSlab] {
        &self.slabs
    }

    pub fn len(&self) -> usize {
        self.slabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }
}

impl Default for SlabTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl<'de> Deserialize<'de> for SlabTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slabs = Vec::<TaxSlab>::deserialize(deserializer)?;
        SlabTable::new(slabs).map_err(serde::de::Error::custom)
    }
}
