use std::str::FromStr;

use crate::errors::ArgumentError;

/// `UNTIL_CANCELLED` is the textual form of [`Budget::UntilCancelled`].
pub const UNTIL_CANCELLED: &str = "until-cancelled";

/// `Budget` is how many units a worker performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    Units(u64),
    UntilCancelled,
}

impl Budget {
    /// `exhausted` returns true once `done` units satisfy the budget.
    #[must_use]
    pub fn exhausted(&self, done: u64) -> bool {
        match self {
            Self::Units(units) => done >= *units,
            Self::UntilCancelled => false,
        }
    }
}

impl FromStr for Budget {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNTIL_CANCELLED {
            return Ok(Self::UntilCancelled);
        }
        parse_positive::<u64>("budget", s).map(Self::Units)
    }
}

impl core::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Units(units) => write!(f, "{units}"),
            Self::UntilCancelled => write!(f, "{UNTIL_CANCELLED}"),
        }
    }
}

/// `parse_positive` accepts only canonical positive decimals: the value has
/// to read back exactly as written, so signs, leading zeros, whitespace and
/// overflowing input are rejected.
///
/// # Errors
///
/// Returns an [`ArgumentError`] naming `name` and the rejected input.
pub fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ArgumentError>
where
    T: FromStr + ToString + Default + PartialEq,
{
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ArgumentError::NotANumber {
            name,
            value: value.to_string(),
        });
    }

    if value.starts_with('-') {
        return Err(ArgumentError::NotPositive {
            name,
            value: value.to_string(),
        });
    }

    let parsed = match value.parse::<T>() {
        Ok(parsed) if parsed.to_string() == value => parsed,
        _ => {
            return Err(ArgumentError::NotCanonical {
                name,
                value: value.to_string(),
            })
        }
    };

    if parsed == T::default() {
        return Err(ArgumentError::NotPositive {
            name,
            value: value.to_string(),
        });
    }

    Ok(parsed)
}
