use {
    super::error::PaymentError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in the currency's smallest unit. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(minor_units: i64) -> Result<Self, PaymentError> {
        if minor_units <= 0 {
            return Err(PaymentError::Validation(format!(
                "amount must be positive, got: {minor_units}"
            )));
        }
        Ok(Self(minor_units))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Myr,
    Sgd,
    Usd,
    Eur,
    Gbp,
    Jpy,
    Kwd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Myr => "MYR",
            Self::Sgd => "SGD",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Kwd => "KWD",
        }
    }

    /// ISO 4217 minor-unit exponent.
    pub fn exponent(&self) -> u32 {
        match self {
            Self::Jpy => 0,
            Self::Kwd => 3,
            Self::Myr | Self::Sgd | Self::Usd | Self::Eur | Self::Gbp => 2,
        }
    }

    /// Minor units per major unit (100 for two-decimal currencies).
    pub fn minor_unit_factor(&self) -> i64 {
        10_i64.pow(self.exponent())
    }

    /// Converts an amount in this currency's ISO minor units to a convention
    /// with `target_exponent` decimal places.
    pub fn convert_minor_units(
        &self,
        amount: MoneyAmount,
        target_exponent: u32,
    ) -> Result<i64, PaymentError> {
        let own = self.exponent();
        let value = amount.minor_units();
        if target_exponent >= own {
            value
                .checked_mul(10_i64.pow(target_exponent - own))
                .ok_or_else(|| PaymentError::Validation("amount overflows gateway units".into()))
        } else {
            let divisor = 10_i64.pow(own - target_exponent);
            if value % divisor != 0 {
                return Err(PaymentError::Validation(format!(
                    "amount {value} {self} is not representable with {target_exponent} decimals"
                )));
            }
            Ok(value / divisor)
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_uppercase().as_str() {
            "MYR" => Ok(Self::Myr),
            "SGD" => Ok(Self::Sgd),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "JPY" => Ok(Self::Jpy),
            "KWD" => Ok(Self::Kwd),
            other => Err(PaymentError::Validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factor = self.currency.minor_unit_factor();
        let value = self.amount.minor_units();
        if factor == 1 {
            write!(f, "{value} {}", self.currency)
        } else {
            let width = self.currency.exponent() as usize;
            write!(
                f,
                "{}.{:0width$} {}",
                value / factor,
                value % factor,
                self.currency
            )
        }
    }
}
