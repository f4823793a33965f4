use alloy::primitives::U256;
use fastnum::{
    UD256, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

use crate::error::SdkError;

/// Fixed-point to decimal converter for token amounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> Result<UnsignedDecimal<N>, SdkError> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())
            .ok_or_else(|| SdkError::InvalidAmount(format!("{value} does not fit {N} words")))?;
        Ok(UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        ))
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }

    /// Parses a decimal amount, e.g. `"1.5"`, into base units.
    ///
    /// Fails if the amount carries more fractional digits than the token has
    /// or does not fit 256 bits.
    pub fn parse(&self, value: &str) -> Result<U256, SdkError> {
        let invalid = || SdkError::InvalidAmount(format!("{value} with {} decimals", self.decimals));
        let decimal = UD256::from_str(value.trim(), Context::default()).map_err(|_| invalid())?;
        let units = self.to_unsigned(decimal);
        if self.from_unsigned::<4>(units)? != decimal {
            return Err(invalid());
        }
        Ok(units)
    }

    /// Decimal representation of an amount given in base units.
    pub fn format(&self, value: U256) -> Result<String, SdkError> {
        Ok(self.from_unsigned::<4>(value)?.to_string())
    }
}
