use crate::ContractError;

/// Decimals of the native asset (one unit is 10^7 stroops).
pub const TOKEN_DECIMALS: u32 = 7;

/// Decimals of every USD value the contract compares.
pub const USD_DECIMALS: u32 = 18;

/// Converts `amount` stroops into USD with [`USD_DECIMALS`] decimals, given a
/// feed `answer` carrying `feed_decimals` decimals.
pub fn conversion_rate(
    amount: i128,
    answer: i128,
    feed_decimals: u32,
) -> Result<i128, ContractError> {
    if answer <= 0 {
        return Err(ContractError::StalePrice);
    }

    let price = rescale(answer, feed_decimals, USD_DECIMALS)?;
    let scaled = price.checked_mul(amount).ok_or(ContractError::Overflow)?;
    Ok(scaled / pow10(TOKEN_DECIMALS)?)
}

fn rescale(value: i128, from: u32, to: u32) -> Result<i128, ContractError> {
    if from <= to {
        value
            .checked_mul(pow10(to - from)?)
            .ok_or(ContractError::Overflow)
    } else {
        Ok(value / pow10(from - to)?)
    }
}

fn pow10(exp: u32) -> Result<i128, ContractError> {
    10i128.checked_pow(exp).ok_or(ContractError::Overflow)
}
