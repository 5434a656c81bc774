/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::str::FromStr;

use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::{Error, Result};

/// Largest amount of decimal digits a ratio can be expressed with
/// before `f64` stops being exact.
pub const MAX_RATIO_DIGITS: u32 = 15;

/// Decimals of a wei denominated amount
pub const WEI_DECIMALS: u32 = 18;

fn check_ratio_digits(digits: u32) -> Result<()> {
    if digits == 0 || digits > MAX_RATIO_DIGITS {
        return Err(Error::InvalidPrecision(digits))
    }

    Ok(())
}

/// Decode a fixed-point on-chain ratio into a float in `[0, 1]`.
/// `decode_ratio(500_000, 6) == 0.5`
pub fn decode_ratio(raw: u64, digits: u32) -> Result<f64> {
    check_ratio_digits(digits)?;
    let ratio = raw as f64 / 10f64.powi(digits as i32);
    Ok(ratio.min(1.0))
}

/// Encode a float in `[0, 1]` into its fixed-point on-chain form,
/// rounding to the nearest integer.
pub fn encode_ratio(ratio: f64, digits: u32) -> Result<u64> {
    check_ratio_digits(digits)?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(Error::InvalidRatio(ratio))
    }

    Ok((ratio * 10f64.powi(digits as i32)).round() as u64)
}

/// Convert a big integer into `u64`, saturating at `u64::MAX`.
pub fn biguint_to_u64_saturating(value: &BigUint) -> u64 {
    value.to_u64().unwrap_or(u64::MAX)
}

/// Ratio between two big integers in parts-per-`10^digits`, as used
/// when the indexer only reports absolute voting power values.
pub fn ratio_of(part: &BigUint, total: &BigUint, digits: u32) -> Result<f64> {
    check_ratio_digits(digits)?;
    if total.is_zero() {
        return Ok(0.0)
    }

    let scaled = part * BigUint::from(10u64).pow(digits) / total;
    decode_ratio(biguint_to_u64_saturating(&scaled), digits)
}

/// Convert a wei amount given as a base 10 integer string into a
/// decimal value rounded half-up to `precision` decimal places.
/// Precisions above 18 are treated as 18.
pub fn wei_to_decimal(wei: &str, precision: u32) -> Result<f64> {
    if precision == 0 {
        return Err(Error::InvalidPrecision(precision))
    }
    let precision = precision.min(WEI_DECIMALS);

    let wei = BigUint::from_str(wei.trim())?;
    let scale = BigUint::from(10u64).pow(WEI_DECIMALS - precision);
    let rounded = (wei + &scale / 2u32) / scale;

    let unit = BigUint::from(10u64).pow(precision);
    let integer = &rounded / &unit;
    let fraction = &rounded % &unit;

    let repr = format!("{}.{:0>width$}", integer, fraction.to_string(), width = precision as usize);
    Ok(f64::from_str(&repr)?)
}

/// Pack a list of flags into a 256 bit bitmap, bit `i` set when
/// `flags[i]` is true.
pub fn bool_array_to_bitmap(flags: &[bool]) -> Result<U256> {
    if flags.len() > 256 {
        return Err(Error::BitmapOverflow(flags.len()))
    }

    let mut bitmap = U256::zero();
    for (i, flag) in flags.iter().enumerate() {
        if *flag {
            bitmap |= U256::one() << i;
        }
    }

    Ok(bitmap)
}

/// Inverse of [`bool_array_to_bitmap`] for a known amount of flags.
pub fn bitmap_to_bool_array(bitmap: U256, len: usize) -> Vec<bool> {
    (0..len.min(256)).map(|i| bitmap.bit(i)).collect()
}
