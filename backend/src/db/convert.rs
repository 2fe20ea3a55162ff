//! Row-mapping helpers shared by the sqlx repositories.

use std::str::FromStr;

use anyhow::{Context, anyhow};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

pub fn parse_uuid(raw: &str, column: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid {column}: {raw}"))
}

pub fn parse_label<T>(raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(raw.parse::<T>()?)
}

pub fn parse_decimal(raw: &str, column: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("invalid decimal in {column}: {raw}"))
}

/* =========================
Money
========================= */

pub fn decimal_to_cents(v: Decimal) -> anyhow::Result<i64> {
    (v * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| anyhow!("amount out of range for cents: {v}"))
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/* =========================
Numeric safety helpers
========================= */

pub fn i64_to_u64(v: i64) -> anyhow::Result<u64> {
    if v < 0 {
        return Err(anyhow!("negative i64 where u64 expected: {v}"));
    }
    Ok(v as u64)
}

pub fn i64_to_u32(v: i64) -> anyhow::Result<u32> {
    if v < 0 || v > u32::MAX as i64 {
        return Err(anyhow!("out of range for u32: {v}"));
    }
    Ok(v as u32)
}

pub fn i64_to_u8(v: i64) -> anyhow::Result<u8> {
    if v < 0 || v > u8::MAX as i64 {
        return Err(anyhow!("out of range for u8: {v}"));
    }
    Ok(v as u8)
}

pub fn u64_to_i64(v: u64) -> anyhow::Result<i64> {
    if v > i64::MAX as u64 {
        return Err(anyhow!("u64 too large for i64: {v}"));
    }
    Ok(v as i64)
}

pub fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
