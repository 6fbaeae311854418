use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::FieldErrors;

pub const MAX_CHARS: usize = 255;

/// `NUMERIC(5, 2)`: three integer digits, two decimal places.
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_INTEGER_DIGITS: usize = 3;

pub fn reject_blank(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if matches!(value, Some(v) if v.trim().is_empty()) {
        errors.add(field, "This field may not be blank.");
    }
}

pub fn check_price(errors: &mut FieldErrors, field: &str, price: Option<&Decimal>) {
    let Some(price) = price else { return };
    // Digits as submitted: "5.250" has three decimal places.
    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            field,
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    }
    let integer_digits = price.trunc().abs().to_string().trim_start_matches('0').len();
    if integer_digits > PRICE_INTEGER_DIGITS {
        errors.add(
            field,
            format!("Ensure that there are no more than {PRICE_INTEGER_DIGITS} digits before the decimal point."),
        );
    }
}

/// Reads an integer sent as a JSON number or numeric string (`10`, `"10"`, `10.0`).
pub fn parse_integer(errors: &mut FieldErrors, field: &str, raw: Option<&Value>) -> Option<i32> {
    let raw = raw?;
    let parsed = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            let s = s.split_once('.').filter(|(_, frac)| frac.chars().all(|c| c == '0')).map_or(s, |(int, _)| int);
            s.parse::<i64>().ok()
        }
        _ => None,
    };
    let Some(value) = parsed else {
        errors.add(field, "A valid integer is required.");
        return None;
    };
    match i32::try_from(value) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, format!("Ensure this value is less than or equal to {}.", i32::MAX));
            None
        }
    }
}

/// Reads a decimal sent as a JSON number or numeric string.
pub fn parse_decimal(errors: &mut FieldErrors, field: &str, raw: Option<&Value>) -> Option<Decimal> {
    let raw = raw?;
    let parsed = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    if parsed.is_none() {
        errors.add(field, "A valid number is required.");
    }
    parsed
}

/// Price as stored: rounded into two decimal places.
pub fn money(price: Decimal) -> Decimal {
    let mut rounded = price.round_dp(PRICE_DECIMAL_PLACES);
    rounded.rescale(PRICE_DECIMAL_PLACES);
    rounded
}

/// Validates a list of tag or ingredient names, keyed `field[index]`.
pub fn check_names(errors: &mut FieldErrors, field: &str, names: &[String]) {
    for (i, name) in names.iter().enumerate() {
        let key = format!("{field}[{i}].name");
        if name.trim().is_empty() {
            errors.add(key, "This field may not be blank.");
        } else if name.chars().count() > MAX_CHARS {
            errors.add(key, format!("Ensure this field has no more than {MAX_CHARS} characters."));
        }
    }
}

/// Parses a comma separated id list such as `?tags=1,2`.
pub fn parse_id_list(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Vec<i64> {
    let Some(raw) = raw else { return Vec::new() };
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => errors.add(field, format!("'{part}' is not a valid id.")),
        }
    }
    ids
}
