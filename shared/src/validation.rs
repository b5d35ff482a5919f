//! Pure validation helpers for the Roast Tracker engine

use rust_decimal::Decimal;

use crate::lot::ProductionType;

/// Validate that a mass in grams is strictly positive.
pub fn validate_positive_mass(mass_g: Decimal) -> Result<(), &'static str> {
    if mass_g <= Decimal::ZERO {
        return Err("Mass must be positive");
    }
    Ok(())
}

/// Validate that a unit quantity is strictly positive.
pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate advent calendar day numbers: each in 1..=24 and no duplicates.
pub fn validate_advent_days(days: &[i32]) -> Result<(), &'static str> {
    if days.is_empty() {
        return Err("Advent production needs at least one day");
    }
    let mut seen = [false; 24];
    for &day in days {
        if !(1..=24).contains(&day) {
            return Err("Advent day must be between 1 and 24");
        }
        let slot = (day - 1) as usize;
        if seen[slot] {
            return Err("Advent day numbers must be unique");
        }
        seen[slot] = true;
    }
    Ok(())
}

/// For fixed-size package kinds, the consumed mass must equal
/// package size times unit count.
pub fn validate_sized_total(
    production_type: ProductionType,
    quantity: i32,
    total_mass_g: Decimal,
) -> Result<(), &'static str> {
    if let Some(size) = production_type.package_size_g() {
        let expected = Decimal::from(size) * Decimal::from(quantity);
        if total_mass_g != expected {
            return Err("Total mass must equal package size times quantity");
        }
    }
    Ok(())
}

/// Sum a list of source masses, rejecting non-positive entries.
pub fn sum_source_masses(masses: &[Decimal]) -> Result<Decimal, &'static str> {
    if masses.is_empty() {
        return Err("At least one source is required");
    }
    let mut total = Decimal::ZERO;
    for &m in masses {
        validate_positive_mass(m)?;
        total += m;
    }
    Ok(total)
}
