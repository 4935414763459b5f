use crate::models::SeatCategory;

/// Price multiplier per seat category.
pub fn category_multiplier(category: SeatCategory) -> f64 {
    match category {
        SeatCategory::Normal => 1.0,
        SeatCategory::Reduced => 1.25,
        SeatCategory::Vip => 1.5,
    }
}

/// Seat price: session base price times the category multiplier, rounded
/// to whole cents.
pub fn seat_price_cents(base_price_cents: i64, category: SeatCategory) -> i64 {
    ((base_price_cents as f64) * category_multiplier(category)).round() as i64
}

/// Apply a voucher discount fraction in (0, 1) to an amount, rounding the
/// discount to whole cents. The charged amount never goes below zero.
pub fn discounted_cents(amount_cents: i64, fraction: f64) -> i64 {
    let discount = ((amount_cents as f64) * fraction).round() as i64;
    (amount_cents - discount).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_multipliers() {
        assert_eq!(seat_price_cents(1000, SeatCategory::Normal), 1000);
        assert_eq!(seat_price_cents(1000, SeatCategory::Reduced), 1250);
        assert_eq!(seat_price_cents(1000, SeatCategory::Vip), 1500);
    }

    #[test]
    fn test_rounding_to_cents() {
        // 999 * 1.25 = 1248.75 -> 1249
        assert_eq!(seat_price_cents(999, SeatCategory::Reduced), 1249);
        // 333 * 1.5 = 499.5 -> 500
        assert_eq!(seat_price_cents(333, SeatCategory::Vip), 500);
    }

    #[test]
    fn test_discount_fraction() {
        assert_eq!(discounted_cents(1000, 0.2), 800);
        // 999 * 0.15 = 149.85 -> discount 150
        assert_eq!(discounted_cents(999, 0.15), 849);
        assert_eq!(discounted_cents(0, 0.5), 0);
    }
}
