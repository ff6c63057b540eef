use chrono::{DateTime, Utc};
use rand::Rng;

use super::DealType;

/// Agent-facing code: deal prefix, YYMMDD date and three random digits
pub fn generate_agent_code(deal_type: DealType, now: DateTime<Utc>) -> String {
    let prefix = match deal_type {
        DealType::Sale => "SALE",
        DealType::Rent => "RENT",
    };
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{}{}{:03}", prefix, now.format("%y%m%d"), suffix)
}

/// Catalog code: "PROP", millisecond clock modulo 10^6 and four random digits
pub fn generate_property_code(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("PROP{}{:04}", millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn agent_code_has_prefix_date_and_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let sale = generate_agent_code(DealType::Sale, now);
        assert!(sale.starts_with("SALE240309"));
        assert_eq!(sale.len(), "SALE240309".len() + 3);

        let rent = generate_agent_code(DealType::Rent, now);
        assert!(rent.starts_with("RENT240309"));
        assert!(rent[10..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn property_code_ends_with_four_digits() {
        let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        let code = generate_property_code(now);
        assert!(code.starts_with("PROP123456"));
        assert_eq!(code.len(), "PROP123456".len() + 4);
    }
}
