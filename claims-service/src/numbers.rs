// Reference numbers handed to facilities
use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Upper-case code without the easily confused `0/O` and `1/I`
pub fn random_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHANUMERIC.len());
            ALPHANUMERIC.get(idx).map_or('X', |b| char::from(*b))
        })
        .collect()
}

/// `UTN-20240115-K7QW2M`
pub fn dated_code(prefix: &str, at: DateTime<Utc>, suffix: &str) -> String {
    format!("{prefix}-{}-{suffix}", at.format("%Y%m%d"))
}

/// `CLM-20240115-000042`
pub fn sequenced(prefix: &str, at: DateTime<Utc>, sequence: u64) -> String {
    format!("{prefix}-{}-{sequence:06}", at.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_formats() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(dated_code("UTN", at, "ABC234"), "UTN-20240115-ABC234");
        assert_eq!(sequenced("CLM", at, 42), "CLM-20240115-000042");
    }

    #[test]
    fn test_random_code_alphabet() {
        let mut rng = StdRng::seed_from_u64(11);
        let code = random_code(&mut rng, 6);
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| ALPHANUMERIC.contains(&b)));
    }
}
