use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const IDENTITY_RANDOM_LEN: usize = 9;

/// Milliseconds since the unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Generates a fresh participant identity of the form `user_<9 base36 chars>_<millis>`.
pub fn generate_identity() -> String {
    generate_identity_with(&mut rand::rng(), unix_millis())
}

fn generate_identity_with<R: Rng>(rng: &mut R, millis: u64) -> String {
    let random: String = (0..IDENTITY_RANDOM_LEN)
        .map(|_| BASE36_DIGITS[rng.random_range(0..BASE36_DIGITS.len())] as char)
        .collect();
    format!("user_{random}_{millis}")
}

/// Identity used by the side starting an outbound call.
pub fn host_identity(millis: u64) -> String {
    format!("host_{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn identity_format() {
        let identity = generate_identity_with(&mut StdRng::seed_from_u64(7), 1_700_000_000_000);

        let parts: Vec<&str> = identity.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert_eq!(parts[1].len(), 9);
        assert!(parts[1].bytes().all(|b| BASE36_DIGITS.contains(&b)));
        assert_eq!(parts[2], "1700000000000");
    }

    #[test]
    fn identities_differ() {
        assert_ne!(generate_identity(), generate_identity());
    }

    #[test]
    fn host() {
        assert_eq!(host_identity(42), "host_42");
    }
}
