//! Room code and token generation utilities.

use rand::Rng;

/// Alphabet for room codes. Uppercase alphanumeric with the easily
/// confused characters (0/O, 1/I/L) removed, since codes are shared
/// out-of-band by voice or chat.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generator for human-shareable room codes.
#[derive(Debug, Clone)]
pub struct RoomCodeGenerator {
    length: usize,
}

impl Default for RoomCodeGenerator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl RoomCodeGenerator {
    /// Create a generator producing codes of the given length.
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generate a random room code.
    ///
    /// Codes are not guaranteed unique; the session registry
    /// collision-checks against live codes and retries.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| {
                let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
                ROOM_CODE_ALPHABET[idx] as char
            })
            .collect()
    }

    /// Generate a cryptographically random opaque token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_length_and_alphabet() {
        let generator = RoomCodeGenerator::new(8);
        let code = generator.generate();

        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_room_codes_vary() {
        let generator = RoomCodeGenerator::default();
        let codes: std::collections::HashSet<String> =
            (0..32).map(|_| generator.generate()).collect();

        // 31^8 combinations; 32 draws colliding would mean a broken RNG.
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_generate_token() {
        let generator = RoomCodeGenerator::default();
        let token = generator.generate_token();

        assert_eq!(token.len(), 32); // Simple UUID without hyphens
    }
}
