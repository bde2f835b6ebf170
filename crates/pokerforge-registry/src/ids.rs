//! Session id and participant token generation.

use pokerforge_protocol::SessionId;
use rand::Rng;

/// Ids stay below 2^53 so JavaScript clients can hold them exactly.
const MAX_SAFE_ID: u64 = 1 << 53;

/// Produces candidate session ids.
///
/// A source may return an id that is already live; the registry detects
/// the collision on insert and asks again. Sources must therefore not get
/// stuck returning the same id forever.
///
/// Any `FnMut() -> SessionId` closure is an `IdSource`, which keeps tests
/// short.
pub trait IdSource: Send + 'static {
    /// Returns the next candidate id.
    fn next_id(&mut self) -> SessionId;
}

impl<F> IdSource for F
where
    F: FnMut() -> SessionId + Send + 'static,
{
    fn next_id(&mut self) -> SessionId {
        self()
    }
}

/// Uniformly random ids in `1..2^53`. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> SessionId {
        SessionId(rand::rng().random_range(1..MAX_SAFE_ID))
    }
}

/// Counts up from a starting value: 1, 2, 3, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Starts counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> SessionId {
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        SessionId(id)
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used as the identity of a session's creator.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_stay_in_safe_range() {
        let mut ids = RandomIds;
        for _ in 0..1000 {
            let SessionId(id) = ids.next_id();
            assert!((1..MAX_SAFE_ID).contains(&id));
        }
    }

    #[test]
    fn test_sequential_ids_count_up() {
        let mut ids = SequentialIds::starting_at(5);
        assert_eq!(ids.next_id(), SessionId(5));
        assert_eq!(ids.next_id(), SessionId(6));
    }

    #[test]
    fn test_closure_is_an_id_source() {
        let mut n = 10;
        let mut source = move || {
            n += 1;
            SessionId(n)
        };
        assert_eq!(IdSource::next_id(&mut source), SessionId(11));
    }

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
