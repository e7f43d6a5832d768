//! Identifier generation for new nodes.

use time::OffsetDateTime;
use uuid::Uuid;

const RANDOM_WIDTH: usize = 6;

/// Produces session-unique node identifiers such as `file_m1x2k3_0_k9d8e2`.
///
/// Ids are `<kind>_<millis>_<sequence>_<random>` with every numeric part in
/// base 36. They always contain `_`, so they never equal the root id. No check
/// against the live tree is made.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh identifier for a node of the given kind.
    pub fn generate(&mut self, kind: &str) -> crate::domain::model::NodeId {
        let prefix = sanitize_kind(kind);
        let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).max(0) as u128;
        let random = Uuid::new_v4().as_u128();
        let mut random = to_base36(random);
        random.truncate(RANDOM_WIDTH);

        let id = format!(
            "{prefix}_{}_{}_{random}",
            to_base36(millis),
            to_base36(u128::from(self.issued))
        );
        self.issued += 1;
        id.into()
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

fn sanitize_kind(kind: &str) -> String {
    let cleaned: String = kind
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    if cleaned.is_empty() {
        "id".to_owned()
    } else {
        cleaned
    }
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
